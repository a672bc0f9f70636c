//! Pipeline driver
//!
//! # Run States
//!
//! 1. Init: create the output directory
//! 2. Loading: load the ledger and derive the skip set
//! 3. Filtering: drop completed identifiers (keeping input order), then cap
//! 4. Processing: one item at a time
//!    - success: append to the results sink, record in the ledger, save it
//!    - failure: count it and leave the identifier out of the ledger
//!    - shutdown: the item in flight is dropped uncommitted, which also
//!      removes its temporary video
//! 5. Finalizing: log the summary, even after an interruption or an error
//!
//! The ledger entry for an item is written strictly after its results line.

use crate::model::{Outcome, ProgressState, WorkItem, WorkItemList};
use crate::pipeline::{ItemProcessor, Shutdown};
use crate::storage::{Ledger, OutcomeSink, ProgressStore, ResultsSink};
use crate::{Result, SiftError};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Totals for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Items analyzed and committed this run
    pub processed: usize,
    /// Items that failed and stay eligible for the next run
    pub errors: usize,
    /// Items skipped because a previous run already completed them
    pub already_done: usize,
    pub results_file: PathBuf,
}

/// Sequential, resumable driver over a work-item list
pub struct Pipeline {
    processor: ItemProcessor,
    output_dir: PathBuf,
    store: Arc<dyn ProgressStore>,
    sink: Option<Arc<dyn OutcomeSink>>,
    max_videos: Option<usize>,
    shutdown: Shutdown,
}

impl Pipeline {
    /// Creates a driver writing its ledger and results into `output_dir`
    pub fn new(processor: ItemProcessor, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            processor,
            store: Arc::new(Ledger::new(&output_dir)),
            output_dir,
            sink: None,
            max_videos: None,
            shutdown: Shutdown::new(),
        }
    }

    /// Caps how many pending items one run processes
    pub fn with_max_videos(mut self, max_videos: Option<usize>) -> Self {
        self.max_videos = max_videos;
        self
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Replaces the JSON ledger
    pub fn with_store(mut self, store: Arc<dyn ProgressStore>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the results file named by the ledger
    pub fn with_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Items still to do: not completed, first occurrence only, capped
    fn pending<'a>(&self, list: &'a WorkItemList, state: &ProgressState) -> Vec<&'a WorkItem> {
        let done = state.skip_set();
        let mut queued = HashSet::new();
        let mut pending: Vec<&WorkItem> = list
            .videos
            .iter()
            .filter(|v| !done.contains(&v.shortcode) && queued.insert(v.shortcode.as_str()))
            .collect();

        if let Some(max) = self.max_videos {
            pending.truncate(max);
        }
        pending
    }

    /// Runs the pipeline over `list`
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Every pending item was attempted
    /// * `Err(SiftError::Interrupted)` - Shutdown was requested; committed
    ///   items stay committed
    /// * `Err(_)` - The ledger or results file could not be written
    pub async fn run(&self, list: &WorkItemList) -> Result<RunSummary> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut state = self.store.load(&list.profile);
        let pending = self.pending(list, &state);

        let mut summary = RunSummary {
            processed: 0,
            errors: 0,
            already_done: list
                .videos
                .iter()
                .filter(|v| state.is_processed(&v.shortcode))
                .count(),
            results_file: state.results_file.clone(),
        };

        tracing::info!(
            "Processing {} videos (skipping {} already processed)",
            pending.len(),
            state.processed_shortcodes.len()
        );

        let sink: Arc<dyn OutcomeSink> = match &self.sink {
            Some(sink) => Arc::clone(sink),
            None => Arc::new(ResultsSink::new(&state.results_file)),
        };

        let result = self
            .process_all(&pending, &mut state, sink.as_ref(), &mut summary)
            .await;

        if matches!(result, Err(SiftError::Interrupted)) {
            tracing::info!("Interrupted by user. Progress saved.");
        }
        tracing::info!(
            "Pipeline complete. Processed: {}, Errors: {}",
            summary.processed,
            summary.errors
        );
        tracing::info!("Results saved to: {}", summary.results_file.display());

        result.map(|()| summary)
    }

    async fn process_all(
        &self,
        pending: &[&WorkItem],
        state: &mut ProgressState,
        sink: &dyn OutcomeSink,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let total = pending.len();

        for (index, item) in pending.iter().enumerate() {
            if self.shutdown.is_requested() {
                return Err(SiftError::Interrupted);
            }

            tracing::info!("[{}/{}] {}", index + 1, total, item.shortcode);
            let outcome = tokio::select! {
                outcome = self.processor.process(item) => outcome,
                _ = self.shutdown.requested() => {
                    tracing::info!("Video {} abandoned, NOT marked as processed", item.shortcode);
                    return Err(SiftError::Interrupted);
                }
            };
            self.commit(item, &outcome, state, sink, summary)?;
        }

        if self.shutdown.is_requested() {
            return Err(SiftError::Interrupted);
        }
        Ok(())
    }

    /// Records a finished item
    ///
    /// Successes go to the sink first and only then into the ledger; failures
    /// touch neither so the item is retried next run.
    fn commit(
        &self,
        item: &WorkItem,
        outcome: &Outcome,
        state: &mut ProgressState,
        sink: &dyn OutcomeSink,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if let Some(error) = outcome.error() {
            summary.errors += 1;
            tracing::warn!("Video {} had error: {}", item.shortcode, error);
            tracing::info!("Video {} NOT marked as processed (will retry)", item.shortcode);
            return Ok(());
        }

        sink.append(outcome)?;
        state.record(&item.shortcode);
        self.store.save(state)?;
        summary.processed += 1;

        if outcome.is_exercise_video() {
            tracing::info!("Analyzed exercise video: {}", item.shortcode);
        } else {
            tracing::info!("Processed non-exercise video: {}", item.shortcode);
        }
        Ok(())
    }
}
