use crate::analyzer::Analyzer;
use crate::model::{Outcome, WorkItem};
use crate::source::ItemSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Runs one work item end to end: download, analyze, clean up
///
/// Never returns an error: anything that goes wrong becomes a failure outcome
/// so a single bad item cannot abort the batch.
#[derive(Clone)]
pub struct ItemProcessor {
    source: Arc<dyn ItemSource>,
    analyzer: Arc<dyn Analyzer>,
    scratch_dir: Option<PathBuf>,
}

impl ItemProcessor {
    pub fn new(source: Arc<dyn ItemSource>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            source,
            analyzer,
            scratch_dir: None,
        }
    }

    /// Puts temporary downloads in `dir` instead of the system temp directory
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    fn scratch_file(&self) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("reel-sift-").suffix(".mp4");
        match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }

    /// Processes one item
    ///
    /// The temporary video is removed before this returns, on every path, and
    /// also when the returned future is dropped before completion.
    pub async fn process(&self, item: &WorkItem) -> Outcome {
        tracing::info!("Processing video: {}", item.shortcode);

        let scratch = match self.scratch_file() {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("Failed to create temporary file for {}: {}", item.shortcode, e);
                return Outcome::failure(&item.shortcode, &item.url, e.to_string());
            }
        };

        let outcome = self.download_and_analyze(item, scratch.path()).await;

        let path = scratch.path().to_path_buf();
        match scratch.close() {
            Ok(()) => tracing::debug!("Cleaned up video file: {}", path.display()),
            Err(e) => tracing::warn!("Failed to delete {}: {}", path.display(), e),
        }

        outcome
    }

    async fn download_and_analyze(&self, item: &WorkItem, video: &Path) -> Outcome {
        if let Err(e) = self.source.download(&item.video_url, video).await {
            tracing::error!("Failed to download {}: {}", item.shortcode, e);
            return Outcome::failure(&item.shortcode, &item.url, e.to_string());
        }

        self.analyzer.analyze(video, &item.shortcode).await
    }
}
