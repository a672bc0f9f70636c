//! Pipeline integration tests
//!
//! These run the driver end to end over in-memory sources and analyzers,
//! with the real ledger and results file in a temporary directory.

use crate::common::{item, list, sink_shortcodes, FakeAnalyzer, FakeSource};
use async_trait::async_trait;
use reel_sift::analyzer::Analyzer;
use reel_sift::model::{Outcome, ProgressState, WorkItem, WorkItemList};
use reel_sift::pipeline::{collect_by_shortcodes, CollectSummary};
use reel_sift::source::{load_video_list, ItemSource};
use reel_sift::storage::{progress_file, results_file, Ledger, OutcomeSink, ProgressStore};
use reel_sift::{ItemProcessor, Pipeline, Result, Shutdown, SiftError};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn pipeline(
    source: Arc<FakeSource>,
    analyzer: Arc<FakeAnalyzer>,
    output_dir: &Path,
    scratch_dir: &Path,
) -> Pipeline {
    let processor = ItemProcessor::new(source, analyzer).with_scratch_dir(scratch_dir);
    Pipeline::new(processor, output_dir)
}

fn ledger_entries(output_dir: &Path, profile: &str) -> Vec<String> {
    Ledger::new(output_dir).load(profile).processed_shortcodes
}

fn scratch_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[tokio::test]
async fn test_failed_item_is_not_committed() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let source = Arc::new(FakeSource::default());
    let analyzer = Arc::new(FakeAnalyzer::failing_on(&["B"]));

    let summary = pipeline(source, analyzer.clone(), output.path(), scratch.path())
        .run(&list("coach", &["A", "B", "C"]))
        .await
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.already_done, 0);
    assert_eq!(analyzer.calls(), vec!["A", "B", "C"]);
    assert_eq!(ledger_entries(output.path(), "coach"), vec!["A", "C"]);

    let results = results_file(output.path(), "coach");
    assert_eq!(summary.results_file, results);
    assert_eq!(sink_shortcodes(&results), vec!["A", "C"]);
}

#[tokio::test]
async fn test_failed_item_is_retried_on_next_run() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let source = Arc::new(FakeSource::default());
    let videos = list("coach", &["A", "B", "C"]);

    pipeline(
        source.clone(),
        Arc::new(FakeAnalyzer::failing_on(&["B"])),
        output.path(),
        scratch.path(),
    )
    .run(&videos)
    .await
    .unwrap();

    let analyzer = Arc::new(FakeAnalyzer::default());
    let summary = pipeline(source, analyzer.clone(), output.path(), scratch.path())
        .run(&videos)
        .await
        .unwrap();

    assert_eq!(analyzer.calls(), vec!["B"]);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.already_done, 2);
    assert_eq!(ledger_entries(output.path(), "coach"), vec!["A", "C", "B"]);
    assert_eq!(
        sink_shortcodes(&results_file(output.path(), "coach")),
        vec!["A", "C", "B"]
    );
}

#[tokio::test]
async fn test_resume_with_failure_and_success() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();

    let mut state = ProgressState::fresh("coach", results_file(output.path(), "coach"));
    state.record("A");
    Ledger::new(output.path()).save(&state).unwrap();

    let analyzer = Arc::new(FakeAnalyzer::failing_on(&["B"]));
    let summary = pipeline(
        Arc::new(FakeSource::default()),
        analyzer.clone(),
        output.path(),
        scratch.path(),
    )
    .run(&list("coach", &["A", "B", "C"]))
    .await
    .unwrap();

    assert_eq!(analyzer.calls(), vec!["B", "C"]);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.already_done, 1);
    assert_eq!(ledger_entries(output.path(), "coach"), vec!["A", "C"]);
    assert_eq!(sink_shortcodes(&results_file(output.path(), "coach")), vec!["C"]);
}

#[tokio::test]
async fn test_resume_skips_completed_items() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let codes = ["V0", "V1", "V2", "V3", "V4", "V5"];
    let videos = list("coach", &codes);

    // A previous run got through the first two.
    let mut state = ProgressState::fresh("coach", results_file(output.path(), "coach"));
    state.record("V0");
    state.record("V1");
    Ledger::new(output.path()).save(&state).unwrap();

    let analyzer = Arc::new(FakeAnalyzer::default());
    let summary = pipeline(
        Arc::new(FakeSource::default()),
        analyzer.clone(),
        output.path(),
        scratch.path(),
    )
    .run(&videos)
    .await
    .unwrap();

    assert_eq!(analyzer.calls(), vec!["V2", "V3", "V4", "V5"]);
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.already_done, 2);
    assert_eq!(ledger_entries(output.path(), "coach"), codes.to_vec());
}

#[tokio::test]
async fn test_max_videos_caps_pending_items() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let codes: Vec<String> = (0..10).map(|i| format!("V{}", i)).collect();
    let refs: Vec<&str> = codes.iter().map(String::as_str).collect();

    let analyzer = Arc::new(FakeAnalyzer::default());
    let summary = pipeline(
        Arc::new(FakeSource::default()),
        analyzer.clone(),
        output.path(),
        scratch.path(),
    )
    .with_max_videos(Some(3))
    .run(&list("coach", &refs))
    .await
    .unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(analyzer.calls(), vec!["V0", "V1", "V2"]);
    assert_eq!(ledger_entries(output.path(), "coach").len(), 3);
}

#[tokio::test]
async fn test_corrupt_ledger_starts_fresh() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    std::fs::write(progress_file(output.path(), "coach"), "{not json").unwrap();

    let analyzer = Arc::new(FakeAnalyzer::default());
    let summary = pipeline(
        Arc::new(FakeSource::default()),
        analyzer.clone(),
        output.path(),
        scratch.path(),
    )
    .run(&list("coach", &["A", "B"]))
    .await
    .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(analyzer.calls(), vec!["A", "B"]);
    assert_eq!(ledger_entries(output.path(), "coach"), vec!["A", "B"]);
}

#[tokio::test]
async fn test_duplicate_entries_processed_once() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let analyzer = Arc::new(FakeAnalyzer::default());

    let summary = pipeline(
        Arc::new(FakeSource::default()),
        analyzer.clone(),
        output.path(),
        scratch.path(),
    )
    .run(&list("coach", &["A", "B", "A"]))
    .await
    .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(analyzer.calls(), vec!["A", "B"]);
    assert_eq!(sink_shortcodes(&results_file(output.path(), "coach")), vec!["A", "B"]);
}

#[tokio::test]
async fn test_empty_list_writes_nothing() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();

    let summary = pipeline(
        Arc::new(FakeSource::default()),
        Arc::new(FakeAnalyzer::default()),
        output.path(),
        scratch.path(),
    )
    .run(&WorkItemList::new("coach"))
    .await
    .unwrap();

    assert_eq!(summary.processed, 0);
    assert_eq!(summary.errors, 0);
    assert!(!results_file(output.path(), "coach").exists());
}

#[tokio::test]
async fn test_video_removed_after_analysis() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let source = Arc::new(FakeSource::default());
    let analyzer = Arc::new(FakeAnalyzer::default());

    pipeline(source.clone(), analyzer.clone(), output.path(), scratch.path())
        .run(&list("coach", &["A", "B"]))
        .await
        .unwrap();

    // The analyzer saw each downloaded file, and none of them survived.
    assert_eq!(*analyzer.saw_file.lock().unwrap(), vec![true, true]);
    let paths = source.download_paths();
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| !p.exists()));
    assert!(scratch_is_empty(scratch.path()));
}

#[tokio::test]
async fn test_download_failure_cleans_up_and_skips_analysis() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let source = Arc::new(FakeSource::failing_download("B"));
    let analyzer = Arc::new(FakeAnalyzer::default());

    let summary = pipeline(source.clone(), analyzer.clone(), output.path(), scratch.path())
        .run(&list("coach", &["A", "B"]))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.errors, 1);
    assert_eq!(analyzer.calls(), vec!["A"]);
    assert_eq!(ledger_entries(output.path(), "coach"), vec!["A"]);
    assert!(scratch_is_empty(scratch.path()));
}

#[tokio::test]
async fn test_processor_failure_outcome_carries_item_url() {
    let scratch = TempDir::new().unwrap();
    let processor = ItemProcessor::new(
        Arc::new(FakeSource::failing_download("B")),
        Arc::new(FakeAnalyzer::default()),
    )
    .with_scratch_dir(scratch.path());

    let target = item("B");
    let outcome = processor.process(&target).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.shortcode, "B");
    assert_eq!(outcome.url, target.url);
    assert!(outcome.error().unwrap().contains("503"));
}

#[tokio::test]
async fn test_shutdown_before_run_processes_nothing() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let shutdown = Shutdown::new();
    shutdown.request();

    let analyzer = Arc::new(FakeAnalyzer::default());
    let result = pipeline(
        Arc::new(FakeSource::default()),
        analyzer.clone(),
        output.path(),
        scratch.path(),
    )
    .with_shutdown(shutdown)
    .run(&list("coach", &["A", "B"]))
    .await;

    assert!(matches!(result, Err(SiftError::Interrupted)));
    assert!(analyzer.calls().is_empty());
    assert!(ledger_entries(output.path(), "coach").is_empty());
}

#[tokio::test]
async fn test_shutdown_mid_run_keeps_committed_items() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let shutdown = Shutdown::new();
    let analyzer = Arc::new(FakeAnalyzer {
        interrupt: Some(shutdown.clone()),
        ..Default::default()
    });

    let result = pipeline(
        Arc::new(FakeSource::default()),
        analyzer.clone(),
        output.path(),
        scratch.path(),
    )
    .with_shutdown(shutdown)
    .run(&list("coach", &["A", "B", "C"]))
    .await;

    // The item in flight finishes and is committed; nothing after it starts.
    assert!(matches!(result, Err(SiftError::Interrupted)));
    assert_eq!(analyzer.calls(), vec!["A"]);
    assert_eq!(ledger_entries(output.path(), "coach"), vec!["A"]);
    assert_eq!(sink_shortcodes(&results_file(output.path(), "coach")), vec!["A"]);
}

#[tokio::test]
async fn test_shutdown_during_last_item_reports_interrupted() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let shutdown = Shutdown::new();
    let analyzer = Arc::new(FakeAnalyzer {
        interrupt: Some(shutdown.clone()),
        ..Default::default()
    });

    let result = pipeline(
        Arc::new(FakeSource::default()),
        analyzer,
        output.path(),
        scratch.path(),
    )
    .with_shutdown(shutdown)
    .run(&list("coach", &["A"]))
    .await;

    assert!(matches!(result, Err(SiftError::Interrupted)));
    assert_eq!(ledger_entries(output.path(), "coach"), vec!["A"]);
}

/// Analyzer that requests shutdown and then never answers, like a model call
/// stuck in a long backoff when Ctrl-C arrives
struct StalledAnalyzer {
    shutdown: Shutdown,
    saw_file: Mutex<Vec<bool>>,
}

#[async_trait]
impl Analyzer for StalledAnalyzer {
    async fn analyze(&self, video: &Path, _shortcode: &str) -> Outcome {
        self.saw_file.lock().unwrap().push(video.exists());
        self.shutdown.request();
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_shutdown_abandons_item_in_flight() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let shutdown = Shutdown::new();
    let source = Arc::new(FakeSource::default());
    let analyzer = Arc::new(StalledAnalyzer {
        shutdown: shutdown.clone(),
        saw_file: Mutex::default(),
    });

    let processor = ItemProcessor::new(source.clone(), analyzer.clone())
        .with_scratch_dir(scratch.path());
    let pipeline = Pipeline::new(processor, output.path()).with_shutdown(shutdown);
    let items = list("coach", &["A", "B"]);
    let run = pipeline.run(&items);
    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run should stop once shutdown is requested");

    assert!(matches!(result, Err(SiftError::Interrupted)));
    assert_eq!(*analyzer.saw_file.lock().unwrap(), vec![true]);
    assert!(ledger_entries(output.path(), "coach").is_empty());
    assert!(!results_file(output.path(), "coach").exists());

    // The abandoned item's download was removed with it.
    let paths = source.download_paths();
    assert_eq!(paths.len(), 1);
    assert!(!paths[0].exists());
    assert!(scratch_is_empty(scratch.path()));
}

/// Source whose lookups request shutdown and then hang
struct StalledSource {
    shutdown: Shutdown,
}

#[async_trait]
impl ItemSource for StalledSource {
    async fn enumerate(&self, profile: &str) -> Result<WorkItemList> {
        Ok(WorkItemList::new(profile))
    }

    async fn fetch_one(&self, _shortcode: &str) -> Result<Option<WorkItem>> {
        self.shutdown.request();
        std::future::pending().await
    }

    async fn download(&self, _locator: &str, _dest: &Path) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_collect_by_shortcodes_abandons_lookup_on_shutdown() {
    let dir = TempDir::new().unwrap();
    let list_path = dir.path().join("videos_codes.json");
    let shutdown = Shutdown::new();
    let source = StalledSource {
        shutdown: shutdown.clone(),
    };

    let mut videos = WorkItemList::new("coach");
    let codes = vec!["A".to_string(), "B".to_string()];
    let collect = collect_by_shortcodes(&source, &codes, &mut videos, &list_path, &shutdown);
    let result = tokio::time::timeout(Duration::from_secs(5), collect)
        .await
        .expect("collect should stop once shutdown is requested");

    assert!(matches!(result, Err(SiftError::Interrupted)));
    assert!(videos.is_empty());
    assert!(!list_path.exists());
}

/// Shared log of storage writes, in the order they happened
type Journal = Arc<Mutex<Vec<String>>>;

struct JournalSink(Journal);

impl OutcomeSink for JournalSink {
    fn append(&self, outcome: &Outcome) -> Result<()> {
        self.0
            .lock()
            .unwrap()
            .push(format!("sink:{}", outcome.shortcode));
        Ok(())
    }
}

struct JournalStore(Journal);

impl ProgressStore for JournalStore {
    fn load(&self, profile: &str) -> ProgressState {
        ProgressState::fresh(profile, "unused.jsonl")
    }

    fn save(&self, state: &ProgressState) -> Result<()> {
        let last = state.processed_shortcodes.last().cloned().unwrap_or_default();
        self.0.lock().unwrap().push(format!("ledger:{}", last));
        Ok(())
    }
}

#[tokio::test]
async fn test_results_written_before_ledger() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let journal: Journal = Arc::default();

    pipeline(
        Arc::new(FakeSource::default()),
        Arc::new(FakeAnalyzer::failing_on(&["B"])),
        output.path(),
        scratch.path(),
    )
    .with_store(Arc::new(JournalStore(journal.clone())))
    .with_sink(Arc::new(JournalSink(journal.clone())))
    .run(&list("coach", &["A", "B", "C"]))
    .await
    .unwrap();

    assert_eq!(
        *journal.lock().unwrap(),
        vec!["sink:A", "ledger:A", "sink:C", "ledger:C"]
    );
}

struct BrokenSink;

impl OutcomeSink for BrokenSink {
    fn append(&self, _outcome: &Outcome) -> Result<()> {
        Err(SiftError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }
}

#[tokio::test]
async fn test_sink_failure_aborts_without_ledger_entry() {
    let output = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let analyzer = Arc::new(FakeAnalyzer::default());

    let result = pipeline(
        Arc::new(FakeSource::default()),
        analyzer.clone(),
        output.path(),
        scratch.path(),
    )
    .with_sink(Arc::new(BrokenSink))
    .run(&list("coach", &["A", "B"]))
    .await;

    assert!(matches!(result, Err(SiftError::Io(_))));
    assert_eq!(analyzer.calls(), vec!["A"]);
    assert!(ledger_entries(output.path(), "coach").is_empty());
}

#[tokio::test]
async fn test_collect_by_shortcodes_counts_and_saves() {
    let dir = TempDir::new().unwrap();
    let list_path = dir.path().join("videos_codes.json");
    let source = FakeSource::with_posts(&[("A", true), ("B", false), ("D", true)]);

    let mut videos = WorkItemList::new("coach");
    videos.push_unique(item("E"));
    let codes: Vec<String> = ["E", "A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();

    let summary = collect_by_shortcodes(&source, &codes, &mut videos, &list_path, &Shutdown::new())
        .await
        .unwrap();

    assert_eq!(
        summary,
        CollectSummary {
            added: 2,
            existing: 1,
            not_video: 1,
            errors: 1,
        }
    );
    assert_eq!(*source.lookups.lock().unwrap(), vec!["A", "B", "C", "D"]);

    let saved = load_video_list(&list_path).unwrap();
    assert_eq!(saved, videos);
    let saved_codes: Vec<&str> = saved.videos.iter().map(|v| v.shortcode.as_str()).collect();
    assert_eq!(saved_codes, vec!["E", "A", "D"]);
}

#[tokio::test]
async fn test_collect_by_shortcodes_stops_on_shutdown() {
    let dir = TempDir::new().unwrap();
    let list_path = dir.path().join("videos_codes.json");
    let source = FakeSource::with_posts(&[("A", true)]);
    let shutdown = Shutdown::new();
    shutdown.request();

    let mut videos = WorkItemList::new("coach");
    let codes = vec!["A".to_string()];
    let result = collect_by_shortcodes(&source, &codes, &mut videos, &list_path, &shutdown).await;

    assert!(matches!(result, Err(SiftError::Interrupted)));
    assert!(source.lookups.lock().unwrap().is_empty());
    assert!(!list_path.exists());
}
