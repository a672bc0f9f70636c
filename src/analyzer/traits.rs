use crate::model::Outcome;
use async_trait::async_trait;
use std::path::Path;

/// Turns a local video into an analysis outcome
///
/// Infallible by signature: every failure is reported as a failure outcome so
/// one bad item never aborts a batch.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, video: &Path, shortcode: &str) -> Outcome;
}
