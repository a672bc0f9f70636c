//! Item source trait

use crate::model::{WorkItem, WorkItemList};
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// Produces work items for a profile and fetches their payloads
///
/// Implementations own their pacing and retry behavior; callers see only the
/// final result of each call.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Lists a profile's video posts in discovery order
    ///
    /// May return a partial list when the source keeps rate limiting; it does
    /// not fail the whole call for that.
    async fn enumerate(&self, profile: &str) -> Result<WorkItemList>;

    /// Fetches a single post by identifier
    ///
    /// Returns `Ok(None)` when the post exists but is not a video.
    async fn fetch_one(&self, shortcode: &str) -> Result<Option<WorkItem>>;

    /// Downloads the payload behind `locator` into `dest`
    async fn download(&self, locator: &str, dest: &Path) -> Result<()>;
}
