use crate::model::WorkItemList;
use crate::pipeline::Shutdown;
use crate::source::{save_video_list, ItemSource};
use crate::{Result, SiftError};
use std::path::Path;

/// Counts from one fetch-by-identifier pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectSummary {
    /// Identifiers fetched and added as videos
    pub added: usize,
    /// Identifiers already present in the list
    pub existing: usize,
    /// Posts that turned out not to be videos
    pub not_video: usize,
    /// Lookups that failed; the identifier is left out and can be retried
    pub errors: usize,
}

/// Looks up identifiers one by one and grows `list` with the video posts
///
/// Identifiers already in `list` are skipped, which is how an interrupted
/// pass resumes. The list file is rewritten after every successful lookup. A
/// failed lookup is counted and does not stop the pass.
///
/// # Returns
///
/// * `Ok(CollectSummary)` - Every identifier was attempted
/// * `Err(SiftError::Interrupted)` - Shutdown was requested; the lookup in
///   flight, if any, is abandoned
/// * `Err(_)` - The list file could not be written
pub async fn collect_by_shortcodes(
    source: &dyn ItemSource,
    shortcodes: &[String],
    list: &mut WorkItemList,
    list_path: &Path,
    shutdown: &Shutdown,
) -> Result<CollectSummary> {
    let mut summary = CollectSummary::default();
    let total = shortcodes.len();

    for (index, shortcode) in shortcodes.iter().enumerate() {
        if list.contains(shortcode) {
            summary.existing += 1;
            continue;
        }
        if shutdown.is_requested() {
            tracing::info!("Aborted by user. Progress saved.");
            return Err(SiftError::Interrupted);
        }

        tracing::info!("[{}/{}] Fetching {}...", index + 1, total, shortcode);
        let fetched = tokio::select! {
            fetched = source.fetch_one(shortcode) => fetched,
            _ = shutdown.requested() => {
                tracing::info!("Aborted by user. Progress saved.");
                return Err(SiftError::Interrupted);
            }
        };

        match fetched {
            Ok(Some(item)) => {
                list.push_unique(item);
                summary.added += 1;
                tracing::info!("  Found video: {}", shortcode);
            }
            Ok(None) => {
                summary.not_video += 1;
                tracing::debug!("  Not a video: {}", shortcode);
            }
            Err(e) => {
                summary.errors += 1;
                tracing::warn!("  Error fetching {}: {}", shortcode, e);
                continue;
            }
        }

        save_video_list(list, list_path)?;
    }

    tracing::info!(
        "Done: {} videos, {} skipped, {} errors",
        list.len(),
        summary.not_video,
        summary.errors
    );
    Ok(summary)
}
