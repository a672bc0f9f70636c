use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Canonical post URL prefix used when no other base is configured
pub const DEFAULT_PERMALINK_BASE: &str = "https://www.instagram.com/p/";

/// Derives the canonical post URL for a shortcode
///
/// ```
/// use reel_sift::model::permalink;
///
/// assert_eq!(
///     permalink("https://www.instagram.com/p", "Cx1AbCdEfGh"),
///     "https://www.instagram.com/p/Cx1AbCdEfGh/"
/// );
/// ```
pub fn permalink(base: &str, shortcode: &str) -> String {
    format!("{}/{}/", base.trim_end_matches('/'), shortcode)
}

/// One video post discovered for a profile
///
/// Immutable once produced by an item source. The `video_url` is a transient
/// CDN locator and may expire; the `shortcode` is the stable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub shortcode: String,
    pub url: String,
    pub video_url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

/// A profile's video posts in discovery order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemList {
    pub profile: String,
    pub videos: Vec<WorkItem>,
}

impl WorkItemList {
    /// Creates an empty list for a profile
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            videos: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Returns true if an item with this shortcode is already present
    pub fn contains(&self, shortcode: &str) -> bool {
        self.videos.iter().any(|v| v.shortcode == shortcode)
    }

    /// Appends an item unless its shortcode is already present
    ///
    /// Returns whether the item was added.
    pub fn push_unique(&mut self, item: WorkItem) -> bool {
        if self.contains(&item.shortcode) {
            return false;
        }
        self.videos.push(item);
        true
    }

    /// Returns the set of shortcodes in this list
    pub fn shortcodes(&self) -> HashSet<&str> {
        self.videos.iter().map(|v| v.shortcode.as_str()).collect()
    }
}
