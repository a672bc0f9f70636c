use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Per-profile record of successfully completed shortcodes
///
/// The shortcode list is append-only. An entry is added only after the
/// matching results line has been written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Profile being analyzed
    pub profile: String,

    /// Shortcodes already processed, in completion order
    #[serde(default)]
    pub processed_shortcodes: Vec<String>,

    /// Path of the results file this ledger belongs to
    pub results_file: PathBuf,
}

impl ProgressState {
    /// Creates an empty state for a profile
    pub fn fresh(profile: impl Into<String>, results_file: impl AsRef<Path>) -> Self {
        Self {
            profile: profile.into(),
            processed_shortcodes: Vec::new(),
            results_file: results_file.as_ref().to_path_buf(),
        }
    }

    /// Returns true if the shortcode has already been completed
    pub fn is_processed(&self, shortcode: &str) -> bool {
        self.processed_shortcodes.iter().any(|s| s == shortcode)
    }

    /// Records a completed shortcode
    ///
    /// Returns false, leaving the state unchanged, if it was already recorded.
    pub fn record(&mut self, shortcode: &str) -> bool {
        if self.is_processed(shortcode) {
            return false;
        }
        self.processed_shortcodes.push(shortcode.to_string());
        true
    }

    /// Snapshot of completed shortcodes used to filter a run's work set
    pub fn skip_set(&self) -> HashSet<String> {
        self.processed_shortcodes.iter().cloned().collect()
    }
}
