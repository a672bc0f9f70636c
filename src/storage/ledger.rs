use crate::model::ProgressState;
use crate::storage::{progress_file, results_file, ProgressStore};
use crate::Result;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

/// JSON file ledger, one hidden file per profile in the output directory
#[derive(Debug, Clone)]
pub struct Ledger {
    output_dir: PathBuf,
}

impl Ledger {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn fresh_state(&self, profile: &str) -> ProgressState {
        ProgressState::fresh(profile, results_file(&self.output_dir, profile))
    }
}

impl ProgressStore for Ledger {
    fn load(&self, profile: &str) -> ProgressState {
        let path = progress_file(&self.output_dir, profile);

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return self.fresh_state(profile),
            Err(e) => {
                tracing::warn!("Failed to read progress file {}: {}", path.display(), e);
                return self.fresh_state(profile);
            }
        };

        match serde_json::from_str::<ProgressState>(&text) {
            Ok(state) => {
                tracing::info!(
                    "Resuming from previous run. Already processed: {} videos",
                    state.processed_shortcodes.len()
                );
                state
            }
            Err(e) => {
                tracing::warn!("Failed to load progress file {}: {}", path.display(), e);
                self.fresh_state(profile)
            }
        }
    }

    /// Writes the ledger through a temporary file and renames it into place,
    /// so a crash mid-write leaves the previous ledger intact
    fn save(&self, state: &ProgressState) -> Result<()> {
        let path = progress_file(&self.output_dir, &state.profile);
        let text = serde_json::to_string_pretty(state)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.output_dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        tracing::debug!(
            "Saved progress for {} ({} processed)",
            state.profile,
            state.processed_shortcodes.len()
        );
        Ok(())
    }
}
