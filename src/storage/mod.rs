//! Storage module for persisting run progress
//!
//! This module handles the two flat files kept per profile in the output
//! directory:
//! - `.progress_<profile>.json`: the ledger of completed shortcodes
//! - `results_<profile>.jsonl`: one outcome record per completed item
//!
//! No database is involved. The ledger is rewritten atomically after every
//! success; the results file is only ever appended to.

mod ledger;
mod sink;
mod traits;

pub use ledger::Ledger;
pub use sink::{read_outcomes, ResultsSink};
pub use traits::{OutcomeSink, ProgressStore};

use std::path::{Path, PathBuf};

/// Path of the hidden ledger file for a profile
pub fn progress_file(output_dir: &Path, profile: &str) -> PathBuf {
    output_dir.join(format!(".progress_{}.json", profile))
}

/// Path of the results file for a profile
pub fn results_file(output_dir: &Path, profile: &str) -> PathBuf {
    output_dir.join(format!("results_{}.jsonl", profile))
}
