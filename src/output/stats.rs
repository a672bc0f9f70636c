//! Statistics over an output directory
//!
//! This module provides functionality for summarizing what previous runs
//! committed for a profile: the ledger and the results file side by side.

use crate::model::AnalysisResult;
use crate::storage::{read_outcomes, Ledger, ProgressStore};
use crate::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Run statistics for one profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub profile: String,

    /// Identifiers recorded as completed in the ledger
    pub ledger_entries: usize,

    /// Parsable records in the results file
    pub records: usize,

    /// Records matched against the exercise schema
    pub exercise: usize,

    /// Records matched against the general schema
    pub general: usize,

    /// Failure records (written by older runs or other tools)
    pub failures: usize,

    /// Lines in the results file that could not be parsed
    pub unparsable: usize,

    /// Ledger identifiers with no record in the results file
    pub missing_records: usize,

    pub results_file: PathBuf,
}

/// Loads statistics for a profile from an output directory
///
/// # Arguments
///
/// * `output_dir` - Directory holding the ledger and results file
/// * `profile` - Profile whose files to read
///
/// # Returns
///
/// * `Ok(RunStatistics)` - Successfully loaded statistics (all zero when the
///   profile was never run)
/// * `Err(SiftError)` - The results file exists but could not be read
pub fn load_statistics(output_dir: &Path, profile: &str) -> Result<RunStatistics> {
    let state = Ledger::new(output_dir).load(profile);

    let mut stats = RunStatistics {
        profile: profile.to_string(),
        ledger_entries: state.processed_shortcodes.len(),
        results_file: state.results_file.clone(),
        ..Default::default()
    };

    let mut recorded = HashSet::new();
    for record in read_outcomes(&state.results_file)? {
        let outcome = match record {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!("Unparsable line in {}: {}", state.results_file.display(), e);
                stats.unparsable += 1;
                continue;
            }
        };

        stats.records += 1;
        match outcome.analysis() {
            Some(AnalysisResult::Exercise(_)) => stats.exercise += 1,
            Some(AnalysisResult::General(_)) => stats.general += 1,
            None => stats.failures += 1,
        }
        if outcome.is_success() {
            recorded.insert(outcome.shortcode);
        }
    }

    stats.missing_records = state
        .processed_shortcodes
        .iter()
        .filter(|code| !recorded.contains(*code))
        .count();

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Run Statistics: {} ===\n", stats.profile);

    println!("Overview:");
    println!("  Completed (ledger): {}", stats.ledger_entries);
    println!("  Result records: {}", stats.records);
    println!("  Results file: {}", stats.results_file.display());
    println!();

    println!("Records by Kind:");
    for (label, count) in [
        ("Exercise", stats.exercise),
        ("General", stats.general),
        ("Failure", stats.failures),
    ] {
        let percentage = if stats.records > 0 {
            (count as f64 / stats.records as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    if stats.unparsable > 0 || stats.missing_records > 0 {
        println!("Problems:");
        if stats.unparsable > 0 {
            println!("  Unparsable lines: {}", stats.unparsable);
        }
        if stats.missing_records > 0 {
            println!("  Completed without a record: {}", stats.missing_records);
        }
        println!();
    }
}
