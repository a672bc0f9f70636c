//! Output module for reporting on a profile's run history
//!
//! This module handles:
//! - Reading a profile's ledger and results file from an output directory
//! - Printing the resulting statistics to the console

pub mod stats;

pub use stats::{load_statistics, print_statistics, RunStatistics};
