//! Data model for work items, analysis outcomes and resumable progress
//!
//! # Components
//!
//! - `WorkItem` / `WorkItemList`: video posts discovered for a profile
//! - `AnalysisResult` / `Outcome`: the tagged result of processing one item
//! - `ProgressState`: the per-profile ledger of completed identifiers

mod item;
mod outcome;
mod progress;

// Re-export main types
pub use item::{permalink, WorkItem, WorkItemList, DEFAULT_PERMALINK_BASE};
pub use outcome::{AnalysisResult, ExerciseAnalysis, GeneralInsights, Outcome, OutcomeStatus};
pub use progress::ProgressState;
