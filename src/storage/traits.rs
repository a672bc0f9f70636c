//! Storage traits
//!
//! This module defines the interfaces the pipeline uses to persist progress
//! and outcomes.

use crate::model::{Outcome, ProgressState};
use crate::Result;

/// Durable per-profile progress ledger
///
/// Implementations must make `save` durable before returning: the pipeline
/// treats a returned `Ok(())` as "this item is committed".
pub trait ProgressStore: Send + Sync {
    /// Loads the state for a profile
    ///
    /// Never fails: a missing or unreadable ledger yields a fresh, empty state.
    fn load(&self, profile: &str) -> ProgressState;

    /// Persists the state, replacing whatever was stored before
    fn save(&self, state: &ProgressState) -> Result<()>;
}

/// Append-only store of outcome records
pub trait OutcomeSink: Send + Sync {
    /// Durably appends one record; existing records are never rewritten
    fn append(&self, outcome: &Outcome) -> Result<()>;
}
