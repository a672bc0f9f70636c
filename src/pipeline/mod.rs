//! Resumable processing pipeline
//!
//! This module handles:
//! - Processing a single work item (`ItemProcessor`)
//! - Driving a whole work-item list with ledger bookkeeping (`Pipeline`)
//! - Building a work-item list from individual identifiers
//! - Cooperative cancellation (`Shutdown`)

mod collect;
mod driver;
mod processor;
mod shutdown;

pub use collect::{collect_by_shortcodes, CollectSummary};
pub use driver::{Pipeline, RunSummary};
pub use processor::ItemProcessor;
pub use shutdown::Shutdown;
