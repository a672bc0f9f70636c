//! Retry and pacing for the two rate-limited services
//!
//! This module handles:
//! - Exponential backoff around arbitrary async operations (`RetryPolicy`)
//! - The three named policies: upload wait, inference call, network lookup
//! - Jittered request pacing (`Pacer`)
//! - Session-level pauses when enumeration hits a rate limit (`SessionBackoff`)

mod policy;
mod throttle;

pub use policy::{RetryPolicy, CONNECTION_KINDS, TRANSIENT_KINDS, UPLOAD_KINDS};
pub use throttle::{Pacer, SessionBackoff};
