//! Video analysis with a vision-language model
//!
//! # Components
//!
//! - `Analyzer`: the boundary the item processor calls
//! - `GeminiAnalyzer`: upload, wait, generate with a primary schema and a
//!   fallback schema, then delete the upload
//! - `ResponseSchema`: the two structured response shapes

mod gemini;
mod prompt;
mod schema;
mod traits;

pub use gemini::GeminiAnalyzer;
pub use prompt::{load_prompt, DEFAULT_PROMPT};
pub use schema::{parse_response, ResponseSchema};
pub use traits::Analyzer;
