use crate::Result;
use std::path::Path;

/// Built-in analysis prompt
pub const DEFAULT_PROMPT: &str = include_str!("prompts/analysis.txt");

/// Returns the prompt at `path`, or the built-in one when no path is given
pub fn load_prompt(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            let prompt = std::fs::read_to_string(path)?;
            tracing::debug!("Loaded prompt from {}", path.display());
            Ok(prompt)
        }
        None => Ok(DEFAULT_PROMPT.to_string()),
    }
}
