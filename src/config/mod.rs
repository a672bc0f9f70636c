//! Configuration module for Reel-Sift
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file, and resolving credentials from a dotenv file or the
//! process environment.
//!
//! # Example
//!
//! ```no_run
//! use reel_sift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("reel-sift.toml")).unwrap();
//! println!("Results go to: {}", config.output.directory.display());
//! ```

mod credentials;
mod parser;
mod types;
mod validation;

// Re-export types
pub use credentials::{Credentials, LoginCredentials};
pub use types::{
    AnalyzerConfig, Config, OutputConfig, RetryConfig, RetryPolicyConfig, SourceConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
