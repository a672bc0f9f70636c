//! Reel-Sift: a resumable video analysis pipeline
//!
//! This crate crawls a profile's video posts, downloads each video and submits it
//! to a vision-language model for structured analysis. Progress is committed after
//! every item so an interrupted or rate-limited run picks up where it left off.

pub mod analyzer;
pub mod config;
pub mod http;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod retry;
pub mod source;
pub mod storage;

use thiserror::Error;

/// Main error type for Reel-Sift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} from {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Unexpected response from {url}: {message}")]
    Protocol { url: String, message: String },

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Uploaded file {name} ended in state {state}")]
    ResourceState { name: String, state: String },

    #[error("Response does not match the {schema} schema: {message}")]
    Validation {
        schema: &'static str,
        message: String,
    },

    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        source: Box<SiftError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Interrupted by user")]
    Interrupted,
}

/// Coarse classification of a failure, used by retry policies to decide
/// whether another attempt is worthwhile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection refused/reset, DNS failure, broken body stream
    Connection,
    /// Request or connect timeout
    Timeout,
    /// HTTP 400
    BadRequest,
    /// HTTP 429
    RateLimited,
    /// HTTP 5xx
    ServerError,
    /// HTTP 404
    NotFound,
    /// HTTP 401/403 or a rejected login
    Auth,
    /// Remote resource landed in an unexpected terminal state
    ResourceState,
    /// Payload does not match the expected schema
    Validation,
    Io,
    Decode,
    Config,
    Interrupted,
    Other,
}

impl ErrorKind {
    /// Maps an HTTP status code onto an error kind
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 | 403 => Self::Auth,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError,
            _ => Self::Other,
        }
    }
}

impl SiftError {
    /// Returns the classification of this error
    ///
    /// A `RetriesExhausted` error reports the kind of the last failure it wraps.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Http { source, .. } => {
                if source.is_timeout() {
                    ErrorKind::Timeout
                } else if source.is_connect() || source.is_request() || source.is_body() {
                    ErrorKind::Connection
                } else if source.is_decode() {
                    ErrorKind::Decode
                } else if let Some(status) = source.status() {
                    ErrorKind::from_status(status.as_u16())
                } else {
                    ErrorKind::Other
                }
            }
            Self::Status { status, .. } => ErrorKind::from_status(*status),
            Self::Decode { .. } | Self::Json(_) => ErrorKind::Decode,
            Self::Protocol { .. } => ErrorKind::Other,
            Self::Login(_) => ErrorKind::Auth,
            Self::ResourceState { .. } => ErrorKind::ResourceState,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::RetriesExhausted { source, .. } => source.kind(),
            Self::Io(_) => ErrorKind::Io,
            Self::Interrupted => ErrorKind::Interrupted,
        }
    }

    /// Builds an `Http` error from a reqwest failure against `url`
    pub fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.into(),
            source,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Result type alias for Reel-Sift operations
pub type Result<T> = std::result::Result<T, SiftError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{AnalysisResult, Outcome, ProgressState, WorkItem, WorkItemList};
pub use pipeline::{ItemProcessor, Pipeline, RunSummary, Shutdown};
