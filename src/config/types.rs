use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Reel-Sift
///
/// Every table is optional; a missing table or key takes the default value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub analyzer: AnalyzerConfig,
    pub output: OutputConfig,
    pub retry: RetryConfig,
}

/// Feed API access and crawl pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourceConfig {
    /// Root URL of the media feed API
    pub base_url: String,

    /// Prefix used to derive the canonical post URL from a shortcode
    pub permalink_base: String,

    /// Base pause before each page fetch and download (milliseconds)
    pub base_delay_ms: u64,

    /// Upper bound of the uniform jitter added to every pause (milliseconds)
    pub jitter_ms: u64,

    /// Base pause before profile and single-post lookups (milliseconds)
    pub lookup_delay_ms: u64,

    /// First session-level pause after a rate-limit signal (milliseconds)
    pub rate_limit_pause_ms: u64,

    /// Ceiling for the session-level pause (milliseconds)
    pub rate_limit_max_pause_ms: u64,

    /// How many session-level pauses enumeration tolerates before giving up
    pub max_rate_limit_retries: u32,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Extra session token files to try before logging in
    pub session_files: Vec<PathBuf>,

    /// Directories scanned for any `session-*` token file
    pub session_dirs: Vec<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://feed.example.com".to_string(),
            permalink_base: crate::model::DEFAULT_PERMALINK_BASE.to_string(),
            base_delay_ms: 5_000,
            jitter_ms: 3_000,
            lookup_delay_ms: 2_000,
            rate_limit_pause_ms: 120_000,
            rate_limit_max_pause_ms: 600_000,
            max_rate_limit_retries: 5,
            request_timeout_secs: 30,
            session_files: Vec::new(),
            session_dirs: Vec::new(),
        }
    }
}

/// User agent identification
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    pub name: String,
    pub version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: "reel-sift".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}

/// Vision-language model endpoint settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnalyzerConfig {
    /// Root URL of the Generative Language API
    pub api_base: String,

    /// Model identifier used for `generateContent`
    pub model: String,

    /// Fixed throttle before every inference attempt (milliseconds)
    pub request_delay_ms: u64,

    /// Interval between upload status polls (milliseconds)
    pub poll_interval_ms: u64,

    /// Optional file replacing the built-in analysis prompt
    pub prompt_path: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            request_delay_ms: 1_000,
            poll_interval_ms: 5_000,
            prompt_path: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding ledgers and results files
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
        }
    }
}

/// Backoff constants for one retry policy
///
/// All four keys are required when the table is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicyConfig {
    pub max_attempts: u32,
    pub multiplier_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl RetryPolicyConfig {
    pub const fn new(max_attempts: u32, multiplier_ms: u64, min_ms: u64, max_ms: u64) -> Self {
        Self {
            max_attempts,
            multiplier_ms,
            min_ms,
            max_ms,
        }
    }

    pub fn multiplier(&self) -> Duration {
        Duration::from_millis(self.multiplier_ms)
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

/// The three independently tuned retry policies
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub upload: RetryPolicyConfig,
    pub inference: RetryPolicyConfig,
    pub network: RetryPolicyConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            upload: RetryPolicyConfig::new(3, 10_000, 10_000, 120_000),
            inference: RetryPolicyConfig::new(3, 10_000, 10_000, 120_000),
            network: RetryPolicyConfig::new(3, 60_000, 60_000, 300_000),
        }
    }
}
