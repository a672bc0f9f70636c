//! Shared HTTP plumbing for the feed and model clients
//!
//! This module handles:
//! - Building HTTP clients with the configured user agent and timeouts
//! - Turning non-2xx responses into classified `SiftError::Status` errors
//! - Decoding JSON bodies with the request URL kept for context

use crate::config::Config;
use crate::{Result, SiftError};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Longest response body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The loaded configuration (user agent and request timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(SiftError)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use reel_sift::config::Config;
/// use reel_sift::http::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(Duration::from_secs(config.source.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|e| SiftError::http("<client builder>", e))
}

/// Passes 2xx responses through and converts anything else into an error
pub async fn check_status(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    Err(SiftError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Reads a response body and decodes it as JSON
pub async fn read_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    let text = response.text().await.map_err(|e| SiftError::http(url, e))?;
    serde_json::from_str(&text).map_err(|source| SiftError::Decode {
        url: url.to_string(),
        source,
    })
}
