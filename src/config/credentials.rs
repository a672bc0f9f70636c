//! Credential resolution
//!
//! Secrets never live in the TOML file. They are read from a dotenv file into a
//! private map (the process environment is left untouched) with the process
//! environment as a fallback.

use crate::ConfigError;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

const USERNAME_VAR: &str = "INSTAGRAM_USERNAME";
const PASSWORD_VAR: &str = "INSTAGRAM_PASSWORD";
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Username/password pair for the feed login
#[derive(Clone)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Every secret the binary may need, resolved once at startup
#[derive(Clone, Default)]
pub struct Credentials {
    username: Option<String>,
    password: Option<String>,
    api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Resolves credentials from an optional dotenv file, then the environment
    ///
    /// A dotenv file that is missing or unreadable is skipped with a warning.
    pub fn load(env_file: Option<&Path>) -> Self {
        let mut file_vars = HashMap::new();

        if let Some(path) = env_file.filter(|p| p.exists()) {
            match dotenvy::from_path_iter(path) {
                Ok(iter) => {
                    for item in iter {
                        match item {
                            Ok((key, value)) => {
                                file_vars.insert(key, value);
                            }
                            Err(e) => {
                                tracing::warn!("Skipping bad line in {}: {}", path.display(), e)
                            }
                        }
                    }
                    tracing::info!("Loaded environment from: {}", path.display());
                }
                Err(e) => tracing::warn!("Failed to read env file {}: {}", path.display(), e),
            }
        }

        Self::from_lookup(|key| {
            file_vars
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
        })
    }

    /// Builds credentials from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            username: non_empty(USERNAME_VAR),
            password: non_empty(PASSWORD_VAR),
            api_key: API_KEY_VARS.iter().find_map(|key| non_empty(key)),
        }
    }

    /// Returns the feed login, or an error naming what is missing
    pub fn login(&self) -> Result<LoginCredentials, ConfigError> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(LoginCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, _) => Err(ConfigError::MissingCredential(USERNAME_VAR)),
            (_, None) => Err(ConfigError::MissingCredential(PASSWORD_VAR)),
        }
    }

    /// Returns the model API key
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential(API_KEY_VARS[0]))
    }
}
