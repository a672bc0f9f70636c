//! Reusable login sessions
//!
//! A session token saved by an earlier login lets the feed client skip the
//! username/password exchange, which the feed rate limits heavily.

use crate::config::SourceConfig;
use std::path::{Path, PathBuf};

/// Supplies a previously saved session token, if one is available
pub trait CredentialProvider: Send + Sync {
    fn session_token(&self, username: &str) -> Option<String>;
}

/// Looks for session token files on disk
///
/// Probes, in order: the default per-user files (when enabled), the
/// configured files, and finally any `session-*` file matched in the session
/// directories. The first non-empty file wins.
#[derive(Debug, Clone, Default)]
pub struct SessionFileProvider {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
    default_locations: bool,
}

impl SessionFileProvider {
    /// A provider that only probes the given files and directories
    pub fn new(files: Vec<PathBuf>, dirs: Vec<PathBuf>) -> Self {
        Self {
            files,
            dirs,
            default_locations: false,
        }
    }

    /// The provider used by the binary: default locations plus configured ones
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            files: config.session_files.clone(),
            dirs: config.session_dirs.clone(),
            default_locations: true,
        }
    }

    /// Per-user directories a session may have been saved into
    fn default_dirs() -> Vec<PathBuf> {
        let mut found = Vec::new();
        if let Some(config) = dirs::config_dir() {
            found.push(config.join("reel-sift"));
        }
        if let Some(home) = dirs::home_dir() {
            found.push(home.join(".reel-sift"));
        }
        found
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        let mut search = if self.default_locations {
            Self::default_dirs()
        } else {
            Vec::new()
        };
        search.extend(self.dirs.iter().cloned());
        search
    }

    fn candidates(&self, username: &str) -> Vec<PathBuf> {
        let file_name = format!("session-{}", username);
        let mut paths = Vec::new();

        if self.default_locations {
            paths.extend(Self::default_dirs().into_iter().map(|d| d.join(&file_name)));
            paths.push(std::env::temp_dir().join(&file_name));
        }
        paths.extend(self.files.iter().cloned());

        for dir in self.search_dirs() {
            paths.extend(session_files_in(&dir));
        }
        paths
    }
}

/// Every `session-*` file in `dir`, sorted
fn session_files_in(dir: &Path) -> Vec<PathBuf> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = Path::new(&escaped).join("session-*");

    let entries = match glob::glob(&pattern.to_string_lossy()) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Cannot scan {} for sessions: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut matches: Vec<PathBuf> = entries.filter_map(|e| e.ok()).collect();
    matches.sort();
    matches
}

fn read_token(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let token = text.trim();
            if token.is_empty() {
                tracing::debug!("Session file {} is empty", path.display());
                None
            } else {
                Some(token.to_string())
            }
        }
        Err(e) => {
            tracing::debug!("Failed to load session from {}: {}", path.display(), e);
            None
        }
    }
}

impl CredentialProvider for SessionFileProvider {
    fn session_token(&self, username: &str) -> Option<String> {
        for path in self.candidates(username) {
            if !path.is_file() {
                continue;
            }
            if let Some(token) = read_token(&path) {
                tracing::info!("Loaded session from {}", path.display());
                return Some(token);
            }
        }
        None
    }
}
