//! Session token access.
//!
//! The client never issues, refreshes, or invalidates tokens; it only
//! reads whatever bearer token the external login flow persisted.

use std::path::PathBuf;

/// Source of the bearer token attached to REST calls and the realtime
/// connection URL.
pub trait TokenProvider: Send + Sync {
    /// The current bearer token, or None when no session is persisted.
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token, for tests and the `--token` CLI flag.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn bearer_token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}

/// Reads the token from a persisted session file.
///
/// The file is re-read on every call so an external login flow can
/// rotate the token without restarting the client. The token is the
/// first line of the file, trimmed.
pub struct FileTokenProvider {
    path: PathBuf,
}

impl FileTokenProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenProvider for FileTokenProvider {
    fn bearer_token(&self) -> Option<String> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        let token = contents.lines().next()?.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }
}
