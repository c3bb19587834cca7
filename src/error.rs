//! Error taxonomy for the release-checking engine

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while checking repositories for new releases
#[derive(Error, Debug)]
pub enum CheckError {
    /// Repository identifier is not of the form `owner/name`
    #[error("invalid repository name '{0}' (expected owner/name)")]
    Config(String),

    /// State file could not be read or written
    #[error("state file I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file exists but does not parse
    #[error("cannot parse JSON state file {}: {source}", path.display())]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// State could not be encoded for writing
    #[error("failed to JSON-encode states: {0}")]
    Serialize(#[source] serde_json::Error),

    /// API quota exhausted until `reset`
    #[error("rate limited by GitHub API (limit resets at {reset})")]
    RateLimited { reset: DateTime<Utc> },

    /// Repository does not exist or is not visible with the current credentials
    #[error("repository not found: {0}")]
    NotFound(String),

    /// Connection-level failure talking to the API
    #[error("network error: {0}")]
    TransientNetwork(String),

    /// Any other API failure
    #[error("GitHub API error: {0}")]
    Unknown(String),
}

impl CheckError {
    /// Engine-level failures end the run; everything else is scoped to one repository.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CheckError::Io { .. }
                | CheckError::CorruptState { .. }
                | CheckError::Serialize(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(CheckError::Io {
            path: PathBuf::from("/tmp/state.json"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        }
        .is_fatal());

        assert!(!CheckError::Config("nope".to_string()).is_fatal());
        assert!(!CheckError::RateLimited { reset: Utc::now() }.is_fatal());
        assert!(!CheckError::TransientNetwork("reset by peer".to_string()).is_fatal());
    }

    #[test]
    fn test_config_error_message() {
        let err = CheckError::Config("just-a-name".to_string());
        assert_eq!(
            err.to_string(),
            "invalid repository name 'just-a-name' (expected owner/name)"
        );
    }
}
