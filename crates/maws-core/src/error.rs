use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CredentialError>;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache storage error ({}): {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt credential cache {}: {reason} - remove it with `maws delete-session-token` and retry", path.display())]
    CorruptCache { path: PathBuf, reason: String },

    #[error("No MFA device registered for profile {0}")]
    NoMfaDevice(String),

    #[error("Session renewal failed: {0}")]
    RenewalFailed(String),

    #[error("Failed to launch {program}: {source}")]
    DelegationFailed {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Maximum length for captured command output in error messages
const MAX_OUTPUT_LENGTH: usize = 500;

impl CredentialError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CredentialError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Truncate captured output so a bad response doesn't flood the terminal
    pub(crate) fn truncate_output(output: &str) -> String {
        let output = output.trim();
        if output.len() <= MAX_OUTPUT_LENGTH {
            return output.to_string();
        }
        let mut end = MAX_OUTPUT_LENGTH;
        while !output.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &output[..end], output.len())
    }
}
