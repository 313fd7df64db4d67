//! Process configuration.
//!
//! Read once from the environment at startup and passed by value into the
//! cache, the identity command client and the delegator.
//!
//! The credential cache lives at `<data dir>/maws/session-token.json` for the
//! default profile and `session-token-<profile>.json` for any other, so a
//! session minted under one profile is never handed to another.

use std::path::PathBuf;

use crate::error::{CredentialError, Result};

/// Application name used for the data directory path
const APP_NAME: &str = "maws";

/// Session file stem in the data directory
const SESSION_FILE_STEM: &str = "session-token";

/// Profile used when `MAWS_PROFILE` is unset
pub const DEFAULT_PROFILE: &str = "default";

/// Executable wrapped when `MAWS_AWS_CLI` is unset
pub const DEFAULT_CLI_PROGRAM: &str = "aws";

pub const PROFILE_ENV: &str = "MAWS_PROFILE";
pub const DATA_DIR_ENV: &str = "MAWS_DATA_DIR";
pub const CLI_PROGRAM_ENV: &str = "MAWS_AWS_CLI";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Named AWS CLI profile used for the identity commands
    pub profile: String,
    /// Directory owned by maws holding the cached session
    pub data_dir: PathBuf,
    /// Executable of the wrapped CLI
    pub cli_program: String,
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let profile = get(PROFILE_ENV).unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let cli_program = get(CLI_PROGRAM_ENV).unwrap_or_else(|| DEFAULT_CLI_PROGRAM.to_string());
        let data_dir = match get(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or_else(|| CredentialError::Config("Could not find data directory".to_string()))?
                .join(APP_NAME),
        };

        Ok(Self {
            profile,
            data_dir,
            cli_program,
        })
    }

    pub fn session_path(&self) -> PathBuf {
        if self.profile == DEFAULT_PROFILE {
            return self.data_dir.join(format!("{}.json", SESSION_FILE_STEM));
        }
        // Profile names end up in a file name; keep them to one path segment
        let profile: String = self
            .profile
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
            .collect();
        self.data_dir
            .join(format!("{}-{}.json", SESSION_FILE_STEM, profile))
    }
}
