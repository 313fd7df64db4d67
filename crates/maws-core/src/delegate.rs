//! Running the wrapped CLI with session credentials.
//!
//! The child gets an explicit environment map (parent environment plus the
//! three credential variables); the parent's own environment is not touched.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::auth::SessionCredential;
use crate::config::Config;
use crate::error::{CredentialError, Result};

pub const ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";

/// Exit status used when the child's own code is unavailable
const FALLBACK_EXIT_CODE: i32 = 1;

fn credential_vars(credential: &SessionCredential) -> [(&'static str, &str); 3] {
    [
        (ACCESS_KEY_ID_ENV, credential.access_key_id.as_str()),
        (SECRET_ACCESS_KEY_ENV, credential.secret_access_key.as_str()),
        (SESSION_TOKEN_ENV, credential.session_token.as_str()),
    ]
}

/// `base` overlaid with the credential variables.
pub fn child_environment<I, K, V>(base: I, credential: &SessionCredential) -> BTreeMap<OsString, OsString>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<OsString>,
    V: Into<OsString>,
{
    let mut env: BTreeMap<OsString, OsString> = base
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    for (key, value) in credential_vars(credential) {
        env.insert(key.into(), value.into());
    }
    env
}

/// Shell `export` lines for `eval "$(maws export-envs)"`.
pub fn export_statements(credential: &SessionCredential) -> String {
    credential_vars(credential)
        .iter()
        .map(|(key, value)| format!("export {}={}", key, shell_quote(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub struct Delegator {
    program: String,
}

impl Delegator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cli_program.clone())
    }

    /// Run the wrapped CLI to completion and return its exit code.
    pub fn delegate<I, S>(&self, credential: &SessionCredential, args: I) -> Result<i32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let env = child_environment(std::env::vars_os(), credential);
        debug!(program = %self.program, "Delegating to wrapped CLI");

        let status = Command::new(&self.program)
            .args(args)
            .env_clear()
            .envs(&env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| CredentialError::DelegationFailed {
                program: self.program.clone(),
                source,
            })?;

        let code = exit_code(status);
        debug!(code, "Wrapped CLI exited");
        Ok(code)
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(FALLBACK_EXIT_CODE)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(FALLBACK_EXIT_CODE)
}
