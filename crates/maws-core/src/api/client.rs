use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::debug;

use crate::auth::{IdentityProvider, MfaDevice, SessionCredential, SessionToken};
use crate::config::Config;
use crate::error::{CredentialError, Result};

#[derive(Debug, Deserialize)]
struct MfaDeviceList {
    #[serde(rename = "MFADevices", default)]
    mfa_devices: Vec<MfaDevice>,
}

/// Runs the AWS CLI for the identity half of the renewal workflow.
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: String,
    profile: String,
}

impl AwsCli {
    pub fn new(program: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            profile: profile.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cli_program.clone(), config.profile.clone())
    }

    /// Run `<cli> --profile <profile> <args..>` and return its stdout.
    fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        debug!(program = %self.program, profile = %self.profile, command = ?args.get(..2), "Running identity command");

        let output = Command::new(&self.program)
            .arg("--profile")
            .arg(&self.profile)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| {
                CredentialError::RenewalFailed(format!("could not run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            return Err(CredentialError::RenewalFailed(format!(
                "{} {} exited with {}",
                self.program,
                args.iter().take(2).copied().collect::<Vec<_>>().join(" "),
                output.status
            )));
        }

        Ok(output.stdout)
    }
}

impl IdentityProvider for AwsCli {
    fn profile(&self) -> &str {
        &self.profile
    }

    fn list_mfa_devices(&self) -> Result<Vec<MfaDevice>> {
        let stdout = self.run(&["iam", "list-mfa-devices", "--output", "json"])?;
        parse_mfa_devices(&stdout)
    }

    fn get_session_token(&self, serial_number: &str, code: &str) -> Result<SessionCredential> {
        let stdout = self.run(&[
            "sts",
            "get-session-token",
            "--serial-number",
            serial_number,
            "--token-code",
            code,
            "--output",
            "json",
        ])?;
        parse_session_token(&stdout)
    }
}

pub(crate) fn parse_mfa_devices(body: &[u8]) -> Result<Vec<MfaDevice>> {
    let list: MfaDeviceList = serde_json::from_slice(body).map_err(|e| {
        CredentialError::RenewalFailed(format!(
            "invalid list-mfa-devices response ({}): {}",
            e,
            CredentialError::truncate_output(&String::from_utf8_lossy(body))
        ))
    })?;
    Ok(list.mfa_devices)
}

/// The response carries the secret, so it is never echoed back in errors.
pub(crate) fn parse_session_token(body: &[u8]) -> Result<SessionCredential> {
    let token: SessionToken = serde_json::from_slice(body).map_err(|e| {
        CredentialError::RenewalFailed(format!("invalid get-session-token response: {}", e))
    })?;
    Ok(token.credentials)
}
