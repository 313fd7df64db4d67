//! Client for the external identity commands.
//!
//! MFA device discovery and session issuance are delegated to the AWS CLI
//! itself (`iam list-mfa-devices`, `sts get-session-token`) under the
//! configured profile. Its JSON output is parsed here; its stderr goes
//! straight to the user.

pub mod client;

pub use client::AwsCli;
