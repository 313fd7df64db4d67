//! Core library for maws.
//!
//! Caches temporary AWS session credentials obtained with a multi-factor
//! one-time code, renews them when they expire, and runs the AWS CLI with
//! the cached credentials injected into its environment.
//!
//! - [`cache`]: the single-record credential file
//! - [`auth`]: the credential model, the MFA renewal workflow and the
//!   credential source that ties cache and renewal together
//! - [`api`]: the external identity command client (`aws iam` / `aws sts`)
//! - [`delegate`]: launching the wrapped CLI and shell export formatting

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod delegate;
pub mod error;

pub use api::AwsCli;
pub use auth::{CredentialSource, MfaDevice, MfaRenewal, SessionCredential, StdinPrompt};
pub use cache::CredentialCache;
pub use config::Config;
pub use delegate::Delegator;
pub use error::{CredentialError, Result};
