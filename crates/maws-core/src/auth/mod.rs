//! Session credential model and lifecycle.
//!
//! This module provides:
//! - `SessionCredential`: the cached access key, secret, token and expiration
//! - `MfaRenewal`: the interactive device-discovery and code-exchange workflow
//! - `CredentialSource`: cached credential if still valid, renewal otherwise

pub mod renewal;
pub mod session;
pub mod source;

pub use renewal::{CodePrompt, IdentityProvider, LinePrompt, MfaDevice, MfaRenewal, StdinPrompt};
pub use session::{SessionCredential, SessionToken};
pub use source::CredentialSource;
