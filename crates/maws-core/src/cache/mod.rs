//! Local cache for the current session credential.
//!
//! A single JSON file under the maws data directory holds the one live
//! session. The file is replaced atomically on every renewal and is either
//! well-formed or absent; unparsable content is an error, never a miss.

pub mod manager;

pub use manager::CredentialCache;
