use chrono::Utc;
use tracing::{debug, info};

use crate::auth::renewal::{CodePrompt, IdentityProvider, MfaRenewal};
use crate::auth::SessionCredential;
use crate::cache::CredentialCache;
use crate::error::Result;

/// Hands out a valid session credential, renewing through MFA when the
/// cache is empty or expired. A corrupt cache is surfaced, not renewed over.
pub struct CredentialSource<'a, P, C> {
    cache: &'a CredentialCache,
    renewal: MfaRenewal<'a, P, C>,
}

impl<'a, P: IdentityProvider, C: CodePrompt> CredentialSource<'a, P, C> {
    pub fn new(cache: &'a CredentialCache, provider: P, prompt: C) -> Self {
        Self {
            cache,
            renewal: MfaRenewal::new(provider, prompt, cache),
        }
    }

    pub fn obtain(&mut self) -> Result<SessionCredential> {
        match self.cache.load()? {
            Some(credential) if !credential.is_expired_at(Utc::now()) => {
                debug!(
                    minutes = credential.minutes_until_expiry(),
                    "Using cached session credential"
                );
                Ok(credential)
            }
            Some(credential) => {
                info!(expired_at = %credential.expiration, "Cached session expired, renewing");
                self.renewal.renew()
            }
            None => {
                info!("No cached session, renewing");
                self.renewal.renew()
            }
        }
    }
}
