use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Temporary credentials issued by `sts get-session-token`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    #[serde(with = "aws_time")]
    pub expiration: DateTime<FixedOffset>,
}

impl SessionCredential {
    /// A credential is dead once its expiration is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.with_timezone(&Utc) <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expiration.with_timezone(&Utc) - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Envelope shared by the `get-session-token` response and the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    #[serde(rename = "Credentials")]
    pub credentials: SessionCredential,
}

impl From<SessionCredential> for SessionToken {
    fn from(credentials: SessionCredential) -> Self {
        Self { credentials }
    }
}

/// Serde adapter pinning expirations to `2006-01-02T15:04:05-07:00`.
///
/// Sub-second precision is dropped on encode; the offset is kept as written.
pub mod aws_time {
    use chrono::{DateTime, FixedOffset};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%:z";

    pub fn serialize<S>(time: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(LAYOUT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&raw, LAYOUT)
            .map_err(|e| de::Error::custom(format!("invalid expiration {:?}: {}", raw, e)))
    }
}
