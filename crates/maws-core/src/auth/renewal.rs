//! Interactive MFA renewal.
//!
//! Start -> device discovered -> code entered -> credential issued -> persisted.
//! A failure before the credential is issued leaves the cache untouched.

use std::io::{self, Read, Write};

use chrono::SubsecRound;
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::SessionCredential;
use crate::cache::CredentialCache;
use crate::error::{CredentialError, Result};

/// Prompt shown before reading the one-time code
const CODE_PROMPT: &str = "MFA code: ";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MfaDevice {
    #[serde(rename = "SerialNumber")]
    pub serial_number: String,
}

/// The identity side of the workflow: device listing and session issuance.
pub trait IdentityProvider {
    fn profile(&self) -> &str;

    fn list_mfa_devices(&self) -> Result<Vec<MfaDevice>>;

    fn get_session_token(&self, serial_number: &str, code: &str) -> Result<SessionCredential>;
}

/// Source of the one-time code typed by the user.
pub trait CodePrompt {
    fn read_code(&mut self) -> Result<String>;
}

/// Writes a prompt and reads one line as the code. The code is not validated.
///
/// The line is read a byte at a time and nothing after its `\n` is consumed,
/// so input meant for the wrapped CLI stays in the stream.
pub struct LinePrompt<R, W> {
    reader: R,
    writer: W,
}

pub type StdinPrompt = LinePrompt<StdinReader, io::Stderr>;

impl<T: CodePrompt + ?Sized> CodePrompt for &mut T {
    fn read_code(&mut self) -> Result<String> {
        (**self).read_code()
    }
}

impl<R: Read, W: Write> LinePrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl StdinPrompt {
    /// Prompt on stderr so stdout stays usable for `export-envs`.
    pub fn stdin() -> Self {
        Self::new(StdinReader::default(), io::stderr())
    }
}

impl<R: Read, W: Write> CodePrompt for LinePrompt<R, W> {
    fn read_code(&mut self) -> Result<String> {
        let failed =
            |e: io::Error| CredentialError::RenewalFailed(format!("could not read MFA code: {}", e));

        write!(self.writer, "{}", CODE_PROMPT)
            .and_then(|_| self.writer.flush())
            .map_err(failed)?;
        let line = read_line(&mut self.reader).map_err(failed)?.ok_or_else(|| {
            CredentialError::RenewalFailed("could not read MFA code: end of input".to_string())
        })?;
        Ok(line.trim().to_string())
    }
}

/// Next line without its terminator, or `None` at end of input. A last line
/// without `\n` still counts.
fn read_line(reader: &mut impl Read) -> io::Result<Option<String>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) if line.is_empty() => return Ok(None),
            Ok(0) => break,
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => line.push(byte[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// Unbuffered stdin. `io::Stdin` reads ahead into its own buffer, which would
/// swallow bytes the delegated CLI is meant to receive.
#[derive(Default)]
pub struct StdinReader {
    #[cfg(unix)]
    file: Option<std::fs::File>,
}

#[cfg(unix)]
impl Read for StdinReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use std::os::fd::AsFd;

        if self.file.is_none() {
            let fd = io::stdin().as_fd().try_clone_to_owned()?;
            self.file = Some(std::fs::File::from(fd));
        }
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Ok(0),
        }
    }
}

#[cfg(not(unix))]
impl Read for StdinReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().read(buf)
    }
}

pub struct MfaRenewal<'a, P, C> {
    provider: P,
    prompt: C,
    cache: &'a CredentialCache,
}

impl<'a, P: IdentityProvider, C: CodePrompt> MfaRenewal<'a, P, C> {
    pub fn new(provider: P, prompt: C, cache: &'a CredentialCache) -> Self {
        Self {
            provider,
            prompt,
            cache,
        }
    }

    /// Mint a new session credential and persist it. Never reads the cache.
    pub fn renew(&mut self) -> Result<SessionCredential> {
        let device = self.discover_device()?;

        let code = self.prompt.read_code()?;

        let issued = self
            .provider
            .get_session_token(&device.serial_number, &code)?;
        // The cache keeps whole seconds; hand back exactly what gets stored
        let credential = SessionCredential {
            expiration: issued.expiration.trunc_subsecs(0),
            ..issued
        };
        if credential.is_expired() {
            return Err(CredentialError::RenewalFailed(format!(
                "issued credential already expired at {}",
                credential.expiration
            )));
        }

        self.cache.persist(&credential)?;
        info!(
            profile = self.provider.profile(),
            minutes = credential.minutes_until_expiry(),
            "Renewed session credential"
        );
        Ok(credential)
    }

    /// The first listed device wins.
    fn discover_device(&self) -> Result<MfaDevice> {
        let mut devices = self.provider.list_mfa_devices()?.into_iter();
        let device = devices
            .next()
            .ok_or_else(|| CredentialError::NoMfaDevice(self.provider.profile().to_string()))?;

        let others = devices.count();
        if others > 0 {
            warn!(
                serial_number = %device.serial_number,
                others,
                "Multiple MFA devices registered, using the first"
            );
        }
        Ok(device)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::cell::{Cell, RefCell};
    use std::io::Cursor;
    use tempfile::tempdir;

    pub(crate) fn credential_expiring_in(delta: Duration) -> SessionCredential {
        SessionCredential {
            access_key_id: "ASIAFRESH".to_string(),
            secret_access_key: "fresh-secret".to_string(),
            session_token: "fresh-token".to_string(),
            expiration: (Utc::now() + delta).fixed_offset(),
        }
    }

    /// Identity provider that records every call.
    pub(crate) struct FakeProvider {
        pub devices: Vec<&'static str>,
        pub issued: Option<SessionCredential>,
        pub list_calls: Cell<usize>,
        pub issue_calls: RefCell<Vec<(String, String)>>,
    }

    impl FakeProvider {
        pub(crate) fn issuing(devices: Vec<&'static str>, issued: Option<SessionCredential>) -> Self {
            Self {
                devices,
                issued,
                list_calls: Cell::new(0),
                issue_calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl IdentityProvider for &FakeProvider {
        fn profile(&self) -> &str {
            "test"
        }

        fn list_mfa_devices(&self) -> Result<Vec<MfaDevice>> {
            self.list_calls.set(self.list_calls.get() + 1);
            Ok(self
                .devices
                .iter()
                .map(|s| MfaDevice {
                    serial_number: s.to_string(),
                })
                .collect())
        }

        fn get_session_token(&self, serial_number: &str, code: &str) -> Result<SessionCredential> {
            self.issue_calls
                .borrow_mut()
                .push((serial_number.to_string(), code.to_string()));
            self.issued
                .clone()
                .ok_or_else(|| CredentialError::RenewalFailed("sts exited with 254".to_string()))
        }
    }

    pub(crate) fn code_input(input: &'static str) -> LinePrompt<Cursor<&'static [u8]>, Vec<u8>> {
        LinePrompt::new(Cursor::new(input.as_bytes()), Vec::new())
    }

    #[test]
    fn test_renew_persists_new_credential() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("session-token.json"));
        let issued = credential_expiring_in(Duration::hours(12));
        let provider = FakeProvider::issuing(vec!["arn:mfa/alice"], Some(issued.clone()));

        let cred = MfaRenewal::new(&provider, code_input("123456\n"), &cache)
            .renew()
            .unwrap();

        assert_eq!(cred.access_key_id, "ASIAFRESH");
        assert_eq!(cred.expiration, issued.expiration.trunc_subsecs(0));
        assert_eq!(cache.load().unwrap().unwrap(), cred);
        assert_eq!(
            provider.issue_calls.borrow().as_slice(),
            &[("arn:mfa/alice".to_string(), "123456".to_string())]
        );
    }

    #[test]
    fn test_first_device_wins() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("session-token.json"));
        let provider = FakeProvider::issuing(
            vec!["arn:mfa/primary", "arn:mfa/backup"],
            Some(credential_expiring_in(Duration::hours(1))),
        );

        MfaRenewal::new(&provider, code_input("000111\n"), &cache)
            .renew()
            .unwrap();

        assert_eq!(provider.issue_calls.borrow()[0].0, "arn:mfa/primary");
    }

    #[test]
    fn test_no_device_fails_before_prompt() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("session-token.json"));
        let provider = FakeProvider::issuing(vec![], Some(credential_expiring_in(Duration::hours(1))));
        let mut prompt = code_input("123456\n");

        let err = MfaRenewal::new(&provider, &mut prompt, &cache)
            .renew()
            .unwrap_err();

        assert!(matches!(err, CredentialError::NoMfaDevice(ref p) if p == "test"));
        assert!(prompt.writer.is_empty());
        assert!(provider.issue_calls.borrow().is_empty());
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_failed_exchange_leaves_cache_untouched() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("session-token.json"));
        let previous = credential_expiring_in(Duration::hours(-1));
        cache.persist(&previous).unwrap();
        let before = std::fs::read(cache.path()).unwrap();

        let provider = FakeProvider::issuing(vec!["arn:mfa/alice"], None);
        let err = MfaRenewal::new(&provider, code_input("999999\n"), &cache)
            .renew()
            .unwrap_err();

        assert!(matches!(err, CredentialError::RenewalFailed(_)));
        assert_eq!(std::fs::read(cache.path()).unwrap(), before);
    }

    #[test]
    fn test_failed_exchange_without_cache_stays_absent() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("maws").join("session-token.json"));
        let provider = FakeProvider::issuing(vec!["arn:mfa/alice"], None);

        MfaRenewal::new(&provider, code_input("999999\n"), &cache)
            .renew()
            .unwrap_err();

        assert!(!cache.path().exists());
    }

    #[test]
    fn test_already_expired_issue_is_rejected() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("session-token.json"));
        let provider = FakeProvider::issuing(
            vec!["arn:mfa/alice"],
            Some(credential_expiring_in(Duration::seconds(-5))),
        );

        let err = MfaRenewal::new(&provider, code_input("123456\n"), &cache)
            .renew()
            .unwrap_err();

        assert!(matches!(err, CredentialError::RenewalFailed(_)));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_prompt_trims_and_writes_prompt() {
        let mut prompt = code_input("  424242 \n");
        assert_eq!(prompt.read_code().unwrap(), "424242");
        assert_eq!(String::from_utf8(prompt.writer).unwrap(), CODE_PROMPT);
    }

    #[test]
    fn test_prompt_accepts_unterminated_line() {
        let mut prompt = code_input("123456");
        assert_eq!(prompt.read_code().unwrap(), "123456");
    }

    #[test]
    fn test_prompt_strips_crlf() {
        let mut prompt = code_input("123456\r\n");
        assert_eq!(prompt.read_code().unwrap(), "123456");
    }

    #[test]
    fn test_prompt_leaves_rest_of_input() {
        let mut prompt = code_input("123456\n{\"Bucket\": \"logs\"}\n");
        assert_eq!(prompt.read_code().unwrap(), "123456");

        let mut rest = String::new();
        prompt.reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "{\"Bucket\": \"logs\"}\n");
    }

    #[test]
    fn test_prompt_end_of_input_fails() {
        let mut prompt = code_input("");
        let err = prompt.read_code().unwrap_err();
        assert!(matches!(err, CredentialError::RenewalFailed(_)));
    }
}
