use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::auth::{SessionCredential, SessionToken};
use crate::error::{CredentialError, Result};

pub struct CredentialCache {
    path: PathBuf,
}

impl CredentialCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached credential. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<SessionCredential>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cached session");
                return Ok(None);
            }
            Err(e) => return Err(CredentialError::storage(&self.path, e)),
        };

        let token: SessionToken =
            serde_json::from_str(&contents).map_err(|e| CredentialError::CorruptCache {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        Ok(Some(token.credentials))
    }

    /// Replace the cached credential, creating the data directory if needed.
    pub fn persist(&self, credential: &SessionCredential) -> Result<()> {
        let token = SessionToken::from(credential.clone());
        let contents = serde_json::to_string_pretty(&token).map_err(|e| {
            CredentialError::storage(&self.path, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;

        if let Some(parent) = self.path.parent() {
            create_private_dir(parent).map_err(|e| CredentialError::storage(parent, e))?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let written = write_private_file(&tmp_path, contents.as_bytes())
            .and_then(|_| fs::rename(&tmp_path, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(CredentialError::storage(&self.path, e));
        }

        debug!(path = %self.path.display(), "Persisted session credential");
        Ok(())
    }

    /// Remove the cached credential. Removing a missing file succeeds.
    pub fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Deleted cached session");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CredentialError::storage(&self.path, e)),
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

fn write_private_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

// ============================================================================
// Tests
// ============================================================================
