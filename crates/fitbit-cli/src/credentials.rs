use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, ConfigLocator};

/// Keeps each profile's serialized Fitbit token in its own file.
pub struct FileCredentialStore {
    locator: ConfigLocator,
}

impl FileCredentialStore {
    pub fn new(locator: ConfigLocator) -> Self {
        Self { locator }
    }

    pub fn with_default_locator() -> Result<Self, CredentialError> {
        Ok(Self::new(ConfigLocator::new()?))
    }

    pub fn load(&self, profile: &str) -> Result<Option<String>, CredentialError> {
        let path = self.locator.token_file(profile)?;
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let envelope: TokenEnvelope = serde_json::from_str(&raw)?;
        Ok(Some(envelope.token))
    }

    pub fn save(&self, profile: &str, serialized_token: &str) -> Result<(), CredentialError> {
        let envelope = TokenEnvelope {
            version: 1,
            profile: profile.to_owned(),
            token: serialized_token.to_owned(),
        };
        let payload = serde_json::to_string_pretty(&envelope)?;
        write_private(&self.locator.token_file(profile)?, &payload)
    }

    pub fn delete(&self, profile: &str) -> Result<(), CredentialError> {
        match fs::remove_file(self.locator.token_file(profile)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn write_private(path: &Path, payload: &str) -> Result<(), CredentialError> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(payload.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perm = file.metadata()?.permissions();
        perm.set_mode(0o600);
        fs::set_permissions(path, perm)?;
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenEnvelope {
    version: u32,
    profile: String,
    /// Opaque string produced by `Token::to_serialized`.
    token: String,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("credential file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed credential file: {0}")]
    Format(#[from] serde_json::Error),
}
