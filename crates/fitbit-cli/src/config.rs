use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;

/// Locates the per-user directory holding stored Fitbit tokens.
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    root: PathBuf,
}

impl ConfigLocator {
    /// Discover the platform configuration directory, creating it (mode 0700) if needed.
    pub fn new() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("com", "fitbit", "fitbit-rs")
            .ok_or(ConfigError::MissingProjectDirs)?;
        Self::at(dirs.config_dir())
    }

    pub fn at(root: &Path) -> Result<Self, ConfigError> {
        fs::create_dir_all(root).map_err(ConfigError::CreateDir)?;
        set_user_only_permissions(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Path of the token file for `profile`. Names that could leave the directory are rejected.
    pub fn token_file(&self, profile: &str) -> Result<PathBuf, ConfigError> {
        let valid = !profile.is_empty()
            && profile
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !profile.starts_with('.');
        if !valid {
            return Err(ConfigError::InvalidProfile(profile.to_owned()));
        }
        Ok(self.root.join(format!("token-{profile}.json")))
    }
}

fn set_user_only_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(0o700);
        fs::set_permissions(path, permissions)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to determine configuration directory for fitbit-rs")]
    MissingProjectDirs,
    #[error("failed to create configuration directory: {0}")]
    CreateDir(#[source] std::io::Error),
    #[error("invalid profile name '{0}': use letters, digits, '-', '_' or '.'")]
    InvalidProfile(String),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}
