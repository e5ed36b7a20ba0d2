use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::app::{get_config_dir, SessionConfig};
use crate::constants::SESSION_FILE_NAME;
use crate::utils::{CannonError, CannonResult};

/// What survives between runs: the bearer token and who it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: String,
    pub email: Option<String>,
}

/// TOML file holding the stored credentials
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the configured path, or `session.toml` in the config directory
    pub fn from_config(config: &SessionConfig) -> CannonResult<Self> {
        if let Some(path) = &config.credentials_path {
            return Ok(Self::new(path));
        }

        let dir = get_config_dir().map_err(|e| CannonError::Storage(e.to_string()))?;
        Ok(Self::new(dir.join(SESSION_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored credentials; `None` when nothing is stored
    pub fn load(&self) -> CannonResult<Option<StoredCredentials>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| self.storage_error(e))?;
        let stored: StoredCredentials =
            toml::from_str(&content).map_err(|e| self.storage_error(e))?;

        if stored.token.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(stored))
    }

    pub fn save(&self, credentials: &StoredCredentials) -> CannonResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.storage_error(e))?;
        }

        let content = toml::to_string_pretty(credentials).map_err(|e| self.storage_error(e))?;
        fs::write(&self.path, content).map_err(|e| self.storage_error(e))?;
        debug!("stored credentials at {}", self.path.display());
        Ok(())
    }

    /// Remove stored credentials; a missing file is not an error
    pub fn clear(&self) -> CannonResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_error(e)),
        }
    }

    fn storage_error(&self, err: impl std::fmt::Display) -> CannonError {
        CannonError::Storage(format!("{}: {}", self.path.display(), err))
    }
}
