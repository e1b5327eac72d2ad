//! On-disk lifecycle of `config.kdl`.
//!
//! A [`ConfigStore`] is loaded once per process, owned by the dispatcher and
//! lent to whatever needs it. Every mutator persists immediately.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use kdl::KdlDocument;

use super::schema::KeelConfig;
use crate::Result;

/// File name of the settings file inside the keel home directory.
pub const CONFIG_FILE_NAME: &str = "config.kdl";

/// Single-owner handle over the persisted configuration.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: KeelConfig,
}

impl ConfigStore {
    /// Load the store for a keel home directory, creating the directory if needed.
    ///
    /// A missing file yields an empty configuration; it is only written on the
    /// first mutation.
    pub fn open(home: &Path) -> Result<Self> {
        ensure_private_dir(home)?;
        Self::load(home.join(CONFIG_FILE_NAME))
    }

    /// Load the store from an explicit file path.
    pub fn load(path: PathBuf) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let doc: KdlDocument = content.parse()?;
            KeelConfig::from_kdl(&doc)
        } else {
            KeelConfig::new()
        };

        Ok(Self { path, config })
    }

    /// In-memory store that still persists to `path` on mutation.
    pub fn with_config(path: PathBuf, config: KeelConfig) -> Self {
        Self { path, config }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &KeelConfig {
        &self.config
    }

    /// Record the default wallet. Path and password are always set together.
    pub fn set_default_wallet(&mut self, path: &Path, password: &str) -> Result<()> {
        self.config.default_wallet_path = Some(path.to_string_lossy().into_owned());
        self.config.default_wallet_password = Some(password.to_string());
        self.save()
    }

    pub fn set_default_wallet_password(&mut self, password: &str) -> Result<()> {
        self.config.default_wallet_password = Some(password.to_string());
        self.save()
    }

    pub fn set_login_token(&mut self, token: Option<String>) -> Result<()> {
        self.config.login_token = token;
        self.save()
    }

    pub fn set_telemetry_disabled(&mut self, disabled: bool) -> Result<()> {
        self.config.telemetry_disabled = disabled;
        self.save()
    }

    /// Cache the latest release.
    ///
    /// The background telemetry process calls this seconds after loading, so
    /// the file is re-read first and only the update-cache fields change.
    pub fn record_latest_version(&mut self, version: &str, checked_at: DateTime<Utc>) -> Result<()> {
        if self.path.exists() {
            self.config = Self::load(self.path.clone())?.config;
        }
        self.config.latest_version = Some(version.to_string());
        self.config.update_checked_at = Some(checked_at);
        self.save()
    }

    /// Write the configuration atomically with owner-only permissions.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                ensure_private_dir(parent)?;
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        };

        let mut doc = self.config.to_kdl();
        doc.autoformat();

        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(doc.to_string().as_bytes())?;
        file.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(
                file.path(),
                fs::Permissions::from_mode(super::schema::CONFIG_FILE_MODE),
            )?;
        }

        file.persist(&self.path).map_err(|e| e.error)?;
        tracing::debug!(path = %self.path.display(), "saved configuration");
        Ok(())
    }
}

/// Create `dir` (and parents), restricting it to the owner on Unix.
///
/// An existing directory keeps its permissions.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(super::schema::CONFIG_DIR_MODE))?;
    }

    Ok(())
}
