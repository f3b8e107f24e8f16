use crate::error::AppError;
use photo_pipeline::{WebDavConfig, DEFAULT_TARGET_LONG_SIDE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `storage.app_password`
pub const APP_PASSWORD_ENV: &str = "GALLERY_APP_PASSWORD";

/// Application configuration, read from a TOML file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GalleryConfig {
    pub database_path: PathBuf,
    /// Root below which every request gets its own scratch directory
    pub scratch_root: PathBuf,
    /// Long side of resized pictures, in pixels
    pub target_long_side: u32,
    pub metadata_timeout_secs: u64,
    pub session_ttl_secs: u64,
    pub storage: StorageConfig,
}

/// Remote photo storage (Nextcloud WebDAV)
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub server_url: Option<String>,
    pub username: String,
    pub app_password: String,
    /// Folder all painting folders are created in
    pub parent_path: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("app_password", &"<redacted>")
            .field("parent_path", &self.parent_path)
            .finish()
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("gallery.db"),
            scratch_root: PathBuf::from("tmp"),
            target_long_side: DEFAULT_TARGET_LONG_SIDE,
            metadata_timeout_secs: 15,
            session_ttl_secs: 3600,
            storage: StorageConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            username: String::new(),
            app_password: String::new(),
            parent_path: "gallery".to_string(),
        }
    }
}

impl GalleryConfig {
    /// Loads the file at `path`; a missing file gives the defaults
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        if let Ok(password) = std::env::var(APP_PASSWORD_ENV) {
            config.storage.app_password = password;
        }
        Ok(config)
    }

    pub fn from_toml(s: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(s)
            .map_err(|e| AppError::Validation(format!("Failed to parse config: {}", e)))?;
        if config.target_long_side == 0 {
            return Err(AppError::Validation(
                "target_long_side must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Connection settings for the WebDAV backend
    pub fn webdav(&self) -> Result<WebDavConfig, AppError> {
        let server_url = self
            .storage
            .server_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AppError::RemoteStorage("No storage server_url configured".to_string())
            })?;

        Ok(WebDavConfig {
            server_url,
            username: self.storage.username.clone(),
            app_password: self.storage.app_password.clone(),
        })
    }
}
