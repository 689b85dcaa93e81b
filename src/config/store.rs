//! Loading and saving the settings document.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::paths;
use super::settings::{Settings, SettingsUpdate};

/// Errors that can occur while saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file or its directory is not writable.
    #[error(
        "permission denied writing {}; choose a config location you can write to",
        .path.display()
    )]
    PermissionDenied {
        /// Path that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        /// Path that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Settings could not be encoded.
    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ConfigError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            ConfigError::PermissionDenied {
                path: path.to_path_buf(),
                source,
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Result type for config store operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Reads and writes the settings document at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the platform default location.
    pub fn at_default_location() -> Self {
        Self::new(paths::default_config_path())
    }

    /// Path of the settings document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the saved settings.
    ///
    /// A missing or unreadable document yields `None` so callers fall back to
    /// defaults; the reason is logged.
    pub fn load(&self) -> Option<Settings> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No config file found");
                return None;
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to read config file");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(settings) => {
                tracing::info!(path = %self.path.display(), "Configuration loaded");
                Some(settings)
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to parse config file");
                None
            }
        }
    }

    /// Loads the saved settings or returns defaults.
    pub fn load_or_default(&self) -> Settings {
        self.load().unwrap_or_default()
    }

    /// Merges `update` into the saved document and writes it back.
    ///
    /// Returns the settings as persisted.
    pub fn save(&self, update: &SettingsUpdate) -> Result<Settings> {
        let settings = Settings::merged(self.load(), update);
        let json = serde_json::to_string_pretty(&settings)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        fs::write(&self.path, json).map_err(|e| {
            let err = ConfigError::io(&self.path, e);
            tracing::error!(error = %err, "Failed to save config file");
            err
        })?;

        tracing::info!(
            path = %self.path.display(),
            provider = %settings.email_provider,
            "Configuration saved"
        );
        Ok(settings)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::at_default_location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Provider;
    use tempfile::TempDir;

    fn update(provider: Provider, username: &str) -> SettingsUpdate {
        SettingsUpdate {
            ebooks_dir: PathBuf::from("/books"),
            provider,
            username: username.to_string(),
            password: "secret".to_string(),
            kindle_email: "reader@kindle.com".to_string(),
        }
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn load_corrupt_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let store = ConfigStore::new(path);
        assert!(store.load().is_none());
        assert_eq!(store.load_or_default(), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("nested").join("config.json"));

        let saved = store.save(&update(Provider::Gmail, "me@gmail.com")).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(saved, loaded);
        assert_eq!(loaded.gmail_username, "me@gmail.com");
    }

    #[test]
    fn save_keeps_other_provider_and_history() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));

        store.save(&update(Provider::Gmail, "me@gmail.com")).unwrap();
        store.save(&update(Provider::Qq, "42@qq.com")).unwrap();
        let loaded = store.save(&update(Provider::Qq, "42@qq.com")).unwrap();

        assert_eq!(loaded.gmail_username, "me@gmail.com");
        assert_eq!(loaded.qq_username, "42@qq.com");
        assert_eq!(loaded.email_history, vec!["me@gmail.com", "42@qq.com"]);
    }

    #[test]
    fn save_into_unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let store = ConfigStore::new(blocker.join("config.json"));
        assert!(store.save(&update(Provider::Gmail, "me@gmail.com")).is_err());
    }
}
