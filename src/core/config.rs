use std::fs;
use std::io;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::alerts::engine::AlertSettings;
use super::error::{Error, Result};

/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";

/// Operator identity sent with backend requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub name: String,
}

/// Application settings with alert configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub api_base: String,
    /// Refetch all sources on this interval. Fetch once at startup when unset.
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,
    /// Overrides the platform data directory for the dismissal file
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub user: Option<UserIdentity>,
    /// Alert aggregation configuration
    #[serde(default)]
    pub alert_settings: AlertSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            refresh_interval_secs: None,
            data_dir: None,
            user: None,
            alert_settings: AlertSettings::default(),
        }
    }
}

/// Platform config and data directories for the app.
#[derive(Debug, Clone)]
pub struct AppDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppDirs {
    pub fn resolve() -> Result<Self> {
        let dirs = ProjectDirs::from("com", "premierlux", "stockbell")
            .ok_or(Error::DirectoriesNotFound)?;
        Ok(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
        })
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn load(&self) -> Settings {
        if self.config_path.exists() {
            match fs::read_to_string(&self.config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(err) => log::warn!(
                        "Invalid settings in {:?}, using defaults: {err}",
                        self.config_path
                    ),
                },
                Err(err) => log::warn!(
                    "Could not read {:?}, using defaults: {err}",
                    self.config_path
                ),
            }
        }
        Settings::default()
    }

    pub fn save(&self, settings: &Settings) -> io::Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dismissals::model::DismissalScope;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().to_path_buf());

        let default = manager.load();
        assert_eq!(default.api_base, DEFAULT_API_BASE);
        assert_eq!(default.alert_settings.expiry_window_days, 30);

        let new_settings = Settings {
            api_base: "http://inventory.local:8080".to_string(),
            refresh_interval_secs: Some(60),
            data_dir: Some(PathBuf::from("/tmp/stockbell")),
            user: Some(UserIdentity {
                id: "u-17".to_string(),
                name: "Branch Manager".to_string(),
            }),
            alert_settings: AlertSettings {
                dismissal_scope: DismissalScope::PerKind,
                ..AlertSettings::default()
            },
        };

        manager.save(&new_settings).unwrap();
        let loaded = manager.load();

        assert_eq!(loaded, new_settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().to_path_buf());
        fs::write(manager.config_path(), r#"{"api_base": "http://10.0.0.5:5000"}"#).unwrap();

        let loaded = manager.load();
        assert_eq!(loaded.api_base, "http://10.0.0.5:5000");
        assert_eq!(loaded.refresh_interval_secs, None);
        assert_eq!(loaded.alert_settings, AlertSettings::default());
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().to_path_buf());
        fs::write(manager.config_path(), "not json").unwrap();

        assert_eq!(manager.load(), Settings::default());
    }
}
