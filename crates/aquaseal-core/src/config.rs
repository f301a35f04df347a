//! Bridge configuration management.
//!
//! Handles loading and saving the settings that select the engine command and
//! the storage directories used by the path resolver.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::paths::{
    PathResolver, StorageRoots, WritePolicy, default_app_external_directory,
    default_app_private_directory,
};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "AQUASEAL_CONFIG";

/// How to launch the media engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Program to execute.
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the engine function name.
    #[serde(default = "default_engine_args")]
    pub args: Vec<String>,
    /// Working directory for the engine process.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_engine_args() -> Vec<String> {
    vec!["-m".to_string(), "downloader".to_string()]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_engine_args(),
            working_dir: None,
        }
    }
}

/// Storage directory overrides. Unset entries use the platform defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Public Downloads directory.
    #[serde(default)]
    pub downloads_dir: Option<PathBuf>,
    /// Public Pictures directory.
    #[serde(default)]
    pub pictures_dir: Option<PathBuf>,
    /// Root of the application-scoped external directories.
    #[serde(default)]
    pub app_external_dir: Option<PathBuf>,
    /// Application-private base directory.
    #[serde(default)]
    pub app_private_dir: Option<PathBuf>,
    /// Check applied to the public directory.
    #[serde(default)]
    pub write_policy: WritePolicy,
}

impl StorageConfig {
    /// Storage roots with platform defaults filled in.
    pub fn roots(&self) -> StorageRoots {
        StorageRoots {
            public_downloads: self.downloads_dir.clone().or_else(dirs::download_dir),
            public_pictures: self.pictures_dir.clone().or_else(dirs::picture_dir),
            app_external: self
                .app_external_dir
                .clone()
                .or_else(default_app_external_directory),
            app_private: self
                .app_private_dir
                .clone()
                .or_else(default_app_private_directory),
        }
    }

    /// Build a path resolver for these settings.
    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(self.roots(), self.write_policy)
    }
}

/// Bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Engine launch settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Storage directory settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl BridgeConfig {
    /// Load configuration from the default location, creating it if missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `path`, creating it with defaults if missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found, using defaults");
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                warn!("Failed to save default config: {}", e);
            }
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| Error::FileSystem {
            path: path.to_path_buf(),
            message: format!("Failed to read config file: {e}"),
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {e}")))?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| Error::FileSystem {
                path: parent.to_path_buf(),
                message: format!("Failed to create config directory: {e}"),
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::FileSystem {
            path: path.to_path_buf(),
            message: format!("Failed to write config file: {e}"),
        })?;

        info!("Saved config to {}", path.display());
        Ok(())
    }
}

/// Path of the configuration file.
///
/// Honors [`CONFIG_PATH_ENV`], otherwise `<config dir>/aquaseal/config.json`.
pub fn config_file_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aquaseal")
        .join("config.json")
}
