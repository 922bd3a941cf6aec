//! Where invoice data lives.
//!
//! Settings are a small TOML file in the platform config directory. The
//! `FINCH_DATA_ROOT` environment variable overrides it for one run.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DATA_ROOT_ENV: &str = "FINCH_DATA_ROOT";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub data_root: String,
}

impl AppSettings {
    /// Defaults to the platform data directory.
    pub fn default_root() -> Result<Self, ConfigError> {
        let dirs = project_dirs().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self {
            data_root: dirs.data_dir().to_string_lossy().into_owned(),
        })
    }

    /// `data_root` with a leading `~` expanded.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        expand_home_dir(&self.data_root)
    }

    pub fn output_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("output"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "finch-invoice", "app")
}

pub fn settings_path() -> Result<PathBuf, ConfigError> {
    let dirs = project_dirs().ok_or(ConfigError::NoHomeDir)?;
    Ok(dirs.config_dir().join(SETTINGS_FILE))
}

/// Read settings from `path`. `Ok(None)` when the file does not exist.
pub fn read_settings(path: &Path) -> Result<Option<AppSettings>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    Ok(Some(toml::from_str(&content)?))
}

pub fn write_settings(path: &Path, settings: &AppSettings) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let body = toml::to_string_pretty(settings)?;
    fs::write(path, body).map_err(io_err)
}

/// Effective settings: environment override, then the settings file, then
/// the platform default.
pub fn load() -> Result<AppSettings, ConfigError> {
    if let Some(settings) = root_override(env::var(DATA_ROOT_ENV).ok()) {
        tracing::debug!(data_root = %settings.data_root, "data root from environment");
        return Ok(settings);
    }
    match read_settings(&settings_path()?)? {
        Some(settings) => Ok(settings),
        None => AppSettings::default_root(),
    }
}

// Blank values count as unset.
fn root_override(value: Option<String>) -> Option<AppSettings> {
    value
        .filter(|root| !root.trim().is_empty())
        .map(|data_root| AppSettings { data_root })
}

pub fn save(settings: &AppSettings) -> Result<PathBuf, ConfigError> {
    let path = settings_path()?;
    write_settings(&path, settings)?;
    tracing::info!(path = %path.display(), "settings saved");
    Ok(path)
}

pub fn expand_home_dir(path: &str) -> Result<PathBuf, ConfigError> {
    match path.strip_prefix('~') {
        Some(rest) => {
            let base = BaseDirs::new().ok_or(ConfigError::NoHomeDir)?;
            let rest = rest.trim_start_matches(['/', '\\']);
            Ok(base.home_dir().join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}
