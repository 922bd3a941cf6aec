use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure reading or writing the durable invoice slot.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invoice data is not valid: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to write settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine a home directory")]
    NoHomeDir,
}

#[derive(Debug, Error)]
#[error("failed to render invoice: {0}")]
pub struct RenderError(#[from] pub tera::Error);
