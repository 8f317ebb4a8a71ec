use std::path::PathBuf;

use thiserror::Error;

use crate::app_dirs::AppDirError;

/// Failure to load or store `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading, writing or creating the parent of the config file failed.
    #[error("Failed to access config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to encode config for {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error(transparent)]
    AppDir(#[from] AppDirError),
}

impl ConfigError {
    pub(super) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
