//! Where the panel keeps files that do not belong to the output root.
//!
//! Everything lives under one `.dtrees` folder in the OS config directory, or
//! under `$DTREES_CONFIG_HOME/.dtrees` when that variable is set:
//!
//! ```text
//! .dtrees/
//!   config.toml      server settings
//!   selection.json   terminal client selection cache
//!   logs/            one file per launch
//! ```

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

pub const APP_DIR_NAME: &str = ".dtrees";
pub const CONFIG_HOME_ENV: &str = "DTREES_CONFIG_HOME";
pub const CONFIG_FILE: &str = "config.toml";
pub const SELECTION_FILE: &str = "selection.json";
const LOGS_DIR: &str = "logs";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No config directory available; set {CONFIG_HOME_ENV}")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolved `.dtrees` folder. The folder exists once a value is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// Locate the `.dtrees` folder for this user and create it.
    pub fn resolve() -> Result<Self, AppDirError> {
        let base = std::env::var_os(CONFIG_HOME_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
            .ok_or(AppDirError::NoBaseDir)?;
        Self::under(&base)
    }

    /// Use `base/.dtrees`, creating it if needed.
    pub fn under(base: &Path) -> Result<Self, AppDirError> {
        let root = base.join(APP_DIR_NAME);
        ensure_dir(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn selection_file(&self) -> PathBuf {
        self.root.join(SELECTION_FILE)
    }

    /// Log directory, created on demand.
    pub fn logs_dir(&self) -> Result<PathBuf, AppDirError> {
        let dir = self.root.join(LOGS_DIR);
        ensure_dir(&dir)?;
        Ok(dir)
    }
}

fn ensure_dir(path: &Path) -> Result<(), AppDirError> {
    std::fs::create_dir_all(path).map_err(|source| AppDirError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
