use std::path::Path;

use crate::fs_ops;

use super::{ConfigError, PanelSettings, load::config_path};

/// Persist configuration into the application directory.
pub fn save(settings: &PanelSettings) -> Result<(), ConfigError> {
    let path = config_path()?;
    save_to_path(settings, &path)
}

/// Save configuration to a specific path, creating parent directories as needed.
///
/// The TOML file is written atomically to prevent partial writes on crash.
pub fn save_to_path(settings: &PanelSettings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(ConfigError::io(parent))?;
    }
    let data = toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    fs_ops::atomic_write(path, data.as_bytes()).map_err(ConfigError::io(path))
}
