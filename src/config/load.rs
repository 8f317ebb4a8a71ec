use std::path::{Path, PathBuf};

use crate::app_dirs::AppPaths;

use super::{ConfigError, PanelSettings, SCRIPTS_DIR_ENV};

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(AppPaths::resolve()?.config_file())
}

/// Load configuration from the application directory, returning defaults if missing.
///
/// `SCRIPTS_DIR` in the environment overrides the configured scripts directory.
pub fn load_or_default() -> Result<PanelSettings, ConfigError> {
    let path = config_path()?;
    load_from(&path)
}

/// Load configuration from an explicit path, returning defaults if the file is absent.
pub fn load_from(path: &Path) -> Result<PanelSettings, ConfigError> {
    let settings = load_settings_from(path)?;
    Ok(apply_env_overrides(
        settings,
        std::env::var_os(SCRIPTS_DIR_ENV).map(PathBuf::from),
    ))
}

pub(super) fn load_settings_from(path: &Path) -> Result<PanelSettings, ConfigError> {
    if !path.exists() {
        return Ok(PanelSettings::default());
    }
    let text = std::fs::read_to_string(path).map_err(ConfigError::io(path))?;
    toml::from_str::<PanelSettings>(&text)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
        .map(PanelSettings::normalized)
}

pub(super) fn apply_env_overrides(
    mut settings: PanelSettings,
    scripts_dir: Option<PathBuf>,
) -> PanelSettings {
    if let Some(dir) = scripts_dir.filter(|dir| !dir.as_os_str().is_empty()) {
        tracing::debug!(dir = %dir.display(), "Scripts directory overridden from environment");
        settings.scripts.dir = dir;
    }
    settings
}
