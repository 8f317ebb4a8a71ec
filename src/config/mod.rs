//! Panel configuration: where runs live, how scripts are launched and where
//! the server listens.

mod defaults;
mod errors;
mod load;
mod save;
mod types;


pub use crate::app_dirs::CONFIG_FILE as CONFIG_FILE_NAME;

/// Environment variable overriding `scripts.dir`.
pub const SCRIPTS_DIR_ENV: &str = "SCRIPTS_DIR";

pub use errors::ConfigError;
pub use load::{config_path, load_from, load_or_default};
pub use save::{save, save_to_path};
pub use types::{PanelSettings, ScriptSettings};
