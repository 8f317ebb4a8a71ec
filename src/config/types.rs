use std::{net::SocketAddr, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use super::defaults::{
    MIN_TIMEOUT_SECS, default_bind_addr, default_compare_timeout_secs, default_interpreter,
    default_interpreter_args, default_output_root, default_scripts_dir,
    default_train_timeout_secs,
};

/// Panel settings persisted in `config.toml`.
///
/// Config keys (TOML): `output_root`, `bind_addr`, `[scripts]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSettings {
    /// Directory that holds run directories and the `compare/` subtree.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub scripts: ScriptSettings,
}

/// How external training and comparison scripts are launched.
///
/// Config keys: `dir`, `interpreter`, `interpreter_args`, `train_timeout_secs`,
/// `compare_timeout_secs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSettings {
    /// Working directory containing the scripts.
    #[serde(default = "default_scripts_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Arguments placed between the interpreter and the script path.
    #[serde(default = "default_interpreter_args")]
    pub interpreter_args: Vec<String>,
    #[serde(default = "default_train_timeout_secs")]
    pub train_timeout_secs: u64,
    #[serde(default = "default_compare_timeout_secs")]
    pub compare_timeout_secs: u64,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            bind_addr: default_bind_addr(),
            scripts: ScriptSettings::default(),
        }
    }
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            dir: default_scripts_dir(),
            interpreter: default_interpreter(),
            interpreter_args: default_interpreter_args(),
            train_timeout_secs: default_train_timeout_secs(),
            compare_timeout_secs: default_compare_timeout_secs(),
        }
    }
}

impl PanelSettings {
    pub(crate) fn normalized(mut self) -> Self {
        self.scripts = self.scripts.normalized();
        if self.bind_addr.trim().is_empty() {
            self.bind_addr = default_bind_addr();
        }
        self
    }

    /// Parse `bind_addr`, falling back to the default address when malformed.
    pub fn socket_addr(&self) -> SocketAddr {
        self.bind_addr.parse().unwrap_or_else(|_| {
            tracing::warn!(bind_addr = %self.bind_addr, "Invalid bind address; using default");
            default_bind_addr()
                .parse()
                .unwrap_or(SocketAddr::from(([127, 0, 0, 1], 3000)))
        })
    }
}

impl ScriptSettings {
    fn normalized(mut self) -> Self {
        self.train_timeout_secs = self.train_timeout_secs.max(MIN_TIMEOUT_SECS);
        self.compare_timeout_secs = self.compare_timeout_secs.max(MIN_TIMEOUT_SECS);
        if self.interpreter.trim().is_empty() {
            self.interpreter = default_interpreter();
        }
        self
    }

    pub fn train_timeout(&self) -> Duration {
        Duration::from_secs(self.train_timeout_secs)
    }

    pub fn compare_timeout(&self) -> Duration {
        Duration::from_secs(self.compare_timeout_secs)
    }
}
