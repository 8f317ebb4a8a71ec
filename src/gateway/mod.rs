//! Invocation of the external training and comparison scripts.
//!
//! Every request spawns exactly one interpreter process. The child is killed
//! when its deadline elapses; there is no pooling, retry or deduplication.

use std::{
    path::PathBuf,
    process::Stdio,
    time::{Duration, Instant},
};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::{
    config::ScriptSettings,
    errors::{ApiError, ErrorCode},
};

pub mod payload;
pub mod train;

pub use payload::{check_success, extract_stack_trace, extract_trailing_json, parse_payload};
pub use train::{
    AggregateMetrics, ClassMetrics, ClassificationReport, DatasetParams, ModelInfo, TrainRequest,
    TrainResult, normalize_train_result, train_args,
};

/// Failures of a script invocation carry the same shape as HTTP error bodies.
pub type GatewayError = ApiError;

/// Script entry point used for comparisons.
pub const COMPARE_SCRIPT: &str = "compare.py";

/// How scripts are located and launched.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub scripts_dir: PathBuf,
    pub interpreter: String,
    pub interpreter_args: Vec<String>,
}

impl From<&ScriptSettings> for GatewayConfig {
    fn from(settings: &ScriptSettings) -> Self {
        Self {
            scripts_dir: settings.dir.clone(),
            interpreter: settings.interpreter.clone(),
            interpreter_args: settings.interpreter_args.clone(),
        }
    }
}

/// Captured result of a script that ran to completion with exit code 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone)]
pub struct ScriptGateway {
    config: GatewayConfig,
}

impl ScriptGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run `{interpreter} {interpreter_args} {scripts_dir}/{script} {args}` in
    /// `scripts_dir` and collect its output.
    ///
    /// A nonzero exit maps to `SCRIPT_EXECUTION_ERROR` carrying stderr (or
    /// stdout when stderr is empty) and the Python traceback if one was
    /// printed. A spawn failure maps to `SCRIPT_NOT_FOUND`; an elapsed
    /// deadline kills the child and maps to `TIMEOUT`.
    pub async fn invoke(
        &self,
        script: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ScriptOutput, GatewayError> {
        let script_path = self.config.scripts_dir.join(script);
        if !script_path.is_file() {
            let reason = format!("script not found at {}", script_path.display());
            warn!(script, path = %script_path.display(), "Script missing");
            return Err(ApiError::new(
                ErrorCode::ScriptNotFound,
                format!("Failed to execute script: {reason}"),
            )
            .with_details(reason));
        }

        let mut command = Command::new(&self.config.interpreter);
        command
            .args(&self.config.interpreter_args)
            .arg(&script_path)
            .args(args)
            .current_dir(&self.config.scripts_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(script, ?args, "Spawning script");
        let started = Instant::now();
        let child = command.spawn().map_err(|err| {
            warn!(script, interpreter = %self.config.interpreter, error = %err, "Failed to spawn script");
            ApiError::new(
                ErrorCode::ScriptNotFound,
                format!("Failed to execute script: {err}"),
            )
            .with_details(err.to_string())
        })?;

        // Dropping the pending future drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(ApiError::new(
                    ErrorCode::ScriptExecutionError,
                    format!("Failed to collect script output: {err}"),
                ));
            }
            Err(_) => {
                warn!(script, timeout_secs = timeout.as_secs(), "Script timed out");
                return Err(ApiError::new(
                    ErrorCode::Timeout,
                    format!("Script timed out after {} seconds", timeout.as_secs()),
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let exit_code = output.status.code().unwrap_or(-1);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if !output.status.success() {
            warn!(script, exit_code, elapsed_ms, "Script failed");
            let details = if stderr.is_empty() { stdout } else { stderr.clone() };
            return Err(ApiError::new(
                ErrorCode::ScriptExecutionError,
                format!("Script exited with code {exit_code}"),
            )
            .with_details(details)
            .with_stack_trace(extract_stack_trace(&stderr)));
        }
        info!(script, elapsed_ms, "Script finished");
        Ok(ScriptOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}
