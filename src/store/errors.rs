use std::{fmt, path::PathBuf};

use thiserror::Error;

use crate::identity::NameError;

use super::sidecar::SidecarError;

/// Which kind of record an operation targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Run,
    Compare,
}

impl RecordKind {
    fn id_label(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Compare => "compare",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Compare => "compare run",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// Failure category of a store operation, used to pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    InvalidFormat,
    InvalidName,
    NotFound,
    DeleteFailed,
    RenameFailed,
    Io,
}

impl StoreErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::InvalidName => "INVALID_NAME",
            Self::NotFound => "NOT_FOUND",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::RenameFailed => "RENAME_FAILED",
            Self::Io => "IO_ERROR",
        }
    }
}

/// Errors raised by the history and compare stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid {} ID format: {id:?}", .kind.id_label())]
    InvalidId { kind: RecordKind, id: String },
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: String },
    #[error("Identity file not found in run {id}")]
    IdentityMissing { id: String },
    #[error("Failed to delete {kind} at {path}: {source}")]
    DeleteFailed {
        kind: RecordKind,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to rename {kind} {id}: {reason}")]
    RenameFailed {
        kind: RecordKind,
        id: String,
        reason: String,
    },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Sidecar(#[from] SidecarError),
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::InvalidId { .. } => StoreErrorKind::InvalidFormat,
            Self::InvalidName(_) => StoreErrorKind::InvalidName,
            Self::NotFound { .. } | Self::IdentityMissing { .. } => StoreErrorKind::NotFound,
            Self::DeleteFailed { .. } => StoreErrorKind::DeleteFailed,
            Self::RenameFailed { .. } => StoreErrorKind::RenameFailed,
            Self::Io { .. } => StoreErrorKind::Io,
            Self::Sidecar(err) if err.is_missing() => StoreErrorKind::NotFound,
            Self::Sidecar(_) => StoreErrorKind::RenameFailed,
        }
    }

    /// Short message safe to show to panel users; filesystem detail stays in logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidId { kind, .. } => format!("Invalid {} ID format", kind.id_label()),
            Self::InvalidName(err) => err.to_string(),
            Self::NotFound { kind, .. } => capitalize(&format!("{kind} not found")),
            Self::IdentityMissing { .. } => "ID file not found".to_string(),
            Self::DeleteFailed { kind, .. } => format!("Failed to delete {kind}"),
            Self::RenameFailed { kind, .. } => format!("Failed to rename {kind}"),
            Self::Io { .. } => "Failed to access run storage".to_string(),
            Self::Sidecar(err) if err.is_missing() => "runtime.json not found".to_string(),
            Self::Sidecar(_) => "Failed to update runtime.json".to_string(),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
