//! Filesystem-backed records of training runs and comparisons.
//!
//! Every record lives in a directory named by a 10-digit epoch-seconds
//! identifier. The stores never cache: each call reflects the filesystem as it
//! is at that moment.

pub mod compare;
pub mod errors;
pub mod history;
pub mod ids;
pub mod locks;
pub mod sidecar;

pub use compare::{COMPARE_DIR, CompareEntry, CompareModelInfo, CompareStore};
pub use errors::{RecordKind, StoreError, StoreErrorKind};
pub use history::{HistoryEntry, HistoryFilter, HistoryStore};
pub use ids::{RecordId, is_record_id};
pub use locks::IdLocks;
pub use sidecar::{
    CompareManifest, ManifestModel, ManifestModels, ManifestSlice, RUNTIME_FILE, SidecarError,
    TrainingRuntime,
};
