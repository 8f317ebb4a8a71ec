//! Drives a comparison from the current selection to a stored result.
//!
//! State moves `Idle -> Comparing -> Succeeded | Failed`, and back to `Idle`
//! on [`Orchestrator::dismiss`]. [`Orchestrator::run_compare`] blocks on the
//! backend; callers that need to observe `Comparing` split the call with
//! `begin_compare` / `finish_compare`. A new attempt discards the previous
//! outcome. Nothing is retried.

use tracing::{info, warn};

use crate::{
    errors::ApiError,
    selection::{KeyValueStore, SelectionModel},
    store::HistoryEntry,
};

pub mod backend;
pub mod request;
pub mod result;

pub use backend::{BackendError, CompareBackend, HttpBackend};
pub use request::CompareRequest;
pub use result::{CompareResult, ModelComparison, ResultShapeError, SequencePoint, SequenceSlice};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum CompareState {
    #[default]
    Idle,
    Comparing,
    Succeeded(CompareResult),
    Failed(ApiError),
}

#[derive(Debug)]
pub struct Orchestrator<S, B> {
    selection: SelectionModel<S>,
    backend: B,
    history: Vec<HistoryEntry>,
    state: CompareState,
}

impl<S: KeyValueStore, B: CompareBackend> Orchestrator<S, B> {
    pub fn new(selection: SelectionModel<S>, backend: B) -> Self {
        Self {
            selection,
            backend,
            history: Vec::new(),
            state: CompareState::Idle,
        }
    }

    pub fn selection(&self) -> &SelectionModel<S> {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionModel<S> {
        &mut self.selection
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn state(&self) -> &CompareState {
        &self.state
    }

    /// Reload the run history for the selected dataset. A failed fetch leaves
    /// the history empty.
    pub fn refresh_history(&mut self) -> Result<usize, ApiError> {
        match self.backend.history(self.selection.dataset()) {
            Ok(runs) => {
                self.history = runs;
                Ok(self.history.len())
            }
            Err(err) => {
                warn!(error = %err, "Failed to load run history");
                self.history.clear();
                Err(err.into_api_error())
            }
        }
    }

    /// Select every known run of the current dataset.
    pub fn add_all_models(&mut self) {
        self.selection.add_all_models(&self.history);
    }

    /// Compare the selected runs. Does nothing, and returns `false`, while the
    /// selection is empty, holds duplicates or a comparison is in flight.
    pub fn run_compare(&mut self) -> bool {
        let Some(request) = self.begin_compare() else {
            return false;
        };
        let outcome = self.backend.compare(&request);
        self.finish_compare(outcome);
        true
    }

    /// Enter `Comparing` and return the request to send, for callers that
    /// drive the backend themselves. The previous outcome is discarded.
    pub fn begin_compare(&mut self) -> Option<CompareRequest> {
        if self.is_comparing() || !self.selection.can_compare() {
            return None;
        }
        self.state = CompareState::Comparing;
        Some(CompareRequest::build(
            self.selection.dataset(),
            self.selection.selected_run_ids(),
            self.selection.params(),
        ))
    }

    /// Record the outcome of the request handed out by [`Self::begin_compare`].
    /// Ignored unless a comparison is in flight.
    pub fn finish_compare(&mut self, outcome: Result<CompareResult, BackendError>) {
        if !self.is_comparing() {
            return;
        }
        self.state = match outcome {
            Ok(result) => {
                info!(compare_id = result.compare_id(), "Comparison finished");
                CompareState::Succeeded(result)
            }
            Err(err) => {
                warn!(error = %err, "Comparison failed");
                CompareState::Failed(err.into_api_error())
            }
        };
    }

    pub fn is_comparing(&self) -> bool {
        matches!(self.state, CompareState::Comparing)
    }

    /// Clear the last result or error.
    pub fn dismiss(&mut self) {
        self.state = CompareState::Idle;
    }

    pub fn result(&self) -> Option<&CompareResult> {
        match &self.state {
            CompareState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match &self.state {
            CompareState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Rebuild the selection from the runs of a previous result.
    pub fn load_models_from_result(&mut self, result: &CompareResult) {
        self.selection.replace_with(result.run_refs());
    }
}
