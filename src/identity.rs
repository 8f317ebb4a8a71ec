//! Training run identity tokens.
//!
//! A run directory holds one empty file named
//! `{model}_{dataset}_{score}[_{name}].id`. The filename is the only place the
//! model, dataset, accuracy and display name of a run are recorded together.
//!
//! `score` is `round(accuracy * 1_000_000)` written zero-padded to
//! [`SCORE_WIDTH`] digits, so `1.0` encodes as `1000000` and `0.05` as
//! `0050000`. Decoding reads the digit run as an integer, which makes leading
//! zeros insignificant: tokens written with the older six-digit width decode to
//! the same accuracy as their seven-digit form.

use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::{DatasetId, ModelKind};

/// File extension of identity tokens.
pub const ID_EXTENSION: &str = ".id";
/// Multiplier applied to accuracy before it is written as an integer.
pub const SCORE_SCALE: f64 = 1_000_000.0;
/// Fixed digit width of the encoded score.
pub const SCORE_WIDTH: usize = 7;
/// Longest accepted display name, counted before sanitization.
pub const MAX_NAME_LEN: usize = 50;

static IDENTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^_]+)_([^_]+)_(\d+)(?:_(.+))?\.id$").expect("identity pattern is valid")
});

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_. -]*$").expect("name pattern is valid"));

/// Decoded contents of an identity filename.
#[derive(Debug, Clone, PartialEq)]
pub struct RunIdentity {
    pub model: ModelKind,
    pub dataset: DatasetId,
    pub accuracy: f64,
    /// Stored name, with underscores in place of spaces.
    pub name: Option<String>,
}

impl RunIdentity {
    /// Identity filename for this run.
    pub fn file_name(&self) -> String {
        encode(self.model, self.dataset, self.accuracy, self.name.as_deref())
    }

    /// Same identity carrying a different stored name.
    pub fn with_name(&self, name: Option<String>) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }
}

/// A display name rejected by the naming policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("Name must be {MAX_NAME_LEN} characters or less")]
    TooLong,
    #[error(
        "Name must contain only alphanumeric characters, hyphens, underscores, dots, and spaces"
    )]
    InvalidCharacters,
}

/// Build the identity filename. `name` must already be sanitized.
pub fn encode(model: ModelKind, dataset: DatasetId, accuracy: f64, name: Option<&str>) -> String {
    let score = score_token(accuracy);
    match name.filter(|name| !name.is_empty()) {
        Some(name) => format!("{model}_{dataset}_{score}_{name}{ID_EXTENSION}"),
        None => format!("{model}_{dataset}_{score}{ID_EXTENSION}"),
    }
}

/// Fixed-width score digits for an accuracy, clamped to `[0, 1]`.
pub fn score_token(accuracy: f64) -> String {
    let clamped = if accuracy.is_finite() {
        accuracy.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let scaled = (clamped * SCORE_SCALE).round() as u64;
    format!("{scaled:0width$}", width = SCORE_WIDTH)
}

/// Parse an identity filename. Anything that does not match, or names a model
/// or dataset outside the catalog, is not a run and yields `None`.
pub fn decode(file_name: &str) -> Option<RunIdentity> {
    let captures = IDENTITY_PATTERN.captures(file_name)?;
    let model = captures.get(1)?.as_str().parse().ok()?;
    let dataset = captures.get(2)?.as_str().parse().ok()?;
    let score: u64 = captures.get(3)?.as_str().parse().ok()?;
    let name = captures.get(4).map(|m| m.as_str().to_string());
    Some(RunIdentity {
        model,
        dataset,
        accuracy: score as f64 / SCORE_SCALE,
        name,
    })
}

/// Check a requested name against the naming policy. Empty names are valid
/// and mean "clear the name".
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.chars().count() > MAX_NAME_LEN {
        return Err(NameError::TooLong);
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(NameError::InvalidCharacters);
    }
    Ok(())
}

/// Storage form of a requested name: trimmed, spaces turned into underscores,
/// `None` when nothing remains.
pub fn sanitize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.replace(' ', "_"))
}

/// Presentation form of a stored name.
pub fn display_name(stored: &str) -> String {
    stored.replace('_', " ")
}
