//! Fixed catalog of classifier kinds and datasets.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Classifier family trained by one of the external scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "tree")]
    Tree,
    #[serde(rename = "forest")]
    Forest,
    #[serde(rename = "gradient")]
    Gradient,
    #[serde(rename = "hist-gradient")]
    HistGradient,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Tree,
        ModelKind::Forest,
        ModelKind::Gradient,
        ModelKind::HistGradient,
    ];

    /// Token used in filenames, manifests and query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Forest => "forest",
            Self::Gradient => "gradient",
            Self::HistGradient => "hist-gradient",
        }
    }

    /// Training script invoked for this model kind.
    pub fn script(self) -> &'static str {
        match self {
            Self::Tree => "train-tree.py",
            Self::Forest => "train-forest.py",
            Self::Gradient => "train-gradient.py",
            Self::HistGradient => "train-hist-gradient.py",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Tree => "Decision Tree",
            Self::Forest => "Random Forest",
            Self::Gradient => "Gradient Boosting",
            Self::HistGradient => "Hist Gradient Boosting",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = UnknownCatalogEntry;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| UnknownCatalogEntry::Model(value.to_string()))
    }
}

/// Dataset a run was trained or compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetId {
    Iris,
    Income,
}

impl DatasetId {
    pub const ALL: [DatasetId; 2] = [DatasetId::Iris, DatasetId::Income];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Iris => "Iris",
            Self::Income => "Income",
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetId {
    type Err = UnknownCatalogEntry;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|dataset| dataset.as_str() == value)
            .ok_or_else(|| UnknownCatalogEntry::Dataset(value.to_string()))
    }
}

/// A model or dataset token outside the fixed catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnknownCatalogEntry {
    #[error("Unknown model: {0}")]
    Model(String),
    #[error("Unknown dataset: {0}")]
    Dataset(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_tokens_round_trip_through_from_str_and_serde() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.as_str().parse::<ModelKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert_eq!(
            "boosted".parse::<ModelKind>(),
            Err(UnknownCatalogEntry::Model("boosted".into()))
        );
    }

    #[test]
    fn datasets_are_case_sensitive() {
        assert_eq!("Iris".parse::<DatasetId>().unwrap(), DatasetId::Iris);
        assert!("iris".parse::<DatasetId>().is_err());
    }

    #[test]
    fn hist_gradient_uses_its_own_script() {
        assert_eq!(ModelKind::HistGradient.script(), "train-hist-gradient.py");
    }
}
