use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

/// Number of digits in a run or compare identifier.
pub const RECORD_ID_LEN: usize = 10;

/// Identifier of a run or compare directory: a 10-digit epoch-seconds stamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

/// A string that is not a well-formed record identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid record ID: {0:?}")]
pub struct InvalidRecordId(pub String);

impl RecordId {
    /// Validate the 10-digit shape without touching the filesystem.
    pub fn parse(value: &str) -> Result<Self, InvalidRecordId> {
        if is_record_id(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidRecordId(value.to_string()))
        }
    }

    /// Identifier for the current second.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        Self(format!("{secs:010}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time in epoch seconds.
    pub fn timestamp(&self) -> u64 {
        self.0.parse().unwrap_or_default()
    }
}

/// True when `value` is exactly ten ASCII digits.
pub fn is_record_id(value: &str) -> bool {
    value.len() == RECORD_ID_LEN && value.bytes().all(|b| b.is_ascii_digit())
}

impl TryFrom<String> for RecordId {
    type Error = InvalidRecordId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_record_id(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidRecordId(value))
        }
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_ten_digits() {
        assert!(RecordId::parse("1700000000").is_ok());
        assert!(RecordId::parse("170000000").is_err());
        assert!(RecordId::parse("17000000000").is_err());
        assert!(RecordId::parse("abc").is_err());
        assert!(RecordId::parse("../1700000").is_err());
        assert!(RecordId::parse("１７００００００００").is_err());
    }

    #[test]
    fn now_has_record_shape() {
        let id = RecordId::now();
        assert!(is_record_id(id.as_str()));
        assert!(id.timestamp() > 1_600_000_000);
    }

    #[test]
    fn serde_rejects_malformed_ids() {
        let id: RecordId = serde_json::from_str("\"1700000001\"").unwrap();
        assert_eq!(id.timestamp(), 1_700_000_001);
        assert!(serde_json::from_str::<RecordId>("\"17\"").is_err());
    }
}
