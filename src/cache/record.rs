//! Cache Record Module
//!
//! Row layout of a cached value and the envelope handed back on a hit.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::Document;
use crate::error::{CacheError, Result};

// == Cache Record ==
/// One stored version of a cached value.
///
/// Timestamps are persisted as epoch milliseconds so the `expiresAt`
/// secondary index can range over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    /// Storage primary key
    pub id: String,
    /// Caller payload
    pub value: Value,
    /// Write time
    #[serde(with = "ts_milliseconds")]
    pub stored: DateTime<Utc>,
    /// Time to live in milliseconds, as supplied
    pub ttl: u64,
    /// `stored + ttl`
    #[serde(with = "ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl CacheRecord {
    // == Constructor ==
    /// Builds a record written at `now`.
    ///
    /// `now` is truncated to milliseconds so the persisted `stored` and
    /// `expiresAt` still differ by exactly `ttl`.
    pub fn new(id: String, value: Value, ttl: u64, now: DateTime<Utc>) -> Result<Self> {
        let stored = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        let expires_at = i64::try_from(ttl)
            .ok()
            .and_then(Duration::try_milliseconds)
            .and_then(|ttl| stored.checked_add_signed(ttl))
            .ok_or(CacheError::InvalidTtl(ttl))?;

        Ok(Self {
            id,
            value,
            stored,
            ttl,
            expires_at,
        })
    }

    /// Serializes the record into a storable document.
    pub fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self)? {
            Value::Object(doc) => Ok(doc),
            _ => Err(CacheError::MalformedRecord),
        }
    }

    /// Reads a record back from a stored document.
    ///
    /// A row without `value`, without a non-null `stored`, or with fields of
    /// the wrong shape is reported as malformed rather than as a miss.
    pub fn from_document(doc: Document) -> Result<Self> {
        let has_value = doc.contains_key("value");
        let has_stored = doc.get("stored").is_some_and(|stored| !stored.is_null());
        if !has_value || !has_stored {
            return Err(CacheError::MalformedRecord);
        }

        serde_json::from_value(Value::Object(doc)).map_err(|_| CacheError::MalformedRecord)
    }

    /// Wraps the payload for the caller.
    pub fn into_envelope(self) -> Envelope {
        Envelope {
            item: self.value,
            stored: self.stored.timestamp_millis(),
            ttl: self.ttl,
        }
    }
}

// == Envelope ==
/// Result of a cache hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The cached value
    pub item: Value,
    /// Write time in epoch milliseconds
    pub stored: i64,
    /// TTL in milliseconds, as supplied on write
    pub ttl: u64,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn test_record_deadline_is_stored_plus_ttl() {
        let record = CacheRecord::new("k".into(), json!("v"), 1500, at(1_000)).unwrap();

        assert_eq!(record.stored, at(1_000));
        assert_eq!(record.expires_at, at(2_500));
        assert_eq!(record.ttl, 1500);
    }

    #[test]
    fn test_record_truncates_to_milliseconds() {
        let now = at(1_000) + Duration::microseconds(700);
        let record = CacheRecord::new("k".into(), json!(1), 10, now).unwrap();

        assert_eq!(record.stored, at(1_000));
        assert_eq!(record.expires_at, at(1_010));
    }

    #[test]
    fn test_record_rejects_unrepresentable_ttl() {
        let result = CacheRecord::new("k".into(), json!(1), u64::MAX, at(0));
        assert!(matches!(result, Err(CacheError::InvalidTtl(u64::MAX))));
    }

    #[test]
    fn test_document_layout() {
        let record = CacheRecord::new("k".into(), json!({"a": [1, 2]}), 60, at(5)).unwrap();
        let doc = record.to_document().unwrap();

        assert_eq!(doc["id"], json!("k"));
        assert_eq!(doc["value"], json!({"a": [1, 2]}));
        assert_eq!(doc["stored"], json!(5));
        assert_eq!(doc["ttl"], json!(60));
        assert_eq!(doc["expiresAt"], json!(65));
    }

    #[test]
    fn test_document_roundtrip_to_envelope() {
        let record = CacheRecord::new("k".into(), json!(null), 60, at(5)).unwrap();
        let doc = record.to_document().unwrap();

        let envelope = CacheRecord::from_document(doc).unwrap().into_envelope();
        assert_eq!(
            envelope,
            Envelope {
                item: json!(null),
                stored: 5,
                ttl: 60
            }
        );
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let no_value = json!({"id": "k", "stored": 5, "ttl": 1, "expiresAt": 6});
        let no_stored = json!({"id": "k", "value": 1, "ttl": 1, "expiresAt": 6});
        let null_stored = json!({"id": "k", "value": 1, "stored": null, "ttl": 1, "expiresAt": 6});
        let bad_ttl = json!({"id": "k", "value": 1, "stored": 5, "ttl": "x", "expiresAt": 6});

        for doc in [no_value, no_stored, null_stored, bad_ttl] {
            let doc = doc.as_object().cloned().unwrap();
            assert!(matches!(
                CacheRecord::from_document(doc),
                Err(CacheError::MalformedRecord)
            ));
        }
    }
}
