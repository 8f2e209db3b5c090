//! Cache Key Module
//!
//! Maps a two-part caller key onto a single storage primary key.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Characters left as-is by URI component encoding.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

// == Cache Key ==
/// Caller-facing key: a segment (namespace) plus an id inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub segment: String,
    pub id: String,
}

impl CacheKey {
    pub fn new(segment: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            id: id.into(),
        }
    }

    /// Checks both parts with the segment-name rule.
    pub fn validate(&self) -> Result<()> {
        check_name(&self.segment).map_err(|reason| {
            CacheError::InvalidKey(format!("segment: {reason}"))
        })?;
        check_name(&self.id).map_err(|reason| CacheError::InvalidKey(format!("id: {reason}")))
    }

    /// Validates the key and returns its storage id.
    pub fn storage_id(&self) -> Result<String> {
        self.validate()?;
        Ok(generate_key(self))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.segment, self.id)
    }
}

/// Percent-encodes both parts and concatenates them.
///
/// There is no separator, so `("ab", "c")` and `("a", "bc")` share the id
/// `abc`. Existing tables depend on this layout.
pub fn generate_key(key: &CacheKey) -> String {
    format!(
        "{}{}",
        utf8_percent_encode(&key.segment, COMPONENT),
        utf8_percent_encode(&key.id, COMPONENT)
    )
}

/// Accepts any non-empty name without a null character.
pub fn validate_segment_name(name: &str) -> Result<()> {
    check_name(name).map_err(|reason| CacheError::InvalidSegmentName(reason.to_string()))
}

fn check_name(name: &str) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        return Err("Empty string");
    }
    if name.contains('\0') {
        return Err("Includes null character");
    }
    Ok(())
}
