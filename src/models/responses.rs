//! Response DTOs for the cache HTTP surface
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheKey, Envelope};

/// Response body for `GET /cache/:segment/:id`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub segment: String,
    pub id: String,
    /// The cached value
    pub item: Value,
    /// Write time in epoch milliseconds
    pub stored: i64,
    /// TTL in milliseconds
    pub ttl: u64,
}

impl GetResponse {
    /// Creates a new GetResponse from a cache hit
    pub fn new(key: CacheKey, envelope: Envelope) -> Self {
        Self {
            segment: key.segment,
            id: key.id,
            item: envelope.item,
            stored: envelope.stored,
            ttl: envelope.ttl,
        }
    }
}

/// Response body for `PUT /cache/:segment/:id`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: &CacheKey) -> Self {
        Self {
            message: format!("Key '{}' stored successfully", key),
        }
    }
}

/// Response body for `DELETE /cache/:segment/:id`
#[derive(Debug, Clone, Serialize)]
pub struct DropResponse {
    /// Success message
    pub message: String,
}

impl DropResponse {
    /// Creates a new DropResponse
    pub fn new(key: &CacheKey) -> Self {
        Self {
            message: format!("Key '{}' dropped", key),
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Whether the backend can serve record operations
    pub ready: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse stamped with the current time
    pub fn new(ready: bool) -> Self {
        Self {
            ready,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
