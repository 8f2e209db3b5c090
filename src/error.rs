//! Error types for the cache backend
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::engine::EngineError;

// == Cache Error Enum ==
/// Unified error type for the cache backend.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration rejected before any connection attempt
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Segment name failed validation
    #[error("{0}")]
    InvalidSegmentName(String),

    /// One part of a cache key failed validation
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// TTL pushes the deadline past the representable range
    #[error("TTL out of range: {0}ms")]
    InvalidTtl(u64),

    /// A record operation ran while the connection was not ready
    #[error("Connection not started")]
    NotStarted,

    /// Opening or bootstrapping the storage handle failed
    #[error("{0}")]
    Connection(String),

    /// A stored row is missing required fields
    #[error("Incorrect result structure")]
    MalformedRecord,

    /// The value could not be turned into a storable document
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything the storage engine reported, forwarded as is
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// Cache miss surfaced over HTTP
    #[error("Key not found: {0}")]
    NotFound(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidSegmentName(_)
            | CacheError::InvalidKey(_)
            | CacheError::InvalidTtl(_)
            | CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::NotStarted => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Config(_)
            | CacheError::Connection(_)
            | CacheError::MalformedRecord
            | CacheError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache backend.
pub type Result<T> = std::result::Result<T, CacheError>;
