//! Catbox Table - a table-store cache backend
//!
//! Persists opaque cached values into a table keyed by segment and id,
//! enforces TTL through an indexed `expiresAt` deadline, and sweeps expired
//! records in the background.

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheBackend, CacheKey, Connection, Envelope};
pub use config::{Config, ServerConfig};
pub use error::{CacheError, Result};
