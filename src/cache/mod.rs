//! Cache Module
//!
//! Expiring key-value adapter over a table store: key codec, record layout,
//! schema bootstrap and the connection that ties them together.

mod backend;
mod connection;
pub mod key;
mod record;
pub mod schema;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backend::CacheBackend;
pub use connection::Connection;
pub use key::{generate_key, validate_segment_name, CacheKey};
pub use record::{CacheRecord, Envelope};
pub use schema::EXPIRES_AT_INDEX;
