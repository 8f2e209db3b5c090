//! Cache Backend Contract
//!
//! The operations a host caching framework drives a backend through.

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{key, CacheKey, Connection, Envelope};
use crate::error::Result;

/// Storage backend as seen by the cache policy layer.
///
/// The host owns all policy; a backend only stores, fetches and deletes
/// envelopes and reports whether it can currently do so.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Brings the backend up. Calling it on a started backend is a no-op.
    async fn start(&self) -> Result<()>;

    /// Shuts the backend down. Calling it on a stopped backend is a no-op.
    fn stop(&self);

    fn is_ready(&self) -> bool;

    fn validate_segment_name(&self, name: &str) -> Result<()>;

    /// `Ok(None)` is a miss.
    async fn get(&self, key: &CacheKey) -> Result<Option<Envelope>>;

    /// `ttl` is in milliseconds.
    async fn set(&self, key: &CacheKey, value: Value, ttl: u64) -> Result<()>;

    async fn drop(&self, key: &CacheKey) -> Result<()>;
}

#[async_trait]
impl CacheBackend for Connection {
    async fn start(&self) -> Result<()> {
        Connection::start(self).await
    }

    fn stop(&self) {
        Connection::stop(self)
    }

    fn is_ready(&self) -> bool {
        Connection::is_ready(self)
    }

    fn validate_segment_name(&self, name: &str) -> Result<()> {
        key::validate_segment_name(name)
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Envelope>> {
        Connection::get(self, key).await
    }

    async fn set(&self, key: &CacheKey, value: Value, ttl: u64) -> Result<()> {
        Connection::set(self, key, &value, ttl).await
    }

    async fn drop(&self, key: &CacheKey) -> Result<()> {
        Connection::drop(self, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::MemoryEngine;
    use serde_json::json;
    use std::sync::Arc;

    fn connection() -> Connection {
        Connection::new(Config::default(), Arc::new(MemoryEngine::new())).unwrap()
    }

    #[test]
    fn test_validate_segment_name_before_start() {
        let conn = connection();
        let backend: &dyn CacheBackend = &conn;

        assert!(backend.validate_segment_name("").is_err());
        assert!(backend.validate_segment_name("a\0b").is_err());
        assert!(backend.validate_segment_name("valid").is_ok());
        assert!(!backend.is_ready());
    }

    #[tokio::test]
    async fn test_contract_through_trait_object() {
        let conn = connection();
        let backend: &dyn CacheBackend = &conn;
        let key = CacheKey::new("segment", "item");

        backend.start().await.unwrap();
        assert!(backend.is_ready());

        backend.set(&key, json!([1, 2, 3]), 10_000).await.unwrap();
        let envelope = backend.get(&key).await.unwrap().unwrap();
        assert_eq!(envelope.item, json!([1, 2, 3]));
        assert_eq!(envelope.ttl, 10_000);

        backend.drop(&key).await.unwrap();
        assert!(backend.get(&key).await.unwrap().is_none());

        backend.stop();
        assert!(!backend.is_ready());
    }
}
