//! API Handlers
//!
//! HTTP request handlers for each endpoint. Every handler goes through the
//! [`CacheBackend`] contract only.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::cache::{CacheBackend, CacheKey};
use crate::error::{CacheError, Result};
use crate::models::{DropResponse, GetResponse, HealthResponse, SetRequest, SetResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Backend serving every request
    pub backend: Arc<dyn CacheBackend>,
}

impl AppState {
    /// Creates a new AppState around a backend.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Builds a key from path parts, rejecting segment names the backend
    /// does not accept.
    fn key(&self, segment: String, id: String) -> Result<CacheKey> {
        self.backend.validate_segment_name(&segment)?;
        Ok(CacheKey::new(segment, id))
    }
}

/// Handler for GET /cache/:segment/:id
///
/// Returns the envelope on a hit and 404 on a miss.
pub async fn get_handler(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    let key = state.key(segment, id)?;

    match state.backend.get(&key).await? {
        Some(envelope) => Ok(Json(GetResponse::new(key, envelope))),
        None => Err(CacheError::NotFound(key.to_string())),
    }
}

/// Handler for PUT /cache/:segment/:id
///
/// Stores the request value for `ttl` milliseconds.
pub async fn set_handler(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let key = state.key(segment, id)?;
    state.backend.set(&key, req.value, req.ttl).await?;

    Ok(Json(SetResponse::new(&key)))
}

/// Handler for DELETE /cache/:segment/:id
///
/// Succeeds whether or not the key was present.
pub async fn drop_handler(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
) -> Result<Json<DropResponse>> {
    let key = state.key(segment, id)?;
    state.backend.as_ref().drop(&key).await?;

    Ok(Json(DropResponse::new(&key)))
}

/// Handler for GET /health
///
/// 200 when the backend is ready, 503 otherwise.
pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let ready = state.backend.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(HealthResponse::new(ready)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Connection;
    use crate::config::Config;
    use crate::engine::MemoryEngine;
    use serde_json::json;

    async fn started_state() -> AppState {
        let conn = Connection::new(Config::default(), Arc::new(MemoryEngine::new())).unwrap();
        conn.start().await.unwrap();
        AppState::new(Arc::new(conn))
    }

    fn path(segment: &str, id: &str) -> Path<(String, String)> {
        Path((segment.to_string(), id.to_string()))
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = started_state().await;

        let req = SetRequest {
            value: json!({"name": "test"}),
            ttl: 60_000,
        };
        let result = set_handler(State(state.clone()), path("users", "1"), Json(req)).await;
        assert!(result.is_ok());

        let response = get_handler(State(state.clone()), path("users", "1"))
            .await
            .unwrap();
        assert_eq!(response.item, json!({"name": "test"}));
        assert_eq!(response.ttl, 60_000);
        state.backend.stop();
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let state = started_state().await;

        let result = get_handler(State(state.clone()), path("users", "missing")).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
        state.backend.stop();
    }

    #[tokio::test]
    async fn test_drop_handler() {
        let state = started_state().await;
        let req = SetRequest {
            value: json!(1),
            ttl: 60_000,
        };
        set_handler(State(state.clone()), path("s", "gone"), Json(req))
            .await
            .unwrap();

        assert!(drop_handler(State(state.clone()), path("s", "gone")).await.is_ok());
        assert!(drop_handler(State(state.clone()), path("s", "gone")).await.is_ok());

        let result = get_handler(State(state.clone()), path("s", "gone")).await;
        assert!(result.is_err());
        state.backend.stop();
    }

    #[tokio::test]
    async fn test_bad_segment_name() {
        let state = started_state().await;

        let result = get_handler(State(state.clone()), path("a\0b", "id")).await;
        assert!(matches!(result, Err(CacheError::InvalidSegmentName(_))));
        state.backend.stop();
    }

    #[tokio::test]
    async fn test_health_handler() {
        let state = started_state().await;

        let (status, response) = health_handler(State(state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(response.ready);

        state.backend.stop();
        let (status, response) = health_handler(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!response.ready);
    }
}
