//! API Module
//!
//! HTTP handlers and routing over a cache backend.
//!
//! # Endpoints
//! - `GET /cache/:segment/:id` - Fetch a cached envelope
//! - `PUT /cache/:segment/:id` - Store a value with a TTL
//! - `DELETE /cache/:segment/:id` - Drop a value
//! - `GET /health` - Backend readiness

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
