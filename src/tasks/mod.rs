//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a connection is
//! ready.
//!
//! # Tasks
//! - Expiry sweep: deletes records whose deadline has passed

mod sweep;

pub use sweep::{spawn_sweep_task, sweep_expired, SweepHandle};
