//! Expiry Sweep Task
//!
//! Background task that periodically deletes records whose `expiresAt`
//! deadline has passed, ranging over the secondary index.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::EXPIRES_AT_INDEX;
use crate::engine::{EngineResult, Session, TableRef};

// == Sweep Handle ==
/// Owner of a running sweep task.
///
/// The task is aborted by [`SweepHandle::cancel`] or when the handle is
/// dropped, whichever comes first.
#[derive(Debug)]
pub struct SweepHandle {
    handle: JoinHandle<()>,
}

impl SweepHandle {
    /// Stops the task. Takes effect at the task's next await point.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawns a task that sweeps `table` every `interval`.
///
/// The first sweep runs one full interval after spawning. A tick is skipped
/// when the session has no live connection, and a failed tick is logged and
/// otherwise ignored.
///
/// # Example
/// ```ignore
/// let sweep = spawn_sweep_task(session.clone(), table, Duration::from_secs(60));
/// // Later, when the connection stops:
/// sweep.cancel();
/// ```
pub fn spawn_sweep_task(
    session: Arc<dyn Session>,
    table: TableRef,
    interval: Duration,
) -> SweepHandle {
    let handle = tokio::spawn(async move {
        info!(
            %table,
            interval_ms = interval.as_millis() as u64,
            "Starting expiry sweep"
        );

        let Some(first_tick) = Instant::now().checked_add(interval) else {
            warn!(%table, "Flush interval out of range, expiry sweep disabled");
            return;
        };
        let mut ticker = interval_at(first_tick, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if session.open_connections() == 0 {
                debug!(%table, "Expiry sweep skipped: no live connection");
                continue;
            }

            match sweep_expired(session.as_ref(), &table, Utc::now()).await {
                Ok(0) => debug!(%table, "Expiry sweep: no expired records"),
                Ok(removed) => info!(%table, removed, "Expiry sweep: removed expired records"),
                Err(error) => warn!(%table, %error, "Expiry sweep failed"),
            }
        }
    });

    SweepHandle { handle }
}

/// Deletes every record whose deadline is at or before `now`.
pub async fn sweep_expired(
    session: &dyn Session,
    table: &TableRef,
    now: DateTime<Utc>,
) -> EngineResult<u64> {
    session
        .delete_through(table, EXPIRES_AT_INDEX, now.timestamp_millis())
        .await
}
