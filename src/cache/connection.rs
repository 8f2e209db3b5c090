//! Connection Module
//!
//! Owns the storage handle, the lifecycle state machine and the expiry sweep,
//! and runs the record operations against the cache table.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{schema, CacheKey, CacheRecord, Envelope};
use crate::config::Config;
use crate::engine::{Driver, Session, TableRef};
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_sweep_task, SweepHandle};

// == Connection State ==
enum State {
    Stopped,
    Starting,
    Ready(Live),
}

/// What a ready connection holds on to.
struct Live {
    session: Arc<dyn Session>,
    sweep: SweepHandle,
}

impl Live {
    fn shutdown(self) {
        self.sweep.cancel();
        self.session.close();
    }
}

// == Connection ==
/// Cache backend persisting records into one table of a table store.
///
/// Lifecycle: `Stopped -> Starting -> Ready`, back to `Stopped` on
/// [`Connection::stop`] or a failed start.
pub struct Connection {
    config: Config,
    table: TableRef,
    driver: Arc<dyn Driver>,
    state: Mutex<State>,
    /// Serializes `start` calls so only one of them bootstraps
    start_gate: tokio::sync::Mutex<()>,
}

impl Connection {
    // == Constructor ==
    /// Creates a stopped connection. Fails if the configuration is unusable.
    pub fn new(config: Config, driver: Arc<dyn Driver>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            table: config.table_ref(),
            config,
            driver,
            state: Mutex::new(State::Stopped),
            start_gate: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // == Start ==
    /// Connects, bootstraps the schema and arms the expiry sweep.
    ///
    /// Returns immediately if the connection is already ready. Concurrent
    /// callers wait for the in-flight start and then see it ready.
    pub async fn start(&self) -> Result<()> {
        let _gate = self.start_gate.lock().await;

        {
            let mut state = self.state.lock();
            if matches!(*state, State::Ready(_)) {
                debug!(table = %self.table, "Connection already started");
                return Ok(());
            }
            *state = State::Starting;
        }

        let session = match self.driver.connect(&self.config.connect_options()).await {
            Ok(session) => session,
            Err(error) => {
                self.reset_if_starting();
                return Err(CacheError::Connection(error.to_string()));
            }
        };

        if let Err(error) = schema::bootstrap(session.as_ref(), &self.table).await {
            session.close();
            self.reset_if_starting();
            return Err(CacheError::Connection(error.to_string()));
        }

        let mut state = self.state.lock();
        if !matches!(*state, State::Starting) {
            session.close();
            return Err(CacheError::Connection(
                "Connection stopped while starting".to_string(),
            ));
        }

        let sweep = spawn_sweep_task(
            session.clone(),
            self.table.clone(),
            Duration::from_millis(self.config.flush_interval),
        );
        *state = State::Ready(Live { session, sweep });

        info!(
            host = %self.config.host,
            port = self.config.port,
            table = %self.table,
            "Cache connection started"
        );
        Ok(())
    }

    fn reset_if_starting(&self) {
        let mut state = self.state.lock();
        if matches!(*state, State::Starting) {
            *state = State::Stopped;
        }
    }

    // == Stop ==
    /// Cancels the sweep and closes the handle. A no-op when stopped.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Stopped);
        if let State::Ready(live) = previous {
            live.shutdown();
            info!(table = %self.table, "Cache connection stopped");
        }
    }

    // == Is Ready ==
    /// True when started and the transport still has a live connection.
    pub fn is_ready(&self) -> bool {
        match &*self.state.lock() {
            State::Ready(live) => live.session.open_connections() > 0,
            _ => false,
        }
    }

    fn session(&self) -> Result<Arc<dyn Session>> {
        match &*self.state.lock() {
            State::Ready(live) => Ok(live.session.clone()),
            _ => Err(CacheError::NotStarted),
        }
    }

    // == Get ==
    /// Looks up a record.
    ///
    /// Returns `Ok(None)` on a miss. Rows past their deadline are still
    /// returned until the sweep deletes them.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Envelope>> {
        let session = self.session()?;
        let id = key.storage_id()?;

        let Some(doc) = session.get(&self.table, &id).await? else {
            return Ok(None);
        };

        Ok(Some(CacheRecord::from_document(doc)?.into_envelope()))
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl` milliseconds, replacing any
    /// previous version.
    ///
    /// The existence probe and the following insert or replace are two
    /// separate round trips. Two writers racing on a fresh key can both
    /// insert; the loser gets the engine's duplicate key error. A row that
    /// vanishes between the probe and the replace is written afresh.
    pub async fn set<T>(&self, key: &CacheKey, value: &T, ttl: u64) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let session = self.session()?;
        let id = key.storage_id()?;
        let value = serde_json::to_value(value)?;
        let doc = CacheRecord::new(id, value, ttl, Utc::now())?.to_document()?;

        match self.get(key).await? {
            None => session.insert(&self.table, doc).await?,
            Some(_) => session.replace(&self.table, doc).await?,
        }
        Ok(())
    }

    // == Drop ==
    /// Deletes the record under `key`. Deleting a missing key succeeds.
    pub async fn drop(&self, key: &CacheKey) -> Result<()> {
        let session = self.session()?;
        let id = key.storage_id()?;

        let removed = session.delete(&self.table, &id).await?;
        if removed == 0 {
            debug!(key = %key, "Drop of missing key");
        }
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if matches!(*self.state.get_mut(), State::Ready(_)) {
            warn!(table = %self.table, "Cache connection dropped without stop");
            self.stop();
        }
    }
}
