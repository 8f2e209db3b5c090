//! Schema Bootstrap
//!
//! Ensures the database, table and `expiresAt` index exist before the
//! connection is handed out. Every step checks first and tolerates losing a
//! create race to another process.

use tracing::info;

use crate::engine::{EngineError, EngineResult, Session, TableRef};

/// Name of the secondary index (and field) the sweep ranges over.
pub const EXPIRES_AT_INDEX: &str = "expiresAt";

/// Runs the three ensure steps in order.
pub async fn bootstrap(session: &dyn Session, table: &TableRef) -> EngineResult<()> {
    ensure_database(session, &table.db).await?;
    ensure_table(session, table).await?;
    ensure_index(session, table, EXPIRES_AT_INDEX).await
}

pub async fn ensure_database(session: &dyn Session, db: &str) -> EngineResult<()> {
    if session.db_list().await?.iter().any(|name| name == db) {
        return Ok(());
    }
    tolerate_existing(session.db_create(db).await)?;
    info!(db, "created cache database");
    Ok(())
}

pub async fn ensure_table(session: &dyn Session, table: &TableRef) -> EngineResult<()> {
    if session
        .table_list(&table.db)
        .await?
        .iter()
        .any(|name| *name == table.table)
    {
        return Ok(());
    }
    tolerate_existing(session.table_create(table).await)?;
    info!(%table, "created cache table");
    Ok(())
}

pub async fn ensure_index(
    session: &dyn Session,
    table: &TableRef,
    index: &str,
) -> EngineResult<()> {
    if session.index_list(table).await?.iter().any(|name| name == index) {
        return Ok(());
    }
    tolerate_existing(session.index_create(table, index).await)?;
    info!(%table, index, "created secondary index");
    Ok(())
}

fn tolerate_existing(result: EngineResult<()>) -> EngineResult<()> {
    match result {
        Err(EngineError::AlreadyExists { .. }) => Ok(()),
        other => other,
    }
}
