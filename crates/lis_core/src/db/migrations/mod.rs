//! Schema migrations for the lab store.
//!
//! Each step is a named SQL script applied at most once. The highest applied
//! step is recorded in `PRAGMA user_version`; all pending steps of one open
//! run inside a single transaction.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction};

struct SchemaStep {
    version: u32,
    name: &'static str,
    script: &'static str,
}

static SCHEMA_STEPS: [SchemaStep; 2] = [
    SchemaStep {
        version: 1,
        name: "init",
        script: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "lookup_indexes",
        script: include_str!("0002_lookup_indexes.sql"),
    },
];

/// Highest schema version this build can produce.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.iter().map(|step| step.version).max().unwrap_or(0)
}

/// Brings the schema behind `conn` up to [`latest_version`].
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > found)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        run_step(&tx, step)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        found,
        supported,
        pending.len()
    );
    Ok(())
}

fn run_step(tx: &Transaction<'_>, step: &SchemaStep) -> DbResult<()> {
    tx.execute_batch(step.script)?;
    tx.pragma_update(None, "user_version", step.version)?;
    info!(
        "event=db_migrate_step module=db status=ok version={} name={}",
        step.version, step.name
    );
    Ok(())
}
