/*!
 * Schema bookkeeping and table registration.
 *
 * A one-row `schema_version` table records which layout a database file was
 * created with. Files stamped by a newer layout are refused; otherwise the
 * idempotent DDL of every registered table runs each time a session factory
 * is built.
 */

use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

use super::record::Table;
use crate::errors::StoreError;

/// Layout version stamped into new databases
pub const SCHEMA_VERSION: i32 = 1;

/// Check or stamp the layout version, then create the registered tables
pub fn initialize_schema(conn: &Connection, tables: &[&'static Table]) -> Result<(), StoreError> {
    match stored_version(conn)? {
        None => {
            info!("Stamping new database with schema v{}", SCHEMA_VERSION);
            stamp_version(conn, SCHEMA_VERSION)?;
        }
        Some(found) if found > SCHEMA_VERSION => {
            return Err(StoreError::UnsupportedSchema {
                found,
                supported: SCHEMA_VERSION,
            });
        }
        Some(found) => debug!("Database schema v{} accepted", found),
    }

    register_tables(conn, tables)
}

/// Run the DDL of each mapped table
pub fn register_tables(conn: &Connection, tables: &[&'static Table]) -> Result<(), StoreError> {
    for table in tables {
        debug!("Registering mapped table '{}'", table.name);
        conn.execute_batch(table.ddl)?;
    }
    Ok(())
}

/// Version stamped into the database, `None` for a database never stamped
fn stored_version(conn: &Connection) -> Result<Option<i32>, StoreError> {
    let stamped = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !stamped {
        return Ok(None);
    }

    Ok(conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| row.get(0))
        .optional()?)
}

fn stamp_version(conn: &Connection, version: i32) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            stamped_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );",
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
        [version],
    )?;
    Ok(())
}
