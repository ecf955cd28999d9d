/*!
 * Session factory, sessions and transactions.
 *
 * The factory owns one SQLite connection. A session is an exclusive guard on
 * that connection and is released when dropped; a transaction lives inside a
 * session and rolls back when dropped without a commit.
 */

use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::types::{FromSql, ToSql, ValueRef};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::record::{Record, Table};
use super::schema;
use crate::configuration::DatabaseConfiguration;
use crate::errors::StoreError;

/// Dialect served by the embedded backend
pub const SQLITE_DIALECT: &str = "sqlite";

/// Driver name of the embedded backend
pub const SQLITE_DRIVER: &str = "rusqlite";

/// Schema value selecting an in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Hands out sessions on a shared database connection
#[derive(Clone)]
pub struct SessionFactory {
    inner: Arc<FactoryInner>,
}

struct FactoryInner {
    /// Database file path or `:memory:`
    target: String,
    /// Connection URL derived from the configuration
    url: String,
    connection: Mutex<Connection>,
    counters: Counters,
}

#[derive(Default)]
struct Counters {
    opened: AtomicU64,
    open: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

/// Collects the mapped tables before the factory is built
pub struct SessionFactoryBuilder<'c> {
    configuration: &'c DatabaseConfiguration,
    tables: Vec<&'static Table>,
}

impl<'c> SessionFactoryBuilder<'c> {
    /// Register the table of a record type
    pub fn register<R: Record>(self) -> Self {
        self.register_table(R::table())
    }

    pub fn register_table(mut self, table: &'static Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Validate dialect and driver, open the database and create the
    /// registered tables
    pub fn build(self) -> Result<SessionFactory, StoreError> {
        let configuration = self.configuration;

        if !configuration.dialect().eq_ignore_ascii_case(SQLITE_DIALECT) {
            return Err(StoreError::UnsupportedDialect(configuration.dialect().to_string()));
        }
        if !configuration.driver_class().eq_ignore_ascii_case(SQLITE_DRIVER) {
            return Err(StoreError::UnsupportedDriver(
                configuration.driver_class().to_string(),
            ));
        }

        let url = configuration.connection_url();
        info!(
            "Building session factory for {} as '{}'",
            url,
            configuration.username()
        );

        SessionFactory::open(configuration.schema(), url, &self.tables)
    }
}

impl SessionFactory {
    pub fn builder(configuration: &DatabaseConfiguration) -> SessionFactoryBuilder<'_> {
        SessionFactoryBuilder {
            configuration,
            tables: Vec::new(),
        }
    }

    /// Create an in-memory factory (for testing)
    pub fn in_memory(tables: &[&'static Table]) -> Result<Self, StoreError> {
        debug!("Creating in-memory session factory");
        Self::open(IN_MEMORY, format!("{}://{}", SQLITE_DIALECT, IN_MEMORY), tables)
    }

    fn open(target: &str, url: String, tables: &[&'static Table]) -> Result<Self, StoreError> {
        let open_error = |source: Box<dyn std::error::Error + Send + Sync>| StoreError::Open {
            target: target.to_string(),
            source,
        };

        let conn = if target == IN_MEMORY {
            Connection::open_in_memory().map_err(|e| open_error(Box::new(e)))?
        } else {
            let path = Path::new(target);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| open_error(Box::new(e)))?;
            }
            info!("Opening database at: {:?}", path);
            Connection::open(path).map_err(|e| open_error(Box::new(e)))?
        };

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::initialize_schema(&conn, tables)?;

        Ok(Self {
            inner: Arc::new(FactoryInner {
                target: target.to_string(),
                url,
                connection: Mutex::new(conn),
                counters: Counters::default(),
            }),
        })
    }

    /// Database file path, or `:memory:`
    pub fn target(&self) -> &str {
        &self.inner.target
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Open a session; blocks while another session holds the connection
    pub fn open_session(&self) -> Session<'_> {
        let connection = self.inner.connection.lock();
        let counters = &self.inner.counters;
        let id = counters.opened.fetch_add(1, Ordering::Relaxed) + 1;
        counters.open.fetch_add(1, Ordering::Relaxed);
        debug!("Opened session #{}", id);

        Session {
            connection,
            counters,
            id,
        }
    }

    /// Session and transaction counters
    pub fn stats(&self) -> SessionStats {
        let counters = &self.inner.counters;
        SessionStats {
            sessions_opened: counters.opened.load(Ordering::Relaxed),
            sessions_open: counters.open.load(Ordering::Relaxed),
            commits: counters.commits.load(Ordering::Relaxed),
            rollbacks: counters.rollbacks.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("url", &self.inner.url)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Exclusive use of the factory's connection
pub struct Session<'f> {
    connection: MutexGuard<'f, Connection>,
    counters: &'f Counters,
    id: u64,
}

impl<'f> Session<'f> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Raw connection, for statements outside the record mapping
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn begin_transaction(&mut self) -> Result<Transaction<'_>, StoreError> {
        let tx = self.connection.transaction()?;
        debug!("Session #{}: transaction started", self.id);

        Ok(Transaction {
            tx,
            counters: self.counters,
            session_id: self.id,
        })
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.counters.open.fetch_sub(1, Ordering::Relaxed);
        debug!("Closed session #{}", self.id);
    }
}

/// A transaction inside a session
pub struct Transaction<'s> {
    tx: rusqlite::Transaction<'s>,
    counters: &'s Counters,
    session_id: u64,
}

impl Transaction<'_> {
    pub fn connection(&self) -> &Connection {
        &self.tx
    }

    /// Every row of the record's table, ordered by identifier
    pub fn list<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        let table = R::table();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            table.select_list(),
            table.name,
            table.id_column
        );

        let mut stmt = self.tx.prepare(&sql)?;
        let records = stmt
            .query_map([], R::from_row)?
            .collect::<rusqlite::Result<Vec<R>>>()?;

        Ok(records)
    }

    /// The row with the given key, if any
    pub fn get<R: Record>(&self, key: &R::Key) -> Result<Option<R>, StoreError> {
        let table = R::table();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            table.select_list(),
            table.name,
            table.id_column
        );

        Ok(self.tx.query_row(&sql, [key], R::from_row).optional()?)
    }

    /// Insert a record and return its key; the store generates the key when
    /// the record has none
    pub fn save<R: Record>(&self, record: &R) -> Result<R::Key, StoreError> {
        let table = R::table();
        let values = record.values();

        let mut columns: Vec<&str> = Vec::with_capacity(table.columns.len() + 1);
        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(values.len() + 1);
        if let Some(key) = record.key() {
            columns.push(table.id_column);
            params.push(key);
        }
        columns.extend(table.columns.iter().copied());
        params.extend(values.iter().map(|v| v as &dyn ToSql));

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table.name)
        } else {
            let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table.name,
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        self.tx.execute(&sql, params.as_slice())?;

        match record.key() {
            Some(key) => Ok(key.clone()),
            None => {
                let rowid = self.tx.last_insert_rowid();
                debug!("Generated key {} in '{}'", rowid, table.name);
                R::Key::column_result(ValueRef::Integer(rowid)).map_err(StoreError::KeyConversion)
            }
        }
    }

    /// Write the record's columns onto its row; returns the number of rows
    /// changed
    pub fn update<R: Record>(&self, record: &R) -> Result<usize, StoreError> {
        let table = R::table();
        let key = record.key().ok_or(StoreError::MissingKey(table.name))?;
        if table.columns.is_empty() {
            return Ok(0);
        }

        let values = record.values();
        let assignments: Vec<String> = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            table.name,
            assignments.join(", "),
            table.id_column,
            table.columns.len() + 1
        );

        let mut params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
        params.push(key);

        Ok(self.tx.execute(&sql, params.as_slice())?)
    }

    /// Remove the row with the given key; returns the number of rows removed
    pub fn delete<R: Record>(&self, key: &R::Key) -> Result<usize, StoreError> {
        let table = R::table();
        let sql = format!("DELETE FROM {} WHERE {} = ?1", table.name, table.id_column);
        Ok(self.tx.execute(&sql, [key])?)
    }

    /// Commit; a failed commit (deferred constraints) leaves the
    /// transaction rolled back
    pub fn commit(self) -> Result<(), StoreError> {
        match self.tx.commit() {
            Ok(()) => {
                self.counters.commits.fetch_add(1, Ordering::Relaxed);
                debug!("Session #{}: transaction committed", self.session_id);
                Ok(())
            }
            Err(e) => {
                self.counters.rollbacks.fetch_add(1, Ordering::Relaxed);
                warn!("Session #{}: commit failed, rolled back: {}", self.session_id, e);
                Err(e.into())
            }
        }
    }

    pub fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback()?;
        self.counters.rollbacks.fetch_add(1, Ordering::Relaxed);
        debug!("Session #{}: transaction rolled back", self.session_id);
        Ok(())
    }
}

/// Session factory statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Sessions opened since the factory was built
    pub sessions_opened: u64,
    /// Sessions currently held
    pub sessions_open: u64,
    /// Committed transactions
    pub commits: u64,
    /// Explicitly rolled back transactions
    pub rollbacks: u64,
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sessions opened: {}, Open: {}, Commits: {}, Rollbacks: {}",
            self.sessions_opened, self.sessions_open, self.commits, self.rollbacks
        )
    }
}
