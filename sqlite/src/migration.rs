//! Creating, dropping and inspecting the record tables.
//!
//! [`Migration`] owns the connection while the schema changes; hand it to a
//! [`DatasetStore`](crate::DatasetStore) afterwards with
//! [`Migration::into_connection`].
//!
//! # Example
//!
//! ```no_run
//! use phylofeat_sqlite::Migration;
//! use rusqlite::Connection;
//!
//! let mut migration = Migration::new(Connection::open("features.db").unwrap(), "pf_").unwrap();
//! migration.up().unwrap();
//!
//! let status = migration.status().unwrap();
//! assert!(status.tables_exist);
//! println!("{} datasets, {} trees", status.dataset_count, status.tree_count);
//! ```

use rusqlite::{Connection, params_from_iter};
use tracing::{debug, info};

use crate::convert::from_sql_int;
use crate::error::{Result, SqliteError};
use crate::schema::{TABLES, generate_drop_sql, generate_schema_sql, validate_prefix};

/// Schema lifecycle for one table prefix.
pub struct Migration {
    conn: Connection,
    prefix: String,
}

impl Migration {
    /// Takes over `conn` for the tables named `{prefix}datasets` etc.
    ///
    /// Foreign keys are switched on here, since tree rows rely on
    /// `ON DELETE CASCADE`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`] for an empty prefix or one with
    /// characters other than alphanumerics and `_`.
    pub fn new(conn: Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn, prefix })
    }

    /// Creates the three tables and their indexes. Existing tables are kept.
    pub fn up(&mut self) -> Result<()> {
        let sql = generate_schema_sql(&self.prefix)?;
        self.apply(&sql, "create")?;
        info!(prefix = %self.prefix, "record tables ready");
        Ok(())
    }

    /// Drops the three tables, children first. Missing tables are skipped.
    pub fn down(&mut self) -> Result<()> {
        let sql = generate_drop_sql(&self.prefix)?;
        self.apply(&sql, "drop")?;
        info!(prefix = %self.prefix, "record tables dropped");
        Ok(())
    }

    fn apply(&mut self, sql: &str, action: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        if let Err(e) = tx.execute_batch(sql) {
            return Err(SqliteError::MigrationError(format!(
                "cannot {action} tables with prefix '{}': {e}",
                self.prefix
            )));
        }
        tx.commit()?;
        Ok(())
    }

    /// Row counts of every table, plus the tables that are missing.
    ///
    /// A table that does not exist counts zero rows; `tables_exist` is only
    /// true when all three are present.
    pub fn status(&self) -> Result<MigrationStatus> {
        let present = self.present_tables()?;
        let mut status = MigrationStatus::default();

        for table in TABLES {
            if !present.iter().any(|name| name == table) {
                status.missing_tables.push(format!("{}{table}", self.prefix));
                continue;
            }
            let rows = self.row_count(table)?;
            match table {
                "datasets" => status.dataset_count = rows,
                "trees" => status.tree_count = rows,
                _ => status.parsimony_tree_count = rows,
            }
        }
        status.tables_exist = status.missing_tables.is_empty();
        debug!(prefix = %self.prefix, ?status, "migration status");
        Ok(status)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Unprefixed names of the record tables found in `sqlite_master`.
    fn present_tables(&self) -> Result<Vec<String>> {
        let names = TABLES.map(|table| format!("{}{table}", self.prefix));
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN (?1, ?2, ?3)",
        )?;
        let found = stmt
            .query_map(params_from_iter(names.iter()), |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(found
            .into_iter()
            .filter_map(|name| name.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }

    fn row_count(&self, table: &str) -> Result<usize> {
        let table = format!("{}{table}", self.prefix);
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        from_sql_int(count, &table)
    }
}

/// Snapshot returned by [`Migration::status`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    /// All three record tables are present.
    pub tables_exist: bool,
    /// Prefixed names of absent tables, parents first.
    pub missing_tables: Vec<String>,
    pub dataset_count: usize,
    pub tree_count: usize,
    pub parsimony_tree_count: usize,
}
