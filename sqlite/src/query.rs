//! Reading and writing aggregated datasets.
//!
//! Provides [`DatasetStore`] for storing the records of one aggregation and
//! reading them back. Writes use a single transaction per dataset: the
//! dataset row first, then its trees, then its parsimony trees. Deletes rely
//! on the cascading foreign keys to remove tree rows.
//!
//! # Example
//!
//! ```no_run
//! use phylofeat_sqlite::DatasetStore;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("features.db").unwrap();
//! let store = DatasetStore::new(&conn, "pf_").unwrap();
//!
//! for dataset in store.list_datasets().unwrap() {
//!     let trees = store.trees_for_dataset(&dataset.uuid).unwrap();
//!     println!("{}: {} trees", dataset.name, trees.len());
//! }
//! ```

use phylofeat_core::{Dataset, DatasetRecords, ParsimonyTree, TreeRecord, validate_records};
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::convert;
use crate::error::{Result, SqliteError};
use crate::schema::validate_prefix;

/// Row counts written by one [`DatasetStore::insert_aggregate`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub trees_inserted: usize,
    pub parsimony_trees_inserted: usize,
}

/// Store interface for dataset, tree, and parsimony-tree records.
///
/// Wraps a connection and table prefix. Tables must already exist; see
/// [`Migration::up`](crate::Migration::up).
pub struct DatasetStore<'a> {
    conn: &'a Connection,
    prefix: String,
}

impl<'a> DatasetStore<'a> {
    /// Creates a store for the given connection and table prefix.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPrefix`] if the prefix is invalid.
    pub fn new(conn: &'a Connection, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn, prefix })
    }

    /// Stores one aggregated dataset with all its tree records.
    ///
    /// The records are validated first; nothing is written if validation
    /// fails or any insert fails.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidRecords`] for inconsistent records and
    /// [`SqliteError::DatasetExists`] if a dataset with the same name is
    /// already stored.
    pub fn insert_aggregate(&self, records: &DatasetRecords) -> Result<InsertReport> {
        let problems = validate_records(records);
        if !problems.is_empty() {
            return Err(SqliteError::InvalidRecords(problems));
        }

        let tx = self.conn.unchecked_transaction()?;
        if self.name_exists(&tx, &records.dataset.name)? {
            return Err(SqliteError::DatasetExists(records.dataset.name.clone()));
        }
        let report = self.write_records(&tx, records)?;
        tx.commit()?;

        info!(
            dataset = %records.dataset.name,
            trees = report.trees_inserted,
            parsimony_trees = report.parsimony_trees_inserted,
            "stored dataset"
        );
        Ok(report)
    }

    /// Replaces the stored dataset with the same name, or inserts it.
    ///
    /// The delete and the insert share one transaction.
    pub fn replace_aggregate(&self, records: &DatasetRecords) -> Result<InsertReport> {
        let problems = validate_records(records);
        if !problems.is_empty() {
            return Err(SqliteError::InvalidRecords(problems));
        }

        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute(
            &format!("DELETE FROM {}datasets WHERE name = ?1", self.prefix),
            params![records.dataset.name],
        )?;
        let report = self.write_records(&tx, records)?;
        tx.commit()?;

        info!(
            dataset = %records.dataset.name,
            replaced = removed > 0,
            trees = report.trees_inserted,
            "stored dataset"
        );
        Ok(report)
    }

    fn write_records(&self, conn: &Connection, records: &DatasetRecords) -> Result<InsertReport> {
        convert::insert_dataset(conn, &self.prefix, &records.dataset)?;
        let trees_inserted = convert::insert_trees(conn, &self.prefix, &records.trees)?;
        let parsimony_trees_inserted =
            convert::insert_parsimony_trees(conn, &self.prefix, &records.parsimony_trees)?;
        Ok(InsertReport {
            trees_inserted,
            parsimony_trees_inserted,
        })
    }

    fn name_exists(&self, conn: &Connection, name: &str) -> Result<bool> {
        let exists = conn
            .prepare(&format!(
                "SELECT COUNT(*) FROM {}datasets WHERE name = ?1",
                self.prefix
            ))?
            .query_row(params![name], |row| Ok(row.get::<_, i64>(0)? > 0))?;
        Ok(exists)
    }

    /// Loads one dataset by UUID.
    pub fn get_dataset(&self, uuid: &str) -> Result<Option<Dataset>> {
        let mut datasets = convert::load_datasets(self.conn, &self.prefix, Some(("uuid", uuid)))?;
        Ok(datasets.pop())
    }

    /// Loads one dataset by name.
    pub fn find_dataset_by_name(&self, name: &str) -> Result<Option<Dataset>> {
        let mut datasets = convert::load_datasets(self.conn, &self.prefix, Some(("name", name)))?;
        Ok(datasets.pop())
    }

    /// Loads all datasets ordered by name.
    pub fn list_datasets(&self) -> Result<Vec<Dataset>> {
        convert::load_datasets(self.conn, &self.prefix, None)
    }

    pub fn trees_for_dataset(&self, dataset_uuid: &str) -> Result<Vec<TreeRecord>> {
        convert::load_trees(self.conn, &self.prefix, dataset_uuid)
    }

    pub fn parsimony_trees_for_dataset(&self, dataset_uuid: &str) -> Result<Vec<ParsimonyTree>> {
        convert::load_parsimony_trees(self.conn, &self.prefix, dataset_uuid)
    }

    /// Loads a dataset by name together with all of its tree records.
    pub fn load_records(&self, name: &str) -> Result<Option<DatasetRecords>> {
        let Some(dataset) = self.find_dataset_by_name(name)? else {
            return Ok(None);
        };
        debug!(dataset = %name, uuid = %dataset.uuid, "loading tree records");
        let trees = self.trees_for_dataset(&dataset.uuid)?;
        let parsimony_trees = self.parsimony_trees_for_dataset(&dataset.uuid)?;
        Ok(Some(DatasetRecords {
            dataset,
            trees,
            parsimony_trees,
        }))
    }

    /// Deletes a dataset by name; its tree rows are removed by cascade.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::DatasetNotFound`] if no dataset has that name.
    pub fn delete_dataset(&self, name: &str) -> Result<()> {
        let rows = self.conn.execute(
            &format!("DELETE FROM {}datasets WHERE name = ?1", self.prefix),
            params![name],
        )?;

        if rows == 0 {
            return Err(SqliteError::DatasetNotFound(name.to_string()));
        }

        Ok(())
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_store_validates_prefix() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(DatasetStore::new(&conn, "valid_").is_ok());

        let conn = Connection::open_in_memory().unwrap();
        assert!(DatasetStore::new(&conn, "").is_err());
    }
}
