//! SQLite storage backend for tree-search difficulty features.
//!
//! Stores the records produced by one dataset aggregation
//! ([`DatasetRecords`](phylofeat_core::DatasetRecords)) in three prefixed
//! tables, with migration lifecycle management and read-back queries.
//!
//! # Architecture
//!
//! - **`schema`**: SQL generation with customizable table prefixes
//! - **`migration`**: Lifecycle operations (up/down/status)
//! - **`convert`**: Record ↔ SQL row transformations
//! - **`query`**: Transactional inserts and read-back
//!
//! # Quick start
//!
//! ```no_run
//! use phylofeat_sqlite::{DatasetStore, Migration};
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("features.db").unwrap();
//! let mut migration = Migration::new(conn, "pf_").unwrap();
//! migration.up().unwrap();
//!
//! let conn = migration.into_connection();
//! let store = DatasetStore::new(&conn, "pf_").unwrap();
//! if let Some(records) = store.load_records("dna_example").unwrap() {
//!     println!("{} trees", records.trees.len());
//! }
//! ```
//!
//! # Table prefix customization
//!
//! All table and index names are prefixed with a configurable string,
//! allowing multiple isolated record sets within the same SQLite database.
//! Prefixes must contain only alphanumeric characters and underscores.

mod convert;
mod error;
mod migration;
mod query;
mod schema;

pub use error::{Result, SqliteError};
pub use migration::{Migration, MigrationStatus};
pub use query::{DatasetStore, InsertReport};
pub use schema::{generate_drop_sql, generate_schema_sql};
