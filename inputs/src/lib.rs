//! Configuration, dataset manifests, and input loading.
//!
//! This crate wires files on disk to the in-memory sources the aggregator in
//! [`phylofeat_parser`] consumes.
//!
//! # Quick start
//!
//! ```no_run
//! use phylofeat_inputs::{AggregationConfig, DatasetManifest, load_dataset_sources};
//! use phylofeat_parser::aggregate_dataset;
//!
//! let config = AggregationConfig::load("phylofeat.yml").unwrap();
//! let manifest = DatasetManifest::load("datasets.yml").unwrap();
//! let tool = config.rfdist.to_tool();
//!
//! for entry in &manifest.datasets {
//!     let sources = load_dataset_sources(entry).unwrap();
//!     let aggregation = aggregate_dataset(&sources, &tool).unwrap();
//!     println!("{}: {} trees", entry.name, aggregation.records.trees.len());
//! }
//! ```

mod config;
mod error;
mod loader;
mod manifest;

pub use config::{AggregationConfig, RfDistConfig, StoreConfig};
pub use error::{InputError, Result};
pub use loader::{
    load_cluster_map, load_dataset_sources, load_msa_features, load_significance_table,
    read_source,
};
pub use manifest::{DatasetEntry, DatasetManifest, RunPaths};
