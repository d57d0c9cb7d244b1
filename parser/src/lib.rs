//! Log parsing and feature aggregation for phylogenetic tree searches.
//!
//! This crate turns the plain-text output of IQ-TREE and RAxML-NG runs into
//! typed values and combines the runs of one dataset into the records defined
//! in [`phylofeat_core`].
//!
//! # Main entry points
//!
//! - [`extract`]: marker-based line extraction shared by every parser.
//! - [`iqtree`], [`parsimony`], [`rfdist`]: one parser module per log kind.
//! - [`statstest`]: significance-test tables and tree-to-topology matching.
//! - [`aggregate::aggregate_dataset`]: one dataset's sources in, its dataset,
//!   tree, and parsimony-tree records out.
//! - [`runner::ToolRfDistance`]: RF distances through an external tool.
//!
//! # Example
//!
//! ```
//! use phylofeat_parser::iqtree::{get_best_iqtree_llh, get_iqtree_elapsed_time};
//!
//! let log = "\
//! Optimal log-likelihood: -5790.12
//! Optimal log-likelihood: -5765.37
//! Elapsed time: 5562.869 seconds (this run) / 91413.668 seconds (total with restarts)
//! ";
//! assert_eq!(get_best_iqtree_llh(log).unwrap(), -5765.37);
//! assert_eq!(get_iqtree_elapsed_time(log).unwrap(), 5562.869);
//! ```
//!
//! # Failure policy
//!
//! Required fields fail with a typed error; nothing is silently defaulted.
//! The one recoverable case inside a parser, a resumed run without an
//! `Initial log-likelihood:` line, yields negative infinity plus a
//! [`warnings::ParseWarning`].

pub mod aggregate;
pub mod error;
pub mod extract;
pub mod iqtree;
pub mod newick;
pub mod parsimony;
pub mod rfdist;
pub mod runner;
pub mod source;
pub mod stats;
pub mod statstest;
pub mod warnings;

pub use aggregate::{
    Aggregation, DatasetSources, EvalRfDistance, SearchRunSources, aggregate_dataset,
};
pub use error::{AggregateError, LookupError, ParseError, SourceContext, ToolError};
pub use extract::{get_all_values, get_single_value};
pub use runner::{RfDistanceCalculator, ToolRfDistance};
pub use source::SourceText;
pub use statstest::{ClusterMap, SignificanceTable, TreeSignificance, parse_iqtree_test_table};
pub use warnings::{ParseWarning, SourcedWarning};
