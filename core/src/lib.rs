//! Core record types for tree-search difficulty features.
//!
//! This crate defines the typed records produced by parsing phylogenetic
//! tree-search logs and aggregating them per dataset:
//!
//! - [`Dataset`]: dataset-level features (LLH statistics, topology
//!   summaries, plausible-set statistics, single-inference features, and
//!   alignment features).
//! - [`TreeRecord`]: one search tree with its re-evaluated counterpart and
//!   significance-test outcomes.
//! - [`ParsimonyTree`]: one parsimony-only tree with score and compute time.
//! - [`SignificanceTests`]: the seven named `(score, significant)` pairs.
//!
//! Validation ([`validate_records`], [`validate_proportion`]) catches
//! inconsistent counts, out-of-range proportions and RF distances, and broken
//! relations before records reach a store.
//!
//! # Example
//!
//! ```
//! use phylofeat_core::*;
//!
//! let tests = SignificanceTests::from_pairs(
//!     TestName::ALL.map(|name| (name, TestScore::new(0.9, false))),
//! )
//! .unwrap();
//! let verdict = TopologyTestResult {
//!     plausible: !tests.any_significant(),
//!     tests,
//!     llh: None,
//!     delta_llh: None,
//! };
//! assert!(verdict.plausible);
//! assert!(validate_proportion(1, 2, 0.5).is_empty());
//! ```

mod types;
mod validate;

pub use types::*;
pub use validate::{ValidationError, validate_proportion, validate_records};
