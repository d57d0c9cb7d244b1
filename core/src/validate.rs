//! Record validation.
//!
//! Checks the structural invariants of an aggregated dataset before it is
//! handed to a store: plausible-tree proportion bounds, counts that must
//! agree with each other, normalized RF distances, and relations from tree
//! records back to their dataset.
//!
//! # Examples
//!
//! ```
//! use phylofeat_core::{ValidationError, validate_proportion};
//!
//! assert!(validate_proportion(3, 10, 0.3).is_empty());
//! assert!(validate_proportion(11, 10, 1.1)
//!     .iter()
//!     .any(|e| matches!(e, ValidationError::TooManyPlausible { .. })));
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{DatasetRecords, TestName, TopologySummary};

const PROPORTION_TOLERANCE: f64 = 1e-9;

/// Record validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Identifier is empty.
    #[error("{0} uuid cannot be empty")]
    EmptyUuid(&'static str),
    /// Two records share an identifier.
    #[error("duplicate uuid: {0}")]
    DuplicateUuid(String),
    /// A dataset was aggregated from zero searches.
    #[error("dataset has no tree searches")]
    NoSearches,
    /// More plausible trees than searches.
    #[error("{plausible} plausible trees exceed {searches} searches")]
    TooManyPlausible { plausible: u64, searches: u64 },
    /// Proportion outside `[0, 1]` or not equal to count / searches.
    #[error("plausible proportion {proportion} does not match {plausible}/{searches}")]
    ProportionMismatch {
        proportion: f64,
        plausible: u64,
        searches: u64,
    },
    /// Relative RF distance outside `[0, 1]`.
    #[error("relative RF distance of the {set} set is outside [0, 1]: {value}")]
    RfDistanceOutOfRange { set: &'static str, value: f64 },
    /// Tree records disagree with the dataset header.
    #[error("tree count mismatch: {0}")]
    TreeCountMismatch(String),
    /// A tree record points at another dataset.
    #[error("record {uuid} references dataset {found}, expected {expected}")]
    ForeignDataset {
        uuid: String,
        found: String,
        expected: String,
    },
    /// A significance record lacks one of the seven tests.
    #[error("missing significance test: {0}")]
    MissingTest(TestName),
    #[error("unknown significance test: {0}")]
    UnknownTestName(String),
    #[error("unknown starting type: {0}")]
    UnknownStartingType(String),
}

/// Validates the plausible-tree counters of a dataset.
///
/// Requires `searches > 0`, `plausible <= searches`, and
/// `proportion == plausible / searches`.
pub fn validate_proportion(plausible: u64, searches: u64, proportion: f64) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if searches == 0 {
        errors.push(ValidationError::NoSearches);
        return errors;
    }
    if plausible > searches {
        errors.push(ValidationError::TooManyPlausible {
            plausible,
            searches,
        });
    }
    let expected = plausible as f64 / searches as f64;
    if !(0.0..=1.0).contains(&proportion) || (proportion - expected).abs() > PROPORTION_TOLERANCE {
        errors.push(ValidationError::ProportionMismatch {
            proportion,
            plausible,
            searches,
        });
    }

    errors
}

fn validate_topology(set: &'static str, summary: &TopologySummary) -> Option<ValidationError> {
    (!(0.0..=1.0).contains(&summary.avg_rel_rfdist)).then_some(
        ValidationError::RfDistanceOutOfRange {
            set,
            value: summary.avg_rel_rfdist,
        },
    )
}

/// Validates a complete dataset with its tree and parsimony records.
///
/// Returns every problem found; an empty vector means the records are
/// consistent.
pub fn validate_records(records: &DatasetRecords) -> Vec<ValidationError> {
    let dataset = &records.dataset;
    let mut errors = Vec::new();

    if dataset.uuid.trim().is_empty() {
        errors.push(ValidationError::EmptyUuid("dataset"));
    }

    errors.extend(validate_proportion(
        dataset.plausible.num_trees,
        dataset.num_searches,
        dataset.plausible.proportion,
    ));

    errors.extend(
        [
            ("search", &dataset.search.topology),
            ("eval", &dataset.eval.topology),
            ("plausible", &dataset.plausible.topology),
            ("parsimony", &dataset.parsimony.topology),
        ]
        .into_iter()
        .filter_map(|(set, summary)| validate_topology(set, summary)),
    );

    if records.trees.len() as u64 != dataset.num_searches {
        errors.push(ValidationError::TreeCountMismatch(format!(
            "{} tree records for {} searches",
            records.trees.len(),
            dataset.num_searches
        )));
    }
    let plausible = records.trees.iter().filter(|t| t.plausible).count() as u64;
    if plausible != dataset.plausible.num_trees {
        errors.push(ValidationError::TreeCountMismatch(format!(
            "{plausible} plausible tree records, dataset reports {}",
            dataset.plausible.num_trees
        )));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(dataset.uuid.as_str());
    let children = records
        .trees
        .iter()
        .map(|t| (t.uuid.as_str(), t.dataset_uuid.as_str()))
        .chain(
            records
                .parsimony_trees
                .iter()
                .map(|t| (t.uuid.as_str(), t.dataset_uuid.as_str())),
        );
    for (uuid, parent) in children {
        if uuid.trim().is_empty() {
            errors.push(ValidationError::EmptyUuid("tree"));
        } else if !seen.insert(uuid) {
            errors.push(ValidationError::DuplicateUuid(uuid.to_string()));
        }
        if parent != dataset.uuid {
            errors.push(ValidationError::ForeignDataset {
                uuid: uuid.to_string(),
                found: parent.to_string(),
                expected: dataset.uuid.clone(),
            });
        }
    }

    errors
}
