//! Parsimony inference log parser.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};
use crate::iqtree::get_iqtree_runtimes;

pub const PARSIMONY_SCORE: &str = "Parsimony score";

static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Parsimony score[^:]*:\s*(\d+)\b").expect("static regex must compile")
});

/// Returns one score per `Parsimony score` line, in file order.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] for a score line without an integer
/// after its colon.
///
/// # Examples
///
/// ```
/// use phylofeat_parser::parsimony::get_all_parsimony_scores;
///
/// let log = "[00:00:00] Parsimony score: 1204\n[00:00:01] Parsimony score: 1198\n";
/// assert_eq!(get_all_parsimony_scores(log).unwrap(), vec![1204, 1198]);
/// ```
pub fn get_all_parsimony_scores(text: &str) -> Result<Vec<u64>> {
    text.lines()
        .filter(|line| line.contains(PARSIMONY_SCORE))
        .map(|line| -> Result<u64> {
            let token = SCORE_RE
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
                .ok_or_else(|| ParseError::invalid(PARSIMONY_SCORE, line.trim()))?;
            token
                .parse()
                .map_err(|_| ParseError::invalid(PARSIMONY_SCORE, token))
        })
        .collect()
}

/// Scores and compute times of a parsimony inference log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsimonyLogSummary {
    pub scores: Vec<u64>,
    pub runtimes: Vec<f64>,
}

/// Parses scores and elapsed times of a parsimony log.
///
/// The two lists are parallel to the tree-list file of the same run; the
/// caller checks their lengths against it.
pub fn summarize_parsimony_log(text: &str) -> Result<ParsimonyLogSummary> {
    Ok(ParsimonyLogSummary {
        scores: get_all_parsimony_scores(text)?,
        runtimes: get_iqtree_runtimes(text)?,
    })
}
