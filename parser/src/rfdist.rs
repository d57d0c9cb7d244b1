//! Topology-distance summary parser.
//!
//! Reads the RF-distance log written for a tree set and returns its number of
//! unique topologies and average relative RF distance.

use phylofeat_core::TopologySummary;

use crate::error::{ParseError, Result};
use crate::extract::{Extraction, LineRule, first_match};

pub const NUM_TOPOLOGIES: &str = "Number of unique topologies in this tree set:";
pub const AVG_REL_RFDIST: &str = "Average relative RF distance in this tree set:";

const NUM_TOPOLOGIES_RULE: LineRule<'static> = LineRule::new(NUM_TOPOLOGIES, Extraction::LastToken);
const AVG_REL_RFDIST_RULE: LineRule<'static> = LineRule::new(AVG_REL_RFDIST, Extraction::LastToken);

/// Parses an RF-distance summary log.
///
/// Both fields are required. The relative distance is already normalized by
/// the tool and is only range-checked here.
///
/// # Errors
///
/// Returns [`ParseError::MissingMarker`] if either line is absent,
/// [`ParseError::InvalidValue`] for a malformed token, and
/// [`ParseError::OutOfRange`] for a relative distance outside `[0, 1]`.
///
/// # Examples
///
/// ```
/// use phylofeat_parser::rfdist::get_rfdistance_results;
///
/// let log = "\
/// Number of unique topologies in this tree set: 3
/// Average relative RF distance in this tree set: 0.15
/// ";
/// let summary = get_rfdistance_results(log).unwrap();
/// assert_eq!(summary.num_topologies, 3);
/// assert_eq!(summary.avg_rel_rfdist, 0.15);
/// ```
pub fn get_rfdistance_results(text: &str) -> Result<TopologySummary> {
    let num_topologies: u64 = first_match(text, &[NUM_TOPOLOGIES_RULE])
        .unwrap_or_else(|| Err(ParseError::missing(NUM_TOPOLOGIES)))?;
    let avg_rel_rfdist: f64 = first_match(text, &[AVG_REL_RFDIST_RULE])
        .unwrap_or_else(|| Err(ParseError::missing(AVG_REL_RFDIST)))?;

    if !(0.0..=1.0).contains(&avg_rel_rfdist) {
        return Err(ParseError::OutOfRange {
            marker: AVG_REL_RFDIST.to_string(),
            value: avg_rel_rfdist,
            min: 0.0,
            max: 1.0,
        });
    }

    Ok(TopologySummary {
        num_topologies,
        avg_rel_rfdist,
    })
}
