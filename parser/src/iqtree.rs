//! Tree-search log parsers.
//!
//! Extracts log-likelihoods, elapsed times, model-parameter descriptors, SPR
//! round counts, and alignment pattern summaries from the plain-text logs of
//! IQ-TREE and RAxML-NG runs. Each field is described by a small table of
//! [`LineRule`]s or regexes, one entry per line shape the tools are known to
//! print, so a new shape is one more table entry.
//!
//! Line shapes handled:
//!
//! | Field | Shapes |
//! |---|---|
//! | final LLH | `Optimal log-likelihood: X` (maximum over repeats) |
//! | starting LLH | `Initial log-likelihood: X` (optional) |
//! | elapsed time | `Elapsed time: N seconds`, `Elapsed time: N seconds (this run) / M seconds (total with restarts)`, `Total wall-clock time used: N sec` |
//! | model | `Rate heterogeneity...: S`, `Base frequencies...: S`, `Substitution rates...: S` |
//! | SPR rounds | `SLOW spr round N`, `FAST spr round N` |
//! | alignment | IQ-TREE `Alignment has ... distinct patterns` / `C constant sites` / `TOTAL x%`; RAxML-NG `Alignment sites / patterns: S / P` / `Gaps: x %` / `Invariant sites: y %` |

use std::sync::LazyLock;

use phylofeat_core::{ModelParameters, SprRounds};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ParseError, Result};
use crate::extract::{Extraction, LineRule, all_matches, first_match, get_all_values, get_single_value};
use crate::warnings::ParseWarning;

pub const OPTIMAL_LLH: &str = "Optimal log-likelihood:";
pub const INITIAL_LLH: &str = "Initial log-likelihood:";

const ELAPSED_TIME: &str = "Elapsed time:";
const WALL_CLOCK_TIME: &str = "Total wall-clock time used:";

/// Both elapsed-time shapes put the per-run value right after the marker, so
/// the composite restart form reports the incremental time, not the total.
const ELAPSED_TIME_RULES: &[LineRule<'static>] = &[
    LineRule::new(ELAPSED_TIME, Extraction::TokenAfterMarker),
    LineRule::new(WALL_CLOCK_TIME, Extraction::TokenAfterMarker),
];

const RATE_HETEROGENEITY: LineRule<'static> =
    LineRule::new("Rate heterogeneity", Extraction::RestAfterColon);
const BASE_FREQUENCIES: LineRule<'static> =
    LineRule::new("Base frequencies", Extraction::RestAfterColon);
const SUBSTITUTION_RATES: LineRule<'static> =
    LineRule::new("Substitution rates", Extraction::RestAfterColon);

static PATTERNS: LazyLock<LogPatterns> = LazyLock::new(LogPatterns::new);

struct LogPatterns {
    spr_round: Regex,

    // IQ-TREE alignment summary
    iqtree_alignment: Regex,
    iqtree_constant_sites: Regex,
    iqtree_gap_total: Regex,

    // RAxML-NG alignment summary
    raxml_sites_patterns: Regex,
    raxml_gaps: Regex,
    raxml_invariant: Regex,
}

impl LogPatterns {
    fn new() -> Self {
        Self {
            spr_round: Regex::new(r"\b(SLOW|FAST) spr round (\d+)")
                .expect("static regex must compile"),
            iqtree_alignment: Regex::new(
                r"Alignment has \d+ sequences with (\d+) columns,\s*(\d+) distinct patterns",
            )
            .expect("static regex must compile"),
            iqtree_constant_sites: Regex::new(
                r"(?:(\d+) constant sites|Number of constant sites:\s*(\d+))",
            )
            .expect("static regex must compile"),
            iqtree_gap_total: Regex::new(r"\bTOTAL\s+(\d+(?:\.\d+)?)%")
                .expect("static regex must compile"),
            raxml_sites_patterns: Regex::new(r"Alignment sites / patterns:\s*(\d+)\s*/\s*(\d+)")
                .expect("static regex must compile"),
            raxml_gaps: Regex::new(r"^\s*Gaps:\s*(\d+(?:\.\d+)?)\s*%")
                .expect("static regex must compile"),
            raxml_invariant: Regex::new(r"^\s*Invariant sites:\s*(\d+(?:\.\d+)?)\s*%")
                .expect("static regex must compile"),
        }
    }
}

/// Returns every `Optimal log-likelihood:` value in file order.
///
/// An empty result is not an error here; collected logs that must contain
/// values are checked by the caller.
pub fn get_all_iqtree_llhs(text: &str) -> Result<Vec<f64>> {
    get_all_values(text, OPTIMAL_LLH)
}

/// Returns the final log-likelihood: the maximum over all
/// `Optimal log-likelihood:` lines, since later optimization rounds report
/// improved values.
///
/// # Examples
///
/// ```
/// use phylofeat_parser::iqtree::get_best_iqtree_llh;
///
/// let log = "Optimal log-likelihood: -1200.5\nOptimal log-likelihood: -1199.75\n";
/// assert_eq!(get_best_iqtree_llh(log).unwrap(), -1199.75);
/// ```
pub fn get_best_iqtree_llh(text: &str) -> Result<f64> {
    get_all_iqtree_llhs(text)?
        .into_iter()
        .reduce(f64::max)
        .ok_or_else(|| ParseError::missing(OPTIMAL_LLH))
}

/// Returns the starting log-likelihood.
///
/// A log of a run resumed from a checkpoint does not repeat the
/// `Initial log-likelihood:` line. In that case the value is negative
/// infinity ("unknown") and exactly one [`ParseWarning::MissingStartingLlh`]
/// is pushed to `warnings`.
///
/// # Errors
///
/// Only a present but malformed value is an error.
pub fn get_iqtree_starting_llh(text: &str, warnings: &mut Vec<ParseWarning>) -> Result<f64> {
    match get_single_value(text, INITIAL_LLH) {
        Err(ParseError::MissingMarker { .. }) => {
            debug!("log has no starting log-likelihood, using -inf");
            warnings.push(ParseWarning::MissingStartingLlh);
            Ok(f64::NEG_INFINITY)
        }
        other => other,
    }
}

/// Returns every elapsed-time value in file order.
///
/// # Errors
///
/// Returns [`ParseError::MissingMarker`] when no elapsed-time line of any
/// supported shape is present, and [`ParseError::InvalidValue`] for the
/// first line whose value is not a number. Such lines are never skipped, so
/// the count stays comparable with the tree list it is checked against.
pub fn get_iqtree_runtimes(text: &str) -> Result<Vec<f64>> {
    let times: Vec<f64> = all_matches(text, ELAPSED_TIME_RULES)?;
    if times.is_empty() {
        return Err(ParseError::missing(ELAPSED_TIME));
    }
    Ok(times)
}

/// Returns the elapsed time of the run: the first elapsed-time line in file
/// order.
///
/// # Examples
///
/// ```
/// use phylofeat_parser::iqtree::get_iqtree_elapsed_time;
///
/// let resumed = "Elapsed time: 5562.869 seconds (this run) / 91413.668 seconds (total with restarts)";
/// assert_eq!(get_iqtree_elapsed_time(resumed).unwrap(), 5562.869);
/// ```
pub fn get_iqtree_elapsed_time(text: &str) -> Result<f64> {
    first_match(text, ELAPSED_TIME_RULES).unwrap_or_else(|| Err(ParseError::missing(ELAPSED_TIME)))
}

fn last_prefixed(text: &str, rule: &LineRule<'_>) -> Option<String> {
    text.lines()
        .map(str::trim_start)
        .filter(|line| line.starts_with(rule.marker))
        .filter_map(|line| rule.token(line))
        .last()
        .map(str::to_string)
}

/// Returns the model-parameter descriptors as the raw strings printed.
///
/// Only lines starting with the marker count. When a marker recurs (one
/// block per partition or per optimization round) the last one wins. A field
/// the model does not report stays `None`.
pub fn get_model_parameter_estimates(text: &str) -> ModelParameters {
    ModelParameters {
        rate_heterogeneity: last_prefixed(text, &RATE_HETEROGENEITY),
        base_frequencies: last_prefixed(text, &BASE_FREQUENCIES),
        substitution_rates: last_prefixed(text, &SUBSTITUTION_RATES),
    }
}

/// Returns the number of slow and fast SPR rounds.
///
/// Round numbers are cumulative, so the count is the largest number seen.
/// A log without SPR rounds yields zero for both.
pub fn get_num_spr_rounds(text: &str) -> Result<SprRounds> {
    let mut rounds = SprRounds::default();
    for caps in text.lines().filter_map(|line| PATTERNS.spr_round.captures(line)) {
        let n: u32 = capture(&caps, 2, "spr round")?;
        match &caps[1] {
            "SLOW" => rounds.slow = rounds.slow.max(n),
            _ => rounds.fast = rounds.fast.max(n),
        }
    }
    Ok(rounds)
}

/// Alignment summary as reported by the tree-search tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSummary {
    pub patterns: u64,
    /// Proportion of gap/ambiguity characters.
    pub gaps: f64,
    /// Proportion of invariant (constant) sites.
    pub invariant: f64,
}

fn capture<T: std::str::FromStr>(caps: &Captures<'_>, group: usize, marker: &str) -> Result<T> {
    let token = caps.get(group).map(|m| m.as_str()).unwrap_or_default();
    token
        .parse()
        .map_err(|_| ParseError::invalid(marker, token))
}

/// Returns pattern count, gap proportion, and invariant proportion.
///
/// Both the IQ-TREE and the RAxML-NG alignment summaries are understood;
/// percentages are converted to proportions.
///
/// # Errors
///
/// Returns [`ParseError::MissingMarker`] naming the first field that no
/// supported line shape provided.
pub fn get_patterns_gaps_invariant(text: &str) -> Result<AlignmentSummary> {
    let p = &*PATTERNS;
    let mut sites: Option<u64> = None;
    let mut patterns: Option<u64> = None;
    let mut constant: Option<u64> = None;
    let mut gaps: Option<f64> = None;
    let mut invariant: Option<f64> = None;

    for line in text.lines() {
        if let Some(caps) = p.iqtree_alignment.captures(line) {
            sites = Some(capture(&caps, 1, "columns")?);
            patterns = Some(capture(&caps, 2, "distinct patterns")?);
        } else if let Some(caps) = p.raxml_sites_patterns.captures(line) {
            sites = Some(capture(&caps, 1, "Alignment sites")?);
            patterns = Some(capture(&caps, 2, "patterns")?);
        } else if let Some(caps) = p.iqtree_constant_sites.captures(line) {
            let group = if caps.get(1).is_some() { 1 } else { 2 };
            constant = Some(capture(&caps, group, "constant sites")?);
        } else if let Some(caps) = p.iqtree_gap_total.captures(line) {
            gaps = Some(capture::<f64>(&caps, 1, "TOTAL")? / 100.0);
        } else if let Some(caps) = p.raxml_gaps.captures(line) {
            gaps = Some(capture::<f64>(&caps, 1, "Gaps:")? / 100.0);
        } else if let Some(caps) = p.raxml_invariant.captures(line) {
            invariant = Some(capture::<f64>(&caps, 1, "Invariant sites:")? / 100.0);
        }
    }

    let patterns = patterns.ok_or_else(|| ParseError::missing("distinct patterns"))?;
    let gaps = gaps.ok_or_else(|| ParseError::missing("TOTAL"))?;
    let invariant = match (invariant, constant, sites) {
        (Some(invariant), _, _) => invariant,
        (None, Some(constant), Some(sites)) if sites > 0 => constant as f64 / sites as f64,
        _ => return Err(ParseError::missing("constant sites")),
    };

    Ok(AlignmentSummary {
        patterns,
        gaps,
        invariant,
    })
}

/// Everything extractable from one search or eval log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLogSummary {
    pub final_llh: f64,
    pub all_llhs: Vec<f64>,
    /// Negative infinity when unknown; serialized as `null`.
    #[serde(with = "phylofeat_core::unknown_llh")]
    pub starting_llh: f64,
    pub elapsed_times: Vec<f64>,
    pub model: ModelParameters,
    pub spr_rounds: SprRounds,
    pub warnings: Vec<ParseWarning>,
}

/// Parses all per-run fields of one tree-search log.
pub fn summarize_search_log(text: &str) -> Result<SearchLogSummary> {
    let mut warnings = Vec::new();
    let starting_llh = get_iqtree_starting_llh(text, &mut warnings)?;
    Ok(SearchLogSummary {
        final_llh: get_best_iqtree_llh(text)?,
        all_llhs: get_all_iqtree_llhs(text)?,
        starting_llh,
        elapsed_times: get_iqtree_runtimes(text)?,
        model: get_model_parameter_estimates(text),
        spr_rounds: get_num_spr_rounds(text)?,
        warnings,
    })
}
