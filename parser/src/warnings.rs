//! Degraded-but-recoverable conditions found while parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A non-fatal parsing condition. The affected field holds a sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseWarning {
    /// No `Initial log-likelihood:` line; the starting LLH is negative
    /// infinity. Typical for runs resumed from a checkpoint.
    MissingStartingLlh,
    /// No eval tree is plausible; plausible-set LLH statistics are absent.
    NoPlausibleTrees,
    /// The eval set's RF summary reports a different average than the
    /// search set's; the search value was recorded.
    EvalRfDistanceFromSearch,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStartingLlh => {
                write!(f, "starting log-likelihood not reported, recorded as -inf")
            }
            Self::NoPlausibleTrees => write!(f, "no plausible trees, LLH statistics left empty"),
            Self::EvalRfDistanceFromSearch => {
                write!(f, "eval average RF distance differs, search value recorded")
            }
        }
    }
}

/// A warning tied to the input it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedWarning {
    pub source_name: String,
    pub warning: ParseWarning,
}

impl fmt::Display for SourcedWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source_name, self.warning)
    }
}
