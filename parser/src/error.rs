//! Error types for log parsing, topology lookup, tool invocation, and
//! aggregation.
//!
//! Parsers work on text and report [`ParseError`] without knowing where the
//! text came from. The aggregator attaches the offending source name through
//! [`SourceContext`], so a failure surfaces as e.g.
//! `pars_search_0.log: no line contains 'Optimal log-likelihood:'`.

use phylofeat_core::{ClusterId, StartingType, ValidationError};
use thiserror::Error;

/// Failure to extract a required field from log or tree text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// No line contains the marker of a required field.
    #[error("no line contains '{marker}'")]
    MissingMarker { marker: String },

    /// The token next to a marker cannot be parsed as the declared type.
    #[error("invalid value '{token}' after '{marker}'")]
    InvalidValue { marker: String, token: String },

    /// The value was parsed but lies outside its domain.
    #[error("value {value} after '{marker}' is outside [{min}, {max}]")]
    OutOfRange {
        marker: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A tree-list file contains no tree.
    #[error("tree file contains no newick string")]
    EmptyTreeFile,

    /// A newick string has no `:length` annotations.
    #[error("tree has no branch lengths")]
    MissingBranchLengths,

    #[error("malformed newick: {0}")]
    MalformedNewick(String),

    /// The significance-test table is present but cannot be read.
    #[error("malformed significance-test table: {0}")]
    MalformedTable(String),
}

impl ParseError {
    pub(crate) fn missing(marker: &str) -> Self {
        Self::MissingMarker {
            marker: marker.to_string(),
        }
    }

    pub(crate) fn invalid(marker: &str, token: &str) -> Self {
        Self::InvalidValue {
            marker: marker.to_string(),
            token: token.to_string(),
        }
    }
}

/// Failure to resolve the significance-test results of a tree.
///
/// Either case means the clustering stage and the test-evaluation stage
/// disagree about the set of topologies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The tree's newick string is not in the cluster mapping.
    #[error("tree is not in the topology-cluster mapping: {newick}")]
    UnclusteredTree { newick: String },

    /// The tree's cluster has no row in the test table.
    #[error("cluster {0} has no significance-test entry")]
    MissingCluster(ClusterId),
}

/// Failure of an external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The executable could not be started.
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Workspace file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tool exited unsuccessfully.
    #[error("running '{command}' failed: {details}")]
    Failed { command: String, details: String },

    /// The tool did not exit within the configured timeout.
    #[error("'{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    /// The tool ran but its log lacks the expected summary.
    #[error("tool log is incomplete: {0}")]
    Log(#[from] ParseError),
}

/// Fatal failure of one dataset aggregation.
///
/// No partial dataset is produced when this is returned.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("{source_name}: {source}")]
    Parse {
        source_name: String,
        #[source]
        source: ParseError,
    },

    #[error("{source_name}: {source}")]
    Lookup {
        source_name: String,
        #[source]
        source: LookupError,
    },

    /// Counts derived from independently parsed files disagree.
    #[error("{source_name}: found {found} {field}, expected {expected}")]
    Inconsistent {
        source_name: String,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// One starting strategy has no searches.
    #[error("dataset has no {0}-started searches")]
    NoSearches(StartingType),

    #[error("RF distance between starting and final tree: {0}")]
    Tool(#[from] ToolError),

    #[error("aggregated records are inconsistent: {0:?}")]
    Invalid(Vec<ValidationError>),
}

/// Attaches a source name to parser and lookup errors.
pub trait SourceContext<T> {
    fn in_source(self, source_name: &str) -> std::result::Result<T, AggregateError>;
}

impl<T> SourceContext<T> for std::result::Result<T, ParseError> {
    fn in_source(self, source_name: &str) -> std::result::Result<T, AggregateError> {
        self.map_err(|source| AggregateError::Parse {
            source_name: source_name.to_string(),
            source,
        })
    }
}

impl<T> SourceContext<T> for std::result::Result<T, LookupError> {
    fn in_source(self, source_name: &str) -> std::result::Result<T, AggregateError> {
        self.map_err(|source| AggregateError::Lookup {
            source_name: source_name.to_string(),
            source,
        })
    }
}

/// Convenience alias for results with [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;
