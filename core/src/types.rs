//! Record type definitions for tree-search difficulty features.
//!
//! This module defines the data model produced by log aggregation: one
//! [`Dataset`] per alignment, one [`TreeRecord`] per search/eval pair, and one
//! [`ParsimonyTree`] per parsimony-only inference. The types are designed for
//! serialization with [`serde`] and round-trip through JSON and SQLite.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Serde helper for log-likelihoods that may be unknown.
///
/// An unknown value is held as negative infinity and written as `null`;
/// `null` reads back as negative infinity. Use with
/// `#[serde(with = "phylofeat_core::unknown_llh")]`.
pub mod unknown_llh {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

/// Starting-tree strategy of one tree search.
///
/// # Examples
///
/// ```
/// use phylofeat_core::StartingType;
///
/// assert_eq!(StartingType::Parsimony.as_str(), "parsimony");
/// assert_eq!("random".parse::<StartingType>().unwrap(), StartingType::Random);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartingType {
    /// Search started from a parsimony tree.
    Parsimony,
    /// Search started from a random topology.
    Random,
}

impl StartingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsimony => "parsimony",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for StartingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StartingType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parsimony" => Ok(Self::Parsimony),
            "random" => Ok(Self::Random),
            other => Err(ValidationError::UnknownStartingType(other.to_string())),
        }
    }
}

/// Identifier of a topology cluster (a group of trees sharing one topology).
///
/// Cluster ids are opaque labels. Numeric ids from tree-test tables are kept
/// in their decimal string form.
///
/// # Examples
///
/// ```
/// use phylofeat_core::ClusterId;
///
/// assert_eq!(ClusterId::from(3u64).as_str(), "3");
/// assert_eq!(ClusterId::from("c1").to_string(), "c1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ClusterId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ClusterId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Name of one topology significance test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TestName {
    #[serde(rename = "bp-RELL")]
    BpRell,
    #[serde(rename = "p-KH")]
    PKh,
    #[serde(rename = "p-SH")]
    PSh,
    #[serde(rename = "p-WKH")]
    PWkh,
    #[serde(rename = "p-WSH")]
    PWsh,
    #[serde(rename = "c-ELW")]
    CElw,
    #[serde(rename = "p-AU")]
    PAu,
}

impl TestName {
    /// All tests, in the column order tree-test tables report them.
    pub const ALL: [TestName; 7] = [
        TestName::BpRell,
        TestName::PKh,
        TestName::PSh,
        TestName::PWkh,
        TestName::PWsh,
        TestName::CElw,
        TestName::PAu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BpRell => "bp-RELL",
            Self::PKh => "p-KH",
            Self::PSh => "p-SH",
            Self::PWkh => "p-WKH",
            Self::PWsh => "p-WSH",
            Self::CElw => "c-ELW",
            Self::PAu => "p-AU",
        }
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|test| test.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownTestName(s.to_string()))
    }
}

/// Score and significance flag of one test.
///
/// `significant == true` means the tree is significantly excluded by the test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestScore {
    pub score: f64,
    pub significant: bool,
}

impl TestScore {
    pub fn new(score: f64, significant: bool) -> Self {
        Self { score, significant }
    }
}

/// The seven significance test outcomes for one topology.
///
/// # Examples
///
/// ```
/// use phylofeat_core::{SignificanceTests, TestName, TestScore};
///
/// let tests = SignificanceTests::from_pairs(
///     TestName::ALL.map(|name| (name, TestScore::new(0.5, false))),
/// )
/// .unwrap();
/// assert!(!tests.any_significant());
/// assert_eq!(tests.get(TestName::PAu).score, 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificanceTests {
    #[serde(rename = "bp-RELL")]
    pub bp_rell: TestScore,
    #[serde(rename = "p-KH")]
    pub p_kh: TestScore,
    #[serde(rename = "p-SH")]
    pub p_sh: TestScore,
    #[serde(rename = "p-WKH")]
    pub p_wkh: TestScore,
    #[serde(rename = "p-WSH")]
    pub p_wsh: TestScore,
    #[serde(rename = "c-ELW")]
    pub c_elw: TestScore,
    #[serde(rename = "p-AU")]
    pub p_au: TestScore,
}

impl SignificanceTests {
    /// Builds the record from `(name, score)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingTest`] for the first test that has
    /// no pair. Later duplicates overwrite earlier ones.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (TestName, TestScore)>,
    ) -> Result<Self, ValidationError> {
        let mut slots: [Option<TestScore>; 7] = [None; 7];
        for (name, score) in pairs {
            slots[name as usize] = Some(score);
        }
        let take = |name: TestName| slots[name as usize].ok_or(ValidationError::MissingTest(name));
        Ok(Self {
            bp_rell: take(TestName::BpRell)?,
            p_kh: take(TestName::PKh)?,
            p_sh: take(TestName::PSh)?,
            p_wkh: take(TestName::PWkh)?,
            p_wsh: take(TestName::PWsh)?,
            c_elw: take(TestName::CElw)?,
            p_au: take(TestName::PAu)?,
        })
    }

    pub fn get(&self, name: TestName) -> &TestScore {
        match name {
            TestName::BpRell => &self.bp_rell,
            TestName::PKh => &self.p_kh,
            TestName::PSh => &self.p_sh,
            TestName::PWkh => &self.p_wkh,
            TestName::PWsh => &self.p_wsh,
            TestName::CElw => &self.c_elw,
            TestName::PAu => &self.p_au,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TestName, &TestScore)> + '_ {
        TestName::ALL.into_iter().map(|name| (name, self.get(name)))
    }

    /// Returns `true` if at least one test excludes the topology.
    pub fn any_significant(&self) -> bool {
        self.iter().any(|(_, score)| score.significant)
    }
}

/// Significance-test verdict for one topology cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyTestResult {
    /// Overall verdict: the topology is in the plausible set.
    pub plausible: bool,
    pub tests: SignificanceTests,
    /// Log-likelihood reported by the test table, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llh: Option<f64>,
    /// Log-likelihood difference to the best tree, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_llh: Option<f64>,
}

/// Number of unique topologies and mean relative RF distance of a tree set.
///
/// `avg_rel_rfdist` is normalized by the tool into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologySummary {
    pub num_topologies: u64,
    pub avg_rel_rfdist: f64,
}

/// Model parameter descriptors, kept as the opaque strings the tool printed.
///
/// `None` means the tool did not report the field for this model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub rate_heterogeneity: Option<String>,
    pub base_frequencies: Option<String>,
    pub substitution_rates: Option<String>,
}

/// Number of SPR rounds per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprRounds {
    pub slow: u32,
    pub fast: u32,
}

/// Summary of the branch lengths of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchLengthStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub total: f64,
}

/// One completed tree inference.
///
/// A starting log-likelihood of negative infinity means the value is unknown
/// (the run was resumed from a checkpoint and never re-reported it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSearchRun {
    pub starting_newick: String,
    pub final_newick: String,
    #[serde(with = "unknown_llh")]
    pub starting_llh: f64,
    pub final_llh: f64,
    pub elapsed_time: f64,
    pub model: ModelParameters,
    pub spr_rounds: SprRounds,
}

impl TreeSearchRun {
    pub fn starting_llh_known(&self) -> bool {
        self.starting_llh.is_finite()
    }

    /// Final minus starting log-likelihood, `None` if the start is unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// use phylofeat_core::{ModelParameters, SprRounds, TreeSearchRun};
    ///
    /// let mut run = TreeSearchRun {
    ///     starting_newick: "(a,b,c);".into(),
    ///     final_newick: "(a,b,c);".into(),
    ///     starting_llh: -120.0,
    ///     final_llh: -100.0,
    ///     elapsed_time: 1.5,
    ///     model: ModelParameters::default(),
    ///     spr_rounds: SprRounds::default(),
    /// };
    /// assert_eq!(run.llh_difference(), Some(20.0));
    ///
    /// run.starting_llh = f64::NEG_INFINITY;
    /// assert_eq!(run.llh_difference(), None);
    /// ```
    pub fn llh_difference(&self) -> Option<f64> {
        self.starting_llh_known()
            .then(|| self.final_llh - self.starting_llh)
    }
}

/// Features of the single representative inference of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleInference {
    pub run: TreeSearchRun,
    pub rfdistance_starting_final: f64,
    pub llh_difference_starting_final: Option<f64>,
    pub branch_lengths: BranchLengthStats,
}

/// Alignment features computed outside this workspace and copied verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsaFeatures {
    pub taxa: u64,
    pub sites: u64,
    pub patterns: u64,
    pub gaps: f64,
    pub invariant: f64,
    pub entropy: f64,
    #[serde(default)]
    pub column_entropies: Vec<f64>,
    pub bollback: f64,
    #[serde(default)]
    pub treelikeness: Option<f64>,
}

/// Log-likelihood statistics over one tree set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetStatistics {
    pub topology: TopologySummary,
    pub mean_llh: f64,
    pub std_llh: f64,
}

/// Statistics over the plausible trees of a dataset.
///
/// Mean and standard deviation are `None` when no tree is plausible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlausibleStatistics {
    pub topology: TopologySummary,
    pub mean_llh: Option<f64>,
    pub std_llh: Option<f64>,
    pub num_trees: u64,
    pub proportion: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsimonyStatistics {
    pub topology: TopologySummary,
    pub mean_score: f64,
    pub std_score: f64,
}

/// Dataset-level feature record (aggregate root).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub uuid: String,
    /// Human-readable dataset name (usually the alignment file stem).
    pub name: String,
    pub data_type: Option<String>,
    /// RFC 3339 timestamp of the aggregation.
    pub created_at: String,
    /// Parsimony-started plus random-started searches.
    pub num_searches: u64,
    pub search: SetStatistics,
    pub eval: SetStatistics,
    pub plausible: PlausibleStatistics,
    pub single_inference: SingleInference,
    pub parsimony: ParsimonyStatistics,
    pub msa: MsaFeatures,
}

/// Tree-level record: one search tree and its re-evaluated counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    pub uuid: String,
    pub dataset_uuid: String,
    pub starting_type: StartingType,
    pub newick_search: String,
    pub llh_search: f64,
    pub compute_time_search: f64,
    pub newick_eval: String,
    pub llh_eval: f64,
    pub compute_time_eval: f64,
    pub plausible: bool,
    pub cluster_id: ClusterId,
    pub tests: SignificanceTests,
}

/// One parsimony-only inferred tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsimonyTree {
    pub uuid: String,
    pub dataset_uuid: String,
    pub newick: String,
    pub score: u64,
    pub compute_time: f64,
}

/// Everything persisted for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecords {
    pub dataset: Dataset,
    pub trees: Vec<TreeRecord>,
    pub parsimony_trees: Vec<ParsimonyTree>,
}
