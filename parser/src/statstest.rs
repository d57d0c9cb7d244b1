//! Significance-test result matching.
//!
//! Trees sharing one topology share one row of the significance-test table.
//! A [`ClusterMap`] assigns each tree (by newick string) to its topology
//! cluster; a [`SignificanceTable`] holds one [`TopologyTestResult`] per
//! cluster. [`SignificanceTable::result_for_tree`] joins the two.
//!
//! The table is either supplied as JSON keyed by cluster id, or read from the
//! tree-test section of an IQ-TREE report:
//!
//! ```text
//! Tree      logL    deltaL  bp-RELL    p-KH     p-SH    p-WKH    p-WSH       c-ELW       p-AU
//! -------------------------------------------------------------------------------------------
//!   1 -5765.365585       0   0.554 +  0.625 +      1 +  0.625 +  0.877 +     0.5389 +    0.652 +
//!   2 -5790.12      24.754       0 -  0.012 -  0.035 -  0.012 -  0.021 -  1.432e-09 -   0.0031 -
//! ```
//!
//! A `-` marks the tree as significantly excluded by that test. A tree is
//! plausible when no test excludes it.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use phylofeat_core::{ClusterId, SignificanceTests, TestName, TestScore, TopologyTestResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LookupError, ParseError};

static TABLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*Tree\s+logL\s+deltaL((?:\s+[a-z]+-[A-Za-z]+)+)\s*$")
        .expect("static regex must compile")
});

#[derive(Deserialize)]
#[serde(untagged)]
enum RawClusterId {
    Number(u64),
    Text(String),
}

impl From<RawClusterId> for ClusterId {
    fn from(raw: RawClusterId) -> Self {
        match raw {
            RawClusterId::Number(n) => ClusterId::from(n),
            RawClusterId::Text(s) => ClusterId::from(s),
        }
    }
}

/// Mapping from tree (newick string) to topology cluster.
///
/// Keys are compared after trimming surrounding whitespace, so a newick read
/// with its trailing newline still matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterMap {
    clusters: HashMap<String, ClusterId>,
}

impl ClusterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, newick: &str, cluster: ClusterId) {
        self.clusters.insert(newick.trim().to_string(), cluster);
    }

    pub fn cluster_of(&self, newick: &str) -> Option<&ClusterId> {
        self.clusters.get(newick.trim())
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Reads a JSON object mapping newick strings to cluster ids. Ids may be
    /// strings or non-negative integers.
    ///
    /// # Examples
    ///
    /// ```
    /// use phylofeat_parser::statstest::ClusterMap;
    ///
    /// let map = ClusterMap::from_json(r#"{"(a,b,c);": 1, "(a,c,b);": "c2"}"#).unwrap();
    /// assert_eq!(map.cluster_of("(a,b,c);\n").unwrap().as_str(), "1");
    /// assert_eq!(map.cluster_of("(a,c,b);").unwrap().as_str(), "c2");
    /// ```
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let raw: HashMap<String, RawClusterId> = serde_json::from_str(text)?;
        Ok(raw
            .into_iter()
            .map(|(newick, id)| (newick, ClusterId::from(id)))
            .collect())
    }
}

impl FromIterator<(String, ClusterId)> for ClusterMap {
    fn from_iter<I: IntoIterator<Item = (String, ClusterId)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (newick, cluster) in iter {
            map.insert(&newick, cluster);
        }
        map
    }
}

/// Significance-test outcome resolved for one tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSignificance {
    pub cluster_id: ClusterId,
    pub plausible: bool,
    pub tests: SignificanceTests,
}

/// Per-topology significance-test results, keyed by cluster id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignificanceTable {
    entries: BTreeMap<ClusterId, TopologyTestResult>,
}

impl SignificanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cluster: ClusterId, result: TopologyTestResult) {
        self.entries.insert(cluster, result);
    }

    pub fn get(&self, cluster: &ClusterId) -> Option<&TopologyTestResult> {
        self.entries.get(cluster)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClusterId, &TopologyTestResult)> {
        self.entries.iter()
    }

    /// Reads a JSON object keyed by cluster id, each value a
    /// [`TopologyTestResult`].
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Resolves the test results of the tree with the given newick string.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnclusteredTree`] if the tree is not in
    /// `clusters`, and [`LookupError::MissingCluster`] if its cluster has no
    /// table row. Neither case is defaulted.
    ///
    /// # Examples
    ///
    /// ```
    /// use phylofeat_core::{ClusterId, SignificanceTests, TestName, TestScore, TopologyTestResult};
    /// use phylofeat_parser::statstest::{ClusterMap, SignificanceTable};
    ///
    /// let tests = SignificanceTests::from_pairs(
    ///     TestName::ALL.map(|name| (name, TestScore::new(0.92, false))),
    /// )
    /// .unwrap();
    /// let mut table = SignificanceTable::new();
    /// table.insert(
    ///     ClusterId::from("c1"),
    ///     TopologyTestResult { plausible: true, tests, llh: None, delta_llh: None },
    /// );
    /// let mut clusters = ClusterMap::new();
    /// clusters.insert("(a,(b,c));", ClusterId::from("c1"));
    ///
    /// let result = table.result_for_tree("(a,(b,c));", &clusters).unwrap();
    /// assert!(result.plausible);
    /// assert_eq!(result.tests, tests);
    /// ```
    pub fn result_for_tree(
        &self,
        newick: &str,
        clusters: &ClusterMap,
    ) -> Result<TreeSignificance, LookupError> {
        let cluster_id = clusters
            .cluster_of(newick)
            .ok_or_else(|| LookupError::UnclusteredTree {
                newick: newick.trim().to_string(),
            })?;
        let result = self
            .get(cluster_id)
            .ok_or_else(|| LookupError::MissingCluster(cluster_id.clone()))?;

        Ok(TreeSignificance {
            cluster_id: cluster_id.clone(),
            plausible: result.plausible,
            tests: result.tests,
        })
    }
}

fn parse_sign(token: &str) -> Option<bool> {
    match token {
        "-" => Some(true),
        "+" => Some(false),
        _ => None,
    }
}

fn parse_table_row(line: &str, columns: &[TestName]) -> Result<(ClusterId, TopologyTestResult), ParseError> {
    let malformed = || ParseError::MalformedTable(format!("unexpected row '{}'", line.trim()));
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 3 + 2 * columns.len() {
        return Err(malformed());
    }

    let cluster = ClusterId::from(tokens[0]);
    let llh: f64 = tokens[1].parse().map_err(|_| malformed())?;
    let delta_llh: f64 = tokens[2].parse().map_err(|_| malformed())?;

    let mut pairs = Vec::with_capacity(columns.len());
    for (name, chunk) in columns.iter().zip(tokens[3..].chunks(2)) {
        let score: f64 = chunk[0].parse().map_err(|_| malformed())?;
        let significant = parse_sign(chunk[1]).ok_or_else(malformed)?;
        pairs.push((*name, TestScore::new(score, significant)));
    }
    let tests = SignificanceTests::from_pairs(pairs)
        .map_err(|e| ParseError::MalformedTable(e.to_string()))?;

    Ok((
        cluster,
        TopologyTestResult {
            plausible: !tests.any_significant(),
            tests,
            llh: Some(llh),
            delta_llh: Some(delta_llh),
        },
    ))
}

/// Parses the tree-test table of an IQ-TREE report.
///
/// Rows are keyed by the tree index in the first column.
///
/// # Errors
///
/// Returns [`ParseError::MissingMarker`] if there is no table header, and
/// [`ParseError::MalformedTable`] for an unknown test column, a missing test,
/// or a row that does not match the header.
pub fn parse_iqtree_test_table(text: &str) -> Result<SignificanceTable, ParseError> {
    let mut lines = text.lines();
    let columns: Vec<TestName> = loop {
        let Some(line) = lines.next() else {
            return Err(ParseError::missing("Tree logL deltaL"));
        };
        if let Some(caps) = TABLE_HEADER.captures(line) {
            break caps[1]
                .split_whitespace()
                .map(|name| {
                    name.parse::<TestName>()
                        .map_err(|e| ParseError::MalformedTable(e.to_string()))
                })
                .collect::<Result<_, _>>()?;
        }
    };

    let mut table = SignificanceTable::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.chars().all(|c| c == '-') && !trimmed.is_empty() {
            continue;
        }
        if trimmed.is_empty() {
            if table.is_empty() {
                continue;
            }
            break;
        }
        let (cluster, result) = parse_table_row(line, &columns)?;
        table.insert(cluster, result);
    }

    if table.is_empty() {
        return Err(ParseError::MalformedTable("table has no rows".into()));
    }
    Ok(table)
}
