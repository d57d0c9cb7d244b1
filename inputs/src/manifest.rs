//! Dataset manifests.
//!
//! A manifest lists, per dataset, every file the aggregation reads: one
//! entry per search/eval run of each starting strategy, the collected logs,
//! the four RF-distance logs, the parsimony outputs, the significance-test
//! report, the topology-cluster mapping, and the alignment features.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! datasets:
//!   - name: dna_example
//!     data_type: DNA
//!     parsimony_started:
//!       - search_tree: pars_search_0.raxml.bestTree
//!         search_log: pars_search_0.raxml.log
//!         eval_tree: pars_eval_0.treefile
//!         eval_log: pars_eval_0.log
//!     random_started:
//!       - search_tree: rand_search_0.raxml.bestTree
//!         search_log: rand_search_0.raxml.log
//!         eval_tree: rand_eval_0.treefile
//!         eval_log: rand_eval_0.log
//!     starting_tree: pars_search_0.raxml.startTree
//!     search_logs_collected: search.log
//!     eval_logs_collected: eval.log
//!     search_rfdistance: search.raxml.log
//!     eval_rfdistance: eval.raxml.log
//!     plausible_rfdistance: plausible.raxml.log
//!     parsimony_rfdistance: parsimony.raxml.log
//!     parsimony_trees: parsimony.trees
//!     parsimony_logs: parsimony.log
//!     significance: statstest.iqtree
//!     clusters: clusters.json
//!     msa_features: msa_features.json
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use std::collections::HashSet;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InputError, Result};

/// Files of one search run and its re-evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPaths {
    pub search_tree: PathBuf,
    pub search_log: PathBuf,
    pub eval_tree: PathBuf,
    pub eval_log: PathBuf,
}

impl RunPaths {
    fn resolve(&mut self, base: &Path) {
        for path in [
            &mut self.search_tree,
            &mut self.search_log,
            &mut self.eval_tree,
            &mut self.eval_log,
        ] {
            resolve_path(path, base);
        }
    }
}

/// Every input path of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub parsimony_started: Vec<RunPaths>,
    pub random_started: Vec<RunPaths>,
    /// Starting tree of the first parsimony-started run.
    pub starting_tree: PathBuf,
    pub search_logs_collected: PathBuf,
    pub eval_logs_collected: PathBuf,
    pub search_rfdistance: PathBuf,
    pub eval_rfdistance: PathBuf,
    pub plausible_rfdistance: PathBuf,
    pub parsimony_rfdistance: PathBuf,
    pub parsimony_trees: PathBuf,
    pub parsimony_logs: PathBuf,
    /// IQ-TREE report (`.iqtree`) or JSON table keyed by cluster id.
    pub significance: PathBuf,
    /// JSON object mapping newick strings to cluster ids.
    pub clusters: PathBuf,
    pub msa_features: PathBuf,
}

impl DatasetEntry {
    fn resolve(&mut self, base: &Path) {
        for run in self
            .parsimony_started
            .iter_mut()
            .chain(self.random_started.iter_mut())
        {
            run.resolve(base);
        }
        for path in [
            &mut self.starting_tree,
            &mut self.search_logs_collected,
            &mut self.eval_logs_collected,
            &mut self.search_rfdistance,
            &mut self.eval_rfdistance,
            &mut self.plausible_rfdistance,
            &mut self.parsimony_rfdistance,
            &mut self.parsimony_trees,
            &mut self.parsimony_logs,
            &mut self.significance,
            &mut self.clusters,
            &mut self.msa_features,
        ] {
            resolve_path(path, base);
        }
    }
}

fn resolve_path(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

/// List of datasets to aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    /// Manifest format version (e.g., `"1.0"`).
    pub version: String,
    pub datasets: Vec<DatasetEntry>,
}

impl DatasetManifest {
    /// Loads a manifest from a YAML file and resolves relative paths against
    /// the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](InputError::IoError) if the file cannot be read,
    /// [`YamlError`](InputError::YamlError) if parsing fails, and
    /// [`InvalidManifest`](InputError::InvalidManifest) for empty or duplicate
    /// dataset names.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut manifest: Self = serde_yaml::from_reader(reader)?;
        manifest.validate()?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for dataset in &mut manifest.datasets {
            dataset.resolve(base);
        }
        Ok(manifest)
    }

    /// Saves the manifest as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks that dataset names are non-empty and unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for dataset in &self.datasets {
            if dataset.name.trim().is_empty() {
                return Err(InputError::InvalidManifest("dataset with empty name".into()));
            }
            if !seen.insert(dataset.name.as_str()) {
                return Err(InputError::InvalidManifest(format!(
                    "duplicate dataset '{}'",
                    dataset.name
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DatasetEntry> {
        self.datasets.iter().find(|d| d.name == name)
    }
}
