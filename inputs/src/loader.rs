//! Reads every file of one dataset into memory.
//!
//! The aggregator works on text, not paths. [`load_dataset_sources`] turns a
//! manifest [`DatasetEntry`] into [`DatasetSources`], so all I/O failures are
//! reported here, before any parsing starts.

use std::fs;
use std::path::Path;

use phylofeat_core::MsaFeatures;
use phylofeat_parser::{
    ClusterMap, DatasetSources, EvalRfDistance, SearchRunSources, SignificanceTable, SourceText,
    parse_iqtree_test_table,
};
use tracing::debug;

use crate::error::{InputError, Result};
use crate::manifest::{DatasetEntry, RunPaths};

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| InputError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads one file; its path becomes the source name used in errors.
pub fn read_source(path: &Path) -> Result<SourceText> {
    SourceText::read(path).map_err(|source| InputError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

fn from_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|source| InputError::JsonError {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the alignment feature bundle (JSON).
pub fn load_msa_features(path: &Path) -> Result<MsaFeatures> {
    from_json(path)
}

/// Loads the topology-cluster mapping (JSON object, newick to cluster id).
pub fn load_cluster_map(path: &Path) -> Result<ClusterMap> {
    let text = read_text(path)?;
    ClusterMap::from_json(&text).map_err(|source| InputError::JsonError {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the significance-test table.
///
/// Files with a `.json` extension are read as a table keyed by cluster id;
/// anything else is parsed as an IQ-TREE report.
pub fn load_significance_table(path: &Path) -> Result<SignificanceTable> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let text = read_text(path)?;
        return SignificanceTable::from_json(&text).map_err(|source| InputError::JsonError {
            path: path.to_path_buf(),
            source,
        });
    }
    parse_iqtree_test_table(&read_text(path)?).map_err(|source| InputError::Table {
        path: path.to_path_buf(),
        source,
    })
}

fn load_run(paths: &RunPaths) -> Result<SearchRunSources> {
    Ok(SearchRunSources {
        search_tree: read_source(&paths.search_tree)?,
        search_log: read_source(&paths.search_log)?,
        eval_tree: read_source(&paths.eval_tree)?,
        eval_log: read_source(&paths.eval_log)?,
    })
}

/// Reads every input of one dataset.
///
/// The eval RF distance source is left at its default; callers apply
/// [`AggregationConfig::eval_rfdist_from`](crate::AggregationConfig).
///
/// # Errors
///
/// Returns the first [`InputError`] encountered; no partial sources are
/// returned.
pub fn load_dataset_sources(entry: &DatasetEntry) -> Result<DatasetSources> {
    debug!(dataset = %entry.name, "loading dataset inputs");

    let parsimony_started = entry
        .parsimony_started
        .iter()
        .map(load_run)
        .collect::<Result<Vec<_>>>()?;
    let random_started = entry
        .random_started
        .iter()
        .map(load_run)
        .collect::<Result<Vec<_>>>()?;

    Ok(DatasetSources {
        name: entry.name.clone(),
        data_type: entry.data_type.clone(),
        parsimony_started,
        random_started,
        starting_tree: read_source(&entry.starting_tree)?,
        search_logs_collected: read_source(&entry.search_logs_collected)?,
        eval_logs_collected: read_source(&entry.eval_logs_collected)?,
        search_rfdistance: read_source(&entry.search_rfdistance)?,
        eval_rfdistance: read_source(&entry.eval_rfdistance)?,
        plausible_rfdistance: read_source(&entry.plausible_rfdistance)?,
        parsimony_rfdistance: read_source(&entry.parsimony_rfdistance)?,
        parsimony_trees: read_source(&entry.parsimony_trees)?,
        parsimony_logs: read_source(&entry.parsimony_logs)?,
        significance: load_significance_table(&entry.significance)?,
        clusters: load_cluster_map(&entry.clusters)?,
        msa: load_msa_features(&entry.msa_features)?,
        eval_rfdist_from: EvalRfDistance::default(),
    })
}
