//! SQL schema generation with customizable table prefixes.
//!
//! # Table structure
//!
//! - `{prefix}datasets`: one row per aggregated dataset, all dataset-level
//!   features flattened into columns
//! - `{prefix}trees`: one row per search/eval tree pair, with the seven
//!   significance tests as score/flag column pairs
//! - `{prefix}parsimony_trees`: one row per parsimony-only tree
//!
//! Tree rows reference their dataset by UUID with `ON DELETE CASCADE`.
//!
//! # Custom prefix
//!
//! Prefixes must contain only alphanumeric characters and underscores.
//! This enables multiple isolated record sets (e.g., `dna_`, `aa_`) within
//! the same SQLite database.

use crate::error::{Result, SqliteError};

/// Unprefixed table names, parents before children.
pub(crate) const TABLES: [&str; 3] = ["datasets", "trees", "parsimony_trees"];

/// Validates that a table prefix contains only alphanumeric characters and underscores.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    if !prefix.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(SqliteError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Generates the complete SQL schema for all tables with the given prefix.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix contains characters
/// other than alphanumerics and underscores, or if it is empty.
pub fn generate_schema_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
CREATE TABLE IF NOT EXISTS {prefix}datasets (
    uuid TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    data_type TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    num_searches INTEGER NOT NULL,

    avg_rfdist_search REAL NOT NULL,
    num_topos_search INTEGER NOT NULL,
    mean_llh_search REAL NOT NULL,
    std_llh_search REAL NOT NULL,

    avg_rfdist_eval REAL NOT NULL,
    num_topos_eval INTEGER NOT NULL,
    mean_llh_eval REAL NOT NULL,
    std_llh_eval REAL NOT NULL,

    avg_rfdist_plausible REAL NOT NULL,
    num_topos_plausible INTEGER NOT NULL,
    mean_llh_plausible REAL,
    std_llh_plausible REAL,
    num_trees_plausible INTEGER NOT NULL,
    proportion_plausible REAL NOT NULL CHECK (proportion_plausible BETWEEN 0.0 AND 1.0),

    num_slow_spr_rounds INTEGER NOT NULL,
    num_fast_spr_rounds INTEGER NOT NULL,
    llh_starting_tree REAL,
    llh_final_tree REAL NOT NULL,
    compute_time_single REAL NOT NULL,
    rfdistance_starting_final REAL NOT NULL,
    llh_difference_starting_final REAL,
    rate_heterogeneity_final TEXT,
    eq_frequencies_final TEXT,
    substitution_rates_final TEXT,
    average_branch_length_final REAL NOT NULL,
    std_branch_length_final REAL NOT NULL,
    total_branch_length_final REAL NOT NULL,
    minimum_branch_length_final REAL NOT NULL,
    maximum_branch_length_final REAL NOT NULL,
    newick_starting TEXT NOT NULL,
    newick_final TEXT NOT NULL,

    num_taxa INTEGER NOT NULL,
    num_sites INTEGER NOT NULL,
    num_patterns INTEGER NOT NULL,
    proportion_gaps REAL NOT NULL,
    proportion_invariant REAL NOT NULL,
    entropy REAL NOT NULL,
    column_entropies TEXT NOT NULL DEFAULT '[]',
    bollback REAL NOT NULL,
    treelikeness REAL,

    avg_rfdist_parsimony REAL NOT NULL,
    num_topos_parsimony INTEGER NOT NULL,
    mean_parsimony_score REAL NOT NULL,
    std_parsimony_score REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS {prefix}trees (
    uuid TEXT PRIMARY KEY NOT NULL,
    dataset_uuid TEXT NOT NULL,
    position INTEGER NOT NULL,
    starting_type TEXT NOT NULL CHECK (starting_type IN ('parsimony', 'random')),
    newick_search TEXT NOT NULL,
    llh_search REAL NOT NULL,
    compute_time_search REAL NOT NULL,
    newick_eval TEXT NOT NULL,
    llh_eval REAL NOT NULL,
    compute_time_eval REAL NOT NULL,
    plausible INTEGER NOT NULL,
    cluster_id TEXT NOT NULL,
    bp_rell REAL NOT NULL,
    bp_rell_significant INTEGER NOT NULL,
    p_kh REAL NOT NULL,
    p_kh_significant INTEGER NOT NULL,
    p_sh REAL NOT NULL,
    p_sh_significant INTEGER NOT NULL,
    p_wkh REAL NOT NULL,
    p_wkh_significant INTEGER NOT NULL,
    p_wsh REAL NOT NULL,
    p_wsh_significant INTEGER NOT NULL,
    c_elw REAL NOT NULL,
    c_elw_significant INTEGER NOT NULL,
    p_au REAL NOT NULL,
    p_au_significant INTEGER NOT NULL,
    FOREIGN KEY (dataset_uuid) REFERENCES {prefix}datasets(uuid) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS {prefix}parsimony_trees (
    uuid TEXT PRIMARY KEY NOT NULL,
    dataset_uuid TEXT NOT NULL,
    position INTEGER NOT NULL,
    newick TEXT NOT NULL,
    score INTEGER NOT NULL,
    compute_time REAL NOT NULL,
    FOREIGN KEY (dataset_uuid) REFERENCES {prefix}datasets(uuid) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_{prefix}trees_dataset ON {prefix}trees(dataset_uuid);
CREATE INDEX IF NOT EXISTS idx_{prefix}trees_cluster ON {prefix}trees(cluster_id);
CREATE INDEX IF NOT EXISTS idx_{prefix}parsimony_trees_dataset ON {prefix}parsimony_trees(dataset_uuid);
"#,
        prefix = prefix
    );

    Ok(sql)
}

/// Generates SQL to drop all tables in reverse dependency order.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidPrefix`] if the prefix is invalid.
pub fn generate_drop_sql(prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;

    let sql = format!(
        r#"
DROP TABLE IF EXISTS {prefix}parsimony_trees;
DROP TABLE IF EXISTS {prefix}trees;
DROP TABLE IF EXISTS {prefix}datasets;
"#,
        prefix = prefix
    );

    Ok(sql)
}
