//! Conversion between feature records and SQLite rows.
//!
//! Dataset-level features are flattened into one `{prefix}datasets` row;
//! nested groups ([`SetStatistics`], [`SingleInference`], [`MsaFeatures`])
//! map to column families with a shared suffix (`_search`, `_final`, ...).
//!
//! # Storage conventions
//!
//! - Unsigned counters are stored as `INTEGER` and checked on the way in and
//!   out; a value outside `i64` is a [`SqliteError::ConversionError`].
//! - An unknown starting log-likelihood (negative infinity in memory) is
//!   stored as `NULL`.
//! - Per-column alignment entropies are stored as a JSON array.
//! - Booleans are stored as `0`/`1`.
//! - Tree rows carry a `position` column so read-back preserves the order
//!   the aggregator produced.

use phylofeat_core::{
    BranchLengthStats, ClusterId, Dataset, ModelParameters, MsaFeatures, ParsimonyStatistics,
    ParsimonyTree, PlausibleStatistics, SetStatistics, SignificanceTests, SingleInference,
    SprRounds, StartingType, TestName, TestScore, TopologySummary, TreeRecord, TreeSearchRun,
};
use rusqlite::{Connection, Row, params};

use crate::error::{Result, SqliteError};

/// Column stem of each significance test in the trees table.
pub(crate) fn test_column(name: TestName) -> &'static str {
    match name {
        TestName::BpRell => "bp_rell",
        TestName::PKh => "p_kh",
        TestName::PSh => "p_sh",
        TestName::PWkh => "p_wkh",
        TestName::PWsh => "p_wsh",
        TestName::CElw => "c_elw",
        TestName::PAu => "p_au",
    }
}

fn to_sql_int<T>(value: T, field: &str) -> Result<i64>
where
    T: TryInto<i64> + Copy + std::fmt::Display,
{
    value.try_into().map_err(|_| {
        SqliteError::ConversionError(format!("{field} value {value} does not fit in INTEGER"))
    })
}

pub(crate) fn from_sql_int<T>(value: i64, field: &str) -> Result<T>
where
    T: TryFrom<i64>,
{
    T::try_from(value).map_err(|_| {
        SqliteError::ConversionError(format!("{field} value {value} is out of range"))
    })
}

fn get_count<T: TryFrom<i64>>(row: &Row<'_>, column: &str) -> Result<T> {
    let value: i64 = row.get(column)?;
    from_sql_int(value, column)
}

const DATASET_COLUMNS: &str = "uuid, name, data_type, created_at, num_searches, \
    avg_rfdist_search, num_topos_search, mean_llh_search, std_llh_search, \
    avg_rfdist_eval, num_topos_eval, mean_llh_eval, std_llh_eval, \
    avg_rfdist_plausible, num_topos_plausible, mean_llh_plausible, std_llh_plausible, \
    num_trees_plausible, proportion_plausible, \
    num_slow_spr_rounds, num_fast_spr_rounds, llh_starting_tree, llh_final_tree, \
    compute_time_single, rfdistance_starting_final, llh_difference_starting_final, \
    rate_heterogeneity_final, eq_frequencies_final, substitution_rates_final, \
    average_branch_length_final, std_branch_length_final, total_branch_length_final, \
    minimum_branch_length_final, maximum_branch_length_final, newick_starting, newick_final, \
    num_taxa, num_sites, num_patterns, proportion_gaps, proportion_invariant, entropy, \
    column_entropies, bollback, treelikeness, \
    avg_rfdist_parsimony, num_topos_parsimony, mean_parsimony_score, std_parsimony_score";

const TREE_COLUMNS: &str = "uuid, dataset_uuid, position, starting_type, newick_search, \
    llh_search, compute_time_search, newick_eval, llh_eval, compute_time_eval, plausible, \
    cluster_id, bp_rell, bp_rell_significant, p_kh, p_kh_significant, p_sh, p_sh_significant, \
    p_wkh, p_wkh_significant, p_wsh, p_wsh_significant, c_elw, c_elw_significant, \
    p_au, p_au_significant";

const PARSIMONY_TREE_COLUMNS: &str = "uuid, dataset_uuid, position, newick, score, compute_time";

/// Inserts the dataset row.
pub fn insert_dataset(conn: &Connection, prefix: &str, dataset: &Dataset) -> Result<()> {
    let single = &dataset.single_inference;
    let run = &single.run;
    let column_entropies = serde_json::to_string(&dataset.msa.column_entropies)
        .map_err(|e| SqliteError::ConversionError(format!("column entropies: {e}")))?;

    conn.execute(
        &format!(
            "INSERT INTO {prefix}datasets ({DATASET_COLUMNS}) VALUES (\
             ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
             ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32, \
             ?33, ?34, ?35, ?36, ?37, ?38, ?39, ?40, ?41, ?42, ?43, ?44, ?45, ?46, ?47, \
             ?48, ?49)"
        ),
        params![
            dataset.uuid,
            dataset.name,
            dataset.data_type,
            dataset.created_at,
            to_sql_int(dataset.num_searches, "num_searches")?,
            dataset.search.topology.avg_rel_rfdist,
            to_sql_int(dataset.search.topology.num_topologies, "num_topos_search")?,
            dataset.search.mean_llh,
            dataset.search.std_llh,
            dataset.eval.topology.avg_rel_rfdist,
            to_sql_int(dataset.eval.topology.num_topologies, "num_topos_eval")?,
            dataset.eval.mean_llh,
            dataset.eval.std_llh,
            dataset.plausible.topology.avg_rel_rfdist,
            to_sql_int(dataset.plausible.topology.num_topologies, "num_topos_plausible")?,
            dataset.plausible.mean_llh,
            dataset.plausible.std_llh,
            to_sql_int(dataset.plausible.num_trees, "num_trees_plausible")?,
            dataset.plausible.proportion,
            run.spr_rounds.slow,
            run.spr_rounds.fast,
            run.starting_llh_known().then_some(run.starting_llh),
            run.final_llh,
            run.elapsed_time,
            single.rfdistance_starting_final,
            single.llh_difference_starting_final,
            run.model.rate_heterogeneity,
            run.model.base_frequencies,
            run.model.substitution_rates,
            single.branch_lengths.mean,
            single.branch_lengths.std,
            single.branch_lengths.total,
            single.branch_lengths.min,
            single.branch_lengths.max,
            run.starting_newick,
            run.final_newick,
            to_sql_int(dataset.msa.taxa, "num_taxa")?,
            to_sql_int(dataset.msa.sites, "num_sites")?,
            to_sql_int(dataset.msa.patterns, "num_patterns")?,
            dataset.msa.gaps,
            dataset.msa.invariant,
            dataset.msa.entropy,
            column_entropies,
            dataset.msa.bollback,
            dataset.msa.treelikeness,
            dataset.parsimony.topology.avg_rel_rfdist,
            to_sql_int(dataset.parsimony.topology.num_topologies, "num_topos_parsimony")?,
            dataset.parsimony.mean_score,
            dataset.parsimony.std_score,
        ],
    )?;
    Ok(())
}

/// Inserts tree rows in order; `position` records the slice index.
pub fn insert_trees(conn: &Connection, prefix: &str, trees: &[TreeRecord]) -> Result<usize> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {prefix}trees ({TREE_COLUMNS}) VALUES (\
         ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
         ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)"
    ))?;

    for (position, tree) in trees.iter().enumerate() {
        let tests = &tree.tests;
        stmt.execute(params![
            tree.uuid,
            tree.dataset_uuid,
            to_sql_int(position, "position")?,
            tree.starting_type.as_str(),
            tree.newick_search,
            tree.llh_search,
            tree.compute_time_search,
            tree.newick_eval,
            tree.llh_eval,
            tree.compute_time_eval,
            tree.plausible,
            tree.cluster_id.as_str(),
            tests.bp_rell.score,
            tests.bp_rell.significant,
            tests.p_kh.score,
            tests.p_kh.significant,
            tests.p_sh.score,
            tests.p_sh.significant,
            tests.p_wkh.score,
            tests.p_wkh.significant,
            tests.p_wsh.score,
            tests.p_wsh.significant,
            tests.c_elw.score,
            tests.c_elw.significant,
            tests.p_au.score,
            tests.p_au.significant,
        ])?;
    }
    Ok(trees.len())
}

/// Inserts parsimony tree rows in order.
pub fn insert_parsimony_trees(
    conn: &Connection,
    prefix: &str,
    trees: &[ParsimonyTree],
) -> Result<usize> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {prefix}parsimony_trees ({PARSIMONY_TREE_COLUMNS}) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
    ))?;

    for (position, tree) in trees.iter().enumerate() {
        stmt.execute(params![
            tree.uuid,
            tree.dataset_uuid,
            to_sql_int(position, "position")?,
            tree.newick,
            to_sql_int(tree.score, "score")?,
            tree.compute_time,
        ])?;
    }
    Ok(trees.len())
}

fn topology(row: &Row<'_>, suffix: &str) -> Result<TopologySummary> {
    Ok(TopologySummary {
        num_topologies: get_count(row, &format!("num_topos_{suffix}"))?,
        avg_rel_rfdist: row.get(format!("avg_rfdist_{suffix}").as_str())?,
    })
}

fn set_statistics(row: &Row<'_>, suffix: &str) -> Result<SetStatistics> {
    Ok(SetStatistics {
        topology: topology(row, suffix)?,
        mean_llh: row.get(format!("mean_llh_{suffix}").as_str())?,
        std_llh: row.get(format!("std_llh_{suffix}").as_str())?,
    })
}

fn dataset_from_row(row: &Row<'_>) -> Result<Dataset> {
    let column_entropies: String = row.get("column_entropies")?;
    let column_entropies: Vec<f64> = serde_json::from_str(&column_entropies)
        .map_err(|e| SqliteError::ConversionError(format!("column entropies: {e}")))?;
    let starting_llh: Option<f64> = row.get("llh_starting_tree")?;

    let run = TreeSearchRun {
        starting_newick: row.get("newick_starting")?,
        final_newick: row.get("newick_final")?,
        starting_llh: starting_llh.unwrap_or(f64::NEG_INFINITY),
        final_llh: row.get("llh_final_tree")?,
        elapsed_time: row.get("compute_time_single")?,
        model: ModelParameters {
            rate_heterogeneity: row.get("rate_heterogeneity_final")?,
            base_frequencies: row.get("eq_frequencies_final")?,
            substitution_rates: row.get("substitution_rates_final")?,
        },
        spr_rounds: SprRounds {
            slow: get_count(row, "num_slow_spr_rounds")?,
            fast: get_count(row, "num_fast_spr_rounds")?,
        },
    };

    Ok(Dataset {
        uuid: row.get("uuid")?,
        name: row.get("name")?,
        data_type: row.get("data_type")?,
        created_at: row.get("created_at")?,
        num_searches: get_count(row, "num_searches")?,
        search: set_statistics(row, "search")?,
        eval: set_statistics(row, "eval")?,
        plausible: PlausibleStatistics {
            topology: topology(row, "plausible")?,
            mean_llh: row.get("mean_llh_plausible")?,
            std_llh: row.get("std_llh_plausible")?,
            num_trees: get_count(row, "num_trees_plausible")?,
            proportion: row.get("proportion_plausible")?,
        },
        single_inference: SingleInference {
            run,
            rfdistance_starting_final: row.get("rfdistance_starting_final")?,
            llh_difference_starting_final: row.get("llh_difference_starting_final")?,
            branch_lengths: BranchLengthStats {
                min: row.get("minimum_branch_length_final")?,
                max: row.get("maximum_branch_length_final")?,
                mean: row.get("average_branch_length_final")?,
                std: row.get("std_branch_length_final")?,
                total: row.get("total_branch_length_final")?,
            },
        },
        parsimony: ParsimonyStatistics {
            topology: topology(row, "parsimony")?,
            mean_score: row.get("mean_parsimony_score")?,
            std_score: row.get("std_parsimony_score")?,
        },
        msa: MsaFeatures {
            taxa: get_count(row, "num_taxa")?,
            sites: get_count(row, "num_sites")?,
            patterns: get_count(row, "num_patterns")?,
            gaps: row.get("proportion_gaps")?,
            invariant: row.get("proportion_invariant")?,
            entropy: row.get("entropy")?,
            column_entropies,
            bollback: row.get("bollback")?,
            treelikeness: row.get("treelikeness")?,
        },
    })
}

fn tree_from_row(row: &Row<'_>) -> Result<TreeRecord> {
    let starting_type: String = row.get("starting_type")?;
    let starting_type: StartingType = starting_type
        .parse()
        .map_err(|e| SqliteError::ConversionError(format!("{e}")))?;
    let cluster_id: String = row.get("cluster_id")?;

    let mut pairs = Vec::with_capacity(TestName::ALL.len());
    for name in TestName::ALL {
        let column = test_column(name);
        let score: f64 = row.get(column)?;
        let significant: bool = row.get(format!("{column}_significant").as_str())?;
        pairs.push((name, TestScore::new(score, significant)));
    }
    let tests = SignificanceTests::from_pairs(pairs)
        .map_err(|e| SqliteError::ConversionError(format!("{e}")))?;

    Ok(TreeRecord {
        uuid: row.get("uuid")?,
        dataset_uuid: row.get("dataset_uuid")?,
        starting_type,
        newick_search: row.get("newick_search")?,
        llh_search: row.get("llh_search")?,
        compute_time_search: row.get("compute_time_search")?,
        newick_eval: row.get("newick_eval")?,
        llh_eval: row.get("llh_eval")?,
        compute_time_eval: row.get("compute_time_eval")?,
        plausible: row.get("plausible")?,
        cluster_id: ClusterId::from(cluster_id),
        tests,
    })
}

fn parsimony_tree_from_row(row: &Row<'_>) -> Result<ParsimonyTree> {
    Ok(ParsimonyTree {
        uuid: row.get("uuid")?,
        dataset_uuid: row.get("dataset_uuid")?,
        newick: row.get("newick")?,
        score: get_count(row, "score")?,
        compute_time: row.get("compute_time")?,
    })
}

/// Loads datasets matching a `WHERE` clause with one text parameter, or all
/// datasets when `filter` is `None`. Rows are ordered by name.
pub fn load_datasets(
    conn: &Connection,
    prefix: &str,
    filter: Option<(&str, &str)>,
) -> Result<Vec<Dataset>> {
    let (clause, value) = match filter {
        Some((column, value)) => (format!("WHERE {column} = ?1"), Some(value)),
        None => (String::new(), None),
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {DATASET_COLUMNS} FROM {prefix}datasets {clause} ORDER BY name"
    ))?;
    let mut rows = match value {
        Some(value) => stmt.query(params![value])?,
        None => stmt.query([])?,
    };

    let mut datasets = Vec::new();
    while let Some(row) = rows.next()? {
        datasets.push(dataset_from_row(row)?);
    }
    Ok(datasets)
}

/// Loads the tree rows of one dataset in insertion order.
pub fn load_trees(conn: &Connection, prefix: &str, dataset_uuid: &str) -> Result<Vec<TreeRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TREE_COLUMNS} FROM {prefix}trees WHERE dataset_uuid = ?1 ORDER BY position"
    ))?;
    let mut rows = stmt.query(params![dataset_uuid])?;

    let mut trees = Vec::new();
    while let Some(row) = rows.next()? {
        trees.push(tree_from_row(row)?);
    }
    Ok(trees)
}

/// Loads the parsimony tree rows of one dataset in insertion order.
pub fn load_parsimony_trees(
    conn: &Connection,
    prefix: &str,
    dataset_uuid: &str,
) -> Result<Vec<ParsimonyTree>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PARSIMONY_TREE_COLUMNS} FROM {prefix}parsimony_trees \
         WHERE dataset_uuid = ?1 ORDER BY position"
    ))?;
    let mut rows = stmt.query(params![dataset_uuid])?;

    let mut trees = Vec::new();
    while let Some(row) = rows.next()? {
        trees.push(parsimony_tree_from_row(row)?);
    }
    Ok(trees)
}
