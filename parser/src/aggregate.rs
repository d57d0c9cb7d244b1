//! Feature aggregation for one dataset.
//!
//! [`aggregate_dataset`] is a pure function of its inputs: every log, tree
//! list, cluster mapping, and test table of a dataset is passed in as a
//! [`DatasetSources`] value, and one [`DatasetRecords`] value comes out. The
//! only side effect is the RF-distance computation, which goes through the
//! [`RfDistanceCalculator`] the caller supplies.
//!
//! Order of work:
//!
//! 1. search and eval LLH statistics from the collected logs
//! 2. parsimony scores and times, checked against the parsimony tree list
//! 3. single-inference features of the first parsimony-started run
//! 4. topology summaries of the four tree sets
//!    (the eval set's average RF distance comes from the search summary
//!    unless [`EvalRfDistance::EvalSet`] is chosen)
//! 5. one [`TreeRecord`] per search/eval pair of both starting strategies
//! 6. plausible-set statistics, once every tree is classified
//!
//! Any failure of a required field aborts the whole dataset. Missing optional
//! fields degrade to a sentinel and a [`SourcedWarning`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use phylofeat_core::{
    Dataset, DatasetRecords, MsaFeatures, ParsimonyStatistics, ParsimonyTree, PlausibleStatistics,
    SetStatistics, SingleInference, StartingType, TreeRecord, TreeSearchRun, validate_records,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AggregateError, ParseError, SourceContext};
use crate::iqtree::{
    OPTIMAL_LLH, get_all_iqtree_llhs, get_best_iqtree_llh, get_iqtree_elapsed_time,
    get_iqtree_runtimes, get_iqtree_starting_llh, get_model_parameter_estimates,
    get_num_spr_rounds,
};
use crate::newick::{branch_length_stats, first_tree, read_tree_list};
use crate::parsimony::{PARSIMONY_SCORE, get_all_parsimony_scores};
use crate::rfdist::get_rfdistance_results;
use crate::runner::RfDistanceCalculator;
use crate::source::SourceText;
use crate::stats::{mean, std_dev};
use crate::statstest::{ClusterMap, SignificanceTable};
use crate::warnings::{ParseWarning, SourcedWarning};

/// The four files of one tree search and its re-evaluation.
#[derive(Debug, Clone)]
pub struct SearchRunSources {
    pub search_tree: SourceText,
    pub search_log: SourceText,
    pub eval_tree: SourceText,
    pub eval_log: SourceText,
}

/// Which topology summary supplies the eval set's average RF distance.
///
/// Feature tables built so far report the search set's average for both
/// sets, while the eval set's topology count comes from its own summary.
/// [`SearchSet`](Self::SearchSet) keeps those numbers comparable and records
/// an [`ParseWarning::EvalRfDistanceFromSearch`] whenever the eval summary
/// disagrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalRfDistance {
    #[default]
    SearchSet,
    EvalSet,
}

/// Every input of one dataset aggregation.
#[derive(Debug, Clone)]
pub struct DatasetSources {
    pub name: String,
    pub data_type: Option<String>,
    /// Parsimony-started runs; the first one is the representative run.
    pub parsimony_started: Vec<SearchRunSources>,
    pub random_started: Vec<SearchRunSources>,
    /// Starting tree of the representative run.
    pub starting_tree: SourceText,
    pub search_logs_collected: SourceText,
    pub eval_logs_collected: SourceText,
    pub search_rfdistance: SourceText,
    pub eval_rfdistance: SourceText,
    pub plausible_rfdistance: SourceText,
    pub parsimony_rfdistance: SourceText,
    pub parsimony_trees: SourceText,
    pub parsimony_logs: SourceText,
    pub significance: SignificanceTable,
    pub clusters: ClusterMap,
    pub msa: MsaFeatures,
    pub eval_rfdist_from: EvalRfDistance,
}

/// Result of one successful aggregation.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub records: DatasetRecords,
    pub warnings: Vec<SourcedWarning>,
}

fn new_uuid() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Aggregates all sources of one dataset into its records.
///
/// # Errors
///
/// Returns [`AggregateError`] naming the offending file for a missing or
/// malformed required field, a cross-file count mismatch, an unresolvable
/// topology, an RF tool failure, or a starting strategy without searches.
pub fn aggregate_dataset(
    sources: &DatasetSources,
    rf_distance: &dyn RfDistanceCalculator,
) -> Result<Aggregation, AggregateError> {
    let Some(representative) = sources.parsimony_started.first() else {
        return Err(AggregateError::NoSearches(StartingType::Parsimony));
    };
    if sources.random_started.is_empty() {
        return Err(AggregateError::NoSearches(StartingType::Random));
    }

    debug!(dataset = %sources.name, "aggregating dataset");
    let dataset_uuid = new_uuid();
    let mut warnings = Vec::new();

    let search = set_statistics(&sources.search_logs_collected, &sources.search_rfdistance)?;
    let mut eval = set_statistics(&sources.eval_logs_collected, &sources.eval_rfdistance)?;
    if sources.eval_rfdist_from == EvalRfDistance::SearchSet {
        let from_search = search.topology.avg_rel_rfdist;
        if eval.topology.avg_rel_rfdist != from_search {
            warn!(
                source = %sources.eval_rfdistance.name,
                eval_log = eval.topology.avg_rel_rfdist,
                search_log = from_search,
                "eval average RF distance replaced by the search value"
            );
            warnings.push(SourcedWarning {
                source_name: sources.eval_rfdistance.name.clone(),
                warning: ParseWarning::EvalRfDistanceFromSearch,
            });
        }
        eval.topology.avg_rel_rfdist = from_search;
    }

    let (parsimony, parsimony_trees) = parsimony_features(sources, &dataset_uuid)?;

    let single_inference = single_inference(
        representative,
        &sources.starting_tree,
        rf_distance,
        &mut warnings,
    )?;

    let plausible_topology = get_rfdistance_results(&sources.plausible_rfdistance.text)
        .in_source(&sources.plausible_rfdistance.name)?;

    let mut trees = Vec::with_capacity(sources.parsimony_started.len() + sources.random_started.len());
    let mut plausible_llhs = Vec::new();
    for (starting_type, runs) in [
        (StartingType::Parsimony, &sources.parsimony_started),
        (StartingType::Random, &sources.random_started),
    ] {
        for run in runs {
            let record = tree_record(run, starting_type, &dataset_uuid, sources)?;
            if record.plausible {
                plausible_llhs.push(record.llh_eval);
            }
            trees.push(record);
        }
    }

    let num_searches = trees.len() as u64;
    if plausible_llhs.is_empty() {
        warn!(dataset = %sources.name, "no plausible trees");
        warnings.push(SourcedWarning {
            source_name: sources.name.clone(),
            warning: ParseWarning::NoPlausibleTrees,
        });
    }
    let plausible = PlausibleStatistics {
        topology: plausible_topology,
        mean_llh: mean(&plausible_llhs),
        std_llh: std_dev(&plausible_llhs),
        num_trees: plausible_llhs.len() as u64,
        proportion: plausible_llhs.len() as f64 / num_searches as f64,
    };

    let records = DatasetRecords {
        dataset: Dataset {
            uuid: dataset_uuid,
            name: sources.name.clone(),
            data_type: sources.data_type.clone(),
            created_at: Utc::now().to_rfc3339(),
            num_searches,
            search,
            eval,
            plausible,
            single_inference,
            parsimony,
            msa: sources.msa.clone(),
        },
        trees,
        parsimony_trees,
    };

    let problems = validate_records(&records);
    if !problems.is_empty() {
        return Err(AggregateError::Invalid(problems));
    }

    info!(
        dataset = %sources.name,
        searches = num_searches,
        plausible = records.dataset.plausible.num_trees,
        parsimony_trees = records.parsimony_trees.len(),
        warnings = warnings.len(),
        "aggregated dataset"
    );
    Ok(Aggregation { records, warnings })
}

fn set_statistics(
    collected_logs: &SourceText,
    rfdistance: &SourceText,
) -> Result<SetStatistics, AggregateError> {
    let llhs = get_all_iqtree_llhs(&collected_logs.text).in_source(&collected_logs.name)?;
    let (Some(mean_llh), Some(std_llh)) = (mean(&llhs), std_dev(&llhs)) else {
        return Err(AggregateError::Parse {
            source_name: collected_logs.name.clone(),
            source: ParseError::missing(OPTIMAL_LLH),
        });
    };
    let topology = get_rfdistance_results(&rfdistance.text).in_source(&rfdistance.name)?;
    Ok(SetStatistics {
        topology,
        mean_llh,
        std_llh,
    })
}

fn parsimony_features(
    sources: &DatasetSources,
    dataset_uuid: &str,
) -> Result<(ParsimonyStatistics, Vec<ParsimonyTree>), AggregateError> {
    let logs = &sources.parsimony_logs;
    let newicks = read_tree_list(&sources.parsimony_trees.text);
    let scores = get_all_parsimony_scores(&logs.text).in_source(&logs.name)?;
    if scores.len() != newicks.len() {
        return Err(AggregateError::Inconsistent {
            source_name: logs.name.clone(),
            field: "parsimony scores",
            expected: newicks.len(),
            found: scores.len(),
        });
    }
    let runtimes = get_iqtree_runtimes(&logs.text).in_source(&logs.name)?;
    if runtimes.len() != newicks.len() {
        return Err(AggregateError::Inconsistent {
            source_name: logs.name.clone(),
            field: "elapsed times",
            expected: newicks.len(),
            found: runtimes.len(),
        });
    }

    let values: Vec<f64> = scores.iter().map(|&s| s as f64).collect();
    let (Some(mean_score), Some(std_score)) = (mean(&values), std_dev(&values)) else {
        return Err(AggregateError::Parse {
            source_name: logs.name.clone(),
            source: ParseError::missing(PARSIMONY_SCORE),
        });
    };
    let topology = get_rfdistance_results(&sources.parsimony_rfdistance.text)
        .in_source(&sources.parsimony_rfdistance.name)?;

    let trees = newicks
        .into_iter()
        .zip(scores)
        .zip(runtimes)
        .map(|((newick, score), compute_time)| ParsimonyTree {
            uuid: new_uuid(),
            dataset_uuid: dataset_uuid.to_string(),
            newick,
            score,
            compute_time,
        })
        .collect();

    Ok((
        ParsimonyStatistics {
            topology,
            mean_score,
            std_score,
        },
        trees,
    ))
}

fn single_inference(
    run: &SearchRunSources,
    starting_tree: &SourceText,
    rf_distance: &dyn RfDistanceCalculator,
    warnings: &mut Vec<SourcedWarning>,
) -> Result<SingleInference, AggregateError> {
    let log = &run.search_log;

    let mut log_warnings = Vec::new();
    let starting_llh = get_iqtree_starting_llh(&log.text, &mut log_warnings).in_source(&log.name)?;
    for warning in log_warnings {
        warn!(source = %log.name, %warning, "degraded field");
        warnings.push(SourcedWarning {
            source_name: log.name.clone(),
            warning,
        });
    }

    let starting_newick = first_tree(&starting_tree.text).in_source(&starting_tree.name)?;
    let final_newick = first_tree(&run.search_tree.text).in_source(&run.search_tree.name)?;
    let branch_lengths = branch_length_stats(&final_newick).in_source(&run.search_tree.name)?;

    let run = TreeSearchRun {
        final_llh: get_best_iqtree_llh(&log.text).in_source(&log.name)?,
        elapsed_time: get_iqtree_elapsed_time(&log.text).in_source(&log.name)?,
        model: get_model_parameter_estimates(&log.text),
        spr_rounds: get_num_spr_rounds(&log.text).in_source(&log.name)?,
        starting_llh,
        starting_newick,
        final_newick,
    };
    let rfdistance_starting_final =
        rf_distance.relative_rf_distance(&run.starting_newick, &run.final_newick)?;

    Ok(SingleInference {
        llh_difference_starting_final: run.llh_difference(),
        rfdistance_starting_final,
        branch_lengths,
        run,
    })
}

fn tree_record(
    run: &SearchRunSources,
    starting_type: StartingType,
    dataset_uuid: &str,
    sources: &DatasetSources,
) -> Result<TreeRecord, AggregateError> {
    let newick_eval = first_tree(&run.eval_tree.text).in_source(&run.eval_tree.name)?;
    let significance = sources
        .significance
        .result_for_tree(&newick_eval, &sources.clusters)
        .in_source(&run.eval_tree.name)?;

    Ok(TreeRecord {
        uuid: new_uuid(),
        dataset_uuid: dataset_uuid.to_string(),
        starting_type,
        newick_search: first_tree(&run.search_tree.text).in_source(&run.search_tree.name)?,
        llh_search: get_best_iqtree_llh(&run.search_log.text).in_source(&run.search_log.name)?,
        compute_time_search: get_iqtree_elapsed_time(&run.search_log.text)
            .in_source(&run.search_log.name)?,
        newick_eval,
        llh_eval: get_best_iqtree_llh(&run.eval_log.text).in_source(&run.eval_log.name)?,
        compute_time_eval: get_iqtree_elapsed_time(&run.eval_log.text)
            .in_source(&run.eval_log.name)?,
        plausible: significance.plausible,
        cluster_id: significance.cluster_id,
        tests: significance.tests,
    })
}

#[cfg(test)]
mod tests {
    use phylofeat_core::{
        ClusterId, SignificanceTests, TestName, TestScore, TopologyTestResult,
    };

    use super::*;
    use crate::error::{LookupError, ToolError};

    struct FixedDistance(f64);

    impl RfDistanceCalculator for FixedDistance {
        fn relative_rf_distance(&self, _: &str, _: &str) -> Result<f64, ToolError> {
            Ok(self.0)
        }
    }

    struct FailingTool;

    impl RfDistanceCalculator for FailingTool {
        fn relative_rf_distance(&self, _: &str, _: &str) -> Result<f64, ToolError> {
            Err(ToolError::Failed {
                command: "raxml-ng --rfdist".into(),
                details: "ERROR: bad tree".into(),
            })
        }
    }

    const PLAUSIBLE_TOPOLOGY: &str = "((a:0.1,b:0.2):0.05,c:0.3,d:0.4);";
    const EXCLUDED_TOPOLOGY: &str = "((a:0.1,c:0.2):0.05,b:0.3,d:0.4);";

    fn rf_log(topologies: u64, distance: f64) -> String {
        format!(
            "Number of unique topologies in this tree set: {topologies}\n\
             Average relative RF distance in this tree set: {distance}\n"
        )
    }

    fn search_log(llh: f64, time: f64) -> String {
        format!(
            "Initial log-likelihood: {}\n\
             Rate heterogeneity: GAMMA (4 cats, mean),  alpha: 0.4\n\
             Base frequencies (ML): 0.3 0.2 0.2 0.3\n\
             SLOW spr round 1\nFAST spr round 1\nFAST spr round 2\n\
             Optimal log-likelihood: {llh}\n\
             Elapsed time: {time} seconds\n",
            llh - 100.0
        )
    }

    fn eval_log(llh: f64, time: f64) -> String {
        format!("Optimal log-likelihood: {llh}\nElapsed time: {time} seconds\n")
    }

    fn run(index: usize, prefix: &str, eval_tree: &str, eval_llh: f64) -> SearchRunSources {
        SearchRunSources {
            search_tree: SourceText::new(format!("{prefix}_search_{index}.tree"), eval_tree),
            search_log: SourceText::new(
                format!("{prefix}_search_{index}.log"),
                search_log(eval_llh - 1.0, 10.0 + index as f64),
            ),
            eval_tree: SourceText::new(format!("{prefix}_eval_{index}.tree"), format!("{eval_tree}\n")),
            eval_log: SourceText::new(
                format!("{prefix}_eval_{index}.log"),
                eval_log(eval_llh, 1.0),
            ),
        }
    }

    fn verdict(significant: bool) -> TopologyTestResult {
        let tests = SignificanceTests::from_pairs(
            TestName::ALL.map(|name| (name, TestScore::new(0.5, significant))),
        )
        .unwrap();
        TopologyTestResult {
            plausible: !significant,
            tests,
            llh: None,
            delta_llh: None,
        }
    }

    fn parsimony_log(scores: &[u64]) -> String {
        scores
            .iter()
            .map(|s| format!("Parsimony score: {s}\nElapsed time: 0.02 seconds\n"))
            .collect()
    }

    fn parsimony_trees(count: usize) -> String {
        (0..count).map(|_| "(a,b,(c,d));\n").collect()
    }

    /// Two parsimony-started runs (one plausible) and one random-started run
    /// (plausible).
    fn sources() -> DatasetSources {
        let mut significance = SignificanceTable::new();
        significance.insert(ClusterId::from("c1"), verdict(false));
        significance.insert(ClusterId::from("c2"), verdict(true));
        let mut clusters = ClusterMap::new();
        clusters.insert(PLAUSIBLE_TOPOLOGY, ClusterId::from("c1"));
        clusters.insert(EXCLUDED_TOPOLOGY, ClusterId::from("c2"));

        DatasetSources {
            name: "dna_example".into(),
            data_type: Some("DNA".into()),
            parsimony_started: vec![
                run(0, "pars", PLAUSIBLE_TOPOLOGY, -5000.0),
                run(1, "pars", EXCLUDED_TOPOLOGY, -5030.0),
            ],
            random_started: vec![run(0, "rand", PLAUSIBLE_TOPOLOGY, -5002.0)],
            starting_tree: SourceText::new("pars_starting_0.tree", "(a,c,(b,d));\n"),
            search_logs_collected: SourceText::new(
                "search.log",
                "Optimal log-likelihood: -5001\nOptimal log-likelihood: -5031\nOptimal log-likelihood: -5003\n",
            ),
            eval_logs_collected: SourceText::new(
                "eval.log",
                "Optimal log-likelihood: -5000\nOptimal log-likelihood: -5030\nOptimal log-likelihood: -5002\n",
            ),
            search_rfdistance: SourceText::new("search.rfdist.log", rf_log(2, 0.25)),
            eval_rfdistance: SourceText::new("eval.rfdist.log", rf_log(4, 0.25)),
            plausible_rfdistance: SourceText::new("plausible.rfdist.log", rf_log(1, 0.0)),
            parsimony_rfdistance: SourceText::new("parsimony.rfdist.log", rf_log(3, 0.4)),
            parsimony_trees: SourceText::new("parsimony.trees", parsimony_trees(5)),
            parsimony_logs: SourceText::new(
                "parsimony.log",
                parsimony_log(&[410, 412, 414, 410, 414]),
            ),
            significance,
            clusters,
            msa: MsaFeatures {
                taxa: 4,
                sites: 1200,
                patterns: 480,
                gaps: 0.02,
                invariant: 0.4,
                entropy: 0.6,
                column_entropies: vec![0.1, 0.2],
                bollback: -3500.2,
                treelikeness: None,
            },
            eval_rfdist_from: EvalRfDistance::default(),
        }
    }

    #[test]
    fn test_aggregates_dataset_and_tree_records() {
        let aggregation = aggregate_dataset(&sources(), &FixedDistance(0.25)).unwrap();
        let records = aggregation.records;
        let dataset = &records.dataset;

        assert_eq!(dataset.name, "dna_example");
        assert_eq!(dataset.num_searches, 3);
        assert_eq!(records.trees.len(), 3);
        assert_eq!(
            records.trees.iter().filter(|t| t.starting_type == StartingType::Random).count(),
            1
        );
        assert!(records.trees.iter().all(|t| t.dataset_uuid == dataset.uuid));

        assert_eq!(dataset.search.topology.avg_rel_rfdist, 0.25);
        assert_eq!(dataset.eval.topology.avg_rel_rfdist, 0.25);
        assert!((dataset.eval.mean_llh - (-15032.0 / 3.0)).abs() < 1e-9);
        assert_eq!(dataset.search.topology.num_topologies, 2);
        assert_eq!(dataset.eval.topology.num_topologies, 4);

        assert_eq!(dataset.plausible.num_trees, 2);
        assert!((dataset.plausible.proportion - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(dataset.plausible.mean_llh, Some(-5001.0));
        assert_eq!(dataset.plausible.std_llh, Some(1.0));
        assert!(aggregation.warnings.is_empty());

        let single = &dataset.single_inference;
        assert_eq!(single.run.final_llh, -5001.0);
        assert_eq!(single.run.starting_llh, -5101.0);
        assert_eq!(single.llh_difference_starting_final, Some(100.0));
        assert_eq!(single.run.elapsed_time, 10.0);
        assert_eq!(single.run.spr_rounds.slow, 1);
        assert_eq!(single.run.spr_rounds.fast, 2);
        assert_eq!(single.run.model.substitution_rates, None);
        assert_eq!(single.rfdistance_starting_final, 0.25);
        assert_eq!(single.run.starting_newick, "(a,c,(b,d));");
        assert_eq!(single.branch_lengths.max, 0.4);

        assert_eq!(records.parsimony_trees.len(), 5);
        assert_eq!(dataset.parsimony.mean_score, 412.0);
        assert_eq!(dataset.parsimony.topology.num_topologies, 3);
    }

    #[test]
    fn test_eval_rfdist_defaults_to_search_summary() {
        let mut sources = sources();
        sources.eval_rfdistance = SourceText::new("eval.rfdist.log", rf_log(4, 0.5));
        let aggregation = aggregate_dataset(&sources, &FixedDistance(0.0)).unwrap();
        let eval = aggregation.records.dataset.eval.topology;

        assert_eq!(eval.avg_rel_rfdist, 0.25);
        assert_eq!(eval.num_topologies, 4);
        assert_eq!(
            aggregation.warnings,
            vec![SourcedWarning {
                source_name: "eval.rfdist.log".into(),
                warning: ParseWarning::EvalRfDistanceFromSearch,
            }]
        );
    }

    #[test]
    fn test_eval_rfdist_from_eval_summary() {
        let mut sources = sources();
        sources.eval_rfdistance = SourceText::new("eval.rfdist.log", rf_log(4, 0.5));
        sources.eval_rfdist_from = EvalRfDistance::EvalSet;
        let aggregation = aggregate_dataset(&sources, &FixedDistance(0.0)).unwrap();
        let dataset = &aggregation.records.dataset;

        assert_eq!(dataset.eval.topology.avg_rel_rfdist, 0.5);
        assert_eq!(dataset.eval.topology.num_topologies, 4);
        assert_eq!(dataset.search.topology.avg_rel_rfdist, 0.25);
        assert!(aggregation.warnings.is_empty());
    }

    #[test]
    fn test_tree_records_carry_cluster_results() {
        let records = aggregate_dataset(&sources(), &FixedDistance(0.0)).unwrap().records;
        let excluded = &records.trees[1];
        assert_eq!(excluded.cluster_id, ClusterId::from("c2"));
        assert!(!excluded.plausible);
        assert!(excluded.tests.p_au.significant);
        assert_eq!(excluded.llh_eval, -5030.0);
        assert_eq!(excluded.llh_search, -5031.0);
        assert_eq!(excluded.compute_time_search, 11.0);
        assert_eq!(excluded.newick_eval, EXCLUDED_TOPOLOGY);
    }

    #[test]
    fn test_parsimony_counts_must_match_tree_list() {
        let mut sources = sources();
        sources.parsimony_trees = SourceText::new("parsimony.trees", parsimony_trees(4));
        let err = aggregate_dataset(&sources, &FixedDistance(0.0)).unwrap_err();
        match err {
            AggregateError::Inconsistent {
                source_name,
                expected,
                found,
                ..
            } => {
                assert_eq!(source_name, "parsimony.log");
                assert_eq!((expected, found), (4, 5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_initial_llh_is_one_warning() {
        let mut sources = sources();
        sources.parsimony_started[0].search_log = SourceText::new(
            "pars_search_0.log",
            "Optimal log-likelihood: -5001\nElapsed time: 5562.869 seconds (this run) / 91413.668 seconds (total with restarts)\n",
        );
        let aggregation = aggregate_dataset(&sources, &FixedDistance(0.1)).unwrap();

        assert_eq!(
            aggregation.warnings,
            vec![SourcedWarning {
                source_name: "pars_search_0.log".into(),
                warning: ParseWarning::MissingStartingLlh,
            }]
        );
        let single = &aggregation.records.dataset.single_inference;
        assert_eq!(single.run.starting_llh, f64::NEG_INFINITY);
        assert_eq!(single.llh_difference_starting_final, None);
        assert_eq!(single.run.elapsed_time, 5562.869);
    }

    #[test]
    fn test_requires_both_starting_strategies() {
        let mut sources = sources();
        sources.random_started.clear();
        assert!(matches!(
            aggregate_dataset(&sources, &FixedDistance(0.0)).unwrap_err(),
            AggregateError::NoSearches(StartingType::Random)
        ));

        sources.parsimony_started.clear();
        assert!(matches!(
            aggregate_dataset(&sources, &FixedDistance(0.0)).unwrap_err(),
            AggregateError::NoSearches(StartingType::Parsimony)
        ));
    }

    #[test]
    fn test_unclustered_eval_tree_names_file() {
        let mut sources = sources();
        sources.random_started[0].eval_tree = SourceText::new("rand_eval_0.tree", "(d,(c,(a,b)));");
        let err = aggregate_dataset(&sources, &FixedDistance(0.0)).unwrap_err();
        match err {
            AggregateError::Lookup {
                source_name,
                source: LookupError::UnclusteredTree { .. },
            } => assert_eq!(source_name, "rand_eval_0.tree"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_required_llh_names_file() {
        let mut sources = sources();
        sources.random_started[0].eval_log = SourceText::new("rand_eval_0.log", "Elapsed time: 1 seconds\n");
        let err = aggregate_dataset(&sources, &FixedDistance(0.0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "rand_eval_0.log: no line contains 'Optimal log-likelihood:'"
        );
    }

    #[test]
    fn test_no_plausible_trees() {
        let mut sources = sources();
        sources.significance.insert(ClusterId::from("c1"), verdict(true));
        let aggregation = aggregate_dataset(&sources, &FixedDistance(0.0)).unwrap();
        let plausible = aggregation.records.dataset.plausible;

        assert_eq!(plausible.num_trees, 0);
        assert_eq!(plausible.proportion, 0.0);
        assert_eq!(plausible.mean_llh, None);
        assert_eq!(aggregation.warnings.len(), 1);
        assert_eq!(aggregation.warnings[0].warning, ParseWarning::NoPlausibleTrees);
    }

    #[test]
    fn test_rf_tool_failure_aborts() {
        let err = aggregate_dataset(&sources(), &FailingTool).unwrap_err();
        assert!(matches!(err, AggregateError::Tool(ToolError::Failed { .. })));
    }

    #[test]
    fn test_proportion_is_bounded() {
        let records = aggregate_dataset(&sources(), &FixedDistance(0.0)).unwrap().records;
        let plausible = records.dataset.plausible;
        assert!((0.0..=1.0).contains(&plausible.proportion));
        assert!(plausible.num_trees <= records.dataset.num_searches);
    }
}
