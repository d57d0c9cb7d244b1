use std::fs;
use std::path::PathBuf;

use phylofeat_core::{ClusterId, TestScore};
use phylofeat_parser::iqtree::{
    get_best_iqtree_llh, get_iqtree_elapsed_time, get_iqtree_runtimes, get_iqtree_starting_llh,
    get_model_parameter_estimates, get_num_spr_rounds, get_patterns_gaps_invariant,
    summarize_search_log,
};
use phylofeat_parser::newick::read_tree_list;
use phylofeat_parser::parsimony::summarize_parsimony_log;
use phylofeat_parser::rfdist::get_rfdistance_results;
use phylofeat_parser::statstest::{ClusterMap, parse_iqtree_test_table};
use phylofeat_parser::{ParseWarning, SourceText};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"))
}

#[test]
fn test_raxml_search_log_fields() {
    let log = fixture("raxml_search.log");
    let summary = summarize_search_log(&log).expect("fixture should parse");

    assert_eq!(summary.final_llh, -5765.365585);
    assert_eq!(summary.starting_llh, -6012.734512);
    assert!(summary.warnings.is_empty());
    assert_eq!(summary.elapsed_times, vec![2.317]);
    assert_eq!(summary.spr_rounds.slow, 3);
    assert_eq!(summary.spr_rounds.fast, 2);

    let rate = summary.model.rate_heterogeneity.expect("rate heterogeneity present");
    assert!(rate.starts_with("GAMMA (4 cats, mean),  alpha: 0.412345"));
    assert_eq!(
        summary.model.base_frequencies.as_deref(),
        Some("0.281245 0.219876 0.231045 0.267834")
    );
    assert!(summary.model.substitution_rates.is_some());
}

#[test]
fn test_raxml_search_log_alignment_summary() {
    let summary = get_patterns_gaps_invariant(&fixture("raxml_search.log")).unwrap();
    assert_eq!(summary.patterns, 480);
    assert!((summary.gaps - 0.0215).abs() < 1e-12);
    assert!((summary.invariant - 0.415).abs() < 1e-12);
}

#[test]
fn test_resumed_log_degrades_starting_llh() {
    let log = fixture("raxml_search_resumed.log");

    let mut warnings = Vec::new();
    let starting = get_iqtree_starting_llh(&log, &mut warnings).unwrap();
    assert_eq!(starting, f64::NEG_INFINITY);
    assert_eq!(warnings, vec![ParseWarning::MissingStartingLlh]);

    assert_eq!(get_iqtree_elapsed_time(&log).unwrap(), 5562.869);
    assert_eq!(get_best_iqtree_llh(&log).unwrap(), -893118.401132);
    assert_eq!(get_num_spr_rounds(&log).unwrap().slow, 5);
}

#[test]
fn test_iqtree_eval_log_fields() {
    let log = fixture("iqtree_eval.log");

    assert_eq!(get_best_iqtree_llh(&log).unwrap(), -5765.36558);
    assert_eq!(get_iqtree_runtimes(&log).unwrap(), vec![0.648]);

    let model = get_model_parameter_estimates(&log);
    assert_eq!(model.rate_heterogeneity, None);
    assert_eq!(
        model.base_frequencies.as_deref(),
        Some("A: 0.281  C: 0.220  G: 0.231  T: 0.268")
    );
    assert_eq!(model.substitution_rates, None);

    let spr = get_num_spr_rounds(&log).unwrap();
    assert_eq!((spr.slow, spr.fast), (0, 0));
}

#[test]
fn test_iqtree_eval_log_alignment_summary() {
    let summary = get_patterns_gaps_invariant(&fixture("iqtree_eval.log")).unwrap();
    assert_eq!(summary.patterns, 480);
    assert!((summary.gaps - 0.0215).abs() < 1e-12);
    assert!((summary.invariant - 498.0 / 1200.0).abs() < 1e-12);
}

#[test]
fn test_rfdist_fixture() {
    let summary = get_rfdistance_results(&fixture("raxml_rfdist.log")).unwrap();
    assert_eq!(summary.num_topologies, 3);
    assert_eq!(summary.avg_rel_rfdist, 0.15);
}

#[test]
fn test_parsimony_fixture_matches_tree_list() {
    let summary = summarize_parsimony_log(&fixture("parsimony.log")).unwrap();
    let trees = read_tree_list(&fixture("parsimony.trees"));

    assert_eq!(summary.scores, vec![1204, 1198, 1201, 1198, 1210]);
    assert_eq!(summary.scores.len(), trees.len());
    assert_eq!(summary.runtimes.len(), trees.len());
}

#[test]
fn test_statstest_fixture() {
    let table = parse_iqtree_test_table(&fixture("statstest.iqtree")).unwrap();
    assert_eq!(table.len(), 3);

    let mut clusters = ClusterMap::new();
    clusters.insert("((a,b),c,d);", ClusterId::from(2u64));
    let result = table.result_for_tree("((a,b),c,d);", &clusters).unwrap();
    assert!(result.plausible);
    assert_eq!(result.tests.p_au, TestScore::new(0.506, false));

    let excluded = table.get(&ClusterId::from("3")).unwrap();
    assert!(!excluded.plausible);
    assert_eq!(excluded.delta_llh, Some(24.754));
}

#[test]
fn test_source_text_read_uses_path_as_name() {
    let path = fixture_path("parsimony.trees");
    let source = SourceText::read(&path).unwrap();
    assert!(source.name.ends_with("parsimony.trees"));
    assert_eq!(read_tree_list(&source.text).len(), 5);
}
