use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use phylofeat_inputs::AggregationConfig;
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_phylofeat");

const TREE_A: &str = "((t1:0.1,t2:0.2):0.05,t3:0.3,t4:0.4);";
const TREE_B: &str = "((t1:0.1,t3:0.2):0.05,t2:0.3,t4:0.4);";

const STATSTEST: &str = "\
USER TREES
----------

Tree      logL    deltaL  bp-RELL    p-KH     p-SH    p-WKH    p-WSH       c-ELW       p-AU
-------------------------------------------------------------------------------------------
  1  -5765.3656       0   0.912 +  0.881 +      1 +  0.881 +  0.954 +      0.902 +    0.933 +
  2  -5801.2214  35.856   0.088 -  0.019 -  0.041 -  0.019 -  0.032 -     0.0981 -   0.0112 -

";

fn run(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run phylofeat")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn rf_log(topologies: u64, distance: f64) -> String {
    format!(
        "Number of unique topologies in this tree set: {topologies}\n\
         Average relative RF distance in this tree set: {distance:.6}\n"
    )
}

/// Writes one dataset with a parsimony-started run ending in the plausible
/// topology and a random-started run ending in the excluded one.
fn write_dataset(dir: &Path, name: &str) {
    fs::create_dir_all(dir).unwrap();
    for (prefix, tree, llh) in [("pars", TREE_A, -5765.0), ("rand", TREE_B, -5801.0)] {
        write(dir, &format!("{prefix}_search.tree"), &format!("{tree}\n"));
        write(
            dir,
            &format!("{prefix}_search.log"),
            &format!(
                "Initial log-likelihood: {}\nOptimal log-likelihood: {}\nElapsed time: 12.5 seconds\n",
                llh - 250.0,
                llh - 0.5
            ),
        );
        write(dir, &format!("{prefix}_eval.tree"), &format!("{tree}\n"));
        write(
            dir,
            &format!("{prefix}_eval.log"),
            &format!("Optimal log-likelihood: {llh}\nTotal wall-clock time used: 0.61 sec (0h:0m:0s)\n"),
        );
    }
    write(dir, "start.tree", "((t1,t3),t2,t4);\n");
    write(
        dir,
        "search.log",
        "Optimal log-likelihood: -5765.5\nOptimal log-likelihood: -5801.5\n",
    );
    write(
        dir,
        "eval.log",
        "Optimal log-likelihood: -5765\nOptimal log-likelihood: -5801\n",
    );
    write(dir, "search.rf.log", &rf_log(2, 0.5));
    write(dir, "eval.rf.log", &rf_log(2, 0.5));
    write(dir, "plausible.rf.log", &rf_log(1, 0.0));
    write(dir, "parsimony.rf.log", &rf_log(2, 0.5));
    write(dir, "parsimony.trees", "((t1,t2),t3,t4);\n((t1,t3),t2,t4);\n");
    write(
        dir,
        "parsimony.log",
        "Parsimony score: 412\nElapsed time: 0.02 seconds\nParsimony score: 415\nElapsed time: 0.03 seconds\n",
    );
    write(dir, "statstest.iqtree", STATSTEST);
    write(
        dir,
        "clusters.json",
        &serde_json::json!({ TREE_A: 1, TREE_B: 2 }).to_string(),
    );
    write(
        dir,
        "msa.json",
        r#"{"taxa": 4, "sites": 1200, "patterns": 480, "gaps": 0.02,
            "invariant": 0.41, "entropy": 0.62, "bollback": -3512.7}"#,
    );

    let entry = format!(
        "  - name: {name}
    data_type: DNA
    parsimony_started:
      - {{search_tree: {d}/pars_search.tree, search_log: {d}/pars_search.log, eval_tree: {d}/pars_eval.tree, eval_log: {d}/pars_eval.log}}
    random_started:
      - {{search_tree: {d}/rand_search.tree, search_log: {d}/rand_search.log, eval_tree: {d}/rand_eval.tree, eval_log: {d}/rand_eval.log}}
    starting_tree: {d}/start.tree
    search_logs_collected: {d}/search.log
    eval_logs_collected: {d}/eval.log
    search_rfdistance: {d}/search.rf.log
    eval_rfdistance: {d}/eval.rf.log
    plausible_rfdistance: {d}/plausible.rf.log
    parsimony_rfdistance: {d}/parsimony.rf.log
    parsimony_trees: {d}/parsimony.trees
    parsimony_logs: {d}/parsimony.log
    significance: {d}/statstest.iqtree
    clusters: {d}/clusters.json
    msa_features: {d}/msa.json
",
        d = name
    );
    fs::write(dir.with_extension("entry"), entry).unwrap();
}

/// Writes a manifest over the given dataset directories (relative to `root`).
fn write_manifest(root: &Path, names: &[&str]) -> PathBuf {
    let mut manifest = String::from("version: \"1.0\"\ndatasets:\n");
    for name in names {
        manifest.push_str(&fs::read_to_string(root.join(name).with_extension("entry")).unwrap());
    }
    let path = root.join("datasets.yml");
    fs::write(&path, manifest).unwrap();
    path
}

/// Configuration whose RF tool is a shell script writing a fixed summary.
fn write_config(root: &Path) -> PathBuf {
    let mut config = AggregationConfig::default();
    config.rfdist.executable = "sh".to_string();
    config.rfdist.args = vec![
        "-c".to_string(),
        "test -s {trees} && printf 'Number of unique topologies in this tree set: 2\\nAverage relative RF distance in this tree set: 0.200000\\n' > {prefix}.raxml.log".to_string(),
    ];
    config.rfdist.timeout_secs = 30;
    config.jobs = 2;
    let path = root.join("phylofeat.yml");
    config.save(&path).unwrap();
    path
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

#[test]
fn parse_rfdist_prints_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("rf.raxml.log");
    fs::write(&input, rf_log(7, 0.25)).unwrap();

    let out = run(&["parse", "--kind", "rfdist", "--input", path_str(&input)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["num_topologies"], 7);
    assert_eq!(json["avg_rel_rfdist"], 0.25);
}

#[test]
fn parse_statstest_reports_plausible_flags() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("statstest.iqtree");
    fs::write(&input, STATSTEST).unwrap();

    let out = run(&["parse", "--kind", "statstest", "--input", path_str(&input)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["1"]["plausible"], true);
    assert_eq!(json["2"]["plausible"], false);
    assert_eq!(json["2"]["tests"]["p-AU"]["significant"], true);
}

#[test]
fn parse_iqtree_summarizes_search_log() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("search.log");
    fs::write(
        &input,
        "Optimal log-likelihood: -10.5\nOptimal log-likelihood: -9.5\nElapsed time: 3.25 seconds\n",
    )
    .unwrap();

    let out = run(&["parse", "--kind", "iqtree", "--input", path_str(&input)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["final_llh"], -9.5);
    assert_eq!(json["elapsed_times"][0], 3.25);
    assert!(json["starting_llh"].is_null());
    assert_eq!(json["warnings"][0], "missing_starting_llh");
}

#[test]
fn parse_missing_marker_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("parsimony.log");
    fs::write(&input, "nothing useful here\n").unwrap();

    let out = run(&["parse", "--kind", "parsimony", "--input", path_str(&input)]);
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("error:"), "stderr: {err}");
    assert!(err.contains("parsimony.log"), "stderr: {err}");
}

// ---------------------------------------------------------------------------
// migrate
// ---------------------------------------------------------------------------

#[test]
fn migrate_up_status_down() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("features.db");
    let db = path_str(&db);

    let out = run(&["migrate", "up", "--db", db, "--prefix", "pf_"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let out = run(&["migrate", "status", "--db", db, "--prefix", "pf_"]);
    let text = stdout(&out);
    assert!(text.contains("Tables exist: yes"), "stdout: {text}");
    assert!(text.contains("Dataset count: 0"), "stdout: {text}");

    let out = run(&["migrate", "down", "--db", db, "--prefix", "pf_"]);
    assert!(out.status.success());

    let out = run(&["migrate", "status", "--db", db, "--prefix", "pf_"]);
    assert!(stdout(&out).contains("Tables exist: no"));
}

#[test]
fn migrate_status_lists_missing_tables() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("features.db");

    let out = run(&["migrate", "up", "--db", path_str(&db), "--prefix", "pf_"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    rusqlite::Connection::open(&db)
        .unwrap()
        .execute_batch("DROP TABLE pf_parsimony_trees;")
        .unwrap();

    let out = run(&["migrate", "status", "--db", path_str(&db), "--prefix", "pf_"]);
    let text = stdout(&out);
    assert!(text.contains("Tables exist: no"), "stdout: {text}");
    assert!(text.contains("Missing tables: pf_parsimony_trees"), "stdout: {text}");
}

#[test]
fn migrate_rejects_invalid_prefix() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("features.db");

    let out = run(&["migrate", "up", "--db", path_str(&db), "--prefix", "drop;--"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("invalid prefix"));
}

// ---------------------------------------------------------------------------
// aggregate + show
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn aggregate_stores_datasets_and_show_reads_them_back() {
    let root = TempDir::new().unwrap();
    write_dataset(&root.path().join("alpha"), "alpha");
    write_dataset(&root.path().join("beta"), "beta");
    let manifest = write_manifest(root.path(), &["alpha", "beta"]);
    let config = write_config(root.path());
    let db = root.path().join("features.db");

    let args = [
        "aggregate",
        "--manifest",
        path_str(&manifest),
        "--config",
        path_str(&config),
        "--db",
        path_str(&db),
    ];
    let out = run(&args);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("Stored: 2"), "stdout: {text}");
    assert!(text.contains("Failed: 0"), "stdout: {text}");

    let out = run(&["migrate", "status", "--db", path_str(&db), "--prefix", "pf_"]);
    let text = stdout(&out);
    assert!(text.contains("Dataset count: 2"), "stdout: {text}");
    assert!(text.contains("Tree count: 4"), "stdout: {text}");
    assert!(text.contains("Parsimony tree count: 4"), "stdout: {text}");

    let out = run(&["show", "--db", path_str(&db), "--prefix", "pf_", "--name", "alpha"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let records: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(records["dataset"]["name"], "alpha");
    assert_eq!(records["dataset"]["num_searches"], 2);
    assert_eq!(records["dataset"]["plausible"]["proportion"], 0.5);
    assert_eq!(
        records["dataset"]["single_inference"]["rfdistance_starting_final"],
        0.2
    );
    assert_eq!(records["trees"].as_array().unwrap().len(), 2);
    assert_eq!(records["trees"][1]["starting_type"], "random");
    assert_eq!(records["trees"][1]["plausible"], false);

    // Stored names are unique unless --replace is given
    let out = run(&args);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("already stored"));

    let mut replace = args.to_vec();
    replace.push("--replace");
    let out = run(&replace);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let out = run(&["show", "--db", path_str(&db), "--prefix", "pf_"]);
    assert!(stdout(&out).contains("Datasets: 2"));
}

#[cfg(unix)]
#[test]
fn aggregate_reports_failed_dataset_and_keeps_the_rest() {
    let root = TempDir::new().unwrap();
    write_dataset(&root.path().join("good"), "good");
    write_dataset(&root.path().join("bad"), "bad");
    // One parsimony score short of the tree list
    write(
        &root.path().join("bad"),
        "parsimony.log",
        "Parsimony score: 412\nElapsed time: 0.02 seconds\n",
    );
    let manifest = write_manifest(root.path(), &["good", "bad"]);
    let config = write_config(root.path());
    let db = root.path().join("features.db");

    let out = run(&[
        "aggregate",
        "--manifest",
        path_str(&manifest),
        "--config",
        path_str(&config),
        "--db",
        path_str(&db),
        "--prefix",
        "run1_",
        "--jobs",
        "1",
    ]);
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("bad:"), "stderr: {err}");
    assert!(err.contains("1 of 2 datasets failed"), "stderr: {err}");
    assert!(stdout(&out).contains("Stored: 1"));

    let out = run(&["show", "--db", path_str(&db), "--prefix", "run1_"]);
    let text = stdout(&out);
    assert!(text.contains("Datasets: 1"), "stdout: {text}");
    assert!(text.contains("good"), "stdout: {text}");
}

#[test]
fn aggregate_missing_manifest_fails() {
    let dir = TempDir::new().unwrap();
    let out = run(&[
        "aggregate",
        "--manifest",
        path_str(&dir.path().join("missing.yml")),
        "--db",
        path_str(&dir.path().join("features.db")),
    ]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Failed to load manifest"));
}
