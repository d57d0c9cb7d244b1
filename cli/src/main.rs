use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use phylofeat_core::DatasetRecords;
use phylofeat_inputs::{AggregationConfig, DatasetManifest, load_dataset_sources};
use phylofeat_parser::iqtree::summarize_search_log;
use phylofeat_parser::parsimony::summarize_parsimony_log;
use phylofeat_parser::rfdist::get_rfdistance_results;
use phylofeat_parser::{Aggregation, parse_iqtree_test_table};
use phylofeat_sqlite::{DatasetStore, Migration};
use rayon::prelude::*;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "phylofeat")]
#[command(about = "Tree-search log parsing and difficulty feature aggregation")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Aggregate every dataset of a manifest and store the records.
    Aggregate(AggregateArgs),
    /// Parse a single log file and print the extracted values as JSON.
    Parse(ParseArgs),
    /// Print stored datasets, or the full records of one dataset.
    Show(ShowArgs),
    /// SQLite table lifecycle operations.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args)]
struct AggregateArgs {
    /// Path to the dataset manifest (YAML).
    #[arg(long)]
    manifest: PathBuf,
    /// Path to the configuration file (YAML); defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Table prefix (overrides the configuration).
    #[arg(long)]
    prefix: Option<String>,
    /// Number of datasets aggregated in parallel (overrides the configuration).
    #[arg(long)]
    jobs: Option<usize>,
    /// Replace datasets that are already stored instead of failing.
    #[arg(long)]
    replace: bool,
}

/// Log kinds understood by `parse`.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogKind {
    /// IQ-TREE or RAxML-NG tree-search log.
    Iqtree,
    /// RF-distance summary log.
    Rfdist,
    /// Parsimony-only inference log.
    Parsimony,
    /// IQ-TREE report with the tree-test table.
    Statstest,
}

#[derive(Debug, Args)]
struct ParseArgs {
    #[arg(long, value_enum)]
    kind: LogKind,
    /// Path to the log file.
    #[arg(long)]
    input: PathBuf,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Table prefix.
    #[arg(long)]
    prefix: String,
    /// Print the full records of this dataset as JSON.
    #[arg(long)]
    name: Option<String>,
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create the record tables in the database.
    Up(DbArgs),
    /// Drop the record tables from the database.
    Down(DbArgs),
    /// Show table status and row counts.
    Status(DbArgs),
}

#[derive(Debug, Args)]
struct DbArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Table prefix.
    #[arg(long)]
    prefix: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Aggregate(args) => run_aggregate(args),
        Command::Parse(args) => run_parse(args),
        Command::Show(args) => run_show(args),
        Command::Migrate(args) => run_migrate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn open_database(db: &PathBuf) -> Result<rusqlite::Connection, String> {
    rusqlite::Connection::open(db)
        .map_err(|e| format!("Failed to open database '{}': {e}", db.display()))
}

// ---------------------------------------------------------------------------
// aggregate command
// ---------------------------------------------------------------------------

struct DatasetOutcome {
    name: String,
    result: Result<Aggregation, String>,
}

fn run_aggregate(args: AggregateArgs) -> Result<(), String> {
    // 1. Configuration, with command-line overrides
    let config = match &args.config {
        Some(path) => AggregationConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => AggregationConfig::default(),
    };
    let prefix = args
        .prefix
        .clone()
        .unwrap_or_else(|| config.store.table_prefix.clone());
    let jobs = args.jobs.unwrap_or(config.jobs);
    if jobs == 0 {
        return Err("--jobs must be at least 1".to_string());
    }

    let manifest = DatasetManifest::load(&args.manifest)
        .map_err(|e| format!("Failed to load manifest '{}': {e}", args.manifest.display()))?;
    let tool = config.rfdist.to_tool();
    let eval_rfdist_from = config.eval_rfdist_from;

    // 2. Aggregate datasets in parallel; each pass is independent
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| format!("Failed to create thread pool: {e}"))?;

    let outcomes: Vec<DatasetOutcome> = pool.install(|| {
        manifest
            .datasets
            .par_iter()
            .map(|entry| {
                let result = load_dataset_sources(entry)
                    .map_err(|e| e.to_string())
                    .and_then(|mut sources| {
                        sources.eval_rfdist_from = eval_rfdist_from;
                        phylofeat_parser::aggregate_dataset(&sources, &tool)
                            .map_err(|e| e.to_string())
                    });
                DatasetOutcome {
                    name: entry.name.clone(),
                    result,
                }
            })
            .collect()
    });

    // 3. Persist successes sequentially
    let conn = open_database(&args.db)?;
    let mut migration = Migration::new(conn, prefix.as_str())
        .map_err(|e| format!("Failed to initialize migration: {e}"))?;
    migration
        .up()
        .map_err(|e| format!("Failed to create tables: {e}"))?;
    let conn = migration.into_connection();
    let store = DatasetStore::new(&conn, prefix.as_str())
        .map_err(|e| format!("Failed to open store: {e}"))?;

    let mut stored = 0usize;
    let mut warning_count = 0usize;
    let mut failures: Vec<(String, String)> = Vec::new();

    for outcome in outcomes {
        let aggregation = match outcome.result {
            Ok(aggregation) => aggregation,
            Err(err) => {
                failures.push((outcome.name, err));
                continue;
            }
        };
        for warning in &aggregation.warnings {
            eprintln!("warning: {}: {warning}", outcome.name);
        }
        warning_count += aggregation.warnings.len();

        let written = if args.replace {
            store.replace_aggregate(&aggregation.records)
        } else {
            store.insert_aggregate(&aggregation.records)
        };
        match written {
            Ok(report) => {
                debug!(dataset = %outcome.name, trees = report.trees_inserted, "persisted");
                stored += 1;
            }
            Err(err) => failures.push((outcome.name, format!("Failed to store records: {err}"))),
        }
    }

    // 4. Summary report
    println!("Aggregate Summary:");
    println!("  Datasets: {}", manifest.datasets.len());
    println!("  Stored: {stored}");
    println!("  Warnings: {warning_count}");
    println!("  Failed: {}", failures.len());

    if !failures.is_empty() {
        eprintln!("\nFailures:");
        for (name, err) in &failures {
            warn!(dataset = %name, "aggregation failed");
            eprintln!("  {name}: {err}");
        }
        return Err(format!(
            "{} of {} datasets failed",
            failures.len(),
            manifest.datasets.len()
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// parse command
// ---------------------------------------------------------------------------

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let text = fs::read_to_string(&args.input)
        .map_err(|e| format!("Failed to read '{}': {e}", args.input.display()))?;
    let context = |e: phylofeat_parser::ParseError| format!("{}: {e}", args.input.display());

    let value = match args.kind {
        LogKind::Iqtree => to_json(&summarize_search_log(&text).map_err(context)?),
        LogKind::Rfdist => to_json(&get_rfdistance_results(&text).map_err(context)?),
        LogKind::Parsimony => to_json(&summarize_parsimony_log(&text).map_err(context)?),
        LogKind::Statstest => to_json(&parse_iqtree_test_table(&text).map_err(context)?),
    }?;

    println!("{value}");
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Serialization failed: {e}"))
}

// ---------------------------------------------------------------------------
// show command
// ---------------------------------------------------------------------------

fn run_show(args: ShowArgs) -> Result<(), String> {
    let conn = open_database(&args.db)?;
    let store = DatasetStore::new(&conn, args.prefix.as_str())
        .map_err(|e| format!("Failed to open store: {e}"))?;

    if let Some(name) = &args.name {
        let records: DatasetRecords = store
            .load_records(name)
            .map_err(|e| format!("Failed to load '{name}': {e}"))?
            .ok_or_else(|| format!("dataset not found: {name}"))?;
        println!("{}", to_json(&records)?);
        return Ok(());
    }

    let datasets = store
        .list_datasets()
        .map_err(|e| format!("Failed to list datasets: {e}"))?;
    println!("Datasets: {}", datasets.len());
    for dataset in &datasets {
        println!(
            "  {} ({}): {} searches, {} plausible, created {}",
            dataset.name,
            dataset.uuid,
            dataset.num_searches,
            dataset.plausible.num_trees,
            dataset.created_at
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// migrate command
// ---------------------------------------------------------------------------

fn run_migrate(args: MigrateArgs) -> Result<(), String> {
    match args.operation {
        MigrateOperation::Up(a) => run_migrate_up(a),
        MigrateOperation::Down(a) => run_migrate_down(a),
        MigrateOperation::Status(a) => run_migrate_status(a),
    }
}

fn open_migration(args: &DbArgs) -> Result<Migration, String> {
    let conn = open_database(&args.db)?;
    Migration::new(conn, args.prefix.as_str())
        .map_err(|e| format!("Failed to initialize migration: {e}"))
}

fn run_migrate_up(args: DbArgs) -> Result<(), String> {
    let mut migration = open_migration(&args)?;
    migration
        .up()
        .map_err(|e| format!("Migration up failed: {e}"))?;
    println!(
        "Migration up complete. Tables created with prefix '{}' in '{}'.",
        args.prefix,
        args.db.display()
    );
    Ok(())
}

fn run_migrate_down(args: DbArgs) -> Result<(), String> {
    let mut migration = open_migration(&args)?;
    migration
        .down()
        .map_err(|e| format!("Migration down failed: {e}"))?;
    println!(
        "Migration down complete. Tables with prefix '{}' dropped from '{}'.",
        args.prefix,
        args.db.display()
    );
    Ok(())
}

fn run_migrate_status(args: DbArgs) -> Result<(), String> {
    let migration = open_migration(&args)?;
    let status = migration
        .status()
        .map_err(|e| format!("Failed to get migration status: {e}"))?;
    println!("Migration Status:");
    println!(
        "  Tables exist: {}",
        if status.tables_exist { "yes" } else { "no" }
    );
    if !status.tables_exist && status.missing_tables.len() < 3 {
        println!("  Missing tables: {}", status.missing_tables.join(", "));
    }
    println!("  Dataset count: {}", status.dataset_count);
    println!("  Tree count: {}", status.tree_count);
    println!("  Parsimony tree count: {}", status.parsimony_tree_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_kind_values() {
        let cli = Cli::try_parse_from([
            "phylofeat",
            "parse",
            "--kind",
            "statstest",
            "--input",
            "x.iqtree",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Parse(ParseArgs {
                kind: LogKind::Statstest,
                ..
            })
        ));
    }

    #[test]
    fn test_aggregate_overrides_are_optional() {
        let cli = Cli::try_parse_from([
            "phylofeat",
            "aggregate",
            "--manifest",
            "datasets.yml",
            "--db",
            "features.db",
        ])
        .unwrap();
        match cli.command {
            Command::Aggregate(args) => {
                assert!(args.prefix.is_none());
                assert!(args.jobs.is_none());
                assert!(!args.replace);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
