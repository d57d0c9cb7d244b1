//! RF-distance computation through an external tool.
//!
//! The aggregator needs the relative RF distance between the starting and the
//! final tree of one run. [`ToolRfDistance`] writes both trees to a scratch
//! tree file, runs the configured tool on it, and summarizes the tool's log
//! with [`get_rfdistance_results`]. The scratch directory is removed when the
//! call returns, whether it succeeded or not.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use phylofeat_core::TopologySummary;
use tracing::debug;
use wait_timeout::ChildExt;

use crate::error::ToolError;
use crate::rfdist::get_rfdistance_results;

/// Placeholder replaced by the scratch tree-file path.
pub const TREES_PLACEHOLDER: &str = "{trees}";
/// Placeholder replaced by the scratch output prefix.
pub const PREFIX_PLACEHOLDER: &str = "{prefix}";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Computes the relative RF distance between two trees.
pub trait RfDistanceCalculator {
    fn relative_rf_distance(&self, starting: &str, final_tree: &str) -> Result<f64, ToolError>;
}

/// Runs an RF-distance tool as a child process.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRfDistance {
    pub executable: String,
    /// Arguments; `{trees}` and `{prefix}` are substituted.
    pub args: Vec<String>,
    /// Log file the summary is read from; `{prefix}` is substituted.
    /// Relative paths resolve against the scratch directory.
    pub log_file: String,
    pub timeout: Duration,
}

impl Default for ToolRfDistance {
    /// `raxml-ng --rfdist --tree {trees} --prefix {prefix} --redo`.
    fn default() -> Self {
        Self {
            executable: "raxml-ng".to_string(),
            args: ["--rfdist", "--tree", TREES_PLACEHOLDER, "--prefix", PREFIX_PLACEHOLDER, "--redo"]
                .map(str::to_string)
                .to_vec(),
            log_file: format!("{PREFIX_PLACEHOLDER}.raxml.log"),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ToolRfDistance {
    /// Summarizes an arbitrary tree set (one newick per entry).
    pub fn summarize_trees(&self, trees: &[&str]) -> Result<TopologySummary, ToolError> {
        let workspace = tempfile::Builder::new()
            .prefix("phylofeat-rfdist-")
            .tempdir()?;
        let trees_path = workspace.path().join("trees.nwk");
        let prefix = workspace.path().join("rfdist");

        let mut contents = String::new();
        for tree in trees {
            contents.push_str(tree.trim());
            contents.push('\n');
        }
        fs::write(&trees_path, contents)?;

        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| substitute(arg, &trees_path, &prefix))
            .collect();
        let command_line = std::iter::once(self.executable.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        debug!(command = %command_line, trees = trees.len(), "running RF-distance tool");

        let output = self.run(&args, workspace.path(), &command_line)?;

        let log_path = workspace
            .path()
            .join(substitute(&self.log_file, &trees_path, &prefix));
        let log = fs::read_to_string(&log_path).map_err(|e| ToolError::Failed {
            command: command_line.clone(),
            details: format!(
                "cannot read log {}: {e}; tool output: {}",
                log_path.display(),
                error_details(&output)
            ),
        })?;

        Ok(get_rfdistance_results(&log)?)
    }

    /// Spawns the tool and returns its combined stdout and stderr.
    fn run(&self, args: &[String], workdir: &Path, command_line: &str) -> Result<String, ToolError> {
        let mut child = Command::new(&self.executable)
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: self.executable.clone(),
                source,
            })?;

        // Drain both pipes so a chatty tool cannot block on a full buffer.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let Some(status) = child.wait_timeout(self.timeout)? else {
            if let Err(e) = child.kill() {
                debug!(command = %command_line, error = %e, "failed to kill timed out tool");
            }
            let _ = child.wait();
            return Err(ToolError::Timeout {
                command: command_line.to_string(),
                timeout_secs: self.timeout.as_secs(),
            });
        };

        let mut output = join_output(stdout);
        output.push_str(&join_output(stderr));

        if !status.success() {
            return Err(ToolError::Failed {
                command: command_line.to_string(),
                details: format!("{status}: {}", error_details(&output)),
            });
        }
        Ok(output)
    }
}

impl RfDistanceCalculator for ToolRfDistance {
    fn relative_rf_distance(&self, starting: &str, final_tree: &str) -> Result<f64, ToolError> {
        Ok(self.summarize_trees(&[starting, final_tree])?.avg_rel_rfdist)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            debug!(error = %e, "failed to read tool output");
        }
        buf
    })
}

fn join_output(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

fn substitute(template: &str, trees: &Path, prefix: &Path) -> String {
    template
        .replace(TREES_PLACEHOLDER, &trees.display().to_string())
        .replace(PREFIX_PLACEHOLDER, &prefix.display().to_string())
}

/// Keeps only the tool's `ERROR` lines when it printed any.
fn error_details(output: &str) -> String {
    let errors: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR"))
        .collect();
    if errors.is_empty() {
        output.trim().to_string()
    } else {
        errors.join("\n")
    }
}
