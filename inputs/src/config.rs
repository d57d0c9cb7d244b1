//! Aggregation configuration.
//!
//! Defines the YAML-serializable configuration that controls the RF-distance
//! tool, the store table prefix, and aggregation parallelism. Every section
//! has defaults, so an empty file is a valid configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! rfdist:
//!   executable: raxml-ng
//!   args: ["--rfdist", "--tree", "{trees}", "--prefix", "{prefix}", "--redo"]
//!   log_file: "{prefix}.raxml.log"
//!   timeout_secs: 600
//! store:
//!   table_prefix: "pf_"
//! jobs: 4
//! eval_rfdist_from: search_set
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

use phylofeat_parser::{EvalRfDistance, ToolRfDistance};
use phylofeat_parser::runner::TREES_PLACEHOLDER;
use serde::{Deserialize, Serialize};

use crate::error::{InputError, Result};

/// How the RF-distance tool is invoked.
///
/// `{trees}` in `args` is replaced by the scratch tree file and `{prefix}` in
/// `args` and `log_file` by the scratch output prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfDistConfig {
    pub executable: String,
    pub args: Vec<String>,
    pub log_file: String,
    pub timeout_secs: u64,
}

impl Default for RfDistConfig {
    fn default() -> Self {
        let tool = ToolRfDistance::default();
        Self {
            executable: tool.executable,
            args: tool.args,
            log_file: tool.log_file,
            timeout_secs: tool.timeout.as_secs(),
        }
    }
}

impl RfDistConfig {
    /// Builds the tool runner described by this section.
    pub fn to_tool(&self) -> ToolRfDistance {
        ToolRfDistance {
            executable: self.executable.clone(),
            args: self.args.clone(),
            log_file: self.log_file.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prefix of every table name.
    pub table_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_prefix: "pf_".to_string(),
        }
    }
}

/// Top-level aggregation configuration.
///
/// # Examples
///
/// ```
/// use phylofeat_inputs::AggregationConfig;
///
/// let config: AggregationConfig = serde_yaml::from_str("jobs: 2").unwrap();
/// assert_eq!(config.jobs, 2);
/// assert_eq!(config.rfdist.executable, "raxml-ng");
/// assert_eq!(config.store.table_prefix, "pf_");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    pub rfdist: RfDistConfig,
    pub store: StoreConfig,
    /// Number of datasets aggregated in parallel.
    pub jobs: usize,
    /// Summary the eval set's average RF distance is read from.
    pub eval_rfdist_from: EvalRfDistance,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            rfdist: RfDistConfig::default(),
            store: StoreConfig::default(),
            jobs: 4,
            eval_rfdist_from: EvalRfDistance::default(),
        }
    }
}

impl AggregationConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](InputError::IoError) if the file cannot be read,
    /// [`YamlError`](InputError::YamlError) if parsing fails, and
    /// [`InvalidConfig`](InputError::InvalidConfig) if a value is unusable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.rfdist.executable.trim().is_empty() {
            return Err(InputError::InvalidConfig("rfdist.executable is empty".into()));
        }
        if !self.rfdist.args.iter().any(|arg| arg.contains(TREES_PLACEHOLDER)) {
            return Err(InputError::InvalidConfig(format!(
                "rfdist.args must reference {TREES_PLACEHOLDER}"
            )));
        }
        if self.rfdist.timeout_secs == 0 {
            return Err(InputError::InvalidConfig("rfdist.timeout_secs must be positive".into()));
        }
        if self.jobs == 0 {
            return Err(InputError::InvalidConfig("jobs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AggregationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rfdist.timeout_secs, 600);
        assert_eq!(config.rfdist.log_file, "{prefix}.raxml.log");
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "rfdist:\n  executable: /opt/raxml-ng/bin/raxml-ng\n";
        let config: AggregationConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.rfdist.executable, "/opt/raxml-ng/bin/raxml-ng");
        assert!(config.rfdist.args.iter().any(|a| a == "--rfdist"));
        assert_eq!(config.jobs, 4);
    }

    #[test]
    fn test_args_without_tree_placeholder_rejected() {
        let mut config = AggregationConfig::default();
        config.rfdist.args = vec!["--rfdist".into()];
        assert!(matches!(
            config.validate().unwrap_err(),
            InputError::InvalidConfig(_)
        ));
    }

    #[test]
    fn test_eval_rfdist_source_from_yaml() {
        let config: AggregationConfig = serde_yaml::from_str("jobs: 1").unwrap();
        assert_eq!(config.eval_rfdist_from, EvalRfDistance::SearchSet);

        let config: AggregationConfig =
            serde_yaml::from_str("eval_rfdist_from: eval_set").unwrap();
        assert_eq!(config.eval_rfdist_from, EvalRfDistance::EvalSet);
        assert!(serde_yaml::from_str::<AggregationConfig>("eval_rfdist_from: both").is_err());
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let config = AggregationConfig {
            jobs: 0,
            ..AggregationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_tool() {
        let mut config = RfDistConfig::default();
        config.timeout_secs = 30;
        let tool = config.to_tool();
        assert_eq!(tool.timeout, Duration::from_secs(30));
        assert_eq!(tool.args, config.args);
    }
}
