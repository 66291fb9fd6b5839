//! `sqlsift.toml` configuration.
//!
//! ```toml
//! [validator]
//! max_items = 200000
//! time_budget_ms = 250
//! statement_policy = "all"
//!
//! [extractor]
//! sinks = ["execute", "executemany", "query"]
//!
//! [scan]
//! jobs = 8
//! exclude_dirs = ["migrations"]
//! include_rejected = false
//! timeout_secs = 600
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlsift_core::extractor::ExtractOptions;
use sqlsift_core::validator::ValidatorConfig;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "sqlsift.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiftConfig {
    pub validator: ValidatorConfig,
    pub extractor: ExtractOptions,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Worker count; defaults to available parallelism.
    pub jobs: Option<usize>,
    /// Directory names skipped in addition to the built-in list.
    pub exclude_dirs: Vec<String>,
    /// Also write rejected candidates.
    pub include_rejected: bool,
    pub timeout_secs: Option<u64>,
}

impl SiftConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in '{}'", path.display()))
    }

    /// Load the first configuration found, returning where it came from.
    ///
    /// An explicit path must exist. Otherwise `./sqlsift.toml`, then
    /// `<config dir>/sqlsift/config.toml`, then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }
        for candidate in default_locations() {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading config");
                return Ok((Self::from_file(&candidate)?, Some(candidate)));
            }
        }
        Ok((Self::default(), None))
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("sqlsift").join("config.toml"));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlsift_core::validator::StatementPolicy;

    #[test]
    fn test_full_config() {
        let config = SiftConfig::from_toml(
            r#"
            [validator]
            max_items = 5000
            time_budget_ms = 250
            statement_policy = "any"
            bare_queries = true

            [extractor]
            sinks = ["execute", "query"]

            [scan]
            jobs = 4
            exclude_dirs = ["fixtures"]
            include_rejected = true
            timeout_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.validator.max_items, 5000);
        assert_eq!(config.validator.time_budget_ms, Some(250));
        assert_eq!(config.validator.statement_policy, StatementPolicy::Any);
        assert!(config.validator.bare_queries);
        assert_eq!(config.extractor.sinks, vec!["execute", "query"]);
        assert_eq!(
            config.scan,
            ScanConfig {
                jobs: Some(4),
                exclude_dirs: vec!["fixtures".into()],
                include_rejected: true,
                timeout_secs: Some(60),
            }
        );
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = SiftConfig::from_toml("[scan]\njobs = 2\n").unwrap();
        assert_eq!(config.validator, ValidatorConfig::default());
        assert!(config.extractor.sinks.is_empty());
        assert_eq!(config.scan.jobs, Some(2));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(SiftConfig::from_toml("[scan]\nthreads = 2\n").is_err());
        assert!(SiftConfig::from_toml("[validator]\nstatement_policy = \"most\"\n").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = SiftConfig::load(Some(Path::new("/nonexistent/sqlsift.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config file"));
    }
}
