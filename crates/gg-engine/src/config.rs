//! Pipeline configuration: defaults, optional JSON file, environment
//! overrides.

use std::path::{Path, PathBuf};

use gg_data::{DEFAULT_DATA_PATH, DEFAULT_SPLIT_SEED, DEFAULT_TEST_SIZE};
use gg_optimizer::OptimizerConfig;
use gg_types::{config_error, GgError, GgResult};
use serde::{Deserialize, Serialize};

pub const DATA_PATH_ENV: &str = "GREYGOOSE_DATA_PATH";
pub const RESULTS_DIR_ENV: &str = "GREYGOOSE_RESULTS_DIR";
pub const DEFAULT_RESULTS_DIR: &str = "results";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_path: PathBuf,
    pub results_dir: PathBuf,
    /// Share of rows held out for the final evaluation.
    pub test_size: f64,
    pub split_seed: u64,
    pub optimizer: OptimizerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            test_size: DEFAULT_TEST_SIZE,
            split_seed: DEFAULT_SPLIT_SEED,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Read a config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> GgResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| GgError::persistence(path, e))?;
        serde_json::from_str(&raw)
            .map_err(|e| config_error!("invalid config file {}: {}", path.display(), e))
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Apply `GREYGOOSE_DATA_PATH` and `GREYGOOSE_RESULTS_DIR`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply path overrides from any key lookup; empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());
        if let Some(path) = non_empty(DATA_PATH_ENV) {
            self.data_path = PathBuf::from(path);
        }
        if let Some(dir) = non_empty(RESULTS_DIR_ENV) {
            self.results_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn validate(&self) -> GgResult<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(config_error!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            ));
        }
        self.optimizer.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(config.results_dir, PathBuf::from("results"));
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.split_seed, 42);
        assert_eq!(config.optimizer.population_size, 10);
        assert_eq!(config.optimizer.max_iterations, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_replace_paths() {
        let vars: HashMap<&str, &str> = [
            (DATA_PATH_ENV, "/data/vehicles.csv"),
            (RESULTS_DIR_ENV, "  "),
        ]
        .into_iter()
        .collect();

        let config = PipelineConfig::default()
            .with_overrides_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.data_path, PathBuf::from("/data/vehicles.csv"));
        assert_eq!(config.results_dir, PathBuf::from(DEFAULT_RESULTS_DIR));
    }

    #[test]
    fn partial_json_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("greygoose.json");
        std::fs::write(
            &path,
            r#"{ "results_dir": "out", "optimizer": { "population_size": 4, "max_iterations": 2, "scale": 0.2, "seed": 9 } }"#,
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.results_dir, PathBuf::from("out"));
        assert_eq!(config.test_size, DEFAULT_TEST_SIZE);
        assert_eq!(config.optimizer.population_size, 4);
        assert_eq!(config.optimizer.seed, Some(9));
    }

    #[test]
    fn bad_inputs() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(dir.path().join("missing.json")),
            Err(GgError::Persistence { .. })
        ));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(GgError::Config(_))
        ));

        for test_size in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(PipelineConfig::default().with_test_size(test_size).validate().is_err());
        }
        let zero_pop = OptimizerConfig::default().with_population_size(0);
        assert!(PipelineConfig::default().with_optimizer(zero_pop).validate().is_err());
    }
}
