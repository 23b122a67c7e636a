//! Result artifacts on disk: `best_params.json`, `metrics.json` and the
//! optimization run record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use gg_model::{Hyperparameters, RegressionMetrics};
use gg_optimizer::OptimizationResult;
use gg_types::{GgError, GgResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const BEST_PARAMS_FILE: &str = "best_params.json";
pub const METRICS_FILE: &str = "metrics.json";
pub const OPTIMIZATION_RUN_FILE: &str = "optimization_run.json";

/// Best hyperparameters found by a search, with their cross-validated RMSE.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestParams {
    pub learning_rate_init: f64,
    pub hidden_layer_size_1: i64,
    pub hidden_layer_size_2: i64,
    /// Written as `null` when no evaluation succeeded.
    #[serde(with = "finite_or_null")]
    pub best_rmse: f64,
}

impl BestParams {
    pub fn from_result(result: &OptimizationResult) -> GgResult<Self> {
        let params = Hyperparameters::from_parameters(&result.parameters)?;
        Ok(Self::new(params, result.best_fitness))
    }

    pub fn new(params: Hyperparameters, best_rmse: f64) -> Self {
        Self {
            learning_rate_init: params.learning_rate_init,
            hidden_layer_size_1: params.hidden_layer_size_1,
            hidden_layer_size_2: params.hidden_layer_size_2,
            best_rmse,
        }
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters {
            learning_rate_init: self.learning_rate_init,
            hidden_layer_size_1: self.hidden_layer_size_1,
            hidden_layer_size_2: self.hidden_layer_size_2,
        }
    }
}

/// JSON has no infinity; map it to `null` and back.
mod finite_or_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// Locations of every artifact under one results directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn best_params_path(&self) -> PathBuf {
        self.root.join(BEST_PARAMS_FILE)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.root.join(METRICS_FILE)
    }

    pub fn optimization_run_path(&self) -> PathBuf {
        self.root.join(OPTIMIZATION_RUN_FILE)
    }

    pub async fn write_best_params(&self, params: &BestParams) -> GgResult<PathBuf> {
        let path = self.best_params_path();
        write_json(&path, params).await?;
        info!("Best parameters saved to {}", path.display());
        Ok(path)
    }

    /// `Ok(None)` if the file does not exist; an error if it exists but
    /// cannot be read or parsed.
    pub async fn read_best_params(&self) -> GgResult<Option<BestParams>> {
        read_json(&self.best_params_path()).await
    }

    pub async fn write_metrics(&self, metrics: &RegressionMetrics) -> GgResult<PathBuf> {
        let path = self.metrics_path();
        write_json(&path, metrics).await?;
        info!("Metrics saved to {}", path.display());
        Ok(path)
    }

    pub async fn read_metrics(&self) -> GgResult<Option<RegressionMetrics>> {
        read_json(&self.metrics_path()).await
    }

    pub async fn write_optimization_run(&self, result: &OptimizationResult) -> GgResult<PathBuf> {
        let path = self.optimization_run_path();
        write_json(&path, result).await?;
        Ok(path)
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> GgResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| GgError::persistence(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| GgError::persistence(path, e))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| GgError::persistence(path, e))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> GgResult<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(GgError::persistence(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| GgError::persistence(path, e))
}
