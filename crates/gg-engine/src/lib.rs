// GreyGoose pipeline engine: optimize, train and evaluate the CO2 regressor.

pub mod config;
pub mod evaluate;
pub mod optimize;
pub mod persist;
pub mod train;

use std::sync::Arc;

use gg_data::{get_data_splits, load_data, DataSplits};
use gg_model::{Hyperparameters, RegressionMetrics};
use gg_optimizer::OptimizationResult;
use gg_types::{internal_error, GgError, GgResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub use config::PipelineConfig;
pub use evaluate::evaluate_model;
pub use optimize::{optimize_with, run_optimization};
pub use persist::{ArtifactStore, BestParams};
pub use train::{train_final_model, ParamsSource, TrainedModel};

/// Result of the `optimize` stage.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub best_params: BestParams,
    pub result: OptimizationResult,
}

/// Summary of a full optimize, train and evaluate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub best_params: BestParams,
    pub metrics: RegressionMetrics,
}

/// Drives the pipeline stages and their artifacts. The dataset is loaded and
/// split once, on first use.
#[derive(Debug)]
pub struct GreyGooseEngine {
    config: PipelineConfig,
    store: ArtifactStore,
    splits: Option<Arc<DataSplits>>,
}

impl GreyGooseEngine {
    pub fn new(config: PipelineConfig) -> GgResult<Self> {
        config.validate()?;
        info!("Initializing GreyGoose engine");
        Ok(Self {
            store: ArtifactStore::new(&config.results_dir),
            config,
            splits: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Load the CSV and split it, or return the cached split.
    pub async fn load_splits(&mut self) -> GgResult<Arc<DataSplits>> {
        if let Some(splits) = &self.splits {
            return Ok(Arc::clone(splits));
        }

        let path = self.config.data_path.clone();
        let test_size = self.config.test_size;
        let seed = self.config.split_seed;
        let splits = blocking(move || {
            let records = load_data(&path)?;
            get_data_splits(&records, test_size, seed)
        })
        .await?;

        let splits = Arc::new(splits);
        self.splits = Some(Arc::clone(&splits));
        Ok(splits)
    }

    /// Search for the best hyperparameters and save them to
    /// `best_params.json`.
    pub async fn optimize(&mut self) -> GgResult<OptimizationOutcome> {
        let splits = self.load_splits().await?;
        let config = self.config.optimizer.clone();
        let result = blocking(move || run_optimization(&splits, &config)).await?;

        let best_params = BestParams::from_result(&result)?;
        self.store.write_best_params(&best_params).await?;
        if let Err(e) = self.store.write_optimization_run(&result).await {
            warn!("Could not save optimization run record: {e}");
        }

        Ok(OptimizationOutcome {
            best_params,
            result,
        })
    }

    /// Hyperparameters for the final model: saved ones if present, a fresh
    /// search if the file is missing, defaults if it cannot be read.
    pub async fn resolve_params(&mut self) -> GgResult<(Hyperparameters, ParamsSource)> {
        let saved = self.store.read_best_params().await;
        match saved {
            Ok(Some(saved)) => {
                info!("Loaded best parameters from {}", self.store.best_params_path().display());
                Ok((saved.hyperparameters(), ParamsSource::Saved))
            }
            Ok(None) => {
                info!("Best parameters not found. Running optimization...");
                let outcome = self.optimize().await?;
                Ok((outcome.best_params.hyperparameters(), ParamsSource::Optimized))
            }
            Err(e) => {
                error!("Error loading best parameters: {e}. Using default parameters.");
                Ok((Hyperparameters::default(), ParamsSource::Defaults))
            }
        }
    }

    pub async fn train(&mut self) -> GgResult<TrainedModel> {
        let (params, source) = self.resolve_params().await?;
        self.train_with(params, source).await
    }

    async fn train_with(
        &mut self,
        params: Hyperparameters,
        source: ParamsSource,
    ) -> GgResult<TrainedModel> {
        let splits = self.load_splits().await?;
        let pipeline = blocking(move || train_final_model(&splits, &params)).await?;
        Ok(TrainedModel {
            pipeline,
            params,
            source,
        })
    }

    /// Score a trained model on the test split and save `metrics.json`.
    pub async fn evaluate_trained(&mut self, model: &TrainedModel) -> GgResult<RegressionMetrics> {
        let splits = self.load_splits().await?;
        let metrics = evaluate_model(&model.pipeline, &splits.test_features, &splits.test_target)?;
        self.store.write_metrics(&metrics).await?;
        Ok(metrics)
    }

    /// Train from saved (or freshly searched) parameters, then evaluate.
    pub async fn evaluate(&mut self) -> GgResult<RegressionMetrics> {
        let model = self.train().await?;
        self.evaluate_trained(&model).await
    }

    /// Optimize, train with the result and evaluate.
    pub async fn run(&mut self) -> GgResult<PipelineReport> {
        let outcome = self.optimize().await?;
        let model = self
            .train_with(outcome.best_params.hyperparameters(), ParamsSource::Optimized)
            .await?;
        let metrics = self.evaluate_trained(&model).await?;
        Ok(PipelineReport {
            best_params: outcome.best_params,
            metrics,
        })
    }
}

/// Run CPU-bound work off the async runtime.
async fn blocking<T, F>(task: F) -> GgResult<T>
where
    F: FnOnce() -> GgResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| -> GgError { internal_error!("blocking task failed: {e}") })?
}
