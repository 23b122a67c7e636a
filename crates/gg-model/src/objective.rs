//! Cross-validated RMSE of the vehicle pipeline as a search objective.

use std::collections::BTreeMap;

use gg_optimizer::{truncate, EvaluationError, FallibleObjective, ParameterValue};
use gg_types::{Frame, GgResult, ModelError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cv::{cross_val_rmse, KFold, DEFAULT_CV_FOLDS};
use crate::mlp::MlpConfig;
use crate::pipeline::RegressionPipeline;

/// Decoded MLP hyperparameters. Layer sizes are kept signed so positions
/// outside the search bounds decode faithfully and can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub learning_rate_init: f64,
    pub hidden_layer_size_1: i64,
    pub hidden_layer_size_2: i64,
}

impl Hyperparameters {
    pub const DIM: usize = 3;

    /// Decode `[learning_rate, h1, h2]`, truncating the layer sizes.
    pub fn from_position(position: &[f64]) -> Result<Self, EvaluationError> {
        match *position {
            [learning_rate_init, h1, h2] => Ok(Self {
                learning_rate_init,
                hidden_layer_size_1: truncate(h1),
                hidden_layer_size_2: truncate(h2),
            }),
            _ => Err(EvaluationError::DimensionMismatch {
                expected: Self::DIM,
                actual: position.len(),
            }),
        }
    }

    /// Read from a decoded parameter map keyed by search-space names.
    pub fn from_parameters(parameters: &BTreeMap<String, ParameterValue>) -> GgResult<Self> {
        let get = |name: &str| {
            parameters.get(name).copied().ok_or_else(|| {
                ModelError::InvalidHyperparameter {
                    name: name.to_string(),
                    message: "missing from parameter set".to_string(),
                }
            })
        };
        Ok(Self {
            learning_rate_init: get("learning_rate_init")?.as_f64(),
            hidden_layer_size_1: get("hidden_layer_size_1")?.as_i64(),
            hidden_layer_size_2: get("hidden_layer_size_2")?.as_i64(),
        })
    }

    /// Layer sizes as `usize`, or the first one that is not positive.
    pub fn layer_sizes(&self) -> Result<(usize, usize), EvaluationError> {
        let check = |name: &str, size: i64| {
            usize::try_from(size)
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| EvaluationError::InvalidParameter {
                    name: name.to_string(),
                    value: size.to_string(),
                })
        };
        Ok((
            check("hidden_layer_size_1", self.hidden_layer_size_1)?,
            check("hidden_layer_size_2", self.hidden_layer_size_2)?,
        ))
    }

    pub fn search_config(&self) -> Result<MlpConfig, EvaluationError> {
        let (h1, h2) = self.layer_sizes()?;
        Ok(MlpConfig::for_search(self.learning_rate_init, h1, h2))
    }

    pub fn final_config(&self) -> Result<MlpConfig, EvaluationError> {
        let (h1, h2) = self.layer_sizes()?;
        Ok(MlpConfig::for_final_model(self.learning_rate_init, h1, h2))
    }
}

impl Default for Hyperparameters {
    /// Fallback used when no tuned parameters are available.
    fn default() -> Self {
        Self {
            learning_rate_init: 0.001,
            hidden_layer_size_1: 100,
            hidden_layer_size_2: 50,
        }
    }
}

/// Scores a position by the mean RMSE of a fresh pipeline over K folds of
/// the training data. Invalid layer sizes are rejected before any training.
#[derive(Debug, Clone)]
pub struct MlpObjective {
    features: Frame,
    target: Vec<f64>,
    kfold: KFold,
}

impl MlpObjective {
    pub fn new(features: Frame, target: Vec<f64>) -> Self {
        Self {
            features,
            target,
            kfold: KFold::new(DEFAULT_CV_FOLDS),
        }
    }

    pub fn with_kfold(mut self, kfold: KFold) -> Self {
        self.kfold = kfold;
        self
    }
}

impl FallibleObjective for MlpObjective {
    fn try_evaluate(&mut self, position: &[f64]) -> Result<f64, EvaluationError> {
        let params = Hyperparameters::from_position(position)?;
        let config = params.search_config()?;

        let cv = cross_val_rmse(&self.features, &self.target, &self.kfold, || {
            RegressionPipeline::new(config.clone())
        })?;
        let rmse = cv.mean();
        debug!(
            learning_rate_init = params.learning_rate_init,
            hidden_layer_size_1 = params.hidden_layer_size_1,
            hidden_layer_size_2 = params.hidden_layer_size_2,
            rmse,
            "Evaluated candidate"
        );
        Ok(rmse)
    }
}
