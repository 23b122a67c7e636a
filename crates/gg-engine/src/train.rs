//! Final model training.

use gg_data::DataSplits;
use gg_model::{Hyperparameters, RegressionPipeline};
use gg_types::GgResult;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Where the hyperparameters of a trained model came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamsSource {
    /// Read from `best_params.json`.
    Saved,
    /// Produced by a search run just before training.
    Optimized,
    /// `best_params.json` was unreadable.
    Defaults,
}

#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub pipeline: RegressionPipeline,
    pub params: Hyperparameters,
    pub source: ParamsSource,
}

/// Fit the pipeline on the full training split with the long schedule.
pub fn train_final_model(
    splits: &DataSplits,
    params: &Hyperparameters,
) -> GgResult<RegressionPipeline> {
    let config = params.final_config()?;
    info!(
        "Training final MLP with hidden layers ({}, {}), learning rate {:.5}",
        params.hidden_layer_size_1, params.hidden_layer_size_2, params.learning_rate_init
    );

    let mut pipeline = RegressionPipeline::new(config);
    pipeline.fit(&splits.train_features, &splits.train_target)?;
    info!(
        epochs = pipeline.regressor().n_iter(),
        "Final model training complete"
    );
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::synthetic_splits;
    use gg_types::GgError;

    #[test]
    fn trains_on_train_split() {
        let splits = synthetic_splits(50);
        let params = Hyperparameters {
            learning_rate_init: 0.01,
            hidden_layer_size_1: 8,
            hidden_layer_size_2: 4,
        };
        let pipeline = train_final_model(&splits, &params).unwrap();
        assert!(pipeline.regressor().is_fitted());
        assert_eq!(pipeline.regressor().config().max_iter, 500);
    }

    #[test]
    fn non_positive_layer_is_rejected() {
        let splits = synthetic_splits(20);
        let params = Hyperparameters {
            hidden_layer_size_2: 0,
            ..Hyperparameters::default()
        };
        assert!(matches!(
            train_final_model(&splits, &params),
            Err(GgError::Validation(_))
        ));
    }
}
