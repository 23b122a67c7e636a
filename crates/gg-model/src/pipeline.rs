//! Preprocessor plus regressor, fitted and applied as one unit.

use gg_data::{build_preprocessor, ColumnTransformer};
use gg_types::{Frame, GgResult};
use serde::{Deserialize, Serialize};

use crate::mlp::{MlpConfig, MlpRegressor};

/// The preprocessor learns its statistics from the frame passed to
/// [`RegressionPipeline::fit`] only, so scoring on another frame never
/// leaks information from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionPipeline {
    preprocessor: ColumnTransformer,
    regressor: MlpRegressor,
}

impl RegressionPipeline {
    /// Vehicle preprocessing followed by an MLP with `config`.
    pub fn new(config: MlpConfig) -> Self {
        Self::with_preprocessor(build_preprocessor(), config)
    }

    pub fn with_preprocessor(preprocessor: ColumnTransformer, config: MlpConfig) -> Self {
        Self {
            preprocessor,
            regressor: MlpRegressor::new(config),
        }
    }

    pub fn regressor(&self) -> &MlpRegressor {
        &self.regressor
    }

    pub fn preprocessor(&self) -> &ColumnTransformer {
        &self.preprocessor
    }

    pub fn fit(&mut self, features: &Frame, target: &[f64]) -> GgResult<()> {
        let x = self.preprocessor.fit_transform(features)?;
        self.regressor.fit(&x, target)
    }

    pub fn predict(&self, features: &Frame) -> GgResult<Vec<f64>> {
        let x = self.preprocessor.transform(features)?;
        self.regressor.predict(&x)
    }
}
