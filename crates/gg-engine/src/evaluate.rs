//! Held-out evaluation of a trained pipeline.

use gg_model::{RegressionMetrics, RegressionPipeline};
use gg_types::{Frame, GgResult};
use tracing::info;

pub fn evaluate_model(
    pipeline: &RegressionPipeline,
    features: &Frame,
    target: &[f64],
) -> GgResult<RegressionMetrics> {
    let predictions = pipeline.predict(features)?;
    let metrics = RegressionMetrics::compute(target, &predictions)?;
    info!(
        mse = metrics.mse,
        rmse = metrics.rmse,
        mae = metrics.mae,
        r2 = metrics.r2,
        "Model performance on {} test rows",
        target.len()
    );
    Ok(metrics)
}
