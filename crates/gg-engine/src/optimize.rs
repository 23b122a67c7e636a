//! Hyperparameter search over the MLP with GGO.

use gg_data::DataSplits;
use gg_model::MlpObjective;
use gg_optimizer::{
    GreylagGooseOptimizer, Objective, OptimizationResult, OptimizerConfig, SearchSpace, Total,
};
use gg_types::GgResult;
use tracing::{info, warn};

/// Tune learning rate and layer sizes by cross-validated RMSE on the
/// training split.
pub fn run_optimization(
    splits: &DataSplits,
    config: &OptimizerConfig,
) -> GgResult<OptimizationResult> {
    info!("Starting hyperparameter optimization with GGO");
    let objective = MlpObjective::new(
        splits.train_features.clone(),
        splits.train_target.clone(),
    );
    let mut objective = Total::new(objective);
    let result = optimize_with(SearchSpace::mlp_default(), config, &mut objective)?;

    if objective.failures() > 0 {
        warn!(
            failures = objective.failures(),
            "Some candidates could not be scored"
        );
    }
    Ok(result)
}

/// Run the optimizer against any objective.
pub fn optimize_with<O: Objective + ?Sized>(
    space: SearchSpace,
    config: &OptimizerConfig,
    objective: &mut O,
) -> GgResult<OptimizationResult> {
    let optimizer = GreylagGooseOptimizer::new(space, config.clone())?;
    let result = optimizer.optimize(objective);

    if result.found_finite() {
        info!(
            best_rmse = result.best_fitness,
            "Optimization complete. Best parameters: {:?}",
            result.parameters
        );
    } else {
        warn!("Every evaluation failed; best parameters are the first sampled candidate");
    }
    Ok(result)
}
