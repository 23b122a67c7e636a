//! # gg-optimizer
//!
//! Greylag Goose Optimizer (GGO) for box-bounded hyperparameter search.
//!
//! Provides the search space definition, the population and global-best
//! state, the goose movement rule, the sequential optimization driver and
//! the total objective contract the driver evaluates candidates through.

mod driver;
mod movement;
mod objective;
mod population;
mod run;
mod search;

pub use driver::{GreylagGooseOptimizer, OptimizationResult, OptimizerConfig};
pub use movement::{CentroidMode, MovementRule, DEFAULT_SCALE};
pub use objective::{EvaluationError, FallibleObjective, Objective, Total, FAILED_FITNESS};
pub use population::{Candidate, GlobalBest, Population};
pub use run::{OptimizationState, RunId, RunStatus};
pub use search::{truncate, ParameterDef, ParameterKind, ParameterValue, SearchSpace};
