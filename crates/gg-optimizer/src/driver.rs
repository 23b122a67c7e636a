//! The Greylag Goose Optimizer driver.
//!
//! One run is strictly sequential: sample and score the flock, then for a
//! fixed number of generations move every goose in population order,
//! score it, and fold any improvement into the global best before the next
//! goose moves. A later goose in the same generation therefore already
//! sees an improvement found by an earlier one.

use std::collections::BTreeMap;

use gg_types::{config_error, GgResult};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::movement::{CentroidMode, MovementRule, DEFAULT_SCALE};
use crate::objective::{Objective, FAILED_FITNESS};
use crate::population::{GlobalBest, Population};
use crate::run::{OptimizationState, RunStatus};
use crate::search::{ParameterValue, SearchSpace};

/// Tunables of a GGO run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Number of geese; fixed for the whole run.
    pub population_size: usize,
    /// Generations to run. There is no early stopping.
    pub max_iterations: usize,
    /// Multiplier applied to every movement step.
    pub scale: f64,
    #[serde(default)]
    pub centroid_mode: CentroidMode,
    /// Seed for sampling and movement. `None` draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            max_iterations: 10,
            scale: DEFAULT_SCALE,
            centroid_mode: CentroidMode::Snapshot,
            seed: None,
        }
    }
}

impl OptimizerConfig {
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_centroid_mode(mut self, mode: CentroidMode) -> Self {
        self.centroid_mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> GgResult<()> {
        if self.population_size == 0 {
            return Err(config_error!("population_size must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(config_error!("max_iterations must be positive"));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(config_error!(
                "scale must be a positive finite number, got {}",
                self.scale
            ));
        }
        Ok(())
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best_position: Vec<f64>,
    /// `+infinity` if every evaluation failed.
    pub best_fitness: f64,
    /// Best fitness after initialization, then after each generation.
    pub history: Vec<f64>,
    /// Best position decoded by name, integer dimensions truncated.
    pub parameters: BTreeMap<String, ParameterValue>,
    pub run: RunStatus,
}

impl OptimizationResult {
    pub fn parameter(&self, name: &str) -> Option<ParameterValue> {
        self.parameters.get(name).copied()
    }

    /// Whether any evaluation produced a finite score.
    pub fn found_finite(&self) -> bool {
        self.best_fitness.is_finite()
    }
}

/// Population-based optimizer over a box-bounded [`SearchSpace`].
#[derive(Debug)]
pub struct GreylagGooseOptimizer {
    space: SearchSpace,
    config: OptimizerConfig,
    rule: MovementRule,
    rng: ChaCha8Rng,
    history: Vec<f64>,
    status: RunStatus,
}

impl GreylagGooseOptimizer {
    /// Validate the space and configuration. Nothing is sampled until
    /// [`optimize`](Self::optimize) runs.
    pub fn new(space: SearchSpace, config: OptimizerConfig) -> GgResult<Self> {
        space.validate()?;
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            rule: MovementRule::new(config.scale),
            status: RunStatus::new(config.seed),
            history: Vec::with_capacity(config.max_iterations + 1),
            space,
            config,
            rng,
        })
    }

    pub fn state(&self) -> OptimizationState {
        self.status.state
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Run all generations and return the best point found. Evaluation
    /// failures never abort the run; a run where everything failed still
    /// returns a well-formed result with `+infinity` fitness.
    pub fn optimize<O: Objective + ?Sized>(mut self, objective: &mut O) -> OptimizationResult {
        info!(
            run_id = %self.status.id,
            population_size = self.config.population_size,
            max_iterations = self.config.max_iterations,
            dim = self.space.dim(),
            "Starting GGO optimization"
        );

        let (mut population, mut best) = self.initialize(objective);

        self.status.mark_running();
        let max_iterations = self.config.max_iterations;
        for generation in 1..=max_iterations {
            self.run_generation(&mut population, &mut best, objective);
            info!(
                generation,
                best_fitness = best.fitness(),
                "Iteration {}/{}: best fitness = {:.4}",
                generation,
                max_iterations,
                best.fitness()
            );
        }

        self.status.mark_completed();
        let parameters = self.space.decode(best.position());
        info!(
            best_fitness = best.fitness(),
            evaluations = self.status.evaluations,
            failed = self.status.failed_evaluations,
            "GGO optimization complete"
        );

        OptimizationResult {
            best_position: best.position().to_vec(),
            best_fitness: best.fitness(),
            history: self.history,
            parameters,
            run: self.status,
        }
    }

    /// Sample and score the flock, then seed the global best from it.
    pub(crate) fn initialize<O: Objective + ?Sized>(
        &mut self,
        objective: &mut O,
    ) -> (Population, GlobalBest) {
        self.status.mark_started();
        let mut population =
            Population::sample(&self.space, self.config.population_size, &mut self.rng);

        for i in 0..population.len() {
            let fitness = score(&mut self.status, objective, &population.get(i).position);
            population.get_mut(i).fitness = fitness;
        }

        let mut best = GlobalBest::new(population.get(0).position.clone(), FAILED_FITNESS);
        for candidate in population.iter() {
            best.offer(&candidate.position, candidate.fitness);
        }

        self.history.push(best.fitness());
        self.status.mark_initialized();
        debug!(best_fitness = best.fitness(), "Population initialized");
        (population, best)
    }

    /// Move, clip, score and replace every goose once, in order.
    pub(crate) fn run_generation<O: Objective + ?Sized>(
        &mut self,
        population: &mut Population,
        best: &mut GlobalBest,
        objective: &mut O,
    ) {
        let mut centroid = population.centroid();

        for i in 0..population.len() {
            if self.config.centroid_mode == CentroidMode::Live && i > 0 {
                centroid = population.centroid();
            }

            let next = self.rule.propose(
                &population.get(i).position,
                best,
                &centroid,
                &self.space,
                &mut self.rng,
            );
            let fitness = score(&mut self.status, objective, &next);

            if best.offer(&next, fitness) {
                debug!(goose = i, fitness, "New global best");
            }

            // Replacement is unconditional: a goose may move to a worse spot.
            let candidate = population.get_mut(i);
            candidate.position = next;
            candidate.fitness = fitness;
        }

        self.status.generations_completed += 1;
        self.history.push(best.fitness());
    }
}

fn score<O: Objective + ?Sized>(status: &mut RunStatus, objective: &mut O, position: &[f64]) -> f64 {
    let mut fitness = objective.evaluate(position);
    if fitness.is_nan() {
        fitness = FAILED_FITNESS;
    }
    status.record_evaluation(fitness);
    debug!(?position, fitness, "Evaluated goose");
    fitness
}
