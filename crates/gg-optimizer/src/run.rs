//! Run bookkeeping: lifecycle state and evaluation counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::objective::FAILED_FITNESS;

/// Unique optimization run identifier.
pub type RunId = Uuid;

/// Lifecycle state of an optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationState {
    /// Constructed; nothing sampled yet.
    Uninitialized,
    /// Population sampled and scored.
    Initialized,
    /// Iterating generations.
    Running,
    /// Global best frozen, result built.
    Completed,
}

impl Default for OptimizationState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

/// Aggregate status of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub id: RunId,
    pub state: OptimizationState,
    /// Seed of the search RNG, if one was fixed.
    pub seed: Option<u64>,
    pub evaluations: usize,
    pub failed_evaluations: usize,
    pub generations_completed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStatus {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: OptimizationState::Uninitialized,
            seed,
            evaluations: 0,
            failed_evaluations: 0,
            generations_completed: 0,
            started_at: None,
            finished_at: None,
        }
    }

    /// Stamp the start time. Called before the first goose is sampled.
    pub fn mark_started(&mut self) {
        self.started_at = Some(Utc::now());
    }

    pub fn mark_initialized(&mut self) {
        self.state = OptimizationState::Initialized;
        if self.started_at.is_none() {
            self.mark_started();
        }
    }

    pub fn mark_running(&mut self) {
        self.state = OptimizationState::Running;
    }

    pub fn mark_completed(&mut self) {
        self.state = OptimizationState::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Count one evaluation; the `+infinity` sentinel counts as a failure.
    pub fn record_evaluation(&mut self, fitness: f64) {
        self.evaluations += 1;
        if fitness == FAILED_FITNESS {
            self.failed_evaluations += 1;
        }
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => {
                Some((end - start).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        }
    }
}
