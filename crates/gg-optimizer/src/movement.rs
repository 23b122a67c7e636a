//! The goose movement rule.
//!
//! ```text
//! step  = r1 ⊙ (best - xᵢ) + r2 ⊙ (xᵢ - centroid)
//! xᵢ'   = clip(xᵢ + scale · step)
//! ```
//!
//! The first term pulls a goose toward the best point found so far, the
//! second pushes it away from the flock's centre.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::population::GlobalBest;
use crate::search::SearchSpace;

/// Step scale used when none is configured.
pub const DEFAULT_SCALE: f64 = 0.1;

/// Which population the centroid is averaged over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentroidMode {
    /// Once per generation, from the positions at the start of the generation.
    #[default]
    Snapshot,
    /// Before every candidate, from the partially updated population, so
    /// the centroid drifts as earlier geese move within a generation.
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementRule {
    scale: f64,
}

impl MovementRule {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Next position for a goose at `position`. Draws `r1` then `r2`, one
    /// uniform value per dimension each.
    pub fn propose<R: Rng + ?Sized>(
        &self,
        position: &[f64],
        best: &GlobalBest,
        centroid: &[f64],
        space: &SearchSpace,
        rng: &mut R,
    ) -> Vec<f64> {
        let dim = position.len();
        let r1: Vec<f64> = (0..dim).map(|_| rng.gen::<f64>()).collect();
        let r2: Vec<f64> = (0..dim).map(|_| rng.gen::<f64>()).collect();

        let mut next: Vec<f64> = position
            .iter()
            .enumerate()
            .map(|(j, x)| {
                let step = r1[j] * (best.position()[j] - x) + r2[j] * (x - centroid[j]);
                x + self.scale * step
            })
            .collect();

        space.clip_in_place(&mut next);
        next
    }
}

impl Default for MovementRule {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE)
    }
}
