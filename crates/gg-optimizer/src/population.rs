//! Population state: candidates, their fitness, and the running global best.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::search::SearchSpace;

/// One point in the search space and its last score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub position: Vec<f64>,
    /// Lower is better; `+infinity` marks a failed evaluation.
    pub fitness: f64,
}

/// Fixed-size indexed store of candidates. Its length is set once at
/// sampling time and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    candidates: Box<[Candidate]>,
}

impl Population {
    /// Sample `size` candidates uniformly inside the space. Fitness starts
    /// at `+infinity` until the candidates are scored.
    pub fn sample<R: Rng + ?Sized>(space: &SearchSpace, size: usize, rng: &mut R) -> Self {
        let candidates = (0..size)
            .map(|_| Candidate {
                position: space.sample(&mut *rng),
                fitness: f64::INFINITY,
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, index: usize) -> &Candidate {
        &self.candidates[index]
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut Candidate {
        &mut self.candidates[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Element-wise mean position.
    pub fn centroid(&self) -> Vec<f64> {
        let dim = self.candidates.first().map_or(0, |c| c.position.len());
        let mut sum = vec![0.0; dim];
        for candidate in self.candidates.iter() {
            for (s, x) in sum.iter_mut().zip(&candidate.position) {
                *s += x;
            }
        }
        let n = self.candidates.len().max(1) as f64;
        sum.iter_mut().for_each(|s| *s /= n);
        sum
    }
}

/// Best position found across every evaluation of a run.
///
/// Only [`GlobalBest::offer`] moves it, and only on strict improvement, so
/// its fitness never increases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalBest {
    position: Vec<f64>,
    fitness: f64,
}

impl GlobalBest {
    pub fn new(position: Vec<f64>, fitness: f64) -> Self {
        Self { position, fitness }
    }

    pub fn position(&self) -> &[f64] {
        &self.position
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Replace the best if `fitness` is strictly lower. Returns whether it moved.
    pub fn offer(&mut self, position: &[f64], fitness: f64) -> bool {
        if fitness < self.fitness {
            self.position.clear();
            self.position.extend_from_slice(position);
            self.fitness = fitness;
            true
        } else {
            false
        }
    }
}
