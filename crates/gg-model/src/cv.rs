//! K-fold cross-validation.

use gg_types::{Frame, GgResult, ModelError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::root_mean_squared_error;
use crate::pipeline::RegressionPipeline;

/// Folds used when scoring a search candidate.
pub const DEFAULT_CV_FOLDS: usize = 3;

/// Splits `0..n` into `n_splits` folds. Without shuffling the folds are
/// contiguous; the first `n % n_splits` folds take one extra sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Shuffle indices with a seeded RNG before cutting folds.
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self.shuffle = true;
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// `(train_indices, test_indices)` for each fold.
    pub fn split(&self, n_samples: usize) -> GgResult<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            return Err(ModelError::CrossValidation {
                message: format!("n_splits must be at least 2, got {}", self.n_splits),
            }
            .into());
        }
        if n_samples < self.n_splits {
            return Err(ModelError::CrossValidation {
                message: format!(
                    "cannot split {n_samples} samples into {} folds",
                    self.n_splits
                ),
            }
            .into());
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = match self.random_state {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;

        for i in 0..self.n_splits {
            let end = start + fold_size + usize::from(i < remainder);
            let test = indices[start..end].to_vec();
            let mut train = Vec::with_capacity(n_samples - test.len());
            train.extend_from_slice(&indices[..start]);
            train.extend_from_slice(&indices[end..]);
            folds.push((train, test));
            start = end;
        }
        Ok(folds)
    }
}

/// Per-fold scores of one cross-validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub scores: Vec<f64>,
}

impl CrossValidationResult {
    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return f64::NAN;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    pub fn std(&self) -> f64 {
        if self.scores.is_empty() {
            return f64::NAN;
        }
        let mean = self.mean();
        let var = self.scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>()
            / self.scores.len() as f64;
        var.sqrt()
    }
}

/// Fit a fresh pipeline on each training fold and score RMSE on the held-out
/// fold. Folds run in parallel; any fold error fails the whole run.
pub fn cross_val_rmse<F>(
    features: &Frame,
    target: &[f64],
    kfold: &KFold,
    make_pipeline: F,
) -> GgResult<CrossValidationResult>
where
    F: Fn() -> RegressionPipeline + Sync,
{
    if features.n_rows() != target.len() {
        return Err(ModelError::ShapeMismatch {
            expected: features.n_rows(),
            actual: target.len(),
        }
        .into());
    }

    let folds = kfold.split(target.len())?;
    let scores = folds
        .par_iter()
        .enumerate()
        .map(|(fold, (train, test))| -> GgResult<f64> {
            let mut pipeline = make_pipeline();
            let train_y: Vec<f64> = train.iter().map(|&i| target[i]).collect();
            let test_y: Vec<f64> = test.iter().map(|&i| target[i]).collect();

            pipeline.fit(&features.select_rows(train), &train_y)?;
            let predictions = pipeline.predict(&features.select_rows(test))?;
            let rmse = root_mean_squared_error(&test_y, &predictions)?;
            debug!(fold, rmse, "Scored cross-validation fold");
            Ok(rmse)
        })
        .collect::<GgResult<Vec<f64>>>()?;

    Ok(CrossValidationResult { scores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::MlpConfig;
    use crate::pipeline::tests::vehicle_frame;
    use gg_types::GgError;

    #[test]
    fn contiguous_folds_with_remainder_first() {
        let folds = KFold::new(3).split(10).unwrap();
        let tests: Vec<Vec<usize>> = folds.iter().map(|(_, t)| t.clone()).collect();
        assert_eq!(tests, vec![vec![0, 1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
        assert_eq!(folds[1].0, vec![0, 1, 2, 3, 7, 8, 9]);
    }

    #[test]
    fn every_sample_is_tested_once() {
        let folds = KFold::new(4).with_random_state(7).split(23).unwrap();
        let mut seen: Vec<usize> = folds.iter().flat_map(|(_, t)| t.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());
        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), 23);
        }
    }

    #[test]
    fn invalid_fold_counts() {
        assert!(matches!(
            KFold::new(1).split(10),
            Err(GgError::Model(ModelError::CrossValidation { .. }))
        ));
        assert!(KFold::new(5).split(3).is_err());
    }

    #[test]
    fn cross_val_rmse_scores_each_fold() {
        let (frame, target) = vehicle_frame(45);
        let result = cross_val_rmse(&frame, &target, &KFold::new(3), || {
            RegressionPipeline::new(MlpConfig::for_search(0.01, 8, 8).with_max_iter(30))
        })
        .unwrap();

        assert_eq!(result.scores.len(), 3);
        assert!(result.scores.iter().all(|s| s.is_finite() && *s >= 0.0));
        assert!(result.mean().is_finite());
        assert!(result.std() >= 0.0);
    }

    #[test]
    fn fold_failure_fails_the_run() {
        let (frame, target) = vehicle_frame(12);
        let result = cross_val_rmse(&frame, &target, &KFold::new(3), || {
            RegressionPipeline::new(MlpConfig::for_search(0.01, 0, 8))
        });
        assert!(matches!(
            result,
            Err(GgError::Model(ModelError::InvalidHyperparameter { .. }))
        ));
    }
}
