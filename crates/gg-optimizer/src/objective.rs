//! The objective contract consumed by the optimizer.
//!
//! The optimizer only ever sees [`Objective`], which is total: every
//! position yields a fitness, with `f64::INFINITY` standing for a failed or
//! rejected evaluation. Evaluators that can fail implement
//! [`FallibleObjective`] and are wrapped in [`Total`], which turns errors,
//! panics and NaN results into `+infinity`.
//!
//! Evaluators may be stochastic (cross-validation shuffles, model
//! initialisation). Repeated calls on the same position need not agree, so a
//! fixed optimizer seed only reproduces a run when the evaluator is
//! deterministic too. Termination and bounds do not depend on it.

use std::panic::{catch_unwind, AssertUnwindSafe};

use gg_types::{validation_error, GgError};
use thiserror::Error;
use tracing::{debug, warn};

/// Fitness assigned to any evaluation that did not produce a usable score.
pub const FAILED_FITNESS: f64 = f64::INFINITY;

/// A total fitness function. Lower is better.
pub trait Objective {
    fn evaluate(&mut self, position: &[f64]) -> f64;
}

impl<F> Objective for F
where
    F: FnMut(&[f64]) -> f64,
{
    fn evaluate(&mut self, position: &[f64]) -> f64 {
        self(position)
    }
}

/// Reasons an evaluation can fail. None of these reach the optimizer.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("parameter {name} decodes to {value}, which is not allowed")]
    InvalidParameter { name: String, value: String },

    #[error("expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Model(#[from] GgError),

    #[error("evaluation failed: {0}")]
    Other(String),
}

impl From<EvaluationError> for GgError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::Model(inner) => inner,
            EvaluationError::Other(message) => GgError::Internal(message),
            other => validation_error!("{other}"),
        }
    }
}

/// A fitness function that reports failures instead of scoring them.
pub trait FallibleObjective {
    fn try_evaluate(&mut self, position: &[f64]) -> Result<f64, EvaluationError>;
}

/// Adapter that makes a [`FallibleObjective`] total.
#[derive(Debug)]
pub struct Total<F> {
    inner: F,
    failures: usize,
}

impl<F> Total<F> {
    pub fn new(inner: F) -> Self {
        Self { inner, failures: 0 }
    }

    /// Number of evaluations mapped to `+infinity` so far.
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: FallibleObjective> Objective for Total<F> {
    fn evaluate(&mut self, position: &[f64]) -> f64 {
        let inner = &mut self.inner;
        let outcome = catch_unwind(AssertUnwindSafe(|| inner.try_evaluate(position)));

        match outcome {
            Ok(Ok(fitness)) if !fitness.is_nan() => fitness,
            Ok(Ok(_)) => {
                warn!(?position, "Objective returned NaN, scoring as failed");
                self.failures += 1;
                FAILED_FITNESS
            }
            Ok(Err(e)) => {
                debug!(?position, error = %e, "Evaluation failed");
                self.failures += 1;
                FAILED_FITNESS
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(?position, %message, "Objective panicked, scoring as failed");
                self.failures += 1;
                FAILED_FITNESS
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(Vec<Result<f64, &'static str>>);

    impl FallibleObjective for Scripted {
        fn try_evaluate(&mut self, _position: &[f64]) -> Result<f64, EvaluationError> {
            match self.0.remove(0) {
                Ok(v) => Ok(v),
                Err("panic") => panic!("solver exploded"),
                Err(msg) => Err(EvaluationError::Other(msg.to_string())),
            }
        }
    }

    #[test]
    fn closures_are_objectives() {
        let mut sphere = |x: &[f64]| x.iter().map(|v| v * v).sum::<f64>();
        assert_eq!(sphere.evaluate(&[1.0, 2.0]), 5.0);
    }

    #[test]
    fn total_passes_scores_through() {
        let mut total = Total::new(Scripted(vec![Ok(3.5), Ok(f64::INFINITY)]));
        assert_eq!(total.evaluate(&[0.0]), 3.5);
        assert_eq!(total.evaluate(&[0.0]), f64::INFINITY);
        assert_eq!(total.failures(), 0);
    }

    #[test]
    fn total_maps_errors_nan_and_panics_to_infinity() {
        let mut total = Total::new(Scripted(vec![
            Err("did not converge"),
            Ok(f64::NAN),
            Err("panic"),
            Ok(1.0),
        ]));

        assert_eq!(total.evaluate(&[0.0]), FAILED_FITNESS);
        assert_eq!(total.evaluate(&[0.0]), FAILED_FITNESS);
        assert_eq!(total.evaluate(&[0.0]), FAILED_FITNESS);
        assert_eq!(total.evaluate(&[0.0]), 1.0);
        assert_eq!(total.failures(), 3);
    }

    #[test]
    fn evaluation_error_display() {
        let err = EvaluationError::InvalidParameter {
            name: "hidden_layer_size_1".into(),
            value: "0".into(),
        };
        assert!(err.to_string().contains("hidden_layer_size_1"));
    }

    #[test]
    fn evaluation_errors_convert_to_gg_errors() {
        let invalid: GgError = EvaluationError::DimensionMismatch { expected: 3, actual: 2 }.into();
        assert!(matches!(invalid, GgError::Validation(_)));

        let wrapped: GgError = EvaluationError::Model(GgError::Config("bad".into())).into();
        assert!(matches!(wrapped, GgError::Config(_)));
    }
}
