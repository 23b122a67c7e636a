//! Regression metrics.

use gg_types::{GgResult, ModelError};
use serde::{Deserialize, Serialize};

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> GgResult<()> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::ShapeMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        }
        .into());
    }
    if y_true.is_empty() {
        return Err(ModelError::EmptyTrainingSet.into());
    }
    Ok(())
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> GgResult<f64> {
    check_lengths(y_true, y_pred)?;
    let sum: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    Ok(sum / y_true.len() as f64)
}

pub fn root_mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> GgResult<f64> {
    Ok(mean_squared_error(y_true, y_pred)?.sqrt())
}

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> GgResult<f64> {
    check_lengths(y_true, y_pred)?;
    let sum: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();
    Ok(sum / y_true.len() as f64)
}

/// Coefficient of determination.
///
/// A constant `y_true` scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> GgResult<f64> {
    check_lengths(y_true, y_pred)?;
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Test-set report written to `metrics.json`. Values are rounded to four
/// decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    #[serde(rename = "MSE")]
    pub mse: f64,
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "R2")]
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> GgResult<Self> {
        let mse = mean_squared_error(y_true, y_pred)?;
        Ok(Self {
            mse: round4(mse),
            rmse: round4(mse.sqrt()),
            mae: round4(mean_absolute_error(y_true, y_pred)?),
            r2: round4(r2_score(y_true, y_pred)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gg_types::GgError;

    #[test]
    fn error_metrics() {
        let y_true = [3.0, -0.5, 2.0, 7.0];
        let y_pred = [2.5, 0.0, 2.0, 8.0];

        assert!((mean_squared_error(&y_true, &y_pred).unwrap() - 0.375).abs() < 1e-12);
        assert!((mean_absolute_error(&y_true, &y_pred).unwrap() - 0.5).abs() < 1e-12);
        assert!((root_mean_squared_error(&y_true, &y_pred).unwrap() - 0.375f64.sqrt()).abs() < 1e-12);
        assert!((r2_score(&y_true, &y_pred).unwrap() - 0.948_608_137_044_967_9).abs() < 1e-12);
    }

    #[test]
    fn r2_of_constant_target() {
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]).unwrap(), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[1.0, 2.0]).unwrap(), 0.0);
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        assert!(matches!(
            mean_squared_error(&[1.0, 2.0], &[1.0]),
            Err(GgError::Model(ModelError::ShapeMismatch { expected: 2, actual: 1 }))
        ));
        assert!(mean_absolute_error(&[], &[]).is_err());
    }

    #[test]
    fn report_is_rounded_and_uses_upper_case_keys() {
        let metrics = RegressionMetrics::compute(&[1.0, 2.0, 4.0], &[1.1, 2.2, 3.7]).unwrap();
        assert_eq!(metrics.mse, 0.0467);
        assert_eq!(metrics.rmse, 0.216);
        assert_eq!(metrics.mae, 0.2);

        let json = serde_json::to_value(metrics).unwrap();
        for key in ["MSE", "RMSE", "MAE", "R2"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
