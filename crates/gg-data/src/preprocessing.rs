//! Column-wise preprocessing: standardization, one-hot encoding and passthrough.
//!
//! [`ColumnTransformer`] is fitted on a training [`Frame`] and turns any frame
//! with the same columns into a dense [`FeatureMatrix`]. Output columns are
//! ordered scaled numerics first, then one-hot blocks, then passthrough
//! columns.

use gg_types::{
    FeatureMatrix, Frame, GgResult, ModelError, CATEGORICAL_FEATURES,
    NUMERIC_FEATURES,
};
use serde::{Deserialize, Serialize};

/// Standardizes one numeric column to zero mean and unit variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: f64,
    scale: f64,
}

impl StandardScaler {
    /// Fit on a column. Population variance is used; a constant column
    /// gets scale 1 so it maps to zeros instead of NaN.
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                scale: 1.0,
            };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        let scale = if std > f64::EPSILON { std } else { 1.0 };
        Self { mean, scale }
    }

    pub fn transform_one(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

/// One-hot encoder over the sorted set of categories seen during fit.
///
/// Categories not seen during fit encode as an all-zero block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit(values: &[String]) -> Self {
        let mut categories: Vec<String> = values.to_vec();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Index of the hot column, or `None` for an unknown category.
    pub fn position(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedColumns {
    numeric: Vec<(String, StandardScaler)>,
    categorical: Vec<(String, OneHotEncoder)>,
    passthrough: Vec<String>,
}

/// Applies a scaler to numeric columns, an encoder to categorical columns and
/// passes remaining numeric columns through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    numeric_features: Vec<String>,
    categorical_features: Vec<String>,
    fitted: Option<FittedColumns>,
}

impl ColumnTransformer {
    pub fn new<N, C>(numeric_features: N, categorical_features: C) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            numeric_features: numeric_features.into_iter().map(Into::into).collect(),
            categorical_features: categorical_features.into_iter().map(Into::into).collect(),
            fitted: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Learn scaling statistics and category sets from the training frame.
    pub fn fit(&mut self, frame: &Frame) -> GgResult<()> {
        let mut numeric = Vec::with_capacity(self.numeric_features.len());
        for name in &self.numeric_features {
            numeric.push((name.clone(), StandardScaler::fit(frame.numeric(name)?)));
        }

        let mut categorical = Vec::with_capacity(self.categorical_features.len());
        for name in &self.categorical_features {
            categorical.push((name.clone(), OneHotEncoder::fit(frame.categorical(name)?)));
        }

        let mut passthrough = Vec::new();
        for column in frame.columns() {
            let claimed = self.numeric_features.contains(&column.name)
                || self.categorical_features.contains(&column.name);
            if !claimed {
                // Remainder columns are copied as-is, so they must already be numeric.
                frame.numeric(&column.name)?;
                passthrough.push(column.name.clone());
            }
        }

        tracing::debug!(
            numeric = numeric.len(),
            categorical = categorical.len(),
            passthrough = passthrough.len(),
            "Fitted column transformer"
        );

        self.fitted = Some(FittedColumns {
            numeric,
            categorical,
            passthrough,
        });
        Ok(())
    }

    /// Number of output columns after fitting.
    pub fn output_width(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| {
            f.numeric.len()
                + f.categorical.iter().map(|(_, e)| e.width()).sum::<usize>()
                + f.passthrough.len()
        })
    }

    /// Output column names, e.g. `Fuel_Type_X` for one-hot columns.
    pub fn feature_names_out(&self) -> GgResult<Vec<String>> {
        let fitted = self.fitted_columns("feature_names_out")?;
        let mut names: Vec<String> = fitted.numeric.iter().map(|(n, _)| n.clone()).collect();
        for (name, encoder) in &fitted.categorical {
            names.extend(encoder.categories().iter().map(|c| format!("{name}_{c}")));
        }
        names.extend(fitted.passthrough.iter().cloned());
        Ok(names)
    }

    pub fn transform(&self, frame: &Frame) -> GgResult<FeatureMatrix> {
        let fitted = self.fitted_columns("transform")?;
        let width = self.output_width().unwrap_or(0);
        let mut out = FeatureMatrix::zeros(frame.n_rows(), width);

        let mut offset = 0;
        for (name, scaler) in &fitted.numeric {
            let values = frame.numeric(name)?;
            for (row, value) in values.iter().enumerate() {
                out.row_mut(row)[offset] = scaler.transform_one(*value);
            }
            offset += 1;
        }

        for (name, encoder) in &fitted.categorical {
            let values = frame.categorical(name)?;
            for (row, value) in values.iter().enumerate() {
                if let Some(hot) = encoder.position(value) {
                    out.row_mut(row)[offset + hot] = 1.0;
                }
            }
            offset += encoder.width();
        }

        for name in &fitted.passthrough {
            let values = frame.numeric(name)?;
            for (row, value) in values.iter().enumerate() {
                out.row_mut(row)[offset] = *value;
            }
            offset += 1;
        }

        Ok(out)
    }

    pub fn fit_transform(&mut self, frame: &Frame) -> GgResult<FeatureMatrix> {
        self.fit(frame)?;
        self.transform(frame)
    }

    fn fitted_columns(&self, operation: &str) -> GgResult<&FittedColumns> {
        self.fitted.as_ref().ok_or_else(|| {
            ModelError::NotFitted {
                operation: operation.to_string(),
            }
            .into()
        })
    }
}

/// The preprocessing used for the CO2 regression: scale the three numeric
/// features, one-hot the three categorical ones.
pub fn build_preprocessor() -> ColumnTransformer {
    ColumnTransformer::new(NUMERIC_FEATURES, CATEGORICAL_FEATURES)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(fuel: &[&str], engine: &[f64]) -> Frame {
        Frame::new()
            .with_numeric("Engine_Size_L", engine.to_vec())
            .unwrap()
            .with_categorical("Fuel_Type", fuel.iter().map(|s| s.to_string()).collect())
            .unwrap()
    }

    #[test]
    fn scaler_standardizes() {
        let scaler = StandardScaler::fit(&[1.0, 2.0, 3.0]);
        assert!((scaler.mean() - 2.0).abs() < 1e-12);
        assert!((scaler.transform_one(2.0)).abs() < 1e-12);
        let expected = 1.0 / (2.0f64 / 3.0).sqrt();
        assert!((scaler.transform_one(3.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn constant_column_maps_to_zero() {
        let scaler = StandardScaler::fit(&[5.0, 5.0, 5.0]);
        assert_eq!(scaler.scale(), 1.0);
        assert_eq!(scaler.transform_one(5.0), 0.0);
    }

    #[test]
    fn one_hot_sorted_and_unknown_is_zero() {
        let train = frame(&["Z", "X", "Z"], &[1.0, 2.0, 3.0]);
        let mut ct = ColumnTransformer::new(["Engine_Size_L"], ["Fuel_Type"]);
        ct.fit(&train).unwrap();

        assert_eq!(
            ct.feature_names_out().unwrap(),
            vec!["Engine_Size_L", "Fuel_Type_X", "Fuel_Type_Z"]
        );

        let test = frame(&["X", "E"], &[2.0, 2.0]);
        let out = ct.transform(&test).unwrap();
        assert_eq!(out.n_cols(), 3);
        assert_eq!(&out.row(0)[1..], &[1.0, 0.0]);
        assert_eq!(&out.row(1)[1..], &[0.0, 0.0]);
    }

    #[test]
    fn remainder_columns_pass_through() {
        let train = frame(&["X", "Z"], &[1.0, 3.0])
            .with_numeric("Year", vec![2001.0, 2002.0])
            .unwrap();
        let mut ct = ColumnTransformer::new(["Engine_Size_L"], ["Fuel_Type"]);
        let out = ct.fit_transform(&train).unwrap();

        assert_eq!(out.n_cols(), 4);
        assert_eq!(out.row(0)[3], 2001.0);
        assert_eq!(out.row(1)[3], 2002.0);
        assert_eq!(out.row(0)[0], -1.0);
        assert_eq!(out.row(1)[0], 1.0);
    }

    #[test]
    fn transform_before_fit_fails() {
        let ct = build_preprocessor();
        assert!(!ct.is_fitted());
        assert!(ct.transform(&frame(&["X"], &[1.0])).is_err());
    }

    #[test]
    fn default_preprocessor_on_vehicle_features() {
        let records = crate::splits::tests::synthetic_records(12);
        let features = crate::splits::features_frame(&records).unwrap();
        let mut ct = build_preprocessor();
        let out = ct.fit_transform(&features).unwrap();

        // 3 numeric + 3 classes + 2 transmissions + 3 fuels
        assert_eq!(out.n_cols(), 11);
        assert_eq!(out.n_rows(), 12);
        for i in 0..out.n_rows() {
            let hot: f64 = out.row(i)[3..].iter().sum();
            assert_eq!(hot, 3.0);
        }
    }
}
