//! Feature selection and the train/test split.

use gg_types::{
    config_error, DataError, Frame, GgResult, VehicleRecord, CATEGORICAL_FEATURES,
    NUMERIC_FEATURES,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Fraction of rows held out for testing when the caller has no preference.
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Seed used for the split when the caller has no preference.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Train/test partition of the selected features and target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSplits {
    pub train_features: Frame,
    pub test_features: Frame,
    pub train_target: Vec<f64>,
    pub test_target: Vec<f64>,
}

/// Build the model input frame from the six selected columns.
pub fn features_frame(records: &[VehicleRecord]) -> GgResult<Frame> {
    let [engine, cylinders, comb] = NUMERIC_FEATURES;
    let [class, transmission, fuel] = CATEGORICAL_FEATURES;

    Frame::new()
        .with_numeric(engine, records.iter().map(|r| r.engine_size_l).collect())?
        .with_numeric(cylinders, records.iter().map(|r| r.cylinders).collect())?
        .with_numeric(comb, records.iter().map(|r| r.fuel_comb_l_100km).collect())?
        .with_categorical(class, records.iter().map(|r| r.vehicle_class.clone()).collect())?
        .with_categorical(
            transmission,
            records.iter().map(|r| r.transmission.clone()).collect(),
        )?
        .with_categorical(fuel, records.iter().map(|r| r.fuel_type.clone()).collect())
}

/// Regression target column.
pub fn target(records: &[VehicleRecord]) -> Vec<f64> {
    records.iter().map(|r| r.co2_emissions_g_km).collect()
}

/// Shuffle row indices with a seeded RNG and cut off the test share.
///
/// The test set gets `ceil(test_size * n)` rows; both sides must end up
/// non-empty.
pub fn train_test_indices(
    n_samples: usize,
    test_size: f64,
    seed: u64,
) -> GgResult<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(config_error!("test_size must lie in (0, 1), got {test_size}"));
    }

    let n_test = (test_size * n_samples as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(DataError::InsufficientData {
            message: format!(
                "cannot split {n_samples} rows with test_size {test_size}"
            ),
        }
        .into());
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok((train, indices))
}

/// Select features and target, then split them into train and test sets.
pub fn get_data_splits(
    records: &[VehicleRecord],
    test_size: f64,
    seed: u64,
) -> GgResult<DataSplits> {
    let features = features_frame(records)?;
    let y = target(records);
    let (train_idx, test_idx) = train_test_indices(records.len(), test_size, seed)?;

    tracing::info!(
        "Split {} rows into {} train / {} test (seed {})",
        records.len(),
        train_idx.len(),
        test_idx.len(),
        seed
    );

    Ok(DataSplits {
        train_features: features.select_rows(&train_idx),
        test_features: features.select_rows(&test_idx),
        train_target: train_idx.iter().map(|&i| y[i]).collect(),
        test_target: test_idx.iter().map(|&i| y[i]).collect(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use gg_types::GgError;

    pub(crate) fn synthetic_records(n: usize) -> Vec<VehicleRecord> {
        let classes = ["COMPACT", "SUV", "PICKUP"];
        let fuels = ["X", "Z", "D"];
        (0..n)
            .map(|i| {
                let engine = 1.0 + (i % 5) as f64 * 0.5;
                let comb = 6.0 + engine * 1.5 + (i % 3) as f64 * 0.2;
                VehicleRecord {
                    year: 2000 + (i % 20) as i32,
                    make: "ACME".to_string(),
                    model: format!("M{i}"),
                    vehicle_class: classes[i % 3].to_string(),
                    engine_size_l: engine,
                    cylinders: if engine < 2.5 { 4.0 } else { 6.0 },
                    transmission: if i % 2 == 0 { "A4" } else { "M5" }.to_string(),
                    fuel_type: fuels[i % 3].to_string(),
                    fuel_city_l_100km: comb * 1.1,
                    fuel_hwy_l_100km: comb * 0.9,
                    fuel_comb_l_100km: comb,
                    fuel_comb_mpg: 235.0 / comb,
                    co2_emissions_g_km: comb * 23.0,
                }
            })
            .collect()
    }

    #[test]
    fn split_sizes_follow_test_size() {
        let records = synthetic_records(50);
        let splits = get_data_splits(&records, 0.2, 42).unwrap();

        assert_eq!(splits.test_features.n_rows(), 10);
        assert_eq!(splits.train_features.n_rows(), 40);
        assert_eq!(splits.train_target.len(), 40);
        assert_eq!(splits.test_target.len(), 10);
        assert_eq!(splits.train_features.columns().len(), 6);
    }

    #[test]
    fn test_count_rounds_up() {
        let (train, test) = train_test_indices(11, 0.2, 1).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn split_is_reproducible_and_disjoint() {
        let (train_a, test_a) = train_test_indices(30, 0.3, 7).unwrap();
        let (train_b, test_b) = train_test_indices(30, 0.3, 7).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);

        let mut all: Vec<usize> = train_a.iter().chain(test_a.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn target_rows_follow_feature_rows() {
        let records = synthetic_records(20);
        let splits = get_data_splits(&records, 0.25, 3).unwrap();
        let comb = splits.test_features.numeric("Fuel_Comb_L_100km").unwrap();
        for (x, y) in comb.iter().zip(&splits.test_target) {
            assert!((x * 23.0 - y).abs() < 1e-9);
        }
    }

    #[test]
    fn invalid_test_size_is_config_error() {
        assert!(matches!(
            train_test_indices(10, 0.0, 42),
            Err(GgError::Config(_))
        ));
        assert!(matches!(
            train_test_indices(10, 1.0, 42),
            Err(GgError::Config(_))
        ));
        assert!(matches!(
            train_test_indices(1, 0.5, 42),
            Err(GgError::Data(DataError::InsufficientData { .. }))
        ));
    }
}
