//! Search space definitions: named, box-bounded dimensions.

use gg_types::{config_error, GgResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Human-readable parameter name (e.g. "learning_rate_init").
    pub name: String,
    /// The kind of search range.
    pub kind: ParameterKind,
}

/// Describes how a dimension is bounded and decoded.
///
/// Every dimension is searched as a real number. Integer dimensions are
/// only converted when decoded, by truncation toward zero, so `57.9`
/// decodes to `57`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Continuous range [low, high].
    FloatRange { low: f64, high: f64 },
    /// Integer-valued range [low, high].
    IntRange { low: i64, high: i64 },
}

impl ParameterKind {
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Self::FloatRange { low, high } => (*low, *high),
            Self::IntRange { low, high } => (*low as f64, *high as f64),
        }
    }

    pub fn decode(&self, value: f64) -> ParameterValue {
        match self {
            Self::FloatRange { .. } => ParameterValue::Float(value),
            Self::IntRange { .. } => ParameterValue::Int(truncate(value)),
        }
    }
}

/// Convert a real coordinate to an integer by dropping the fractional part.
pub fn truncate(value: f64) -> i64 {
    value.trunc() as i64
}

/// A concrete decoded parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
}

impl ParameterValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Float(v) => *v,
            Self::Int(v) => *v as f64,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Float(v) => truncate(*v),
            Self::Int(v) => *v,
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
        }
    }
}

/// The full search space: an ordered list of parameter definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterDef>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add_float(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::FloatRange { low, high },
        });
        self
    }

    pub fn add_int(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::IntRange { low, high },
        });
        self
    }

    /// Build an anonymous continuous space from raw bound vectors.
    /// Dimensions are named `x0`, `x1`, ...
    pub fn from_bounds(lower: &[f64], upper: &[f64]) -> GgResult<Self> {
        if lower.len() != upper.len() {
            return Err(config_error!(
                "bounds length mismatch: lower has {} entries, upper has {}",
                lower.len(),
                upper.len()
            ));
        }
        let space = lower
            .iter()
            .zip(upper)
            .enumerate()
            .fold(Self::new(), |space, (i, (lo, hi))| {
                space.add_float(format!("x{i}"), *lo, *hi)
            });
        space.validate()?;
        Ok(space)
    }

    /// Hyperparameter space of the CO2 regressor: learning rate and the two
    /// hidden layer sizes.
    pub fn mlp_default() -> Self {
        Self::new()
            .add_float("learning_rate_init", 0.0001, 0.1)
            .add_int("hidden_layer_size_1", 10, 100)
            .add_int("hidden_layer_size_2", 10, 100)
    }

    pub fn dim(&self) -> usize {
        self.parameters.len()
    }

    pub fn lower(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.kind.bounds().0).collect()
    }

    pub fn upper(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.kind.bounds().1).collect()
    }

    /// Check that the space is non-empty and every dimension has finite,
    /// ordered bounds.
    pub fn validate(&self) -> GgResult<()> {
        if self.parameters.is_empty() {
            return Err(config_error!("search space has no dimensions"));
        }
        for (i, param) in self.parameters.iter().enumerate() {
            let (low, high) = param.kind.bounds();
            if !low.is_finite() || !high.is_finite() {
                return Err(config_error!(
                    "dimension {i} ({}) has non-finite bounds [{low}, {high}]",
                    param.name
                ));
            }
            if low > high {
                return Err(config_error!(
                    "dimension {i} ({}): lower bound {low} exceeds upper bound {high}",
                    param.name
                ));
            }
        }
        Ok(())
    }

    /// Clamp every component into its dimension's bounds.
    pub fn clip(&self, position: &[f64]) -> Vec<f64> {
        let mut clipped = position.to_vec();
        self.clip_in_place(&mut clipped);
        clipped
    }

    /// Clamp each component to its bounds. `position` must have one
    /// component per dimension.
    pub fn clip_in_place(&self, position: &mut [f64]) {
        debug_assert_eq!(position.len(), self.dim(), "position dimension mismatch");
        for (x, param) in position.iter_mut().zip(&self.parameters) {
            let (low, high) = param.kind.bounds();
            *x = x.clamp(low, high);
        }
    }

    pub fn contains(&self, position: &[f64]) -> bool {
        position.len() == self.dim()
            && position.iter().zip(&self.parameters).all(|(x, param)| {
                let (low, high) = param.kind.bounds();
                (low..=high).contains(x)
            })
    }

    /// Uniform sample: `low + (high - low) * U(0, 1)` per dimension.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.parameters
            .iter()
            .map(|param| {
                let (low, high) = param.kind.bounds();
                low + (high - low) * rng.gen::<f64>()
            })
            .collect()
    }

    /// Map a position to named values, truncating integer dimensions.
    pub fn decode(&self, position: &[f64]) -> BTreeMap<String, ParameterValue> {
        self.parameters
            .iter()
            .zip(position)
            .map(|(param, x)| (param.name.clone(), param.kind.decode(*x)))
            .collect()
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gg_types::GgError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn from_bounds_rejects_length_mismatch() {
        let result = SearchSpace::from_bounds(&[0.0, 1.0], &[1.0]);
        assert!(matches!(result, Err(GgError::Config(_))));
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let result = SearchSpace::from_bounds(&[0.0, 5.0], &[1.0, 4.0]);
        match result {
            Err(GgError::Config(msg)) => assert!(msg.contains("dimension 1")),
            other => panic!("expected config error, got {other:?}"),
        }

        let space = SearchSpace::new().add_int("h", 100, 10);
        assert!(space.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_and_non_finite() {
        assert!(SearchSpace::new().validate().is_err());
        assert!(SearchSpace::from_bounds(&[0.0], &[f64::INFINITY]).is_err());
        assert!(SearchSpace::from_bounds(&[f64::NAN], &[1.0]).is_err());
    }

    #[test]
    fn degenerate_dimension_is_allowed() {
        let space = SearchSpace::from_bounds(&[2.0], &[2.0]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(space.sample(&mut rng), vec![2.0]);
    }

    #[test]
    fn clip_clamps_each_component() {
        let space = SearchSpace::mlp_default();
        let clipped = space.clip(&[0.5, 5.0, 57.0]);
        assert_eq!(clipped, vec![0.1, 10.0, 57.0]);
        assert!(space.contains(&clipped));
        assert!(!space.contains(&[0.5, 5.0, 57.0]));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "position dimension mismatch")]
    fn clip_rejects_wrong_dimension() {
        SearchSpace::mlp_default().clip(&[0.5, 5.0]);
    }

    #[test]
    fn sample_stays_in_bounds() {
        let space = SearchSpace::mlp_default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..200 {
            let x = space.sample(&mut rng);
            assert_eq!(x.len(), 3);
            assert!(space.contains(&x), "sample out of bounds: {x:?}");
        }
    }

    #[test]
    fn decode_truncates_integer_dimensions() {
        let space = SearchSpace::mlp_default();
        let decoded = space.decode(&[0.0123, 57.9, 10.99]);

        assert_eq!(decoded["learning_rate_init"], ParameterValue::Float(0.0123));
        assert_eq!(decoded["hidden_layer_size_1"], ParameterValue::Int(57));
        assert_eq!(decoded["hidden_layer_size_2"], ParameterValue::Int(10));
    }

    #[test]
    fn truncation_is_toward_zero() {
        assert_eq!(truncate(57.9), 57);
        assert_eq!(truncate(0.99), 0);
        assert_eq!(truncate(-0.5), 0);
        assert_eq!(truncate(-1.5), -1);
    }

    #[test]
    fn parameter_value_display_and_conversion() {
        assert_eq!(ParameterValue::Int(57).to_string(), "57");
        assert_eq!(ParameterValue::Float(0.5).to_string(), "0.5");
        assert_eq!(ParameterValue::Float(57.9).as_i64(), 57);
        assert_eq!(ParameterValue::Int(3).as_f64(), 3.0);
    }

    #[test]
    fn search_space_builder_chain() {
        let space = SearchSpace::new()
            .add_float("a", 0.0, 1.0)
            .add_int("b", 1, 10);
        assert_eq!(space.dim(), 2);
        assert_eq!(space.lower(), vec![0.0, 1.0]);
        assert_eq!(space.upper(), vec![1.0, 10.0]);
    }
}
