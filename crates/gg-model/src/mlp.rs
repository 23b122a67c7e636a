//! Multi-layer perceptron regressor trained with Adam.
//!
//! ReLU hidden layers, identity output, squared-error loss with an L2
//! penalty. Training runs mini-batch epochs until `max_iter` is reached or
//! the training loss has not improved by at least `tol` for more than
//! `n_iter_no_change` consecutive epochs.

use gg_types::{FeatureMatrix, GgResult, ModelError};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hyperparameters and training schedule of an [`MlpRegressor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpConfig {
    pub hidden_layer_sizes: Vec<usize>,
    pub learning_rate_init: f64,
    /// Maximum number of epochs.
    pub max_iter: usize,
    pub tol: f64,
    pub n_iter_no_change: usize,
    /// L2 penalty strength.
    pub alpha: f64,
    /// Upper bound on the mini-batch size; clipped to the sample count.
    pub batch_size: usize,
    pub beta_1: f64,
    pub beta_2: f64,
    pub epsilon: f64,
    /// Seed for weight initialisation and batch shuffling.
    pub random_state: Option<u64>,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layer_sizes: vec![100],
            learning_rate_init: 0.001,
            max_iter: 200,
            tol: 1e-4,
            n_iter_no_change: 10,
            alpha: 1e-4,
            batch_size: 200,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-8,
            random_state: None,
        }
    }
}

impl MlpConfig {
    /// Short schedule used while scoring candidates during the search.
    pub fn for_search(learning_rate_init: f64, hidden_1: usize, hidden_2: usize) -> Self {
        Self {
            hidden_layer_sizes: vec![hidden_1, hidden_2],
            learning_rate_init,
            max_iter: 100,
            tol: 1e-3,
            n_iter_no_change: 10,
            random_state: Some(42),
            ..Self::default()
        }
    }

    /// Longer schedule used for the final model.
    pub fn for_final_model(learning_rate_init: f64, hidden_1: usize, hidden_2: usize) -> Self {
        Self {
            hidden_layer_sizes: vec![hidden_1, hidden_2],
            learning_rate_init,
            max_iter: 500,
            tol: 1e-4,
            n_iter_no_change: 20,
            random_state: Some(42),
            ..Self::default()
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn validate(&self) -> GgResult<()> {
        let invalid = |name: &str, message: String| -> GgResult<()> {
            Err(ModelError::InvalidHyperparameter {
                name: name.to_string(),
                message,
            }
            .into())
        };

        if self.hidden_layer_sizes.is_empty() {
            return invalid("hidden_layer_sizes", "at least one hidden layer is required".into());
        }
        if let Some(i) = self.hidden_layer_sizes.iter().position(|&h| h == 0) {
            return invalid("hidden_layer_sizes", format!("layer {i} has size 0"));
        }
        if !(self.learning_rate_init.is_finite() && self.learning_rate_init > 0.0) {
            return invalid(
                "learning_rate_init",
                format!("must be positive, got {}", self.learning_rate_init),
            );
        }
        if self.max_iter == 0 {
            return invalid("max_iter", "must be positive".into());
        }
        if self.batch_size == 0 {
            return invalid("batch_size", "must be positive".into());
        }
        if !(self.alpha >= 0.0 && self.alpha.is_finite()) {
            return invalid("alpha", format!("must be non-negative, got {}", self.alpha));
        }
        Ok(())
    }
}

/// Fully connected layer, weights stored row-major as `[fan_in][fan_out]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Dense {
    fan_in: usize,
    fan_out: usize,
    weights: Vec<f64>,
    bias: Vec<f64>,
}

impl Dense {
    /// Glorot-uniform initialisation.
    fn init<R: Rng>(fan_in: usize, fan_out: usize, rng: &mut R) -> Self {
        let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
        let mut sample = |n: usize| -> Vec<f64> {
            (0..n).map(|_| rng.gen_range(-bound..bound)).collect()
        };
        Self {
            fan_in,
            fan_out,
            weights: sample(fan_in * fan_out),
            bias: sample(fan_out),
        }
    }

    fn forward(&self, input: &[f64], output: &mut Vec<f64>) {
        output.clear();
        output.extend_from_slice(&self.bias);
        for (i, x) in input.iter().enumerate() {
            if *x == 0.0 {
                continue;
            }
            let row = &self.weights[i * self.fan_out..(i + 1) * self.fan_out];
            for (o, w) in output.iter_mut().zip(row) {
                *o += x * w;
            }
        }
    }

    fn squared_norm(&self) -> f64 {
        self.weights.iter().map(|w| w * w).sum()
    }
}

#[derive(Debug, Clone)]
struct Gradients {
    weights: Vec<Vec<f64>>,
    bias: Vec<Vec<f64>>,
}

impl Gradients {
    fn zeros(layers: &[Dense]) -> Self {
        Self {
            weights: layers.iter().map(|l| vec![0.0; l.weights.len()]).collect(),
            bias: layers.iter().map(|l| vec![0.0; l.bias.len()]).collect(),
        }
    }

    fn reset(&mut self) {
        self.weights.iter_mut().for_each(|g| g.fill(0.0));
        self.bias.iter_mut().for_each(|g| g.fill(0.0));
    }
}

/// Adam state with bias-corrected step size.
#[derive(Debug, Clone)]
struct Adam {
    lr: f64,
    beta_1: f64,
    beta_2: f64,
    epsilon: f64,
    t: i32,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
}

impl Adam {
    fn new(config: &MlpConfig, shapes: &[usize]) -> Self {
        Self {
            lr: config.learning_rate_init,
            beta_1: config.beta_1,
            beta_2: config.beta_2,
            epsilon: config.epsilon,
            t: 0,
            m: shapes.iter().map(|&n| vec![0.0; n]).collect(),
            v: shapes.iter().map(|&n| vec![0.0; n]).collect(),
        }
    }

    /// Apply one update to every tensor. `params` and `grads` are in the
    /// same order as the shapes passed to `new`.
    fn step(&mut self, params: Vec<&mut [f64]>, grads: Vec<&[f64]>) {
        self.t += 1;
        let lr_t = self.lr * (1.0 - self.beta_2.powi(self.t)).sqrt()
            / (1.0 - self.beta_1.powi(self.t));

        for (k, (param, grad)) in params.into_iter().zip(grads).enumerate() {
            let (m, v) = (&mut self.m[k], &mut self.v[k]);
            for j in 0..param.len() {
                let g = grad[j];
                m[j] = self.beta_1 * m[j] + (1.0 - self.beta_1) * g;
                v[j] = self.beta_2 * v[j] + (1.0 - self.beta_2) * g * g;
                param[j] -= lr_t * m[j] / (v[j].sqrt() + self.epsilon);
            }
        }
    }
}

/// Two-or-more layer perceptron for scalar regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpRegressor {
    config: MlpConfig,
    layers: Vec<Dense>,
    loss_curve: Vec<f64>,
    n_iter: usize,
}

impl MlpRegressor {
    pub fn new(config: MlpConfig) -> Self {
        Self {
            config,
            layers: Vec::new(),
            loss_curve: Vec::new(),
            n_iter: 0,
        }
    }

    pub fn config(&self) -> &MlpConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        !self.layers.is_empty()
    }

    /// Training loss after each epoch of the last `fit`.
    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }

    /// Epochs run by the last `fit`.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> GgResult<()> {
        self.config.validate()?;
        let n = x.n_rows();
        if n == 0 {
            return Err(ModelError::EmptyTrainingSet.into());
        }
        if y.len() != n {
            return Err(ModelError::ShapeMismatch {
                expected: n,
                actual: y.len(),
            }
            .into());
        }

        let mut rng = match self.config.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut sizes = Vec::with_capacity(self.config.hidden_layer_sizes.len() + 2);
        sizes.push(x.n_cols());
        sizes.extend_from_slice(&self.config.hidden_layer_sizes);
        sizes.push(1);
        self.layers = sizes
            .windows(2)
            .map(|w| Dense::init(w[0], w[1], &mut rng))
            .collect();
        self.loss_curve.clear();

        let shapes: Vec<usize> = self
            .layers
            .iter()
            .flat_map(|l| [l.weights.len(), l.bias.len()])
            .collect();
        let mut adam = Adam::new(&self.config, &shapes);
        let mut grads = Gradients::zeros(&self.layers);
        let mut activations: Vec<Vec<f64>> = vec![Vec::new(); self.layers.len() + 1];
        let mut deltas: Vec<Vec<f64>> = self.layers.iter().map(|l| vec![0.0; l.fan_out]).collect();

        let batch_size = self.config.batch_size.min(n);
        let mut order: Vec<usize> = (0..n).collect();
        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0;

        for epoch in 1..=self.config.max_iter {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(batch_size) {
                grads.reset();
                let mut batch_loss = 0.0;

                for &row in batch {
                    let prediction = self.forward(x.row(row), &mut activations);
                    let err = prediction - y[row];
                    batch_loss += 0.5 * err * err;
                    self.backward(err, &activations, &mut deltas, &mut grads);
                }

                let m = batch.len() as f64;
                let penalty: f64 = self.layers.iter().map(Dense::squared_norm).sum();
                batch_loss = batch_loss / m + 0.5 * self.config.alpha * penalty / m;
                epoch_loss += batch_loss * m;

                for (k, layer) in self.layers.iter().enumerate() {
                    for (g, w) in grads.weights[k].iter_mut().zip(&layer.weights) {
                        *g = *g / m + self.config.alpha * w / m;
                    }
                    grads.bias[k].iter_mut().for_each(|g| *g /= m);
                }

                let mut params: Vec<&mut [f64]> = Vec::with_capacity(shapes.len());
                for layer in self.layers.iter_mut() {
                    params.push(layer.weights.as_mut_slice());
                    params.push(layer.bias.as_mut_slice());
                }
                let grad_refs: Vec<&[f64]> = grads
                    .weights
                    .iter()
                    .zip(&grads.bias)
                    .flat_map(|(w, b)| [w.as_slice(), b.as_slice()])
                    .collect();
                adam.step(params, grad_refs);
            }

            let loss = epoch_loss / n as f64;
            if !loss.is_finite() {
                return Err(ModelError::Diverged { epoch, loss }.into());
            }
            self.loss_curve.push(loss);
            self.n_iter = epoch;

            if loss > best_loss - self.config.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if loss < best_loss {
                best_loss = loss;
            }

            if no_improvement > self.config.n_iter_no_change {
                debug!(
                    epoch,
                    loss, "Training loss stopped improving, ending training"
                );
                return Ok(());
            }
        }

        debug!(
            max_iter = self.config.max_iter,
            loss = best_loss,
            "Reached max_iter before the loss converged"
        );
        Ok(())
    }

    pub fn predict(&self, x: &FeatureMatrix) -> GgResult<Vec<f64>> {
        let first = self.layers.first().ok_or_else(|| ModelError::NotFitted {
            operation: "predict".to_string(),
        })?;
        if x.n_cols() != first.fan_in {
            return Err(ModelError::ShapeMismatch {
                expected: first.fan_in,
                actual: x.n_cols(),
            }
            .into());
        }

        let mut activations: Vec<Vec<f64>> = vec![Vec::new(); self.layers.len() + 1];
        Ok((0..x.n_rows())
            .map(|i| self.forward(x.row(i), &mut activations))
            .collect())
    }

    /// Forward pass for one sample. `activations[0]` is the input and
    /// `activations[k + 1]` the post-activation output of layer `k`.
    fn forward(&self, input: &[f64], activations: &mut [Vec<f64>]) -> f64 {
        activations[0].clear();
        activations[0].extend_from_slice(input);

        let last = self.layers.len() - 1;
        for (k, layer) in self.layers.iter().enumerate() {
            let (done, rest) = activations.split_at_mut(k + 1);
            layer.forward(&done[k], &mut rest[0]);
            if k != last {
                rest[0].iter_mut().for_each(|a| *a = a.max(0.0));
            }
        }
        activations[last + 1][0]
    }

    /// Accumulate gradients of `0.5 * err^2` for one sample.
    fn backward(
        &self,
        err: f64,
        activations: &[Vec<f64>],
        deltas: &mut [Vec<f64>],
        grads: &mut Gradients,
    ) {
        let last = self.layers.len() - 1;
        deltas[last][0] = err;

        for k in (0..=last).rev() {
            let layer = &self.layers[k];
            let input = &activations[k];

            for (i, a) in input.iter().enumerate() {
                if *a == 0.0 {
                    continue;
                }
                let g_row = &mut grads.weights[k][i * layer.fan_out..(i + 1) * layer.fan_out];
                for (g, d) in g_row.iter_mut().zip(&deltas[k]) {
                    *g += a * d;
                }
            }
            for (g, d) in grads.bias[k].iter_mut().zip(&deltas[k]) {
                *g += d;
            }

            if k > 0 {
                let (lower, upper) = deltas.split_at_mut(k);
                let prev = &mut lower[k - 1];
                for (i, p) in prev.iter_mut().enumerate() {
                    // ReLU derivative: zero where the activation was clipped.
                    if input[i] <= 0.0 {
                        *p = 0.0;
                        continue;
                    }
                    let row = &layer.weights[i * layer.fan_out..(i + 1) * layer.fan_out];
                    *p = row.iter().zip(&upper[0]).map(|(w, d)| w * d).sum();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gg_types::GgError;

    fn linear_data(n: usize) -> (FeatureMatrix, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let a = (i % 10) as f64 / 10.0 - 0.5;
                let b = (i % 7) as f64 / 7.0 - 0.5;
                vec![a, b]
            })
            .collect();
        let y = rows.iter().map(|r| 3.0 * r[0] - 2.0 * r[1] + 1.0).collect();
        (FeatureMatrix::from_rows(&rows).unwrap(), y)
    }

    fn mse(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>() / a.len() as f64
    }

    #[test]
    fn learns_linear_target() {
        let (x, y) = linear_data(120);
        let config = MlpConfig {
            hidden_layer_sizes: vec![16, 8],
            learning_rate_init: 0.01,
            max_iter: 300,
            batch_size: 16,
            random_state: Some(42),
            ..MlpConfig::default()
        };
        let mut mlp = MlpRegressor::new(config);
        mlp.fit(&x, &y).unwrap();

        let baseline = {
            let mean = y.iter().sum::<f64>() / y.len() as f64;
            mse(&vec![mean; y.len()], &y)
        };
        let predictions = mlp.predict(&x).unwrap();
        assert!(mse(&predictions, &y) < 0.1 * baseline);
        assert!(mlp.n_iter() > 0);
        assert_eq!(mlp.loss_curve().len(), mlp.n_iter());
    }

    #[test]
    fn same_seed_same_model() {
        let (x, y) = linear_data(40);
        let config = MlpConfig::for_search(0.01, 5, 4).with_max_iter(20);
        let mut a = MlpRegressor::new(config.clone());
        let mut b = MlpRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn stops_early_when_loss_plateaus() {
        let (x, _) = linear_data(30);
        let y = vec![0.0; 30];
        let config = MlpConfig {
            hidden_layer_sizes: vec![4, 4],
            learning_rate_init: 0.001,
            max_iter: 500,
            tol: 1.0,
            n_iter_no_change: 2,
            random_state: Some(1),
            ..MlpConfig::default()
        };
        let mut mlp = MlpRegressor::new(config);
        mlp.fit(&x, &y).unwrap();
        assert!(mlp.n_iter() < 500);
    }

    #[test]
    fn zero_sized_layer_is_rejected() {
        let (x, y) = linear_data(10);
        let mut mlp = MlpRegressor::new(MlpConfig::for_search(0.01, 0, 10));
        match mlp.fit(&x, &y) {
            Err(GgError::Model(ModelError::InvalidHyperparameter { name, .. })) => {
                assert_eq!(name, "hidden_layer_sizes");
            }
            other => panic!("expected invalid hyperparameter, got {other:?}"),
        }
    }

    #[test]
    fn overflowing_loss_reports_divergence() {
        let (x, y) = linear_data(20);
        let y: Vec<f64> = y.iter().map(|v| v * 1e200).collect();
        let mut mlp = MlpRegressor::new(MlpConfig::for_search(1e10, 4, 4));
        match mlp.fit(&x, &y) {
            Err(GgError::Model(ModelError::Diverged { .. })) => {}
            other => panic!("expected divergence, got {other:?}"),
        }
    }

    #[test]
    fn predict_checks_state_and_shape() {
        let (x, y) = linear_data(10);
        let mut mlp = MlpRegressor::new(MlpConfig::for_search(0.01, 3, 3).with_max_iter(5));
        assert!(matches!(
            mlp.predict(&x),
            Err(GgError::Model(ModelError::NotFitted { .. }))
        ));

        mlp.fit(&x, &y).unwrap();
        let wrong = FeatureMatrix::zeros(2, 5);
        assert!(matches!(
            mlp.predict(&wrong),
            Err(GgError::Model(ModelError::ShapeMismatch { expected: 2, actual: 5 }))
        ));
    }
}
