use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::{Activation, Dataset, Error, Layer, Result, data, loss, metrics};

/// Input width of a 28x28 grayscale digit.
pub const DEFAULT_INPUT_DIM: usize = 784;
/// Number of digit classes.
pub const DEFAULT_CLASS_COUNT: usize = 10;
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

/// Fixed external shape and step size of a [`Network`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkConfig {
    /// Width of every input vector (and of the first layer's units).
    pub input_dim: usize,
    /// Length of the one-hot target vectors.
    pub class_count: usize,
    pub learning_rate: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_dim: DEFAULT_INPUT_DIM,
            class_count: DEFAULT_CLASS_COUNT,
            learning_rate: DEFAULT_LEARNING_RATE,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        if self.class_count == 0 {
            return Err(Error::InvalidConfig("class_count must be > 0".to_owned()));
        }
        validate_learning_rate(self.learning_rate)
    }
}

fn validate_learning_rate(lr: f64) -> Result<()> {
    if !(lr.is_finite() && lr > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "learning rate must be finite and > 0, got {lr}"
        )));
    }
    Ok(())
}

/// A stack of fully-connected layers trained with per-sample gradient descent.
///
/// Layers are appended one at a time; the structure is otherwise fixed. The
/// network owns the random generator that initialises new layers and
/// shuffles training data, so a seeded network is fully reproducible.
#[derive(Debug, Clone)]
pub struct Network {
    config: NetworkConfig,
    layers: Vec<Layer>,
    rng: StdRng,
}

impl Network {
    /// Creates an empty network seeded from system entropy.
    pub fn new(config: NetworkConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Creates an empty network with a deterministic seed.
    pub fn with_seed(config: NetworkConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(config: NetworkConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            layers: Vec::new(),
            rng,
        })
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.config.input_dim
    }

    #[inline]
    pub fn class_count(&self) -> usize {
        self.config.class_count
    }

    /// Width of the last layer, if any.
    #[inline]
    pub fn output_dim(&self) -> Option<usize> {
        self.layers.last().map(Layer::unit_count)
    }

    #[inline]
    pub fn learning_rate(&self) -> f64 {
        self.config.learning_rate
    }

    pub fn set_learning_rate(&mut self, lr: f64) -> Result<()> {
        validate_learning_rate(lr)?;
        self.config.learning_rate = lr;
        Ok(())
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Appends a freshly initialised layer of `unit_count` units.
    ///
    /// Its input width is the previous layer's unit count, or the network's
    /// input width for the first layer. Only the last layer may use
    /// [`Activation::Softmax`], so nothing can follow a softmax layer.
    pub fn add_layer(&mut self, unit_count: usize, activation: Activation) -> Result<()> {
        let input_dim = match self.layers.last() {
            Some(prev) if prev.activation().is_layer_wide() => {
                return Err(Error::InvalidConfig(
                    "cannot append a layer after a softmax output layer".to_owned(),
                ));
            }
            Some(prev) => prev.unit_count(),
            None => self.config.input_dim,
        };

        let layer = Layer::new_with_rng(input_dim, unit_count, activation, &mut self.rng)?;
        self.layers.push(layer);
        debug!(
            index = self.layers.len() - 1,
            input_dim,
            unit_count,
            ?activation,
            "added layer"
        );
        Ok(())
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::EmptyNetwork);
        }
        if input.len() != self.config.input_dim {
            return Err(Error::size_mismatch(
                "network inputs",
                self.config.input_dim,
                input.len(),
            ));
        }
        Ok(())
    }

    /// Runs `input` through every layer, refreshing their cached state, and
    /// returns the last layer's outputs.
    pub fn forward_propagate(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.check_input(input)?;

        let mut current = input.to_vec();
        for layer in &mut self.layers {
            current = layer.forward_propagate(&current)?;
        }
        Ok(current)
    }

    /// Cross-entropy of `outputs` against `targets`.
    pub fn calculate_loss(&self, outputs: &[f64], targets: &[f64]) -> Result<f64> {
        loss::cross_entropy(outputs, targets)
    }

    /// One gradient-descent step on a single sample. Returns the sample's loss
    /// measured before the update.
    pub fn train_single(&mut self, input: &[f64], targets: &[f64]) -> Result<f64> {
        self.check_input(input)?;
        self.check_targets(targets)?;

        let outputs = self.forward_propagate(input)?;
        let loss = self.calculate_loss(&outputs, targets)?;

        let last = self.layers.len() - 1;
        self.layers[last].calculate_output_layer_deltas(targets)?;

        for idx in (0..last).rev() {
            // Read the layer ahead while writing this one.
            let (head, tail) = self.layers.split_at_mut(idx + 1);
            head[idx].calculate_hidden_layer_deltas(&tail[0])?;
        }

        let lr = self.config.learning_rate;
        for layer in &mut self.layers {
            layer.update_weights(lr)?;
        }

        Ok(loss)
    }

    fn check_targets(&self, targets: &[f64]) -> Result<()> {
        let out_dim = self.output_dim().ok_or(Error::EmptyNetwork)?;
        if targets.len() != out_dim {
            return Err(Error::size_mismatch(
                "network targets",
                out_dim,
                targets.len(),
            ));
        }
        Ok(())
    }

    /// Trains on each `(input, target)` pair in order and returns the mean loss.
    ///
    /// Weights are updated after every sample; nothing is accumulated across
    /// the batch. All pairs are shape-checked before the first update, so a
    /// failing call leaves the weights untouched.
    pub fn train_batch<I, T>(&mut self, inputs: &[I], targets: &[T]) -> Result<f64>
    where
        I: AsRef<[f64]>,
        T: AsRef<[f64]>,
    {
        if inputs.len() != targets.len() {
            return Err(Error::size_mismatch(
                "batch targets",
                inputs.len(),
                targets.len(),
            ));
        }
        if inputs.is_empty() {
            return Err(Error::InvalidConfig("batch must not be empty".to_owned()));
        }
        for (input, target) in inputs.iter().zip(targets) {
            self.check_input(input.as_ref())?;
            self.check_targets(target.as_ref())?;
        }

        let mut total = 0.0_f64;
        for (input, target) in inputs.iter().zip(targets) {
            total += self.train_single(input.as_ref(), target.as_ref())?;
        }
        Ok(total / inputs.len() as f64)
    }

    /// Index of the most probable class for `input`.
    pub fn predict(&mut self, input: &[f64]) -> Result<usize> {
        let outputs = self.forward_propagate(input)?;
        Ok(Self::max_output_index(&outputs))
    }

    /// The input followed by every layer's outputs, in order.
    ///
    /// Evaluated on a read-only path: cached per-layer state is not touched.
    pub fn get_all_activations(&self, input: &[f64]) -> Result<Vec<Vec<f64>>> {
        self.check_input(input)?;

        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        let mut current = input.to_vec();
        for layer in &self.layers {
            let next = layer.evaluate(&current)?;
            activations.push(std::mem::replace(&mut current, next));
        }
        activations.push(current);
        Ok(activations)
    }

    /// One-hot target of `label` over this network's class count.
    pub fn label_to_target(&self, label: i64) -> Vec<f64> {
        data::label_to_target(label, self.config.class_count)
    }

    /// Index of the largest output; ties go to the lowest index.
    pub fn max_output_index(output: &[f64]) -> usize {
        metrics::argmax(output)
    }

    /// Mean cross-entropy over `dataset`, evaluated without touching cached state.
    pub fn evaluate_loss(&self, dataset: &Dataset) -> Result<f64> {
        if dataset.is_empty() {
            return Err(Error::InvalidConfig("dataset must not be empty".to_owned()));
        }

        let mut total = 0.0_f64;
        for sample in dataset.samples() {
            let activations = self.get_all_activations(sample.input())?;
            let outputs = activations.last().map_or(&[][..], Vec::as_slice);
            total += self.calculate_loss(outputs, sample.target())?;
        }
        Ok(total / dataset.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> NetworkConfig {
        NetworkConfig {
            input_dim: 4,
            class_count: 3,
            learning_rate: 0.1,
        }
    }

    fn small_network(seed: u64) -> Network {
        let mut net = Network::with_seed(small_config(), seed).unwrap();
        net.add_layer(5, Activation::ReLU).unwrap();
        net.add_layer(3, Activation::Softmax).unwrap();
        net
    }

    fn params(net: &Network) -> Vec<f64> {
        net.layers()
            .iter()
            .flat_map(|l| l.units())
            .flat_map(|u| u.weights().iter().copied().chain(std::iter::once(u.bias())))
            .collect()
    }

    #[test]
    fn layer_widths_chain() {
        let net = small_network(0);
        assert_eq!(net.layer_count(), 2);
        assert_eq!(net.layers()[0].input_dim(), 4);
        assert_eq!(net.layers()[1].input_dim(), 5);
        assert_eq!(net.output_dim(), Some(3));
        assert_eq!(net.layer(1).map(Layer::unit_count), Some(3));
        assert!(net.layer(2).is_none());
    }

    #[test]
    fn nothing_may_follow_softmax() {
        let mut net = small_network(0);
        assert!(matches!(
            net.add_layer(2, Activation::ReLU),
            Err(Error::InvalidConfig(_))
        ));
        assert_eq!(net.layer_count(), 2);
    }

    #[test]
    fn empty_network_refuses_work() {
        let mut net = Network::with_seed(small_config(), 0).unwrap();
        let x = [0.0; 4];
        assert_eq!(net.forward_propagate(&x), Err(Error::EmptyNetwork));
        assert_eq!(net.predict(&x), Err(Error::EmptyNetwork));
        assert_eq!(
            net.train_single(&x, &[1.0, 0.0, 0.0]),
            Err(Error::EmptyNetwork)
        );
        assert!(net.get_all_activations(&x).is_err());
    }

    #[test]
    fn forward_returns_a_distribution() {
        let mut net = small_network(1);
        let out = net.forward_propagate(&[0.2, 0.4, 0.6, 0.8]).unwrap();
        assert_eq!(out.len(), 3);
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_input_width_is_rejected() {
        let mut net = small_network(1);
        assert!(matches!(
            net.forward_propagate(&[0.1; 3]),
            Err(Error::SizeMismatch { expected: 4, got: 3, .. })
        ));
    }

    #[test]
    fn activations_match_forward_and_leave_state_alone() {
        let mut net = small_network(2);
        let x = [0.9, 0.1, 0.5, 0.3];

        let acts = net.get_all_activations(&x).unwrap();
        assert_eq!(acts.len(), 3);
        assert_eq!(acts[0], x.to_vec());
        assert!(net.layers().iter().all(|l| l.last_inputs().is_empty()));

        let out = net.forward_propagate(&x).unwrap();
        assert_eq!(acts[2], out);
        assert_eq!(acts[1], net.layers()[0].outputs());
    }

    #[test]
    fn train_single_reduces_loss_on_the_sample() {
        let mut net = small_network(3);
        let x = [0.3, 0.7, 0.2, 0.9];
        let t = [0.0, 0.0, 1.0];

        let first = net.train_single(&x, &t).unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = net.train_single(&x, &t).unwrap();
        }
        assert!(last < first);
        assert_eq!(net.predict(&x).unwrap(), 2);
    }

    #[test]
    fn train_single_checks_targets_before_mutating() {
        let mut net = small_network(4);
        let before = params(&net);
        assert!(net.train_single(&[0.5; 4], &[1.0, 0.0]).is_err());
        assert_eq!(params(&net), before);
        assert!(net.layers().iter().all(|l| l.last_inputs().is_empty()));
    }

    #[test]
    fn mismatched_batch_is_rejected_without_updates() {
        let mut net = small_network(5);
        let before = params(&net);

        let inputs = vec![vec![0.1; 4], vec![0.2; 4]];
        let targets = vec![vec![1.0, 0.0, 0.0]];
        assert!(matches!(
            net.train_batch(&inputs, &targets),
            Err(Error::SizeMismatch { .. })
        ));
        assert_eq!(params(&net), before);

        let targets = vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0]];
        assert!(net.train_batch(&inputs, &targets).is_err());
        assert_eq!(params(&net), before);
    }

    #[test]
    fn batch_updates_after_every_sample() {
        let x = [0.4, 0.1, 0.8, 0.6];
        let t = [0.0, 1.0, 0.0];

        let mut batched = small_network(6);
        let mut single = small_network(6);

        let mean = batched.train_batch(&[x, x], &[t, t]).unwrap();
        let l1 = single.train_single(&x, &t).unwrap();
        let l2 = single.train_single(&x, &t).unwrap();

        assert!(l2 < l1);
        assert!((mean - (l1 + l2) / 2.0).abs() < 1e-12);
        assert_eq!(params(&batched), params(&single));
    }

    #[test]
    fn label_to_target_uses_class_count() {
        let net = small_network(0);
        assert_eq!(net.label_to_target(2), vec![0.0, 0.0, 1.0]);
        assert_eq!(net.label_to_target(3), vec![0.0, 0.0, 0.0]);
        assert_eq!(Network::max_output_index(&[0.5, 0.5]), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = small_config();
        cfg.learning_rate = 0.0;
        assert!(Network::with_seed(cfg, 0).is_err());

        let mut net = small_network(0);
        assert!(net.set_learning_rate(f64::NAN).is_err());
        assert_eq!(net.learning_rate(), 0.1);
    }

    #[test]
    fn deltas_flow_back_through_two_hidden_layers() {
        let cfg = NetworkConfig {
            input_dim: 3,
            class_count: 2,
            learning_rate: 0.05,
        };
        let mut net = Network::with_seed(cfg, 11).unwrap();
        net.add_layer(6, Activation::ReLU).unwrap();
        net.add_layer(5, Activation::ReLU).unwrap();
        net.add_layer(2, Activation::Softmax).unwrap();
        let before = net.clone();

        let x = [0.9, 0.4, 0.7];
        let t = [0.0, 1.0];
        net.train_single(&x, &t).unwrap();

        // Reference deltas from the pre-update weights.
        let acts = before.get_all_activations(&x).unwrap();
        let pull_back = |ahead: &Layer, deltas: &[f64], outputs: &[f64]| -> Vec<f64> {
            outputs
                .iter()
                .enumerate()
                .map(|(i, &y)| {
                    let sum: f64 = ahead
                        .units()
                        .iter()
                        .zip(deltas)
                        .map(|(u, d)| d * u.weights()[i])
                        .sum();
                    if y > 0.0 { sum } else { 0.0 }
                })
                .collect()
        };
        let d_out: Vec<f64> = t.iter().zip(&acts[3]).map(|(t, y)| t - y).collect();
        let d2 = pull_back(&before.layers()[2], &d_out, &acts[2]);
        let d1 = pull_back(&before.layers()[1], &d2, &acts[1]);
        assert!(d1.iter().any(|d| *d != 0.0));

        for (layer, expected) in net.layers().iter().zip([&d1, &d2, &d_out]) {
            for (unit, &e) in layer.units().iter().zip(expected) {
                assert!((unit.error_signal() - e).abs() < 1e-12);
            }
        }

        let lr = 0.05;
        let first_before = before.layers()[0].units();
        let first_after = net.layers()[0].units();
        for ((old, new), &d) in first_before.iter().zip(first_after).zip(&d1) {
            for (i, &xi) in x.iter().enumerate() {
                assert!((new.weights()[i] - (old.weights()[i] + lr * d * xi)).abs() < 1e-12);
            }
            assert!((new.bias() - (old.bias() + lr * d)).abs() < 1e-12);
        }
    }
}
