use rand::Rng;
use rand_distr::StandardNormal;

use crate::{Activation, Error, Result};

/// Standard deviation of the initial weights and bias.
pub const INIT_STD_DEV: f64 = 0.1;

/// A single computational node: one weight per input connection plus a bias.
///
/// Besides its parameters a unit keeps the scratch state of the most recent
/// pass: the activated `output` and the backpropagated `error_signal`.
#[derive(Debug, Clone)]
pub struct Unit {
    weights: Vec<f64>,
    bias: f64,
    activation: Activation,
    output: f64,
    error_signal: f64,
}

impl Unit {
    /// Creates a unit with `input_dim` weights drawn from `N(0, INIT_STD_DEV)`.
    pub fn new_with_rng<R: Rng + ?Sized>(
        input_dim: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let weights = (0..input_dim).map(|_| sample_init(rng)).collect();
        let bias = sample_init(rng);
        Self::from_parts(weights, bias, activation)
    }

    /// Creates a unit with explicit parameters.
    pub fn from_parts(weights: Vec<f64>, bias: f64, activation: Activation) -> Self {
        Self {
            weights,
            bias,
            activation,
            output: 0.0,
            error_signal: 0.0,
        }
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline]
    pub fn weight(&self, index: usize) -> Option<f64> {
        self.weights.get(index).copied()
    }

    #[inline]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Activated output of the most recent forward pass.
    #[inline]
    pub fn output(&self) -> f64 {
        self.output
    }

    /// Error signal (delta) of the most recent backward pass.
    #[inline]
    pub fn error_signal(&self) -> f64 {
        self.error_signal
    }

    #[inline]
    pub(crate) fn set_output(&mut self, output: f64) {
        self.output = output;
    }

    #[inline]
    pub fn activate(&self, x: f64) -> f64 {
        self.activation.forward(x)
    }

    #[inline]
    pub fn activate_derivative(&self, x: f64) -> f64 {
        self.activation.grad_from_output(x)
    }

    /// Computes `activate(bias + inputs · weights)` without touching any state.
    pub fn evaluate(&self, inputs: &[f64]) -> Result<f64> {
        if inputs.len() != self.weights.len() {
            return Err(Error::size_mismatch(
                "unit inputs",
                self.weights.len(),
                inputs.len(),
            ));
        }

        let mut sum = self.bias;
        for (&w, &x) in self.weights.iter().zip(inputs) {
            sum += x * w;
        }
        Ok(self.activate(sum))
    }

    /// Forward pass: evaluates the unit and stores the result as `output`.
    pub fn compute_output(&mut self, inputs: &[f64]) -> Result<f64> {
        let output = self.evaluate(inputs)?;
        self.output = output;
        Ok(output)
    }

    /// Gradient-descent step towards a smaller error:
    /// `w[i] += rate * delta * inputs[i]`, `b += rate * delta`.
    ///
    /// `inputs` must be the inputs of the forward pass that produced the
    /// current error signal.
    pub fn update_weights(&mut self, inputs: &[f64], rate: f64) -> Result<()> {
        if inputs.len() != self.weights.len() {
            return Err(Error::size_mismatch(
                "unit update inputs",
                self.weights.len(),
                inputs.len(),
            ));
        }

        let step = rate * self.error_signal;
        for (w, &x) in self.weights.iter_mut().zip(inputs) {
            *w += step * x;
        }
        self.bias += step;
        Ok(())
    }

    /// Output-layer delta for the softmax + cross-entropy pairing.
    #[inline]
    pub fn calculate_output_delta(&mut self, target: f64) {
        self.error_signal = target - self.output;
    }

    /// Hidden-layer delta: the downstream deltas pulled back through the
    /// weights that connect this unit (at `my_index`) to each next unit.
    ///
    /// Fails with [`Error::SizeMismatch`] if any next unit has no weight at
    /// `my_index`; the error signal is left as it was.
    pub fn calculate_hidden_delta(&mut self, next_units: &[Unit], my_index: usize) -> Result<()> {
        let mut sum = 0.0_f64;
        for next in next_units {
            let w = next.weight(my_index).ok_or_else(|| {
                Error::size_mismatch("next unit weights", my_index + 1, next.input_dim())
            })?;
            sum += next.error_signal * w;
        }
        self.error_signal = self.activate_derivative(self.output) * sum;
        Ok(())
    }
}

#[inline]
fn sample_init<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    z * INIT_STD_DEV
}
