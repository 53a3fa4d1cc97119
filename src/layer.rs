use rand::Rng;

use crate::activation::softmax_in_place;
use crate::{Activation, Error, Result, Unit};

/// An ordered group of units sharing an input width and an activation kind.
///
/// The layer caches the inputs of its latest forward pass so the following
/// weight update can use them.
#[derive(Debug, Clone)]
pub struct Layer {
    input_dim: usize,
    activation: Activation,
    units: Vec<Unit>,
    last_inputs: Vec<f64>,
}

impl Layer {
    /// Creates `unit_count` freshly initialised units with `input_dim` weights each.
    pub fn new_with_rng<R: Rng + ?Sized>(
        input_dim: usize,
        unit_count: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        if input_dim == 0 || unit_count == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got input_dim={input_dim} unit_count={unit_count}"
            )));
        }

        let units = (0..unit_count)
            .map(|_| Unit::new_with_rng(input_dim, activation, rng))
            .collect();
        Ok(Self {
            input_dim,
            activation,
            units,
            last_inputs: Vec::new(),
        })
    }

    /// Builds a layer from existing units.
    ///
    /// Every unit must have `input_dim` weights and use `activation`.
    pub fn from_units(input_dim: usize, activation: Activation, units: Vec<Unit>) -> Result<Self> {
        if units.is_empty() {
            return Err(Error::InvalidConfig(
                "layer must have at least one unit".to_owned(),
            ));
        }
        for unit in &units {
            if unit.input_dim() != input_dim {
                return Err(Error::size_mismatch(
                    "layer unit width",
                    input_dim,
                    unit.input_dim(),
                ));
            }
            if unit.activation() != activation {
                return Err(Error::InvalidConfig(format!(
                    "unit activation {:?} does not match layer activation {activation:?}",
                    unit.activation()
                )));
            }
        }

        Ok(Self {
            input_dim,
            activation,
            units,
            last_inputs: Vec::new(),
        })
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Inputs of the most recent forward pass (empty before the first one).
    #[inline]
    pub fn last_inputs(&self) -> &[f64] {
        &self.last_inputs
    }

    /// Outputs of the most recent forward pass, in unit order.
    pub fn outputs(&self) -> Vec<f64> {
        self.units.iter().map(Unit::output).collect()
    }

    fn check_inputs(&self, inputs: &[f64]) -> Result<()> {
        if inputs.len() != self.input_dim {
            return Err(Error::size_mismatch(
                "layer inputs",
                self.input_dim,
                inputs.len(),
            ));
        }
        Ok(())
    }

    /// Computes the layer outputs for `inputs` without touching cached state.
    pub fn evaluate(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        self.check_inputs(inputs)?;

        let mut outputs = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            outputs.push(unit.evaluate(inputs)?);
        }
        if self.activation.is_layer_wide() {
            softmax_in_place(&mut outputs);
        }
        Ok(outputs)
    }

    /// Forward pass: caches `inputs`, updates every unit's output and returns them.
    pub fn forward_propagate(&mut self, inputs: &[f64]) -> Result<Vec<f64>> {
        let outputs = self.evaluate(inputs)?;

        self.last_inputs.clear();
        self.last_inputs.extend_from_slice(inputs);
        for (unit, &y) in self.units.iter_mut().zip(&outputs) {
            unit.set_output(y);
        }
        Ok(outputs)
    }

    /// Sets each unit's delta to `target - output`.
    pub fn calculate_output_layer_deltas(&mut self, targets: &[f64]) -> Result<()> {
        if targets.len() != self.units.len() {
            return Err(Error::size_mismatch(
                "output layer targets",
                self.units.len(),
                targets.len(),
            ));
        }

        for (unit, &t) in self.units.iter_mut().zip(targets) {
            unit.calculate_output_delta(t);
        }
        Ok(())
    }

    /// Pulls the deltas of `next` (the layer ahead of this one) back onto this layer.
    pub fn calculate_hidden_layer_deltas(&mut self, next: &Layer) -> Result<()> {
        if next.input_dim != self.units.len() {
            return Err(Error::size_mismatch(
                "next layer width",
                self.units.len(),
                next.input_dim,
            ));
        }

        for (i, unit) in self.units.iter_mut().enumerate() {
            unit.calculate_hidden_delta(&next.units, i)?;
        }
        Ok(())
    }

    /// Applies each unit's gradient step using the cached forward inputs.
    pub fn update_weights(&mut self, rate: f64) -> Result<()> {
        self.check_inputs(&self.last_inputs)?;

        let inputs = &self.last_inputs;
        for unit in &mut self.units {
            unit.update_weights(inputs, rate)?;
        }
        Ok(())
    }
}
