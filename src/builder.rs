//! Network builder.
//!
//! `NetworkBuilder` declares the whole layer stack up front and checks it
//! before any weights are drawn, so a bad shape never leaves a half-built
//! network behind.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{Activation, Error, Network, NetworkConfig, Result};

#[derive(Debug, Clone, Copy)]
struct LayerSpec {
    unit_count: usize,
    activation: Activation,
}

/// Builder for a [`Network`].
///
/// ```rust
/// use digit_mlp::{Activation, NetworkBuilder};
///
/// # fn main() -> digit_mlp::Result<()> {
/// let net = NetworkBuilder::new(4, 3)?
///     .learning_rate(0.05)?
///     .add_layer(8, Activation::ReLU)?
///     .add_layer(3, Activation::Softmax)?
///     .build_with_seed(0)?;
/// assert_eq!(net.output_dim(), Some(3));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    config: NetworkConfig,
    layers: Vec<LayerSpec>,
}

impl NetworkBuilder {
    /// Starts a network over `input_dim` inputs and `class_count` classes.
    pub fn new(input_dim: usize, class_count: usize) -> Result<Self> {
        Self::from_config(NetworkConfig {
            input_dim,
            class_count,
            ..NetworkConfig::default()
        })
    }

    pub fn from_config(config: NetworkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            layers: Vec::new(),
        })
    }

    pub fn learning_rate(mut self, lr: f64) -> Result<Self> {
        let config = NetworkConfig {
            learning_rate: lr,
            ..self.config
        };
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Appends a layer of `unit_count` units.
    pub fn add_layer(mut self, unit_count: usize, activation: Activation) -> Result<Self> {
        if unit_count == 0 {
            return Err(Error::InvalidConfig(
                "layer unit_count must be > 0".to_owned(),
            ));
        }
        if self
            .layers
            .last()
            .is_some_and(|l| l.activation.is_layer_wide())
        {
            return Err(Error::InvalidConfig(
                "cannot append a layer after a softmax output layer".to_owned(),
            ));
        }

        self.layers.push(LayerSpec {
            unit_count,
            activation,
        });
        Ok(self)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        self.build_with_rng(StdRng::seed_from_u64(seed))
    }

    /// Build seeded from system entropy.
    pub fn build(self) -> Result<Network> {
        self.build_with_rng(StdRng::from_entropy())
    }

    /// Build using the provided RNG; the network keeps it for shuffling.
    pub fn build_with_rng(self, rng: StdRng) -> Result<Network> {
        let last = self.layers.last().ok_or_else(|| {
            Error::InvalidConfig("network must have at least one layer".to_owned())
        })?;
        if last.unit_count != self.config.class_count {
            return Err(Error::size_mismatch(
                "output layer units",
                self.config.class_count,
                last.unit_count,
            ));
        }

        let mut net = Network::with_rng(self.config, rng)?;
        for spec in self.layers {
            net.add_layer(spec.unit_count, spec.activation)?;
        }
        Ok(net)
    }
}
