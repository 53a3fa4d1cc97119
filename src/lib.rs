//! A small digit-classifier MLP (multi-layer perceptron) crate.
//!
//! `digit-mlp` builds a fully-connected network one layer at a time, trains
//! it with per-sample gradient descent on cross-entropy, and scores it on
//! label+pixel datasets (MNIST-style CSV rows).
//!
//! # Model
//!
//! - Scalars are `f64`.
//! - A [`Network`] is a stack of [`Layer`]s; each layer is a group of [`Unit`]s
//!   sharing an input width and an [`Activation`].
//! - Hidden layers use [`Activation::ReLU`]. The output layer uses
//!   [`Activation::Softmax`], normalised across the whole layer, and nothing
//!   may be appended after it.
//! - Weights start as `N(0, 0.1)` draws from the network's own seeded RNG.
//!
//! # Errors
//!
//! Every operation that can see bad shapes or bad data returns [`Result`].
//! Checks run before any state changes, so a failed call leaves the network
//! as it was.
//!
//! # Quick start
//!
//! ```rust
//! use digit_mlp::{Activation, Dataset, FitConfig, Network, NetworkConfig, Sample};
//!
//! # fn main() -> digit_mlp::Result<()> {
//! let config = NetworkConfig {
//!     input_dim: 2,
//!     class_count: 2,
//!     learning_rate: 0.1,
//! };
//! let mut net = Network::with_seed(config, 0)?;
//! net.add_layer(4, Activation::ReLU)?;
//! net.add_layer(2, Activation::Softmax)?;
//!
//! let train = Dataset::new(
//!     2,
//!     2,
//!     vec![
//!         Sample::new(vec![1.0, 0.0], 0, 2),
//!         Sample::new(vec![0.0, 1.0], 1, 2),
//!     ],
//! )?;
//! let report = net.train_on(
//!     &train,
//!     &FitConfig {
//!         epochs: 50,
//!         batch_size: 2,
//!         limit: None,
//!     },
//! )?;
//! assert_eq!(report.epochs.len(), 50);
//!
//! let activations = net.get_all_activations(&[1.0, 0.0])?;
//! assert_eq!(activations.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod browser;
pub mod builder;
pub mod data;
pub mod error;
pub mod layer;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod train;
pub mod unit;

pub use activation::Activation;
pub use browser::SampleStore;
pub use builder::NetworkBuilder;
pub use data::{Dataset, Loader, RowPolicy, Sample, label_to_target};
pub use error::{Error, Result};
pub use layer::Layer;
pub use network::{Network, NetworkConfig};
pub use train::{EpochReport, FitConfig, TestReport, TrainReport};
pub use unit::Unit;
