use std::path::Path;

use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::{Dataset, Error, Loader, Network, Result, metrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitConfig {
    pub epochs: usize,
    /// Samples per loss-averaging window. Weights still move after every sample.
    pub batch_size: usize,
    /// Train on at most this many leading samples.
    pub limit: Option<usize>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 1,
            batch_size: 10,
            limit: None,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        if self.limit == Some(0) {
            return Err(Error::InvalidConfig("sample limit must be > 0".to_owned()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// Zero-based epoch index.
    pub epoch: usize,
    pub batches: usize,
    /// Mean of the per-batch mean losses.
    pub mean_loss: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub samples: usize,
    pub epochs: Vec<EpochReport>,
}

impl TrainReport {
    /// Mean loss of the last epoch.
    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.mean_loss)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestReport {
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
    pub mean_loss: f64,
}

impl Network {
    fn check_dataset(&self, data: &Dataset) -> Result<()> {
        let out_dim = self.output_dim().ok_or(Error::EmptyNetwork)?;
        if data.is_empty() {
            return Err(Error::InvalidConfig("dataset must not be empty".to_owned()));
        }
        if data.input_dim() != self.input_dim() {
            return Err(Error::size_mismatch(
                "dataset inputs",
                self.input_dim(),
                data.input_dim(),
            ));
        }
        if data.class_count() != out_dim {
            return Err(Error::size_mismatch(
                "dataset classes",
                out_dim,
                data.class_count(),
            ));
        }
        Ok(())
    }

    fn loader(&self) -> Loader {
        Loader::new(self.input_dim(), self.class_count())
    }

    /// Loads the dataset at `path` and trains on all of it.
    pub fn train<P: AsRef<Path>>(
        &mut self,
        path: P,
        epochs: usize,
        batch_size: usize,
    ) -> Result<TrainReport> {
        let cfg = FitConfig {
            epochs,
            batch_size,
            limit: None,
        };
        self.train_file(path, &cfg)
    }

    /// Loads up to `cfg.limit` samples from `path` and trains on them.
    pub fn train_file<P: AsRef<Path>>(&mut self, path: P, cfg: &FitConfig) -> Result<TrainReport> {
        cfg.validate()?;
        if self.layers().is_empty() {
            return Err(Error::EmptyNetwork);
        }
        let data = self.loader().load_path(path, cfg.limit)?;
        self.train_on(&data, cfg)
    }

    /// Trains on `data` for `cfg.epochs` passes.
    ///
    /// Each epoch visits the samples in a fresh random order drawn from the
    /// network's generator and groups them into windows of `cfg.batch_size`
    /// (the last one may be shorter). The epoch loss is the mean of the
    /// per-window mean losses.
    pub fn train_on(&mut self, data: &Dataset, cfg: &FitConfig) -> Result<TrainReport> {
        cfg.validate()?;
        self.check_dataset(data)?;

        let samples = cfg.limit.map_or(data.len(), |n| n.min(data.len()));
        let mut order: Vec<usize> = (0..samples).collect();
        let mut epochs = Vec::with_capacity(cfg.epochs);

        for epoch in 0..cfg.epochs {
            order.shuffle(self.rng_mut());

            let mut loss_sum = 0.0_f64;
            let mut batches = 0_usize;
            for chunk in order.chunks(cfg.batch_size) {
                let inputs: Vec<&[f64]> = chunk.iter().map(|&i| data.samples()[i].input()).collect();
                let targets: Vec<&[f64]> =
                    chunk.iter().map(|&i| data.samples()[i].target()).collect();

                let batch_loss = self.train_batch(&inputs, &targets)?;
                debug!(epoch, batch = batches, size = chunk.len(), batch_loss, "trained batch");

                loss_sum += batch_loss;
                batches += 1;
            }

            let mean_loss = loss_sum / batches as f64;
            info!(epoch, batches, mean_loss, "epoch finished");
            epochs.push(EpochReport {
                epoch,
                batches,
                mean_loss,
            });
        }

        Ok(TrainReport { samples, epochs })
    }

    /// Loads up to `sample_limit` samples from `path` and scores the network on them.
    pub fn test<P: AsRef<Path>>(&mut self, path: P, sample_limit: Option<usize>) -> Result<TestReport> {
        if self.layers().is_empty() {
            return Err(Error::EmptyNetwork);
        }
        let data = self.loader().load_path(path, sample_limit)?;
        self.test_on(&data)
    }

    /// Counts samples whose predicted class matches the target's class.
    pub fn test_on(&mut self, data: &Dataset) -> Result<TestReport> {
        self.check_dataset(data)?;

        let mut correct = 0_usize;
        let mut loss_sum = 0.0_f64;
        for sample in data.samples() {
            let outputs = self.forward_propagate(sample.input())?;
            loss_sum += self.calculate_loss(&outputs, sample.target())?;
            if metrics::argmax(&outputs) == metrics::argmax(sample.target()) {
                correct += 1;
            }
        }

        let total = data.len();
        let report = TestReport {
            correct,
            total,
            accuracy: metrics::accuracy(correct, total),
            mean_loss: loss_sum / total as f64,
        };
        info!(
            correct,
            total,
            accuracy = report.accuracy,
            mean_loss = report.mean_loss,
            "test finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Activation, NetworkConfig, Sample};

    fn toy_data() -> Dataset {
        let samples = vec![
            Sample::new(vec![1.0, 0.0], 0, 2),
            Sample::new(vec![0.9, 0.1], 0, 2),
            Sample::new(vec![0.0, 1.0], 1, 2),
            Sample::new(vec![0.1, 0.9], 1, 2),
            Sample::new(vec![0.8, 0.0], 0, 2),
        ];
        Dataset::new(2, 2, samples).unwrap()
    }

    fn toy_network(seed: u64) -> Network {
        let cfg = NetworkConfig {
            input_dim: 2,
            class_count: 2,
            learning_rate: 0.1,
        };
        let mut net = Network::with_seed(cfg, seed).unwrap();
        net.add_layer(4, Activation::ReLU).unwrap();
        net.add_layer(2, Activation::Softmax).unwrap();
        net
    }

    #[test]
    fn partial_last_batch_is_counted() {
        let mut net = toy_network(0);
        let cfg = FitConfig {
            epochs: 2,
            batch_size: 2,
            limit: None,
        };
        let report = net.train_on(&toy_data(), &cfg).unwrap();

        assert_eq!(report.samples, 5);
        assert_eq!(report.epochs.len(), 2);
        assert!(report.epochs.iter().all(|e| e.batches == 3));
        assert!(report.final_loss().unwrap().is_finite());
    }

    #[test]
    fn limit_restricts_training_samples() {
        let mut net = toy_network(0);
        let cfg = FitConfig {
            epochs: 1,
            batch_size: 10,
            limit: Some(3),
        };
        let report = net.train_on(&toy_data(), &cfg).unwrap();
        assert_eq!(report.samples, 3);
        assert_eq!(report.epochs[0].batches, 1);
    }

    #[test]
    fn same_seed_same_run() {
        let cfg = FitConfig {
            epochs: 3,
            batch_size: 2,
            limit: None,
        };
        let a = toy_network(9).train_on(&toy_data(), &cfg).unwrap();
        let b = toy_network(9).train_on(&toy_data(), &cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_epochs_or_batch_size_are_rejected() {
        let mut net = toy_network(0);
        let data = toy_data();
        for cfg in [
            FitConfig {
                epochs: 0,
                ..FitConfig::default()
            },
            FitConfig {
                batch_size: 0,
                ..FitConfig::default()
            },
        ] {
            assert!(matches!(net.train_on(&data, &cfg), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn class_mismatch_is_rejected() {
        let cfg = NetworkConfig {
            input_dim: 2,
            class_count: 3,
            learning_rate: 0.1,
        };
        let mut net = Network::with_seed(cfg, 0).unwrap();
        net.add_layer(3, Activation::Softmax).unwrap();
        assert!(matches!(
            net.test_on(&toy_data()),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn empty_network_cannot_train_or_test() {
        let mut net = Network::with_seed(NetworkConfig::default(), 0).unwrap();
        assert_eq!(
            net.train("/does/not/matter.csv", 1, 1),
            Err(Error::EmptyNetwork)
        );
        assert_eq!(net.test("/does/not/matter.csv", None), Err(Error::EmptyNetwork));
    }

    #[test]
    fn training_fits_a_separable_toy_set() {
        let mut net = toy_network(1);
        let data = toy_data();
        let cfg = FitConfig {
            epochs: 200,
            batch_size: 5,
            limit: None,
        };
        let report = net.train_on(&data, &cfg).unwrap();
        let first = report.epochs[0].mean_loss;
        assert!(report.final_loss().unwrap() < first);

        let test = net.test_on(&data).unwrap();
        assert_eq!(test.total, 5);
        assert_eq!(test.correct, 5);
        assert_eq!(test.accuracy, 1.0);
    }
}
