//! Cursor over a loaded dataset, for stepping through samples one at a time.

use std::path::Path;

use rand::Rng;

use crate::{Dataset, Loader, Result, Sample};

/// Holds a dataset and a current position inside it.
///
/// Navigation wraps around at both ends. An empty store always sits at
/// index 0 and hands out a blank input.
#[derive(Debug, Clone)]
pub struct SampleStore {
    samples: Vec<Sample>,
    input_dim: usize,
    index: usize,
}

impl SampleStore {
    pub fn new(dataset: Dataset) -> Self {
        let input_dim = dataset.input_dim();
        Self {
            samples: dataset.into_samples(),
            input_dim,
            index: 0,
        }
    }

    /// An empty store producing blank inputs of `input_dim` values.
    pub fn empty(input_dim: usize) -> Self {
        Self {
            samples: Vec::new(),
            input_dim,
            index: 0,
        }
    }

    /// Loads up to `limit` samples from `path` and resets the cursor.
    pub fn load<P: AsRef<Path>>(
        &mut self,
        loader: &Loader,
        path: P,
        limit: Option<usize>,
    ) -> Result<usize> {
        let dataset = loader.load_path(path, limit)?;
        *self = Self::new(dataset);
        Ok(self.samples.len())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn current(&self) -> Option<&Sample> {
        self.samples.get(self.index)
    }

    /// Current input, or zeros when the store is empty.
    pub fn current_input(&self) -> Vec<f64> {
        match self.current() {
            Some(sample) => sample.input().to_vec(),
            None => vec![0.0; self.input_dim],
        }
    }

    pub fn current_label(&self) -> Option<i64> {
        self.current().map(Sample::label)
    }

    /// Advances one sample, wrapping to the start.
    pub fn next(&mut self) -> usize {
        if !self.samples.is_empty() {
            self.index = (self.index + 1) % self.samples.len();
        }
        self.index
    }

    /// Steps back one sample, wrapping to the end.
    pub fn prev(&mut self) -> usize {
        if !self.samples.is_empty() {
            self.index = match self.index {
                0 => self.samples.len() - 1,
                i => i - 1,
            };
        }
        self.index
    }

    /// Jumps to a uniformly random sample.
    pub fn random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        if !self.samples.is_empty() {
            self.index = rng.gen_range(0..self.samples.len());
        }
        self.index
    }

    /// Moves to `index` if it exists; returns whether the cursor moved there.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.samples.len() {
            self.index = index;
            true
        } else {
            false
        }
    }
}
