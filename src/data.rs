//! Dataset loading.
//!
//! The row format is one sample per line: an integer class label followed by
//! comma-separated pixel intensities in `[0, 255]`. Pixels are normalised into
//! `[0, 1]` and labels are one-hot encoded into the class count.
//!
//! Rows are never padded or truncated. A row whose pixel count differs from
//! the loader's input width, or that holds a non-numeric or out-of-range
//! field, is malformed; [`RowPolicy`] decides whether it is skipped or fails
//! the whole load.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, warn};

use crate::{Error, Result};

/// Largest raw pixel intensity.
pub const MAX_PIXEL: f64 = 255.0;

/// One-hot encodes `label` into a vector of `class_count` entries.
///
/// Labels outside `0..class_count` map to the all-zero vector.
pub fn label_to_target(label: i64, class_count: usize) -> Vec<f64> {
    let mut target = vec![0.0; class_count];
    if let Ok(idx) = usize::try_from(label) {
        if idx < class_count {
            target[idx] = 1.0;
        }
    }
    target
}

/// A single `(input, target)` pair plus the raw label it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    input: Vec<f64>,
    target: Vec<f64>,
    label: i64,
}

impl Sample {
    /// Builds a sample, one-hot encoding `label` over `class_count` classes.
    pub fn new(input: Vec<f64>, label: i64, class_count: usize) -> Self {
        let target = label_to_target(label, class_count);
        Self {
            input,
            target,
            label,
        }
    }

    #[inline]
    pub fn input(&self) -> &[f64] {
        &self.input
    }

    #[inline]
    pub fn target(&self) -> &[f64] {
        &self.target
    }

    #[inline]
    pub fn label(&self) -> i64 {
        self.label
    }
}

/// A parsed, width-checked collection of samples.
#[derive(Debug, Clone)]
pub struct Dataset {
    samples: Vec<Sample>,
    input_dim: usize,
    class_count: usize,
    skipped: usize,
}

impl Dataset {
    /// Builds a dataset from samples that must all have `input_dim` inputs
    /// and `class_count` targets.
    pub fn new(input_dim: usize, class_count: usize, samples: Vec<Sample>) -> Result<Self> {
        for sample in &samples {
            if sample.input.len() != input_dim {
                return Err(Error::size_mismatch(
                    "sample inputs",
                    input_dim,
                    sample.input.len(),
                ));
            }
            if sample.target.len() != class_count {
                return Err(Error::size_mismatch(
                    "sample targets",
                    class_count,
                    sample.target.len(),
                ));
            }
        }

        Ok(Self {
            samples,
            input_dim,
            class_count,
            skipped: 0,
        })
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
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn class_count(&self) -> usize {
        self.class_count
    }

    /// Number of malformed rows dropped while loading.
    #[inline]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

/// What the loader does with a malformed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowPolicy {
    /// Drop the row, log it, and count it in [`Dataset::skipped`].
    #[default]
    Skip,
    /// Fail the whole load with [`Error::MalformedRow`].
    Strict,
}

/// Parses label+pixel rows into a [`Dataset`].
#[derive(Debug, Clone, Copy)]
pub struct Loader {
    input_dim: usize,
    class_count: usize,
    policy: RowPolicy,
}

impl Loader {
    pub fn new(input_dim: usize, class_count: usize) -> Self {
        Self {
            input_dim,
            class_count,
            policy: RowPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RowPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn class_count(&self) -> usize {
        self.class_count
    }

    /// Loads up to `limit` rows from the file at `path`.
    pub fn load_path<P: AsRef<Path>>(&self, path: P, limit: Option<usize>) -> Result<Dataset> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::UnreadableDataset {
            origin: origin.clone(),
            reason: e.to_string(),
        })?;
        self.load_reader(file, &origin, limit)
    }

    /// Loads up to `limit` rows from `reader`; `origin` names the source in
    /// errors and logs.
    pub fn load_reader<R: Read>(
        &self,
        reader: R,
        origin: &str,
        limit: Option<usize>,
    ) -> Result<Dataset> {
        if self.input_dim == 0 || self.class_count == 0 {
            return Err(Error::InvalidConfig(format!(
                "loader dims must be > 0, got input_dim={} class_count={}",
                self.input_dim, self.class_count
            )));
        }
        if limit == Some(0) {
            return Err(Error::InvalidConfig("sample limit must be > 0".to_owned()));
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut samples = Vec::new();
        let mut skipped = 0;

        for result in rdr.records() {
            if limit.is_some_and(|n| samples.len() >= n) {
                break;
            }

            let parsed = match result {
                Ok(record) => {
                    let line = record.position().map_or(0, |p| p.line() as usize);
                    self.parse_record(&record).map_err(|reason| (line, reason))
                }
                Err(e) if e.is_io_error() => {
                    return Err(Error::UnreadableDataset {
                        origin: origin.to_owned(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    let line = e.position().map_or(0, |p| p.line() as usize);
                    Err((line, e.to_string()))
                }
            };

            match parsed {
                Ok(sample) => samples.push(sample),
                Err((line, reason)) => match self.policy {
                    RowPolicy::Strict => return Err(Error::MalformedRow { line, reason }),
                    RowPolicy::Skip => {
                        warn!(origin, line, %reason, "skipping malformed dataset row");
                        skipped += 1;
                    }
                },
            }
        }

        if samples.is_empty() {
            return Err(Error::UnreadableDataset {
                origin: origin.to_owned(),
                reason: format!("no usable rows ({skipped} skipped)"),
            });
        }

        info!(origin, samples = samples.len(), skipped, "loaded dataset");

        Ok(Dataset {
            samples,
            input_dim: self.input_dim,
            class_count: self.class_count,
            skipped,
        })
    }

    fn parse_record(&self, record: &StringRecord) -> std::result::Result<Sample, String> {
        let mut fields = record.iter();
        let label_field = fields.next().unwrap_or("");
        let label: i64 = label_field
            .parse()
            .map_err(|_| format!("label {label_field:?} is not an integer"))?;

        let mut input = Vec::with_capacity(self.input_dim);
        for (i, field) in fields.enumerate() {
            let value: f64 = field
                .parse()
                .map_err(|_| format!("pixel {i} ({field:?}) is not a number"))?;
            if !(0.0..=MAX_PIXEL).contains(&value) {
                return Err(format!("pixel {i} value {value} is outside [0, 255]"));
            }
            input.push(value / MAX_PIXEL);
        }

        if input.len() != self.input_dim {
            return Err(format!(
                "expected {} pixels, got {}",
                self.input_dim,
                input.len()
            ));
        }

        Ok(Sample::new(input, label, self.class_count))
    }
}
