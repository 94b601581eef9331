//! Labelled datasets.
//!
//! The training loop only sees data through [`DatasetProvider`]. [`LabeledSet`]
//! stores samples contiguously (row-major) next to their integer labels and
//! [`InMemoryDataset`] pairs a training and a test split.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use rand::{Rng, RngCore};

use crate::{Error, Result};

/// One labelled sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Example<'a> {
    pub input: &'a [f32],
    pub label: usize,
}

/// Source of ordered, indexable training and test examples.
pub trait DatasetProvider {
    fn training_len(&self) -> usize;

    fn test_len(&self) -> usize;

    /// Per-sample input dimension, shared by both splits.
    fn input_dim(&self) -> usize;

    /// Panics if `idx >= training_len()`.
    fn training_example(&self, idx: usize) -> Example<'_>;

    /// Panics if `idx >= test_len()`.
    fn test_example(&self, idx: usize) -> Example<'_>;

    /// Permutes the training split, keeping every input with its label.
    fn shuffle_training(&mut self, rng: &mut dyn RngCore);
}

/// Inputs (X) and integer labels (y), stored contiguously.
///
/// - `inputs.len() == len * input_dim`
/// - `labels.len() == len`
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSet {
    inputs: Vec<f32>,
    labels: Vec<usize>,
    input_dim: usize,
}

impl LabeledSet {
    /// Build a set from a flat input buffer with shape `(labels.len(), input_dim)`.
    pub fn from_flat(inputs: Vec<f32>, labels: Vec<usize>, input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidData("input_dim must be > 0".to_owned()));
        }
        if inputs.len() != labels.len() * input_dim {
            return Err(Error::InvalidData(format!(
                "inputs length {} does not match len * input_dim ({} * {input_dim})",
                inputs.len(),
                labels.len()
            )));
        }

        Ok(Self {
            inputs,
            labels,
            input_dim,
        })
    }

    /// Build a set from per-sample rows.
    ///
    /// This is a convenience constructor (it copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f32>], labels: &[usize]) -> Result<Self> {
        if inputs.len() != labels.len() {
            return Err(Error::InvalidData(format!(
                "inputs/labels length mismatch: {} vs {}",
                inputs.len(),
                labels.len()
            )));
        }
        let input_dim = inputs.first().map(Vec::len).unwrap_or(0);
        if input_dim == 0 {
            return Err(Error::InvalidData("input_dim must be > 0".to_owned()));
        }

        let mut flat = Vec::with_capacity(inputs.len() * input_dim);
        for (i, row) in inputs.iter().enumerate() {
            if row.len() != input_dim {
                return Err(Error::InvalidData(format!(
                    "input row {i} has len {}, expected {input_dim}",
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }

        Ok(Self {
            inputs: flat,
            labels: labels.to_vec(),
            input_dim,
        })
    }

    /// Parse CSV rows of the form `label,x0,x1,...`.
    ///
    /// Every feature is divided by `scale` (e.g. `255.0` for 8-bit pixels).
    /// Fields may be quoted and are trimmed. Blank lines are skipped; a first
    /// record whose label is not an integer is treated as a header.
    pub fn from_csv_reader<R: Read>(reader: R, scale: f32) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "csv scale must be finite and > 0, got {scale}"
            )));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut inputs = Vec::new();
        let mut labels = Vec::new();
        let mut input_dim = 0;
        let mut record = StringRecord::new();
        let mut first = true;

        while reader.read_record(&mut record).map_err(csv_error)? {
            let line = record.position().map_or(0, |p| p.line());
            let is_first = std::mem::replace(&mut first, false);

            let label_field = record.get(0).unwrap_or_default();
            let label = match label_field.parse::<usize>() {
                Ok(label) => label,
                Err(_) if is_first => continue,
                Err(e) => {
                    return Err(Error::InvalidData(format!(
                        "line {line}: bad label {label_field:?}: {e}"
                    )));
                }
            };

            let start = inputs.len();
            for field in record.iter().skip(1) {
                let v: f32 = field.parse().map_err(|e| {
                    Error::InvalidData(format!("line {line}: bad value {field:?}: {e}"))
                })?;
                inputs.push(v / scale);
            }

            let dim = inputs.len() - start;
            if labels.is_empty() {
                input_dim = dim;
            } else if dim != input_dim {
                return Err(Error::InvalidData(format!(
                    "line {line}: {dim} features, expected {input_dim}"
                )));
            }
            labels.push(label);
        }

        if labels.is_empty() {
            return Err(Error::InvalidData("csv contains no samples".to_owned()));
        }
        Self::from_flat(inputs, labels, input_dim)
    }

    pub fn load_csv<P: AsRef<Path>>(path: P, scale: f32) -> Result<Self> {
        let p = path.as_ref();
        let file = File::open(p)
            .map_err(|e| Error::Io(format!("failed to open {}: {e}", p.display())))?;
        Self::from_csv_reader(file, scale)
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    /// Returns the `idx`-th input row (shape: `(input_dim,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn input(&self, idx: usize) -> &[f32] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    #[inline]
    pub fn label(&self, idx: usize) -> usize {
        self.labels[idx]
    }

    #[inline]
    pub fn example(&self, idx: usize) -> Example<'_> {
        Example {
            input: self.input(idx),
            label: self.label(idx),
        }
    }

    /// Largest label present, if any.
    pub fn max_label(&self) -> Option<usize> {
        self.labels.iter().copied().max()
    }

    /// Fisher-Yates shuffle: every permutation is equally likely and rows keep
    /// their labels.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let dim = self.input_dim;
        for i in (1..self.len()).rev() {
            let j = rng.gen_range(0..=i);
            if i == j {
                continue;
            }
            self.labels.swap(i, j);

            // j < i, so row j lives entirely in the left half.
            let (left, right) = self.inputs.split_at_mut(i * dim);
            left[j * dim..(j + 1) * dim].swap_with_slice(&mut right[..dim]);
        }
    }
}

fn csv_error(err: csv::Error) -> Error {
    let line = err.position().map(|p| p.line());
    match err.into_kind() {
        csv::ErrorKind::Io(e) => Error::from(e),
        kind => match line {
            Some(line) => Error::InvalidData(format!("line {line}: {kind:?}")),
            None => Error::InvalidData(format!("{kind:?}")),
        },
    }
}

/// A training split and a test split held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    train: LabeledSet,
    test: LabeledSet,
}

impl InMemoryDataset {
    pub fn new(train: LabeledSet, test: LabeledSet) -> Result<Self> {
        if train.input_dim() != test.input_dim() {
            return Err(Error::InvalidData(format!(
                "train input_dim {} does not match test input_dim {}",
                train.input_dim(),
                test.input_dim()
            )));
        }
        Ok(Self { train, test })
    }

    pub fn train(&self) -> &LabeledSet {
        &self.train
    }

    pub fn test(&self) -> &LabeledSet {
        &self.test
    }
}

impl DatasetProvider for InMemoryDataset {
    fn training_len(&self) -> usize {
        self.train.len()
    }

    fn test_len(&self) -> usize {
        self.test.len()
    }

    fn input_dim(&self) -> usize {
        self.train.input_dim()
    }

    fn training_example(&self, idx: usize) -> Example<'_> {
        self.train.example(idx)
    }

    fn test_example(&self, idx: usize) -> Example<'_> {
        self.test.example(idx)
    }

    fn shuffle_training(&mut self, rng: &mut dyn RngCore) {
        self.train.shuffle(rng);
    }
}
