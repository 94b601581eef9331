//! Parameter gradients and their mini-batch accumulation.

use crate::math::{add_elementwise, dot_prod, transpose};
use crate::network::Activations;
use crate::{Error, Matrix, Result};

/// Gradients of the cost with respect to every weight matrix and bias vector.
///
/// Mirrors the shape of a `ParameterSet`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    d_weights: Vec<Matrix>,
    d_biases: Vec<Matrix>,
}

impl Gradients {
    /// Per-example gradients from a forward pass and its deltas.
    ///
    /// `dW_l = delta_{l+1} · y_l^T`, `dB_l = delta_{l+1}`.
    pub fn from_deltas(activations: &Activations, deltas: Vec<Matrix>) -> Result<Self> {
        let ys = activations.ys();
        if deltas.len() + 1 != ys.len() {
            return Err(Error::DimensionMismatch(format!(
                "{} deltas for {} activation layers",
                deltas.len(),
                ys.len()
            )));
        }

        let mut d_weights = Vec::with_capacity(deltas.len());
        for (delta, y) in deltas.iter().zip(ys) {
            d_weights.push(dot_prod(delta, &transpose(y))?);
        }

        Ok(Self {
            d_weights,
            d_biases: deltas,
        })
    }

    /// Builds gradients from explicit per-layer matrices.
    pub fn from_parts(d_weights: Vec<Matrix>, d_biases: Vec<Matrix>) -> Result<Self> {
        if d_weights.len() != d_biases.len() {
            return Err(Error::DimensionMismatch(format!(
                "{} weight gradients but {} bias gradients",
                d_weights.len(),
                d_biases.len()
            )));
        }
        Ok(Self {
            d_weights,
            d_biases,
        })
    }

    #[inline]
    pub fn num_transitions(&self) -> usize {
        self.d_weights.len()
    }

    #[inline]
    pub fn d_weights(&self, layer_idx: usize) -> &Matrix {
        &self.d_weights[layer_idx]
    }

    #[inline]
    pub fn d_biases(&self, layer_idx: usize) -> &Matrix {
        &self.d_biases[layer_idx]
    }

    /// Element-wise sum; weight gradients add to weight gradients and bias
    /// gradients to bias gradients.
    pub fn sum(&self, other: &Gradients) -> Result<Gradients> {
        Ok(Gradients {
            d_weights: add_elementwise(&self.d_weights, &other.d_weights)?,
            d_biases: add_elementwise(&self.d_biases, &other.d_biases)?,
        })
    }
}

/// Running sum of per-example gradients within one mini-batch.
///
/// The first example's gradients seed the sum; every later example is added to it.
#[derive(Debug, Clone, Default)]
pub struct GradientAccumulator {
    sum: Option<Gradients>,
    count: usize,
}

impl GradientAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, grads: Gradients) -> Result<()> {
        let next = match &self.sum {
            None => grads,
            Some(acc) => acc.sum(&grads)?,
        };
        self.sum = Some(next);
        self.count += 1;
        Ok(())
    }

    /// Number of examples accumulated so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn sum(&self) -> Option<&Gradients> {
        self.sum.as_ref()
    }

    /// Consumes the accumulator, returning the summed gradients and the example count.
    pub fn finish(self) -> Option<(Gradients, usize)> {
        let count = self.count;
        self.sum.map(|g| (g, count))
    }
}
