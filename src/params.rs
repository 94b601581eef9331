//! Per-layer weights and biases.

use crate::{Error, Matrix, Result, Topology};

/// Weights and biases for every transition `l -> l + 1` of a topology.
///
/// - `weights[l]` has shape `(size(l + 1), size(l))`
/// - `biases[l]` is a column vector `(size(l + 1), 1)`
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    weights: Vec<Matrix>,
    biases: Vec<Matrix>,
}

impl ParameterSet {
    /// Builds a parameter set, checking every shape against `topology`.
    pub fn new(topology: &Topology, weights: Vec<Matrix>, biases: Vec<Matrix>) -> Result<Self> {
        let params = Self { weights, biases };
        params.check_topology(topology)?;
        Ok(params)
    }

    /// All-zero parameters shaped for `topology`.
    pub fn zeros(topology: &Topology) -> Self {
        let mut weights = Vec::with_capacity(topology.num_transitions());
        let mut biases = Vec::with_capacity(topology.num_transitions());
        for (out_dim, in_dim) in topology.transitions() {
            weights.push(Matrix::zeros(out_dim, in_dim));
            biases.push(Matrix::zeros(out_dim, 1));
        }
        Self { weights, biases }
    }

    /// Returns an error unless the parameters have exactly the shapes `topology` implies.
    pub fn check_topology(&self, topology: &Topology) -> Result<()> {
        let n = topology.num_transitions();
        if self.weights.len() != n || self.biases.len() != n {
            return Err(Error::DimensionMismatch(format!(
                "topology {topology} needs {n} weight and bias entries, got {} and {}",
                self.weights.len(),
                self.biases.len()
            )));
        }

        for (l, (out_dim, in_dim)) in topology.transitions().enumerate() {
            let w = &self.weights[l];
            if w.shape() != (out_dim, in_dim) {
                return Err(Error::DimensionMismatch(format!(
                    "weights {l} are {}x{}, expected {out_dim}x{in_dim}",
                    w.rows(),
                    w.cols()
                )));
            }
            let b = &self.biases[l];
            if b.shape() != (out_dim, 1) {
                return Err(Error::DimensionMismatch(format!(
                    "biases {l} are {}x{}, expected {out_dim}x1",
                    b.rows(),
                    b.cols()
                )));
            }
        }
        Ok(())
    }

    /// Recovers the topology these parameters describe.
    pub fn topology(&self) -> Result<Topology> {
        let first = self
            .weights
            .first()
            .ok_or_else(|| Error::InvalidData("parameter set has no layers".to_owned()))?;
        let mut sizes = Vec::with_capacity(self.weights.len() + 1);
        sizes.push(first.cols());
        sizes.extend(self.weights.iter().map(Matrix::rows));

        let topology = Topology::new(&sizes)?;
        self.check_topology(&topology)?;
        Ok(topology)
    }

    #[inline]
    pub fn num_transitions(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn weights(&self, layer_idx: usize) -> &Matrix {
        &self.weights[layer_idx]
    }

    #[inline]
    pub fn biases(&self, layer_idx: usize) -> &Matrix {
        &self.biases[layer_idx]
    }

    #[inline]
    pub fn weights_mut(&mut self, layer_idx: usize) -> &mut Matrix {
        &mut self.weights[layer_idx]
    }

    #[inline]
    pub fn biases_mut(&mut self, layer_idx: usize) -> &mut Matrix {
        &mut self.biases[layer_idx]
    }

    /// Sum of squared weights (biases excluded).
    pub fn weight_norm_sq(&self) -> f32 {
        self.weights
            .iter()
            .flat_map(|w| w.as_slice())
            .map(|&v| v * v)
            .sum()
    }

    pub fn is_finite(&self) -> bool {
        self.weights
            .iter()
            .chain(&self.biases)
            .all(|m| m.as_slice().iter().all(|v| v.is_finite()))
    }
}
