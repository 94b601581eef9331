use std::fmt;

use crate::{Error, Result};

/// Layer sizes of a network, input layer first.
///
/// Always holds at least two entries (input and output) and every entry is > 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topology {
    sizes: Vec<usize>,
}

impl Topology {
    pub fn new(sizes: &[usize]) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(Error::InvalidConfig(
                "topology must include input and output sizes".to_owned(),
            ));
        }
        if sizes.contains(&0) {
            return Err(Error::InvalidConfig("all layer sizes must be > 0".to_owned()));
        }
        Ok(Self {
            sizes: sizes.to_vec(),
        })
    }

    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Number of layers, input layer included.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.sizes.len()
    }

    /// Number of weighted transitions (`num_layers() - 1`).
    #[inline]
    pub fn num_transitions(&self) -> usize {
        self.sizes.len() - 1
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.sizes[0]
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    /// `(out_dim, in_dim)` for every transition, in order.
    pub fn transitions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.sizes.windows(2).map(|w| (w[1], w[0]))
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.sizes)
    }
}
