//! Initial parameters.
//!
//! A [`Network`](crate::Network) never draws its own parameters: it asks an
//! [`Initializer`] for them. [`StandardInitializer`] covers the usual modes:
//! fresh random weights (optionally persisted right away) or parameters loaded
//! from a checkpoint file.

use std::path::{Path, PathBuf};

use log::info;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Error, Matrix, ParameterSet, Result, Topology};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// File used by [`InitMode::LoadDefault`].
pub const DEFAULT_PARAMS_FILE: &str = "dlnet-params.json";

/// Weight distribution for freshly drawn parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    /// Xavier/Glorot uniform weights `U(-a, a)`, `a = sqrt(6 / (in + out))`;
    /// zero biases.
    Xavier,
    /// Weights and biases drawn from `U(-half_width, half_width)`.
    Uniform { half_width: f32 },
}

impl Init {
    pub fn validate(self) -> Result<()> {
        match self {
            Init::Xavier => Ok(()),
            Init::Uniform { half_width } => {
                if !(half_width.is_finite() && half_width > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "uniform init half_width must be finite and > 0, got {half_width}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Draws a parameter set for `topology` from `rng`.
pub fn random_parameters<R: Rng + ?Sized>(
    topology: &Topology,
    init: Init,
    rng: &mut R,
) -> Result<ParameterSet> {
    init.validate()?;

    let mut weights = Vec::with_capacity(topology.num_transitions());
    let mut biases = Vec::with_capacity(topology.num_transitions());
    for (out_dim, in_dim) in topology.transitions() {
        let (w_limit, b_limit) = match init {
            Init::Xavier => ((6.0 / (in_dim + out_dim) as f32).sqrt(), 0.0),
            Init::Uniform { half_width } => (half_width, half_width),
        };

        let dist = Uniform::new_inclusive(-w_limit, w_limit);
        let w: Vec<f32> = (0..out_dim * in_dim).map(|_| dist.sample(rng)).collect();
        weights.push(Matrix::from_vec(out_dim, in_dim, w)?);

        let b = if b_limit > 0.0 {
            let dist = Uniform::new_inclusive(-b_limit, b_limit);
            (0..out_dim).map(|_| dist.sample(rng)).collect()
        } else {
            vec![0.0; out_dim]
        };
        biases.push(Matrix::from_vec(out_dim, 1, b)?);
    }

    ParameterSet::new(topology, weights, biases)
}

/// Produces the initial parameters of a network.
pub trait Initializer {
    fn initialize(&mut self, topology: &Topology) -> Result<ParameterSet>;
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InitMode {
    /// Fresh random parameters.
    #[default]
    Random,
    /// Fresh random parameters, written to `path` before training starts.
    RandomAndSave { path: PathBuf },
    /// Load from [`DEFAULT_PARAMS_FILE`] in the working directory.
    LoadDefault,
    /// Load from a named file.
    LoadByName { path: PathBuf },
}

/// Initializer for every [`InitMode`], seeded for reproducibility.
#[derive(Debug, Clone)]
pub struct StandardInitializer {
    mode: InitMode,
    init: Init,
    rng: StdRng,
}

impl StandardInitializer {
    pub fn new(mode: InitMode, seed: u64) -> Self {
        Self {
            mode,
            init: Init::Xavier,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_init(mut self, init: Init) -> Self {
        self.init = init;
        self
    }

    pub fn mode(&self) -> &InitMode {
        &self.mode
    }
}

impl Initializer for StandardInitializer {
    fn initialize(&mut self, topology: &Topology) -> Result<ParameterSet> {
        match &self.mode {
            InitMode::Random => random_parameters(topology, self.init, &mut self.rng),
            InitMode::RandomAndSave { path } => {
                let params = random_parameters(topology, self.init, &mut self.rng)?;
                save(&params, path)?;
                info!("saved initial parameters to {}", path.display());
                Ok(params)
            }
            InitMode::LoadDefault => load(Path::new(DEFAULT_PARAMS_FILE), topology),
            InitMode::LoadByName { path } => load(path, topology),
        }
    }
}

#[cfg(feature = "serde")]
fn save(params: &ParameterSet, path: &Path) -> Result<()> {
    crate::checkpoint::save_params(params, path)
}

#[cfg(feature = "serde")]
fn load(path: &Path, topology: &Topology) -> Result<ParameterSet> {
    let params = crate::checkpoint::load_params(path)?;
    params.check_topology(topology)?;
    info!("loaded parameters from {}", path.display());
    Ok(params)
}

#[cfg(not(feature = "serde"))]
fn save(_params: &ParameterSet, path: &Path) -> Result<()> {
    Err(Error::InvalidConfig(format!(
        "cannot save {}: built without the `serde` feature",
        path.display()
    )))
}

#[cfg(not(feature = "serde"))]
fn load(path: &Path, _topology: &Topology) -> Result<ParameterSet> {
    Err(Error::InvalidConfig(format!(
        "cannot load {}: built without the `serde` feature",
        path.display()
    )))
}
