//! Run configuration.
//!
//! [`Hyperparams`] is what a [`Network`](crate::Network) is built with,
//! [`TrainConfig`] drives one call to [`Network::train`](crate::Network::train)
//! and [`NetworkConfig`] is the JSON file the `dlnet` binary reads, combining
//! both with the topology, seed and init mode.
//!
//! ```json
//! {
//!   "topology": [784, 30, 10],
//!   "learning_rate": 0.5,
//!   "cost": "cross_entropy",
//!   "regularization": { "kind": "l2", "lambda": 5.0 },
//!   "adaptive_rate": "linear",
//!   "mini_batch": 10,
//!   "epochs": 30,
//!   "shuffle": true,
//!   "save_best": 9500,
//!   "seed": 42,
//!   "init": { "kind": "random" }
//! }
//! ```

#[cfg(feature = "serde")]
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::init::InitMode;
use crate::optim::Regularization;
use crate::schedule::{AdaptiveRate, LearningRateController};
use crate::{CostFunction, Error, Result, Topology};

/// Hyperparameters fixed for the lifetime of a network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyperparams {
    /// Initial learning rate; the adaptive controller may lower it later.
    pub learning_rate: f32,
    pub cost: CostFunction,
    pub regularization: Regularization,
    pub adaptive_rate: AdaptiveRate,
    pub mini_batch: usize,
}

impl Default for Hyperparams {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            cost: CostFunction::CrossEntropy,
            regularization: Regularization::None,
            adaptive_rate: AdaptiveRate::None,
            mini_batch: 10,
        }
    }
}

impl Hyperparams {
    pub fn validate(&self) -> Result<()> {
        LearningRateController::new(self.learning_rate, self.adaptive_rate)?;
        if self.mini_batch == 0 {
            return Err(Error::InvalidConfig("mini_batch must be > 0".to_owned()));
        }
        self.regularization.validate()
    }
}

/// Settings for one training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    /// Shuffle the training split after each epoch's SGD pass.
    pub shuffle: bool,
    /// Enables best-model checkpointing; the value is the minimum number of
    /// test successes a checkpoint must reach.
    pub save_best: Option<usize>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 30,
            shuffle: true,
            save_best: None,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        Ok(())
    }
}

/// Everything needed to build and train a network from a file.
///
/// Missing fields fall back to [`NetworkConfig::default`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub topology: Vec<usize>,
    pub learning_rate: f32,
    pub cost: CostFunction,
    pub regularization: Regularization,
    pub adaptive_rate: AdaptiveRate,
    pub mini_batch: usize,
    pub epochs: usize,
    pub shuffle: bool,
    pub save_best: Option<usize>,
    pub seed: u64,
    pub init: InitMode,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let hyper = Hyperparams::default();
        let train = TrainConfig::default();
        Self {
            topology: vec![784, 30, 10],
            learning_rate: hyper.learning_rate,
            cost: hyper.cost,
            regularization: hyper.regularization,
            adaptive_rate: hyper.adaptive_rate,
            mini_batch: hyper.mini_batch,
            epochs: train.epochs,
            shuffle: train.shuffle,
            save_best: train.save_best,
            seed: 0,
            init: InitMode::Random,
        }
    }
}

impl NetworkConfig {
    pub fn topology(&self) -> Result<Topology> {
        Topology::new(&self.topology)
    }

    pub fn hyperparams(&self) -> Hyperparams {
        Hyperparams {
            learning_rate: self.learning_rate,
            cost: self.cost,
            regularization: self.regularization,
            adaptive_rate: self.adaptive_rate,
            mini_batch: self.mini_batch,
        }
    }

    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            epochs: self.epochs,
            shuffle: self.shuffle,
            save_best: self.save_best,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.topology()?;
        self.hyperparams().validate()?;
        self.train_config().validate()
    }
}

/// Reads and validates a [`NetworkConfig`] from a JSON file.
#[cfg(feature = "serde")]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<NetworkConfig> {
    let p = path.as_ref();
    let s = std::fs::read_to_string(p)
        .map_err(|e| Error::Io(format!("failed to read {}: {e}", p.display())))?;
    let cfg: NetworkConfig = serde_json::from_str(&s)
        .map_err(|e| Error::InvalidConfig(format!("{}: {e}", p.display())))?;
    cfg.validate()?;
    Ok(cfg)
}
