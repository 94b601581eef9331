//! A from-scratch sigmoid MLP trainer.
//!
//! `dlnet` builds a fully connected feed-forward network with sigmoid units,
//! trains it with mini-batch stochastic gradient descent (optionally with L2
//! weight decay) and scores it on a held-out split after every epoch. The test
//! error can drive an adaptive learning-rate schedule, and the best-scoring
//! parameters can be handed to a checkpoint sink.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - [`Matrix`] is dense and row-major; vectors are `(n, 1)` columns.
//! - Weights of the transition `l -> l + 1` have shape
//!   `(sizes[l + 1], sizes[l])`, biases `(sizes[l + 1], 1)`.
//! - [`LabeledSet`] stores samples contiguously, `(len, input_dim)`, next to
//!   integer labels; targets are one-hot vectors of the output layer size.
//!
//! # Errors
//!
//! Shape problems surface as [`Error::DimensionMismatch`] and bad labels as
//! [`Error::InvalidLabel`]; both abort the operation that hit them. A checkpoint
//! sink that fails to save is logged and training continues.
//!
//! # Logging
//!
//! The library logs through the `log` facade: the parameter reference and one
//! line per epoch at `info`, mini-batch counts and rate changes at `debug`,
//! lost checkpoints at `warn`. Install any logger to see them.
//!
//! # Quick start
//!
//! ```rust
//! use dlnet::{
//!     Hyperparams, InMemoryDataset, InitMode, LabeledSet, Network, NoCheckpoints,
//!     StandardInitializer, Topology, TrainConfig,
//! };
//! use rand::SeedableRng;
//!
//! # fn main() -> dlnet::Result<()> {
//! let xs = vec![
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![1.0, 0.0],
//!     vec![1.0, 1.0],
//! ];
//! let ys = vec![0, 1, 1, 0];
//! let set = LabeledSet::from_rows(&xs, &ys)?;
//! let mut data = InMemoryDataset::new(set.clone(), set)?;
//!
//! let hyper = Hyperparams {
//!     learning_rate: 2.0,
//!     mini_batch: 4,
//!     ..Hyperparams::default()
//! };
//! let mut init = StandardInitializer::new(InitMode::Random, 0);
//! let mut net = Network::with_initializer(Topology::new(&[2, 4, 2])?, &hyper, &mut init)?;
//!
//! let cfg = TrainConfig {
//!     epochs: 10,
//!     shuffle: true,
//!     save_best: None,
//! };
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let report = net.train(&mut data, &cfg, &mut rng, &mut NoCheckpoints)?;
//! assert_eq!(report.epochs.len(), 10);
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod config;
pub mod cost;
pub mod dataset;
pub mod error;
pub mod eval;
pub mod gradients;
pub mod init;
pub mod math;
pub mod matrix;
pub mod network;
pub mod optim;
pub mod params;
pub mod schedule;
pub mod topology;
pub mod train;

pub use checkpoint::{CheckpointSink, NoCheckpoints};
#[cfg(feature = "serde")]
pub use checkpoint::{JsonCheckpointDir, load_params, save_params};
pub use config::{Hyperparams, NetworkConfig, TrainConfig};
pub use cost::CostFunction;
pub use dataset::{DatasetProvider, Example, InMemoryDataset, LabeledSet};
pub use error::{Error, Result};
pub use eval::{BestModel, EvalReport};
pub use gradients::{GradientAccumulator, Gradients};
pub use init::{Init, InitMode, Initializer, StandardInitializer};
pub use matrix::Matrix;
pub use network::{Activations, Network};
pub use optim::{Regularization, SgdStep};
pub use params::ParameterSet;
pub use schedule::{AdaptiveRate, LearningRateController};
pub use topology::Topology;
pub use train::{EpochReport, TrainReport};
