//! Epoch loop and mini-batch SGD.

use log::{debug, info};
use rand::RngCore;

use crate::checkpoint::CheckpointSink;
use crate::config::TrainConfig;
use crate::eval::{BestModel, EvalReport};
use crate::math::one_hot;
use crate::network::example_gradients;
use crate::optim::SgdStep;
use crate::{DatasetProvider, Error, GradientAccumulator, Network, Result};

/// Outcome of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    /// Learning rate used for this epoch's updates.
    pub learning_rate: f32,
    /// Number of parameter updates (mini-batches).
    pub updates: usize,
    pub eval: EvalReport,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub epochs: Vec<EpochReport>,
    /// Best tracked score, if checkpointing was enabled.
    pub best_successes: Option<usize>,
}

impl TrainReport {
    pub fn last(&self) -> Option<&EpochReport> {
        self.epochs.last()
    }
}

impl Network {
    /// Trains for `cfg.epochs` epochs.
    ///
    /// Each epoch runs SGD over the training split in order, shuffles it with
    /// `rng` when `cfg.shuffle` is set, then evaluates on the test split. There
    /// is no early stopping.
    pub fn train<D: DatasetProvider + ?Sized>(
        &mut self,
        data: &mut D,
        cfg: &TrainConfig,
        rng: &mut dyn RngCore,
        sink: &mut dyn CheckpointSink,
    ) -> Result<TrainReport> {
        cfg.validate()?;
        self.check_dataset(data)?;

        self.log_reference();
        info!("epochs: {}", cfg.epochs);
        info!("shuffle: {}", cfg.shuffle);
        match cfg.save_best {
            Some(min) => info!("record best model from {min} successes"),
            None => info!("record best model: off"),
        }

        let mut best = cfg.save_best.map(BestModel::new);
        let mut epochs = Vec::with_capacity(cfg.epochs);

        for epoch in 0..cfg.epochs {
            let learning_rate = self.learning_rate();
            let updates = self.sgd_epoch(&*data)?;
            if cfg.shuffle {
                data.shuffle_training(rng);
            }
            let eval = self.evaluate(&*data, best.as_mut(), sink)?;

            info!(
                "epoch {epoch}: {}/{} ({:.2}%)",
                eval.successes,
                eval.total,
                eval.accuracy() * 100.0
            );
            epochs.push(EpochReport {
                epoch,
                learning_rate,
                updates,
                eval,
            });
        }

        Ok(TrainReport {
            epochs,
            best_successes: best.map(|b| b.best()),
        })
    }

    /// One pass over the training split in contiguous mini-batches.
    ///
    /// A trailing chunk shorter than `mini_batch` is still applied, averaged
    /// over its own size. Returns the number of updates.
    pub fn sgd_epoch<D: DatasetProvider + ?Sized>(&mut self, data: &D) -> Result<usize> {
        let n = data.training_len();
        let mut updates = 0;
        let mut start = 0;
        while start < n {
            let end = (start + self.mini_batch()).min(n);
            self.train_mini_batch(data, start..end)?;
            updates += 1;
            start = end;
        }
        debug!("{updates} mini-batches over {n} examples");
        Ok(updates)
    }

    /// Accumulates gradients over `range` of the training split and applies
    /// one update.
    pub fn train_mini_batch<D: DatasetProvider + ?Sized>(
        &mut self,
        data: &D,
        range: std::ops::Range<usize>,
    ) -> Result<()> {
        let classes = self.topology().output_dim();
        let mut acc = GradientAccumulator::new();
        for idx in range {
            let ex = data.training_example(idx);
            let target = one_hot(ex.label, classes)?;
            acc.add(example_gradients(
                self.params(),
                self.cost_function(),
                ex.input,
                &target,
            )?)?;
        }

        let Some((grads, batch_len)) = acc.finish() else {
            return Ok(());
        };
        let step = SgdStep {
            learning_rate: self.learning_rate(),
            regularization: self.regularization(),
            batch_len,
            training_len: data.training_len(),
        };
        step.apply(self.params_mut(), &grads)
    }

    fn check_dataset<D: DatasetProvider + ?Sized>(&self, data: &D) -> Result<()> {
        if data.training_len() == 0 {
            return Err(Error::InvalidData("training set is empty".to_owned()));
        }
        if data.test_len() == 0 {
            return Err(Error::InvalidData("test set is empty".to_owned()));
        }
        if data.input_dim() != self.topology().input_dim() {
            return Err(Error::DimensionMismatch(format!(
                "dataset input_dim {} does not match network input_dim {}",
                data.input_dim(),
                self.topology().input_dim()
            )));
        }
        Ok(())
    }
}
