//! Held-out evaluation.
//!
//! A test example counts as a success when the one-hot encoding of the
//! network's strongest output equals the one-hot encoding of its label.

use log::{debug, info, warn};

use crate::checkpoint::CheckpointSink;
use crate::math::{argmax, one_hot};
use crate::network::forward;
use crate::{DatasetProvider, Error, Network, ParameterSet, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    pub successes: usize,
    pub total: usize,
    /// `(total - successes) / total`.
    pub error: f32,
    /// Whether this evaluation produced a checkpoint that the sink stored.
    pub checkpoint_saved: bool,
}

impl EvalReport {
    #[inline]
    pub fn accuracy(&self) -> f32 {
        1.0 - self.error
    }
}

/// Tracks the best test score seen so far, starting from a minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestModel {
    best: usize,
}

impl BestModel {
    pub fn new(min_score: usize) -> Self {
        Self { best: min_score }
    }

    #[inline]
    pub fn best(&self) -> usize {
        self.best
    }

    /// Records `successes` if it ties or beats the best so far.
    pub fn offer(&mut self, successes: usize) -> bool {
        if successes >= self.best {
            self.best = successes;
            true
        } else {
            false
        }
    }
}

/// Counts test-split successes for `params`; `classes` is the output layer size.
pub fn count_successes<D: DatasetProvider + ?Sized>(
    params: &ParameterSet,
    data: &D,
    classes: usize,
) -> Result<usize> {
    let mut successes = 0;
    for idx in 0..data.test_len() {
        let ex = data.test_example(idx);
        let target = one_hot(ex.label, classes)?;

        let acts = forward(params, ex.input)?;
        let predicted = argmax(acts.output().as_slice())
            .ok_or_else(|| Error::InvalidData("network produced an empty output".to_owned()))?;

        if one_hot(predicted, classes)? == target {
            successes += 1;
        }
    }
    Ok(successes)
}

impl Network {
    /// Scores the network on the test split without touching any state.
    pub fn accuracy_on<D: DatasetProvider + ?Sized>(&self, data: &D) -> Result<EvalReport> {
        let total = data.test_len();
        if total == 0 {
            return Err(Error::InvalidData("test set is empty".to_owned()));
        }
        let successes = count_successes(self.params(), data, self.topology().output_dim())?;
        Ok(EvalReport {
            successes,
            total,
            error: (total - successes) as f32 / total as f32,
            checkpoint_saved: false,
        })
    }

    /// End-of-epoch evaluation.
    ///
    /// Feeds the test error to the learning-rate controller when it is adaptive
    /// and, when `best` is given and the score ties or beats it, hands the
    /// parameters to `sink`. A sink that fails only loses that checkpoint.
    pub fn evaluate<D: DatasetProvider + ?Sized>(
        &mut self,
        data: &D,
        best: Option<&mut BestModel>,
        sink: &mut dyn CheckpointSink,
    ) -> Result<EvalReport> {
        let mut report = self.accuracy_on(data)?;

        if self.rate.is_adaptive() {
            let before = self.rate.rate();
            let after = self.rate.update(report.error);
            if after != before {
                debug!("learning rate {before} -> {after} (test error {})", report.error);
            }
        }

        if let Some(best) = best {
            if best.offer(report.successes) {
                report.checkpoint_saved =
                    sink.save(self.params(), self.topology(), report.successes);
                if report.checkpoint_saved {
                    info!("saved parameters as best scored: {}", report.successes);
                } else {
                    warn!("best model scoring {} was not saved", report.successes);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::NoCheckpoints;
    use crate::config::Hyperparams;
    use crate::schedule::AdaptiveRate;
    use crate::{InMemoryDataset, LabeledSet, Matrix, Topology};

    /// Output unit 0 fires for x < 0.5, unit 1 for x > 0.5.
    fn threshold_network(hyper: &Hyperparams) -> Network {
        let t = Topology::new(&[1, 2]).unwrap();
        let p = ParameterSet::new(
            &t,
            vec![Matrix::from_vec(2, 1, vec![-10.0, 10.0]).unwrap()],
            vec![Matrix::column(&[5.0, -5.0])],
        )
        .unwrap();
        Network::new(t, p, hyper).unwrap()
    }

    fn data(test: &[(f32, usize)]) -> InMemoryDataset {
        let rows: Vec<Vec<f32>> = test.iter().map(|&(x, _)| vec![x]).collect();
        let labels: Vec<usize> = test.iter().map(|&(_, y)| y).collect();
        let set = LabeledSet::from_rows(&rows, &labels).unwrap();
        InMemoryDataset::new(set.clone(), set).unwrap()
    }

    struct Recording {
        scores: Vec<usize>,
        succeed: bool,
    }

    impl CheckpointSink for Recording {
        fn save(&mut self, _: &ParameterSet, _: &Topology, score: usize) -> bool {
            self.scores.push(score);
            self.succeed
        }
    }

    #[test]
    fn counts_successes_and_error() {
        let mut net = threshold_network(&Hyperparams::default());
        let data = data(&[(0.1, 0), (0.9, 1), (0.2, 1), (0.8, 1)]);

        let report = net.evaluate(&data, None, &mut NoCheckpoints).unwrap();
        assert_eq!(report.successes, 3);
        assert_eq!(report.total, 4);
        assert!((report.error - 0.25).abs() < 1e-6);
        assert!((report.accuracy() - 0.75).abs() < 1e-6);
        assert!(!report.checkpoint_saved);
    }

    #[test]
    fn out_of_range_label_is_an_error() {
        let net = threshold_network(&Hyperparams::default());
        let data = data(&[(0.1, 5)]);
        assert!(matches!(
            net.accuracy_on(&data),
            Err(Error::InvalidLabel { label: 5, classes: 2 })
        ));
    }

    #[test]
    fn adaptive_rate_follows_test_error() {
        let hyper = Hyperparams {
            learning_rate: 1.0,
            adaptive_rate: AdaptiveRate::Quadratic,
            ..Hyperparams::default()
        };
        let mut net = threshold_network(&hyper);

        // All correct: error 0 drives the quadratic rate to the floor.
        let perfect = data(&[(0.1, 0), (0.9, 1)]);
        net.evaluate(&perfect, None, &mut NoCheckpoints).unwrap();
        assert_eq!(net.learning_rate(), crate::schedule::MIN_LEARNING_RATE);

        let mut fixed = threshold_network(&Hyperparams {
            learning_rate: 1.0,
            ..Hyperparams::default()
        });
        fixed.evaluate(&perfect, None, &mut NoCheckpoints).unwrap();
        assert_eq!(fixed.learning_rate(), 1.0);
    }

    #[test]
    fn checkpoints_on_ties_and_improvements_only() {
        let mut net = threshold_network(&Hyperparams::default());
        let mut sink = Recording {
            scores: Vec::new(),
            succeed: true,
        };
        let two = data(&[(0.1, 0), (0.9, 1), (0.2, 1)]);
        let one = data(&[(0.1, 0), (0.9, 0), (0.2, 1)]);

        let mut best = BestModel::new(2);
        assert!(net.evaluate(&two, Some(&mut best), &mut sink).unwrap().checkpoint_saved);
        assert!(net.evaluate(&two, Some(&mut best), &mut sink).unwrap().checkpoint_saved);
        assert!(!net.evaluate(&one, Some(&mut best), &mut sink).unwrap().checkpoint_saved);
        assert_eq!(sink.scores, vec![2, 2]);
        assert_eq!(best.best(), 2);
    }

    #[test]
    fn failed_save_still_advances_best() {
        let mut net = threshold_network(&Hyperparams::default());
        let mut sink = Recording {
            scores: Vec::new(),
            succeed: false,
        };
        let mut best = BestModel::new(0);
        let report = net
            .evaluate(&data(&[(0.1, 0)]), Some(&mut best), &mut sink)
            .unwrap();
        assert!(!report.checkpoint_saved);
        assert_eq!(best.best(), 1);
    }
}
