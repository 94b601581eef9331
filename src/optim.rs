//! Mini-batch gradient descent update.
//!
//! For a mini-batch of `mb` examples with summed gradients `sum_dW`, `sum_dB`:
//!
//! - `W <- r * W - (rate / mb) * sum_dW`
//! - `b <- b - (rate / mb) * sum_dB`
//!
//! where `r = 1` without regularization and `r = 1 - rate * lambda / n` for L2
//! (`n` = training-set size). Biases are never regularized.

use crate::{Error, Gradients, ParameterSet, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Regularization {
    #[default]
    None,
    L2 { lambda: f32 },
}

impl Regularization {
    pub fn validate(self) -> Result<()> {
        match self {
            Regularization::None => Ok(()),
            Regularization::L2 { lambda } => {
                if !(lambda.is_finite() && lambda >= 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "L2 lambda must be finite and >= 0, got {lambda}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Multiplicative weight factor `r` applied before the gradient step.
    #[inline]
    pub fn weight_factor(self, learning_rate: f32, training_len: usize) -> f32 {
        match self {
            Regularization::None => 1.0,
            Regularization::L2 { lambda } => 1.0 - learning_rate * (lambda / training_len as f32),
        }
    }
}

/// One parameter update over a finished mini-batch.
#[derive(Debug, Clone, Copy)]
pub struct SgdStep {
    pub learning_rate: f32,
    pub regularization: Regularization,
    /// Examples in the mini-batch (the averaging divisor).
    pub batch_len: usize,
    /// Size of the whole training set (the L2 normalizer).
    pub training_len: usize,
}

impl SgdStep {
    /// Applies the step to `params` in place.
    pub fn apply(&self, params: &mut ParameterSet, grads: &Gradients) -> Result<()> {
        if self.batch_len == 0 || self.training_len == 0 {
            return Err(Error::InvalidConfig(
                "batch and training set sizes must be > 0".to_owned(),
            ));
        }
        if grads.num_transitions() != params.num_transitions() {
            return Err(Error::DimensionMismatch(format!(
                "gradients cover {} layers, parameters have {}",
                grads.num_transitions(),
                params.num_transitions()
            )));
        }

        let r = self
            .regularization
            .weight_factor(self.learning_rate, self.training_len);
        let step = self.learning_rate / self.batch_len as f32;

        for l in 0..params.num_transitions() {
            let dw = grads.d_weights(l);
            let w = params.weights_mut(l);
            w.check_same_shape(dw, "weight update")?;
            for (p, &g) in w.as_mut_slice().iter_mut().zip(dw.as_slice()) {
                *p = r * *p - step * g;
            }

            let db = grads.d_biases(l);
            let b = params.biases_mut(l);
            b.check_same_shape(db, "bias update")?;
            for (p, &g) in b.as_mut_slice().iter_mut().zip(db.as_slice()) {
                *p -= step * g;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Matrix, Topology};

    fn setup() -> (ParameterSet, Gradients) {
        let t = Topology::new(&[2, 1]).unwrap();
        let params = ParameterSet::new(
            &t,
            vec![Matrix::from_vec(1, 2, vec![1.0, -2.0]).unwrap()],
            vec![Matrix::column(&[2.0])],
        )
        .unwrap();
        let grads = Gradients::from_parts(
            vec![Matrix::from_vec(1, 2, vec![3.0, 3.0]).unwrap()],
            vec![Matrix::column(&[4.0])],
        )
        .unwrap();
        (params, grads)
    }

    #[test]
    fn plain_step_averages_over_batch() {
        let (mut params, grads) = setup();
        SgdStep {
            learning_rate: 0.1,
            regularization: Regularization::None,
            batch_len: 2,
            training_len: 100,
        }
        .apply(&mut params, &grads)
        .unwrap();

        let w = params.weights(0).as_slice();
        assert!((w[0] - (1.0 - 0.05 * 3.0)).abs() < 1e-6);
        assert!((w[1] - (-2.0 - 0.05 * 3.0)).abs() < 1e-6);
        assert!((params.biases(0).get(0, 0) - (2.0 - 0.05 * 4.0)).abs() < 1e-6);
    }

    #[test]
    fn l2_shrinks_weights_but_not_biases() {
        let (mut plain, grads) = setup();
        let mut reg = plain.clone();

        let base = SgdStep {
            learning_rate: 0.5,
            regularization: Regularization::None,
            batch_len: 1,
            training_len: 10,
        };
        base.apply(&mut plain, &grads).unwrap();
        SgdStep {
            regularization: Regularization::L2 { lambda: 2.0 },
            ..base
        }
        .apply(&mut reg, &grads)
        .unwrap();

        assert!(reg.weight_norm_sq() < plain.weight_norm_sq());
        assert_eq!(reg.biases(0), plain.biases(0));

        // r = 1 - 0.5 * 2 / 10 = 0.9
        let w0 = reg.weights(0).get(0, 0);
        assert!((w0 - (0.9 * 1.0 - 0.5 * 3.0)).abs() < 1e-6);
    }

    #[test]
    fn weight_factor_by_mode() {
        assert_eq!(Regularization::None.weight_factor(0.5, 10), 1.0);
        let r = Regularization::L2 { lambda: 5.0 }.weight_factor(0.1, 50_000);
        assert!((r - (1.0 - 0.1 * 5.0 / 50_000.0)).abs() < 1e-7);
    }

    #[test]
    fn validate_rejects_bad_lambda() {
        assert!(Regularization::L2 { lambda: -1.0 }.validate().is_err());
        assert!(Regularization::L2 { lambda: f32::NAN }.validate().is_err());
        assert!(Regularization::L2 { lambda: 0.0 }.validate().is_ok());
    }

    #[test]
    fn rejects_mismatched_gradients() {
        let (mut params, _) = setup();
        let grads = Gradients::from_parts(vec![Matrix::zeros(2, 2)], vec![Matrix::zeros(1, 1)])
            .unwrap();
        let err = SgdStep {
            learning_rate: 0.1,
            regularization: Regularization::None,
            batch_len: 1,
            training_len: 1,
        }
        .apply(&mut params, &grads)
        .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }
}
