//! Cost functions.
//!
//! Only the combinations that have a closed-form output error with a sigmoid
//! output layer are supported:
//!
//! - quadratic: `delta_L = (y - t) * sigmoid'(z_L)`
//! - cross-entropy: `delta_L = y - t` (the `sigmoid'` factor cancels)

use crate::math::{cross_entropy_cost_derivative, quadratic_cost_derivative, sigmoid_derivative};
use crate::{Error, Matrix, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest output value fed into `ln` when computing the cross-entropy cost.
const LOG_EPS: f32 = 1e-7;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostFunction {
    Quadratic,
    #[default]
    CrossEntropy,
}

impl CostFunction {
    /// Output-layer error signal `delta_L`.
    ///
    /// `y` and `z` are the output activation and pre-activation column vectors.
    pub fn output_delta(self, y: &Matrix, z: &Matrix, target: &[f32]) -> Result<Matrix> {
        if y.shape() != z.shape() || !y.is_column() {
            return Err(Error::DimensionMismatch(format!(
                "output activation {}x{} and pre-activation {}x{} must be equal columns",
                y.rows(),
                y.cols(),
                z.rows(),
                z.cols()
            )));
        }

        match self {
            CostFunction::Quadratic => {
                let d = quadratic_cost_derivative(y.as_slice(), target)?;
                Matrix::column(&d).hadamard(&sigmoid_derivative(z))
            }
            CostFunction::CrossEntropy => {
                let d = cross_entropy_cost_derivative(y.as_slice(), target)?;
                Ok(Matrix::column(&d))
            }
        }
    }

    /// Cost of a single prediction.
    ///
    /// - quadratic: `0.5 * |y - t|^2`
    /// - cross-entropy: `-sum(t ln y + (1 - t) ln(1 - y))`
    pub fn cost(self, y: &[f32], target: &[f32]) -> f32 {
        assert_eq!(
            y.len(),
            target.len(),
            "output len {} does not match target len {}",
            y.len(),
            target.len()
        );

        match self {
            CostFunction::Quadratic => {
                let mut sum_sq = 0.0_f32;
                for (&a, &t) in y.iter().zip(target) {
                    let diff = a - t;
                    sum_sq = diff.mul_add(diff, sum_sq);
                }
                0.5 * sum_sq
            }
            CostFunction::CrossEntropy => {
                let mut sum = 0.0_f32;
                for (&a, &t) in y.iter().zip(target) {
                    let a = a.clamp(LOG_EPS, 1.0 - LOG_EPS);
                    sum -= t * a.ln() + (1.0 - t) * (1.0 - a).ln();
                }
                sum
            }
        }
    }
}
