//! Dense math primitives used by the network.
//!
//! Vectors travel as column matrices `(n, 1)` through the forward and backward
//! passes; the cost derivatives work on flat slices since they only ever see
//! the output layer.

use crate::{Error, Matrix, Result};

/// Number of output classes (and length of every one-hot target).
pub const NUM_CLASSES: usize = 10;

/// Matrix product `a · b`. Fails with `DimensionMismatch` unless
/// `a.cols() == b.rows()`.
#[inline]
pub fn dot_prod(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    a.dot(b)
}

/// Matrix with axes swapped.
#[inline]
pub fn transpose(m: &Matrix) -> Matrix {
    m.transpose()
}

/// Flattens a column vector `(n, 1)` into a plain vector of length `n`.
pub fn vector_transpose(m: &Matrix) -> Result<Vec<f32>> {
    if !m.is_column() {
        return Err(Error::DimensionMismatch(format!(
            "expected a column vector, got {}x{}",
            m.rows(),
            m.cols()
        )));
    }
    Ok(m.as_slice().to_vec())
}

/// Element-wise logistic function.
pub fn sigmoid(z: &Matrix) -> Matrix {
    z.map(sigmoid_scalar)
}

/// Element-wise `sigmoid(z) * (1 - sigmoid(z))`.
pub fn sigmoid_derivative(z: &Matrix) -> Matrix {
    z.map(sigmoid_derivative_scalar)
}

#[inline]
pub(crate) fn sigmoid_scalar(x: f32) -> f32 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[inline]
pub(crate) fn sigmoid_derivative_scalar(x: f32) -> f32 {
    // s(1 - s) rewritten as e / (1 + e)^2 with e = exp(-|x|) so the tails do
    // not round to exactly zero.
    let e = (-x.abs()).exp();
    let d = 1.0 + e;
    e / (d * d)
}

/// Derivative of `C = 1/2 * |y - real|^2` with respect to `y`.
pub fn quadratic_cost_derivative(y: &[f32], real: &[f32]) -> Result<Vec<f32>> {
    difference(y, real)
}

/// Derivative term used for the cross-entropy cost.
///
/// Combined with a sigmoid output layer the `sigmoid'(z)` factor cancels, so the
/// output error reduces to `y - real`, numerically identical to the quadratic case.
pub fn cross_entropy_cost_derivative(y: &[f32], real: &[f32]) -> Result<Vec<f32>> {
    difference(y, real)
}

fn difference(y: &[f32], real: &[f32]) -> Result<Vec<f32>> {
    if y.len() != real.len() {
        return Err(Error::DimensionMismatch(format!(
            "output len {} does not match target len {}",
            y.len(),
            real.len()
        )));
    }
    Ok(y.iter().zip(real).map(|(&a, &b)| a - b).collect())
}

/// Pairwise element-wise sum of two equally-shaped lists of matrices.
pub fn add_elementwise(a: &[Matrix], b: &[Matrix]) -> Result<Vec<Matrix>> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch(format!(
            "cannot add lists of {} and {} matrices",
            a.len(),
            b.len()
        )));
    }

    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let mut sum = x.clone();
            sum.add_assign(y)?;
            Ok(sum)
        })
        .collect()
}

/// One-hot vector of length `NUM_CLASSES` with a `1.0` at `label`.
pub fn output_vector(label: usize) -> Result<Vec<f32>> {
    one_hot(label, NUM_CLASSES)
}

/// One-hot vector of length `classes` with a `1.0` at `label`.
pub fn one_hot(label: usize, classes: usize) -> Result<Vec<f32>> {
    if label >= classes {
        return Err(Error::InvalidLabel { label, classes });
    }
    let mut v = vec![0.0; classes];
    v[label] = 1.0;
    Ok(v)
}

/// Index of the largest component; ties resolve to the earliest index.
///
/// Returns `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    Some(best)
}
