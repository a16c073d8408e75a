// src/tensor/arithmetic.rs

//! Element-wise kernels needed to accumulate gradients.
//!
//! Real numeric kernels live behind the op-dispatch layer. The tape only ever needs to sum
//! two gradients and to scale one, so that is all this module provides.

use crate::error::TapeError;
use crate::tensor::Tensor;

/// Element-wise addition.
///
/// Shapes must match exactly, except that a one-element operand is broadcast against the
/// other (the neutral gradient of an absent value is the scalar `0.0`).
///
/// # Errors
/// * `TapeError::DTypeMismatch` if the dtypes differ.
/// * `TapeError::ShapeMismatch` if the shapes differ and neither side has one element.
pub fn add_op(a: &Tensor, b: &Tensor) -> Result<Tensor, TapeError> {
    if a.dtype() != b.dtype() {
        return Err(TapeError::DTypeMismatch {
            expected: a.dtype(),
            actual: b.dtype(),
            operation: "add".to_string(),
        });
    }
    let (a_data, b_data) = (a.data(), b.data());
    let (result_data, result_shape): (Vec<f32>, Vec<usize>) = if a.shape() == b.shape() {
        let sum = a_data.iter().zip(b_data).map(|(x, y)| x + y).collect::<Vec<f32>>();
        (sum, a.shape())
    } else if b.numel() == 1 {
        let rhs = b_data[0];
        (a_data.iter().map(|x| x + rhs).collect(), a.shape())
    } else if a.numel() == 1 {
        let lhs = a_data[0];
        (b_data.iter().map(|y| lhs + y).collect(), b.shape())
    } else {
        return Err(TapeError::ShapeMismatch {
            expected: a.shape(),
            actual: b.shape(),
            operation: "add".to_string(),
        });
    };
    Ok(Tensor::from_parts(result_data, result_shape, a.dtype()))
}

/// Multiplies every element by `factor`, keeping shape and dtype.
pub fn scale_op(a: &Tensor, factor: f32) -> Tensor {
    let data = a.data().iter().map(|x| x * factor).collect();
    Tensor::from_parts(data, a.shape(), a.dtype())
}

impl Tensor {
    /// See [`add_op`].
    pub fn add(&self, other: &Tensor) -> Result<Tensor, TapeError> {
        add_op(self, other)
    }

    /// See [`scale_op`].
    pub fn scale(&self, factor: f32) -> Tensor {
        scale_op(self, factor)
    }
}
