// src/tensor/create.rs

use crate::error::TapeError;
use crate::tensor::Tensor;
use crate::types::DType;

/// Creates a tensor of the given shape and dtype filled with `value`.
pub fn full(shape: &[usize], value: f32, dtype: DType) -> Tensor {
    let numel: usize = shape.iter().product();
    Tensor::from_parts(vec![value; numel], shape.to_vec(), dtype)
}

/// Creates a tensor filled with zeros.
pub fn zeros(shape: &[usize], dtype: DType) -> Tensor {
    full(shape, 0.0, dtype)
}

/// Creates a zero tensor with the same shape and dtype as `tensor`.
pub fn zeros_like(tensor: &Tensor) -> Tensor {
    zeros(&tensor.data.shape, tensor.dtype())
}

/// Creates a 0-dimensional F32 tensor.
pub fn scalar(value: f32) -> Tensor {
    full(&[], value, DType::F32)
}

/// Creates an F32 tensor from a vector, inferring a 1-D shape.
pub fn from_vec(data: Vec<f32>) -> Result<Tensor, TapeError> {
    let len = data.len();
    Tensor::new(data, vec![len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_shape_and_dtype() {
        let t = zeros(&[2, 3], DType::F64);
        assert_eq!(t.shape(), vec![2, 3]);
        assert_eq!(t.dtype(), DType::F64);
        assert!(t.data().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_zeros_like() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
        let z = zeros_like(&t);
        assert_eq!(z.shape(), t.shape());
        assert_eq!(z.data(), &[0.0; 4]);
        assert_ne!(z.id(), t.id());
    }

    #[test]
    fn test_scalar() {
        let s = scalar(2.0);
        assert!(s.shape().is_empty());
        assert_eq!(s.numel(), 1);
    }

    #[test]
    fn test_from_vec() {
        let t = from_vec(vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(t.shape(), vec![3]);
    }
}
