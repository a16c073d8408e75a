// src/tensor/mod.rs

use std::fmt;
use std::sync::Arc;

use crate::error::TapeError;
use crate::tensor_data::{TensorData, TensorId};
use crate::types::DType;

pub mod arithmetic;
pub mod create;

pub use create::{from_vec, full, scalar, zeros, zeros_like};

/// Represents a multi-dimensional array of `f32` values.
///
/// `Tensor` is a cheap handle around an `Arc<TensorData>`. Cloning a tensor shares the
/// underlying data and keeps its [`TensorId`]; the tape uses that id, never the contents,
/// to decide whether a tensor is being watched.
#[derive(Clone)]
pub struct Tensor {
    pub(crate) data: Arc<TensorData>,
}

impl Tensor {
    /// Creates a new F32 Tensor with the given data and shape.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, TapeError> {
        Self::with_dtype(data_vec, shape, DType::F32)
    }

    /// Creates a new Tensor tagged with an explicit dtype.
    pub fn with_dtype(
        data_vec: Vec<f32>,
        shape: Vec<usize>,
        dtype: DType,
    ) -> Result<Self, TapeError> {
        let tensor_data = TensorData::new(data_vec, shape, dtype)?;
        Ok(Tensor {
            data: Arc::new(tensor_data),
        })
    }

    /// Builds a tensor from parts whose lengths are already known to agree.
    pub(crate) fn from_parts(buffer: Vec<f32>, shape: Vec<usize>, dtype: DType) -> Self {
        debug_assert_eq!(buffer.len(), shape.iter().product::<usize>());
        Tensor {
            data: Arc::new(TensorData {
                id: TensorId::next(),
                buffer,
                shape,
                dtype,
            }),
        }
    }

    /// Creates a scalar resource handle.
    ///
    /// Handles are what variables expose to the tape. Their payload is meaningless; only the
    /// identity matters.
    pub fn resource_handle() -> Self {
        full(&[], 0.0, DType::Resource)
    }

    /// Returns the identity of this tensor.
    pub fn id(&self) -> TensorId {
        self.data.id
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype
    }

    /// Returns a clone of the tensor's shape.
    pub fn shape(&self) -> Vec<usize> {
        self.data.shape.clone()
    }

    pub fn numel(&self) -> usize {
        self.data.numel()
    }

    /// Returns the flat row-major data.
    pub fn data(&self) -> &[f32] {
        &self.data.buffer
    }

    /// Returns the single element of a one-element tensor.
    pub fn item(&self) -> Result<f32, TapeError> {
        if self.numel() != 1 {
            return Err(TapeError::ShapeMismatch {
                expected: vec![],
                actual: self.shape(),
                operation: "item".to_string(),
            });
        }
        Ok(self.data.buffer[0])
    }
}

impl PartialEq for Tensor {
    /// Value equality (dtype, shape, data). Use [`Tensor::id`] for identity.
    fn eq(&self, other: &Self) -> bool {
        self.data.dtype == other.data.dtype
            && self.data.shape == other.data.shape
            && self.data.buffer == other.data.buffer
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.data.id)
            .field("dtype", &self.data.dtype)
            .field("shape", &self.data.shape)
            .field("data", &self.data.buffer)
            .finish()
    }
}
