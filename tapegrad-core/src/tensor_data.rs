// src/tensor_data.rs
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TapeError;
use crate::types::DType;

static NEXT_TENSOR_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a tensor.
///
/// Ids are handed out from a process-wide counter when the `TensorData` is created, so
/// clones of a `Tensor` share an id while two tensors with equal contents never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(pub(crate) u64);

impl TensorId {
    pub(crate) fn next() -> Self {
        TensorId(NEXT_TENSOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal storage and metadata for a Tensor.
///
/// Data is stored flat in row-major order. `TensorData` is immutable once built and is
/// shared between `Tensor` clones through an `Arc`.
#[derive(Debug)]
pub struct TensorData {
    pub(crate) id: TensorId,
    pub(crate) buffer: Vec<f32>,
    pub(crate) shape: Vec<usize>,
    pub(crate) dtype: DType,
}

impl TensorData {
    /// Creates a new `TensorData` from flat data, a shape and a dtype.
    ///
    /// # Errors
    /// Returns `TapeError::TensorCreationError` if the length of `data_vec` does not match
    /// the number of elements described by `shape`.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>, dtype: DType) -> Result<Self, TapeError> {
        let numel: usize = shape.iter().product();
        let data_len = data_vec.len();
        if data_len != numel {
            return Err(TapeError::TensorCreationError { data_len, shape });
        }
        Ok(TensorData {
            id: TensorId::next(),
            buffer: data_vec,
            shape,
            dtype,
        })
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}
