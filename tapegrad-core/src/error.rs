use crate::gradient_space::GradientSpace;
use crate::tensor_data::TensorId;
use crate::types::DType;
use thiserror::Error;

/// Custom error type for the tapegrad tape.
///
/// Every variant except `GradientSpaceMismatch` and `BackwardFunction` describes a broken
/// contract between the op-dispatch layer and the tape. None of them is transient.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum TapeError {
    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("DType mismatch for operation '{operation}': expected {expected:?}, got {actual:?}")]
    DTypeMismatch {
        expected: DType,
        actual: DType,
        operation: String,
    },

    #[error("Element {index} of an eager sequence is already a traced node")]
    NodeInSequence { index: usize },

    #[error("Expected a sequence value during operation {operation}")]
    SequenceExpected { operation: String },

    #[error("Index {index} out of bounds for sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Gradient space mismatch: expected {expected:?}, got {actual:?}")]
    GradientSpaceMismatch {
        expected: GradientSpace,
        actual: GradientSpace,
    },

    #[error("Tape was dropped before its watched tensor {tensor_id} received a gradient")]
    TapeDropped { tensor_id: TensorId },

    #[error("Backward function '{op}' failed: {message}")]
    BackwardFunction { op: String, message: String },

    #[error("Cycle detected in the recorded graph during backward replay.")]
    CycleDetected,

    #[error("Internal error: {0}")]
    InternalError(String),
}
