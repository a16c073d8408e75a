// src/gradient_space/mod.rs

//! # Gradient spaces
//!
//! Every kind of [`Value`] has a gradient space: a descriptor that can build a neutral
//! ("zero") gradient for a value of that kind and decide whether two gradients are
//! interchangeable for accumulation.
//!
//! The set of kinds is closed. Registering a new kind means adding a variant to [`Value`]
//! and to [`GradientSpace`], and implementing [`HasGradientSpace`] for its payload type; the
//! exhaustive matches below then refuse to compile until the new kind is handled, so an
//! unregistered kind can never be looked up at runtime.
//!
//! | Kind       | `zeros()`                          | `size()`            |
//! |------------|------------------------------------|---------------------|
//! | `Tensor`   | zero tensor of same shape/dtype    | number of elements  |
//! | `Sequence` | sequence of element zeros          | sum of element sizes|
//! | `Tape`     | fresh empty tape                   | 0                   |
//! | `Absent`   | scalar `0.0`                       | 0                   |

use crate::error::TapeError;
use crate::sequence::EagerSequence;
use crate::tape::Tape;
use crate::tensor::{self, Tensor};
use crate::types::DType;
use crate::value::Value;

pub mod sequence;

pub use sequence::SequenceSpace;

/// Implemented by every registered value kind.
pub trait HasGradientSpace {
    fn gradient_space(&self) -> GradientSpace;
}

/// Gradient space descriptor of a value.
#[derive(Debug, Clone)]
pub enum GradientSpace {
    Tensor { shape: Vec<usize>, dtype: DType },
    Sequence(SequenceSpace),
    Tape,
    Absent,
}

impl GradientSpace {
    /// Looks up the descriptor of `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Tensor(t) => t.gradient_space(),
            Value::Sequence(s) => s.gradient_space(),
            Value::Tape(t) => t.gradient_space(),
            Value::Absent => GradientSpace::Absent,
        }
    }

    pub(crate) fn of_sequence(sequence: &EagerSequence) -> Self {
        GradientSpace::Sequence(SequenceSpace::new(sequence))
    }

    /// Builds the neutral gradient for this space.
    pub fn zeros(&self) -> Value {
        match self {
            GradientSpace::Tensor { shape, dtype } => Value::Tensor(tensor::zeros(shape, *dtype)),
            GradientSpace::Sequence(space) => Value::Sequence(space.zeros()),
            GradientSpace::Tape => Value::Tape(Tape::new()),
            GradientSpace::Absent => Value::Tensor(tensor::scalar(0.0)),
        }
    }

    /// Number of scalar degrees of freedom.
    pub fn size(&self) -> usize {
        match self {
            GradientSpace::Tensor { shape, .. } => shape.iter().product(),
            GradientSpace::Sequence(space) => space.size(),
            GradientSpace::Tape | GradientSpace::Absent => 0,
        }
    }

    /// Element dtype, for tensor spaces only.
    pub fn dtype(&self) -> Option<DType> {
        match self {
            GradientSpace::Tensor { dtype, .. } => Some(*dtype),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, GradientSpace::Absent)
    }

    /// Returns `true` for resource-typed tensor spaces, whose shape is never compared.
    pub fn is_resource(&self) -> bool {
        self.dtype().is_some_and(|dtype| dtype.is_resource())
    }

    /// Checks that a gradient from `actual` can be delivered to a value of `expected`.
    ///
    /// Equal spaces are compatible. An absent gradient is accepted anywhere (it is the
    /// additive identity), and anything is accepted for a resource-typed value.
    ///
    /// # Errors
    /// `TapeError::GradientSpaceMismatch` otherwise.
    pub fn check(expected: &GradientSpace, actual: &GradientSpace) -> Result<(), TapeError> {
        if expected == actual || actual.is_absent() || expected.is_resource() {
            return Ok(());
        }
        Err(TapeError::GradientSpaceMismatch {
            expected: expected.clone(),
            actual: actual.clone(),
        })
    }
}

impl PartialEq for GradientSpace {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                GradientSpace::Tensor { shape, dtype },
                GradientSpace::Tensor {
                    shape: other_shape,
                    dtype: other_dtype,
                },
            ) => shape == other_shape && dtype == other_dtype,
            (GradientSpace::Sequence(a), GradientSpace::Sequence(b)) => a == b,
            (GradientSpace::Tape, GradientSpace::Tape) => true,
            (GradientSpace::Absent, GradientSpace::Absent) => true,
            _ => false,
        }
    }
}

impl HasGradientSpace for Tensor {
    fn gradient_space(&self) -> GradientSpace {
        GradientSpace::Tensor {
            shape: self.shape(),
            dtype: self.dtype(),
        }
    }
}

impl HasGradientSpace for Tape {
    fn gradient_space(&self) -> GradientSpace {
        GradientSpace::Tape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::scalar;

    #[test]
    fn test_tensor_space_zeros() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0], vec![3]).unwrap();
        let space = t.gradient_space();
        assert_eq!(space.size(), 3);
        assert_eq!(space.dtype(), Some(DType::F32));
        let zeros = space.zeros();
        let zeros = zeros.as_tensor().unwrap();
        assert_eq!(zeros.data(), &[0.0, 0.0, 0.0]);
        assert_eq!(zeros.gradient_space(), space);
    }

    #[test]
    fn test_absent_space() {
        let space = GradientSpace::of(&Value::Absent);
        assert_eq!(space.size(), 0);
        assert_eq!(space.zeros(), Value::Tensor(scalar(0.0)));
    }

    #[test]
    fn test_tape_space_zero_is_empty_tape() {
        let tape = Tape::new();
        let space = tape.gradient_space();
        let zero = space.zeros();
        let zero_tape = zero.as_tape().unwrap();
        assert_ne!(zero_tape, &tape, "zeros() must build a fresh tape");
        assert!(zero_tape.gradients().is_empty());
        assert!(zero_tape.watched_tensor_ids().is_empty());
    }

    #[test]
    fn test_tensor_space_equality() {
        let a = GradientSpace::Tensor { shape: vec![2], dtype: DType::F32 };
        let b = GradientSpace::Tensor { shape: vec![2], dtype: DType::F32 };
        let c = GradientSpace::Tensor { shape: vec![3], dtype: DType::F32 };
        let d = GradientSpace::Tensor { shape: vec![2], dtype: DType::F64 };
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_ne!(a, GradientSpace::Absent);
    }

    #[test]
    fn test_check_relaxations() {
        let float = GradientSpace::Tensor { shape: vec![2], dtype: DType::F32 };
        let other = GradientSpace::Tensor { shape: vec![4], dtype: DType::F32 };
        let resource = GradientSpace::Tensor { shape: vec![], dtype: DType::Resource };
        assert!(GradientSpace::check(&float, &float).is_ok());
        assert!(GradientSpace::check(&float, &GradientSpace::Absent).is_ok());
        assert!(GradientSpace::check(&resource, &float).is_ok());
        assert!(matches!(
            GradientSpace::check(&float, &other),
            Err(TapeError::GradientSpaceMismatch { .. })
        ));
    }
}
