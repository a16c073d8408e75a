// src/value.rs

use crate::error::TapeError;
use crate::gradient_space::{GradientSpace, HasGradientSpace};
use crate::sequence::EagerSequence;
use crate::tape::Tape;
use crate::tensor::Tensor;

/// A raw (untraced) value flowing through recorded operations and their gradients.
///
/// The set of kinds is closed: every kind has exactly one [`GradientSpace`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Tensor(Tensor),
    Sequence(EagerSequence),
    /// A tape used as a value: the gradient flowing out of a watched variable.
    Tape(Tape),
    /// No value (and no gradient).
    Absent,
}

impl Value {
    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Value::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&EagerSequence> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tape(&self) -> Option<&Tape> {
        match self {
            Value::Tape(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Returns the tensor, or an internal error naming `operation`.
    ///
    /// Meant for backward functions that know their argument kinds.
    pub fn expect_tensor(&self, operation: &str) -> Result<&Tensor, TapeError> {
        self.as_tensor().ok_or_else(|| {
            TapeError::InternalError(format!(
                "{} expected a tensor, got {:?}",
                operation,
                self.gradient_space()
            ))
        })
    }

    /// Flattens nested sequences into their leaves, depth first.
    ///
    /// Tensors, tapes and absent values are leaves; `Absent` is kept as a leaf so that
    /// positions line up with the structure that produced them.
    pub fn flatten(self) -> Vec<Value> {
        let mut leaves = Vec::new();
        flatten_into(self, &mut leaves);
        leaves
    }

    /// Sums two gradients of the same gradient space.
    ///
    /// `Absent` is the additive identity. Sequences are summed element-wise; when lengths
    /// differ the longer tail is kept unchanged. Two tapes accumulate by identity: a tape plus
    /// itself is itself, otherwise the right-hand tape's gradients are moved into the left.
    ///
    /// # Errors
    /// `TapeError::GradientSpaceMismatch` when the kinds cannot be added, plus any error of
    /// the tensor addition kernel.
    pub fn accumulate(self, other: Value) -> Result<Value, TapeError> {
        match (self, other) {
            (Value::Absent, other) => Ok(other),
            (this, Value::Absent) => Ok(this),
            (Value::Tensor(a), Value::Tensor(b)) => Ok(Value::Tensor(a.add(&b)?)),
            (Value::Sequence(a), Value::Sequence(b)) if a.kind() == b.kind() => {
                let kind = a.kind();
                let mut lhs = a.into_items().into_iter();
                let mut rhs = b.into_items().into_iter();
                let mut summed = Vec::new();
                loop {
                    match (lhs.next(), rhs.next()) {
                        (Some(x), Some(y)) => summed.push(x.accumulate(y)?),
                        (Some(x), None) | (None, Some(x)) => summed.push(x),
                        (None, None) => break,
                    }
                }
                Ok(Value::Sequence(EagerSequence::with_kind(kind, summed)))
            }
            (Value::Tape(a), Value::Tape(b)) => {
                a.merge_gradients(&b);
                Ok(Value::Tape(a))
            }
            (a, b) => Err(TapeError::GradientSpaceMismatch {
                expected: a.gradient_space(),
                actual: b.gradient_space(),
            }),
        }
    }
}

fn flatten_into(value: Value, leaves: &mut Vec<Value>) {
    match value {
        Value::Sequence(seq) => {
            for item in seq.into_items() {
                flatten_into(item, leaves);
            }
        }
        leaf => leaves.push(leaf),
    }
}

impl HasGradientSpace for Value {
    fn gradient_space(&self) -> GradientSpace {
        GradientSpace::of(self)
    }
}

impl From<Tensor> for Value {
    fn from(tensor: Tensor) -> Self {
        Value::Tensor(tensor)
    }
}

impl From<EagerSequence> for Value {
    fn from(sequence: EagerSequence) -> Self {
        Value::Sequence(sequence)
    }
}

impl From<Tape> for Value {
    fn from(tape: Tape) -> Self {
        Value::Tape(tape)
    }
}

impl From<Option<Tensor>> for Value {
    fn from(tensor: Option<Tensor>) -> Self {
        tensor.map_or(Value::Absent, Value::Tensor)
    }
}
