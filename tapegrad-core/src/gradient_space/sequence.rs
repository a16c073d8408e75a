// src/gradient_space/sequence.rs

use crate::gradient_space::GradientSpace;
use crate::sequence::{EagerSequence, SequenceKind};
use crate::value::Value;

/// Gradient space of a heterogeneous sequence.
///
/// `shape` holds one descriptor per element and `size` is the sum of their sizes.
///
/// Equality depends on the container kind:
/// * `Tuple`: lengths and every element descriptor must match.
/// * `EagerList`: sequences of different lengths are equal, and two differing element
///   descriptors are still equal when either side is `Absent` or resource-typed. Backward
///   functions routinely return extra or missing gradients for side inputs and resource
///   handles, and those results have to be accepted.
#[derive(Debug, Clone)]
pub struct SequenceSpace {
    kind: SequenceKind,
    shape: Vec<GradientSpace>,
    size: usize,
}

impl SequenceSpace {
    pub fn new(sequence: &EagerSequence) -> Self {
        let shape: Vec<GradientSpace> = sequence.iter().map(GradientSpace::of).collect();
        let size = shape.iter().map(GradientSpace::size).sum();
        SequenceSpace {
            kind: sequence.kind(),
            shape,
            size,
        }
    }

    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    pub fn shape(&self) -> &[GradientSpace] {
        &self.shape
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.shape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    /// A sequence of the same kind holding each element's zero.
    pub fn zeros(&self) -> EagerSequence {
        let items: Vec<Value> = self.shape.iter().map(GradientSpace::zeros).collect();
        EagerSequence::with_kind(self.kind, items)
    }

    fn relaxed_eq(&self, other: &SequenceSpace) -> bool {
        if self.shape.len() != other.shape.len() {
            log::trace!(
                "Treating eager sequences of length {} and {} as equal",
                self.shape.len(),
                other.shape.len()
            );
            return true;
        }
        self.shape.iter().zip(&other.shape).all(|(ss, os)| {
            ss == os || ss.is_absent() || os.is_absent() || ss.is_resource() || os.is_resource()
        })
    }
}

impl PartialEq for SequenceSpace {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match self.kind {
            SequenceKind::EagerList => self.relaxed_eq(other),
            SequenceKind::Tuple => self.shape == other.shape,
        }
    }
}

#[cfg(test)]
#[path = "sequence_test.rs"]
mod tests;
