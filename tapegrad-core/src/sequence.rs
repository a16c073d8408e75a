// src/sequence.rs

use crate::autograd::Traced;
use crate::error::TapeError;
use crate::gradient_space::{GradientSpace, HasGradientSpace};
use crate::value::Value;

/// Concrete container kind of a sequence.
///
/// Gradient spaces of different kinds never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    /// Inputs and outputs of recorded operations. Compared with the relaxed rule.
    EagerList,
    /// Fixed structures, e.g. what a backward function returns. Compared strictly.
    Tuple,
}

/// Heterogeneous ordered container of raw values.
///
/// Elements are [`Value`]s, so a sequence can never hold a traced node; building one from
/// [`Traced`] values goes through [`EagerSequence::from_traced`], which rejects nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct EagerSequence {
    kind: SequenceKind,
    items: Vec<Value>,
}

impl EagerSequence {
    /// Creates an eager list.
    pub fn new(items: Vec<Value>) -> Self {
        Self::with_kind(SequenceKind::EagerList, items)
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Self::with_kind(SequenceKind::Tuple, items)
    }

    pub fn with_kind(kind: SequenceKind, items: Vec<Value>) -> Self {
        EagerSequence { kind, items }
    }

    /// Builds an eager list from traced values that must all be raw.
    ///
    /// # Errors
    /// Returns `TapeError::NodeInSequence` with the index of the first node found.
    pub fn from_traced(items: Vec<Traced>) -> Result<Self, TapeError> {
        let mut values = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                Traced::Raw(value) => values.push(value),
                Traced::Node(_) => return Err(TapeError::NodeInSequence { index }),
            }
        }
        Ok(Self::new(values))
    }

    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Like [`get`](Self::get) but with a `TapeError::IndexOutOfBounds` error.
    pub fn try_get(&self, index: usize) -> Result<&Value, TapeError> {
        self.items.get(index).ok_or(TapeError::IndexOutOfBounds {
            index,
            len: self.items.len(),
        })
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Replaces element `index`, returning the previous value.
    pub(crate) fn replace(&mut self, index: usize, value: Value) -> Result<Value, TapeError> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(TapeError::IndexOutOfBounds { index, len })?;
        Ok(std::mem::replace(slot, value))
    }
}

impl HasGradientSpace for EagerSequence {
    /// Computed on demand from the elements' own spaces.
    fn gradient_space(&self) -> GradientSpace {
        GradientSpace::of_sequence(self)
    }
}

impl<'a> IntoIterator for &'a EagerSequence {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tape::Tape;
    use crate::tensor::scalar;

    #[test]
    fn test_from_traced_raw() {
        let seq = EagerSequence::from_traced(vec![
            Traced::from(scalar(1.0)),
            Traced::Raw(Value::Absent),
        ])
        .unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.kind(), SequenceKind::EagerList);
    }

    #[test]
    fn test_from_traced_rejects_nodes() {
        let tape = Tape::new();
        let node = crate::autograd::Node::wrap(&tape, scalar(1.0).into());
        let result = EagerSequence::from_traced(vec![
            Traced::from(scalar(1.0)),
            Traced::Node(node),
        ]);
        assert_eq!(result, Err(TapeError::NodeInSequence { index: 1 }));
    }

    #[test]
    fn test_try_get_out_of_bounds() {
        let seq = EagerSequence::new(vec![scalar(1.0).into()]);
        assert!(seq.try_get(0).is_ok());
        assert_eq!(
            seq.try_get(3),
            Err(TapeError::IndexOutOfBounds { index: 3, len: 1 })
        );
    }
}
