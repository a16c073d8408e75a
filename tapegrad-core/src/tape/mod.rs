// src/tape/mod.rs

//! # Tapes
//!
//! A [`Tape`] is one tracking session. It remembers which variable handles were watched while
//! it was active and, during backward replay, collects `(gradient, variable)` pairs for them.
//!
//! Tapes live on a [`TapeStack`], an explicit tracking context owned by the caller. A stack is
//! built from `Rc`/`RefCell` and is therefore confined to the thread that created it.
//!
//! - [`stack`]: push/pop, scoped replacement, the `should_record` gate.
//! - [`watch`]: the variable watch primitive.
//! - [`record`]: the operation recording primitive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;

use crate::autograd::Node;
use crate::error::TapeError;
use crate::tensor_data::TensorId;
use crate::value::Value;
use crate::variable::Variable;

pub mod record;
pub mod stack;
pub mod watch;

pub use record::RecordedOperation;
pub use stack::{should_record, TapeStack};
pub use watch::watch_with_tape;

static NEXT_TAPE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`Tape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TapeId(u64);

impl TapeId {
    fn next() -> Self {
        TapeId(NEXT_TAPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[derive(Default)]
struct TapeData {
    /// Watched handle id -> node wrapping the handle under this tape.
    tensors: HashMap<TensorId, Node>,
    /// Watched handle id -> owning variable.
    variables: HashMap<TensorId, Variable>,
    /// Filled during backward replay only.
    gradients: Vec<(Value, Variable)>,
}

/// A recording session.
///
/// `Tape` is a shared handle: clones refer to the same session, and equality is identity.
#[derive(Clone)]
pub struct Tape {
    id: TapeId,
    inner: Rc<RefCell<TapeData>>,
}

/// Non-owning reference to a [`Tape`], held by the nodes it watches.
#[derive(Clone)]
pub struct WeakTape {
    id: TapeId,
    inner: Weak<RefCell<TapeData>>,
}

impl Tape {
    /// Creates an empty tape.
    pub fn new() -> Self {
        Tape {
            id: TapeId::next(),
            inner: Rc::new(RefCell::new(TapeData::default())),
        }
    }

    pub fn id(&self) -> TapeId {
        self.id
    }

    pub fn downgrade(&self) -> WeakTape {
        WeakTape {
            id: self.id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns `true` if a tensor with this identity was watched on this tape.
    pub fn contains_tensor(&self, tensor_id: TensorId) -> bool {
        self.inner.borrow().tensors.contains_key(&tensor_id)
    }

    /// The node wrapping the watched tensor, if any.
    pub fn watched_node(&self, tensor_id: TensorId) -> Option<Node> {
        self.inner.borrow().tensors.get(&tensor_id).cloned()
    }

    /// The variable owning the watched tensor, if any.
    pub fn variable(&self, tensor_id: TensorId) -> Option<Variable> {
        self.inner.borrow().variables.get(&tensor_id).cloned()
    }

    /// Ids of all watched tensors, sorted.
    pub fn watched_tensor_ids(&self) -> Vec<TensorId> {
        let mut ids: Vec<TensorId> = self.inner.borrow().tensors.keys().copied().collect();
        ids.sort();
        ids
    }

    /// All watched variables, ordered by handle id.
    pub fn watched_variables(&self) -> Vec<Variable> {
        let data = self.inner.borrow();
        let mut entries: Vec<(&TensorId, &Variable)> = data.variables.iter().collect();
        entries.sort_by_key(|(id, _)| **id);
        entries.into_iter().map(|(_, v)| v.clone()).collect()
    }

    /// A snapshot of the accumulated `(gradient, variable)` pairs, in arrival order.
    pub fn gradients(&self) -> Vec<(Value, Variable)> {
        self.inner.borrow().gradients.clone()
    }

    /// Removes and returns the accumulated gradients.
    pub fn take_gradients(&self) -> Vec<(Value, Variable)> {
        std::mem::take(&mut self.inner.borrow_mut().gradients)
    }

    /// Registers a watched tensor. The last watch of an id wins.
    pub(crate) fn insert_watched(&self, tensor_id: TensorId, node: Node, variable: Variable) {
        let mut data = self.inner.borrow_mut();
        if data.tensors.insert(tensor_id, node).is_some() {
            log::trace!("Tape {:?}: re-watching tensor {}", self.id, tensor_id);
        }
        data.variables.insert(tensor_id, variable);
    }

    /// Appends `(g, variable)` for the variable watched under `tensor_id`.
    ///
    /// # Errors
    /// `TapeError::InternalError` if nothing was watched under that id.
    pub(crate) fn append_gradient(&self, tensor_id: TensorId, g: Value) -> Result<(), TapeError> {
        let mut data = self.inner.borrow_mut();
        let variable = match data.variables.get(&tensor_id) {
            Some(variable) => variable.clone(),
            None => {
                warn!("Tape {:?}: gradient for unknown tensor {}", self.id, tensor_id);
                return Err(TapeError::InternalError(format!(
                    "tape {} has no variable for tensor {}",
                    self.id.0, tensor_id
                )));
            }
        };
        data.gradients.push((g, variable));
        Ok(())
    }

    /// Moves `other`'s gradients into this tape. A no-op when both are the same tape.
    pub(crate) fn merge_gradients(&self, other: &Tape) {
        if self.id == other.id {
            return;
        }
        let moved = other.take_gradients();
        self.inner.borrow_mut().gradients.extend(moved);
    }
}

impl Default for Tape {
    fn default() -> Self {
        Tape::new()
    }
}

impl PartialEq for Tape {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tape {}

impl Hash for Tape {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.borrow();
        f.debug_struct("Tape")
            .field("id", &self.id)
            .field("watched", &data.tensors.len())
            .field("gradients", &data.gradients.len())
            .finish()
    }
}

impl WeakTape {
    pub fn id(&self) -> TapeId {
        self.id
    }

    /// Returns the tape if it is still alive.
    pub fn upgrade(&self) -> Option<Tape> {
        self.inner.upgrade().map(|inner| Tape { id: self.id, inner })
    }
}

impl fmt::Debug for WeakTape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakTape")
            .field("id", &self.id)
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{scalar, Tensor};

    fn variable() -> Variable {
        Variable::new("v", Tensor::new(vec![1.0, 2.0], vec![2]).unwrap())
    }

    #[test]
    fn test_identity_equality() {
        let a = Tape::new();
        let b = Tape::new();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_append_gradient_requires_watch() {
        let tape = Tape::new();
        let v = variable();
        let result = tape.append_gradient(v.handle_id(), scalar(1.0).into());
        assert!(matches!(result, Err(TapeError::InternalError(_))));
        assert!(tape.gradients().is_empty());
    }

    #[test]
    fn test_merge_same_tape_is_noop() {
        let tape = Tape::new();
        let v = variable();
        let node = Node::wrap(&tape, Value::Tensor(v.handle()));
        tape.insert_watched(v.handle_id(), node, v.clone());
        tape.append_gradient(v.handle_id(), scalar(1.0).into()).unwrap();
        tape.merge_gradients(&tape.clone());
        assert_eq!(tape.gradients().len(), 1);
    }

    #[test]
    fn test_merge_moves_gradients() {
        let (a, b) = (Tape::new(), Tape::new());
        let v = variable();
        let node = Node::wrap(&b, Value::Tensor(v.handle()));
        b.insert_watched(v.handle_id(), node, v.clone());
        b.append_gradient(v.handle_id(), scalar(2.0).into()).unwrap();
        a.merge_gradients(&b);
        assert_eq!(a.gradients().len(), 1);
        assert!(b.gradients().is_empty());
    }

    #[test]
    fn test_weak_tape_upgrade() {
        let tape = Tape::new();
        let weak = tape.downgrade();
        assert_eq!(weak.upgrade(), Some(tape.clone()));
        drop(tape);
        assert!(weak.upgrade().is_none());
    }
}
