// src/tape/stack.rs

use std::collections::HashSet;

use log::{debug, trace, warn};

use crate::autograd::{Node, Traced};
use crate::tape::watch::watch_with_tape;
use crate::tape::{Tape, TapeId};
use crate::tensor::Tensor;
use crate::variable::Variable;

/// The stack of active tapes for one execution context.
///
/// The op-dispatch layer owns one `TapeStack` per thread of execution and passes it by
/// reference wherever recording decisions are made. Tapes are pushed and popped in LIFO
/// order; the innermost tape is last.
///
/// Besides the stack itself, the context remembers which tapes are *active progenitors*:
/// a tape becomes active when pushed and stops being active when popped. Recorded
/// operations only stay traced against active tapes. Scoped replacement
/// ([`replace_stack`](TapeStack::replace_stack)) activates the replacement tapes for the
/// duration of the scope and restores both the stack and the active set afterwards.
///
/// `TapeStack` holds `Rc`s and is neither `Send` nor `Sync`.
#[derive(Debug, Default)]
pub struct TapeStack {
    tapes: Vec<Tape>,
    active_progenitors: HashSet<TapeId>,
}

impl TapeStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        TapeStack::default()
    }

    /// Creates a stack from existing tapes (outermost first) and marks them active.
    pub fn from_tapes(tapes: Vec<Tape>) -> Self {
        let active_progenitors = tapes.iter().map(Tape::id).collect();
        TapeStack {
            tapes,
            active_progenitors,
        }
    }

    /// Starts a new tracking session: creates a tape, marks it active and pushes it.
    pub fn push_new_tape(&mut self) -> Tape {
        let tape = Tape::new();
        self.active_progenitors.insert(tape.id());
        self.tapes.push(tape.clone());
        debug!("Pushed tape {:?} (depth {})", tape.id(), self.tapes.len());
        tape
    }

    /// Ends the innermost session.
    ///
    /// Returns `None` when the stack is empty; unbalanced pops are tolerated.
    pub fn pop_tape(&mut self) -> Option<Tape> {
        let tape = self.tapes.pop()?;
        self.active_progenitors.remove(&tape.id());
        debug!("Popped tape {:?} (depth {})", tape.id(), self.tapes.len());
        Some(tape)
    }

    /// Marks `variable` as watched by every tape on the stack.
    ///
    /// Each tape gets its own node wrapping the variable's handle.
    pub fn watch_variable(&self, variable: &Variable) {
        if self.tapes.is_empty() {
            warn!(
                "watch_variable({}) called with no active tape; nothing is recorded",
                variable.name()
            );
            return;
        }
        let dtype = variable.value().dtype();
        if !dtype.is_differentiable() {
            warn!(
                "Watching variable {} of non-differentiable dtype {:?}; its gradients will be zero",
                variable.name(),
                dtype
            );
        }
        for tape in &self.tapes {
            watch_with_tape(tape, variable);
        }
    }

    /// Returns `true` if any tape on the stack watches a tensor with `tensor`'s identity.
    pub fn any_tape_has(&self, tensor: &Tensor) -> bool {
        let id = tensor.id();
        self.tapes.iter().any(|tape| tape.contains_tensor(id))
    }

    /// The node wrapping `tensor` on the innermost tape that watches it.
    pub fn watched_node(&self, tensor: &Tensor) -> Option<Node> {
        let id = tensor.id();
        self.tapes.iter().rev().find_map(|tape| tape.watched_node(id))
    }

    /// Runs `f` with the stack temporarily replaced by `new_stack`.
    ///
    /// The tapes in `new_stack` are active progenitors while `f` runs. The previous stack is
    /// restored when `f` returns and also when it unwinds. Whatever
    /// `f` leaves on the replacement stack is discarded, and tapes pushed inside `f` stop
    /// being active progenitors.
    pub fn replace_stack<R>(
        &mut self,
        new_stack: Vec<Tape>,
        f: impl FnOnce(&mut TapeStack) -> R,
    ) -> R {
        let saved = std::mem::replace(&mut self.tapes, new_stack);
        debug!(
            "Replaced tape stack (saved depth {}, new depth {})",
            saved.len(),
            self.tapes.len()
        );
        let saved_active = self.active_progenitors.clone();
        self.active_progenitors.extend(self.tapes.iter().map(Tape::id));
        let mut guard = RestoreStack {
            stack: self,
            saved: Some((saved, saved_active)),
        };
        let result = f(&mut *guard.stack);
        drop(guard);
        result
    }

    pub fn tapes(&self) -> &[Tape] {
        &self.tapes
    }

    pub fn innermost(&self) -> Option<&Tape> {
        self.tapes.last()
    }

    pub fn len(&self) -> usize {
        self.tapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tapes.is_empty()
    }

    /// Returns `true` while the tape with this id is an active progenitor.
    pub fn is_active(&self, id: TapeId) -> bool {
        self.active_progenitors.contains(&id)
    }

    /// Keeps the ids of `progenitors` that are still active, in order.
    pub(crate) fn active_subset(&self, progenitors: &[TapeId]) -> Vec<TapeId> {
        progenitors
            .iter()
            .copied()
            .filter(|id| self.is_active(*id))
            .collect()
    }
}

/// Restores the saved tapes on drop.
struct RestoreStack<'a> {
    stack: &'a mut TapeStack,
    saved: Option<(Vec<Tape>, HashSet<TapeId>)>,
}

impl Drop for RestoreStack<'_> {
    fn drop(&mut self) {
        if let Some((tapes, active)) = self.saved.take() {
            trace!("Restoring tape stack (depth {})", tapes.len());
            self.stack.tapes = tapes;
            self.stack.active_progenitors = active;
        }
    }
}

/// Returns `true` if any of `values` is a traced node.
///
/// This is the gate the op-dispatch layer checks before paying for recording. It is `false`
/// for an empty slice.
pub fn should_record(values: &[Traced]) -> bool {
    values.iter().any(Traced::is_node)
}

#[cfg(test)]
#[path = "stack_test.rs"]
mod tests;
