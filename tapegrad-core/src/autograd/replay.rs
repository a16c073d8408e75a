// src/autograd/replay.rs

//! Backward replay over recorded nodes.
//!
//! This is the minimal driver: it visits nodes from the output toward the leaves, sums the
//! gradients each node receives, checks them against the node's gradient space and calls the
//! node's backward rule. Watched variables reached this way append their gradient to the
//! tape that watched them.

use std::collections::HashMap;

use log::{debug, trace};

use crate::autograd::graph::topological_sort;
use crate::autograd::node::{Node, NodeId};
use crate::error::TapeError;
use crate::gradient_space::{GradientSpace, HasGradientSpace};
use crate::tape::Tape;
use crate::value::Value;

/// Result of a backward replay.
#[derive(Debug, Default)]
pub struct Gradients {
    by_node: HashMap<NodeId, Value>,
    tapes: Vec<Tape>,
}

impl Gradients {
    /// The total gradient that reached `node`, if any.
    pub fn get(&self, node: &Node) -> Option<&Value> {
        self.by_node.get(&node.id())
    }

    /// Tapes that received variable gradients, in first-touched order.
    pub fn tapes(&self) -> &[Tape] {
        &self.tapes
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

/// Replays the graph behind `output` backward, starting from `output_gradient`.
///
/// # Errors
/// * `TapeError::GradientSpaceMismatch` if a node receives a gradient that does not belong
///   to its gradient space.
/// * Any error raised by a backward rule, including `TapeError::TapeDropped`.
pub fn backward(output: &Node, output_gradient: Value) -> Result<Gradients, TapeError> {
    let sorted = topological_sort(output)?;
    debug!(
        "Backward replay from node {:?} over {} nodes",
        output.id(),
        sorted.len()
    );

    let mut pending: HashMap<NodeId, Value> = HashMap::new();
    pending.insert(output.id(), output_gradient);
    let mut result = Gradients::default();

    for node in sorted {
        let g = match pending.remove(&node.id()) {
            Some(g) => g,
            None => {
                trace!("Node {:?} received no gradient", node.id());
                continue;
            }
        };
        GradientSpace::check(&node.value().gradient_space(), &g.gradient_space())?;

        let step = node.backward(&g)?;
        for (parent, parent_grad) in step.parents {
            let summed = match pending.remove(&parent.id()) {
                Some(existing) => existing.accumulate(parent_grad)?,
                None => parent_grad,
            };
            pending.insert(parent.id(), summed);
        }
        for tape in step.tapes {
            if !result.tapes.contains(&tape) {
                result.tapes.push(tape);
            }
        }
        result.by_node.insert(node.id(), g);
    }

    debug!(
        "Backward replay done: {} nodes received gradients, {} tapes touched",
        result.by_node.len(),
        result.tapes.len()
    );
    Ok(result)
}

#[cfg(test)]
#[path = "replay_test.rs"]
mod tests;
