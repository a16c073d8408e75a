// src/tape/record.rs

use std::fmt;
use std::rc::Rc;

use log::{trace, warn};

use crate::autograd::node::make_sequence;
use crate::autograd::{BackwardOp, Node, Primitive, Recipe, Traced};
use crate::error::TapeError;
use crate::gradient_space::HasGradientSpace;
use crate::sequence::EagerSequence;
use crate::tape::TapeStack;
use crate::value::Value;

/// Everything captured when an operation is recorded.
///
/// This is the explicit form of an operation's backward closure: the operation's name
/// (via its [`BackwardOp`]), its raw outputs, its raw inputs, the side outputs it wants back
/// during replay, and the backward rule itself.
pub struct RecordedOperation {
    outputs: EagerSequence,
    inputs: EagerSequence,
    side_outputs: Vec<Value>,
    backward: Rc<dyn BackwardOp>,
}

impl RecordedOperation {
    pub fn outputs(&self) -> &EagerSequence {
        &self.outputs
    }

    pub fn inputs(&self) -> &EagerSequence {
        &self.inputs
    }

    pub fn side_outputs(&self) -> &[Value] {
        &self.side_outputs
    }

    pub fn backward_op(&self) -> &Rc<dyn BackwardOp> {
        &self.backward
    }

    pub(crate) fn backward_name(&self) -> &str {
        self.backward.name()
    }

    /// Gradient with respect to the inputs, given the upstream gradient `g` of the outputs.
    ///
    /// `g` is normally an eager list with one gradient per output. Missing entries (or an
    /// absent `g`) are filled with the zeros of the corresponding output. The backward op is
    /// called with `outputs ++ upstream ++ side_outputs`; its result is flattened and
    /// re-wrapped as an eager list.
    ///
    /// # Errors
    /// Propagates errors returned by the backward op.
    pub fn vjp(&self, g: &Value) -> Result<Value, TapeError> {
        let upstream: Vec<Value> = match g {
            Value::Sequence(seq) => seq.items().to_vec(),
            Value::Absent => Vec::new(),
            single => vec![single.clone()],
        };
        let n_outputs = self.outputs.len();
        let mut args = Vec::with_capacity(2 * n_outputs + self.side_outputs.len());
        args.extend(self.outputs.iter().cloned());
        for (i, output) in self.outputs.iter().enumerate() {
            let grad = match upstream.get(i) {
                Some(grad) if !grad.is_absent() => grad.clone(),
                _ => output.gradient_space().zeros(),
            };
            args.push(grad);
        }
        args.extend(self.side_outputs.iter().cloned());

        trace!(
            "Calling backward function '{}' with {} arguments",
            self.backward.name(),
            args.len()
        );
        let result = self.backward.backward(&args)?;
        let grads = result.flatten();
        if grads.len() != self.inputs.len() {
            warn!(
                "Backward function '{}' returned {} gradients for {} inputs",
                self.backward.name(),
                grads.len(),
                self.inputs.len()
            );
        }
        Ok(Value::Sequence(EagerSequence::new(grads)))
    }
}

impl fmt::Debug for RecordedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordedOperation")
            .field("backward", &self.backward)
            .field("outputs", &self.outputs.len())
            .field("inputs", &self.inputs.len())
            .field("side_outputs", &self.side_outputs.len())
            .finish()
    }
}

impl TapeStack {
    /// Records an executed operation so that it can be replayed backward.
    ///
    /// `inputs` are packed into an eager list (see [`make_sequence`]). If that list is traced
    /// against at least one active tape, the outputs are returned as a node whose backward
    /// rule is `backward`; otherwise the raw outputs are returned untouched.
    ///
    /// Outputs, side outputs and the backward op never receive gradients.
    ///
    /// # Errors
    /// `TapeError::NodeInSequence` if input packing finds a node where a raw value is
    /// required.
    pub fn record_operation(
        &self,
        outputs: Vec<Value>,
        inputs: Vec<Traced>,
        side_outputs: Vec<Value>,
        backward: Rc<dyn BackwardOp>,
    ) -> Result<Traced, TapeError> {
        let inputs = make_sequence(inputs)?;
        let outputs = EagerSequence::new(outputs);

        let inputs_node = match inputs {
            Traced::Node(node) => node,
            Traced::Raw(_) => return Ok(Traced::Raw(Value::Sequence(outputs))),
        };
        let progenitors = self.active_subset(inputs_node.progenitors());
        if progenitors.is_empty() {
            trace!(
                "Not recording '{}': inputs are not traced by an active tape",
                backward.name()
            );
            return Ok(Traced::Raw(Value::Sequence(outputs)));
        }

        let raw_inputs = match inputs_node.value() {
            Value::Sequence(seq) => seq.clone(),
            _ => {
                return Err(TapeError::SequenceExpected {
                    operation: "record_operation".to_string(),
                })
            }
        };
        let op = RecordedOperation {
            outputs: outputs.clone(),
            inputs: raw_inputs,
            side_outputs,
            backward,
        };
        let recipe = Recipe {
            primitive: Primitive::RecordOperation(Rc::new(op)),
            parents: vec![(1, inputs_node)],
        };
        let node = Node::new(Value::Sequence(outputs), progenitors, Some(recipe));
        Ok(Traced::Node(node))
    }
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
