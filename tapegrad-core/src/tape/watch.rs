// src/tape/watch.rs

use log::trace;

use crate::autograd::{Node, Primitive, Recipe};
use crate::tape::Tape;
use crate::value::Value;
use crate::variable::Variable;

/// Wraps `variable`'s handle as a node traced by `tape` and registers it on the tape.
///
/// The node's backward rule for the tape argument appends `(g, variable)` to `tape`'s
/// gradients and yields the tape itself as the gradient; for the tensor argument it passes
/// `g` through unchanged.
///
/// Watching the same handle again replaces the previous node and variable entry.
pub fn watch_with_tape(tape: &Tape, variable: &Variable) -> Node {
    let tensor = variable.handle();
    let recipe = Recipe {
        primitive: Primitive::WatchWithTape {
            tape: tape.downgrade(),
            tensor: tensor.clone(),
        },
        // The handle is a raw tensor, so the tape is the only thing traced.
        parents: Vec::new(),
    };
    let node = Node::new(Value::Tensor(tensor.clone()), vec![tape.id()], Some(recipe));
    trace!(
        "Tape {:?} watching variable '{}' (tensor {})",
        tape.id(),
        variable.name(),
        tensor.id()
    );
    tape.insert_watched(tensor.id(), node.clone(), variable.clone());
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{scalar, Tensor};

    fn variable(name: &str) -> Variable {
        Variable::new(name, Tensor::new(vec![1.0, 2.0], vec![2]).unwrap())
    }

    #[test]
    fn test_watch_registers_tensor_and_variable() {
        let tape = Tape::new();
        let v = variable("w");
        let node = watch_with_tape(&tape, &v);
        let id = v.handle_id();
        assert!(tape.contains_tensor(id));
        assert_eq!(tape.watched_node(id), Some(node.clone()));
        assert_eq!(tape.variable(id), Some(v));
        assert_eq!(node.progenitors(), &[tape.id()]);
        assert_eq!(node.primitive_name(), "watch_with_tape");
    }

    #[test]
    fn test_rewatch_last_wins() {
        let tape = Tape::new();
        let v = variable("w");
        let first = watch_with_tape(&tape, &v);
        let second = watch_with_tape(&tape, &v);
        assert_ne!(first, second);
        assert_eq!(tape.watched_node(v.handle_id()), Some(second));
        assert_eq!(tape.watched_tensor_ids().len(), 1);
    }

    #[test]
    fn test_backward_appends_one_pair() {
        let tape = Tape::new();
        let other = Tape::new();
        let v = variable("w");
        let node = watch_with_tape(&tape, &v);
        watch_with_tape(&other, &v);

        let g = Value::Tensor(Tensor::new(vec![0.5, 0.25], vec![2]).unwrap());
        let step = node.backward(&g).unwrap();

        assert_eq!(step.tapes, vec![tape.clone()]);
        assert!(step.parents.is_empty());
        let gradients = tape.gradients();
        assert_eq!(gradients.len(), 1);
        assert_eq!(gradients[0].0, g);
        assert_eq!(gradients[0].1, v);
        assert!(other.gradients().is_empty(), "Other tapes must be untouched");
    }

    #[test]
    fn test_tensor_argument_is_identity() {
        let tape = Tape::new();
        let v = variable("w");
        let node = watch_with_tape(&tape, &v);
        let g = Value::Tensor(scalar(3.0));
        let primitive = &node.recipe().unwrap().primitive;
        assert_eq!(primitive.vjp(1, &g, node.value()).unwrap(), g);
    }

    #[test]
    fn test_backward_after_tape_dropped() {
        let tape = Tape::new();
        let v = variable("w");
        let node = watch_with_tape(&tape, &v);
        drop(tape);
        let result = node.backward(&Value::Tensor(scalar(1.0)));
        assert!(matches!(
            result,
            Err(crate::error::TapeError::TapeDropped { .. })
        ));
    }
}
