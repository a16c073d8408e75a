use super::*;
use crate::autograd::backward_fn;
use crate::autograd::node::Traced;
use crate::sequence::EagerSequence;
use crate::tape::TapeStack;
use crate::tensor::{scalar, Tensor};
use crate::variable::Variable;

/// Records `outputs = [read(v)]` against the watched handle of `v`, and returns the single
/// output item.
fn read_variable(stack: &TapeStack, v: &Variable) -> Traced {
    let handle = stack.watched_node(&v.handle()).unwrap();
    let read = backward_fn("read_variable", |args: &[Value]| {
        Ok(Value::Sequence(EagerSequence::tuple(vec![args[1].clone()])))
    });
    stack
        .record_operation(vec![v.value().into()], vec![Traced::Node(handle)], vec![], read)
        .and_then(|outputs| outputs.item(0))
        .unwrap()
}

fn scale_by(stack: &TapeStack, x: Traced, factor: f32) -> Traced {
    let y = x.value().as_tensor().unwrap().scale(factor);
    let bwd = backward_fn("scale", move |args: &[Value]| {
        Ok(Value::Tensor(args[1].expect_tensor("scale")?.scale(factor)))
    });
    stack
        .record_operation(vec![y.into()], vec![x], vec![], bwd)
        .and_then(|outputs| outputs.item(0))
        .unwrap()
}

#[test]
fn test_gradient_reaches_watching_tape() {
    let mut stack = TapeStack::new();
    let tape = stack.push_new_tape();
    let v = Variable::new("v", scalar(3.0));
    stack.watch_variable(&v);

    let x = read_variable(&stack, &v);
    let z = scale_by(&stack, x, 2.0);
    let z = z.as_node().unwrap();
    assert_eq!(z.value(), &Value::Tensor(scalar(6.0)));

    let grads = backward(z, scalar(1.0).into()).unwrap();
    assert_eq!(grads.tapes(), &[tape.clone()]);

    let recorded = tape.gradients();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, Value::Tensor(scalar(2.0)));
    assert!(recorded[0].1.ptr_eq(&v));
}

#[test]
fn test_shared_input_gradients_are_summed() {
    let mut stack = TapeStack::new();
    let tape = stack.push_new_tape();
    let v = Variable::new("v", scalar(3.0));
    stack.watch_variable(&v);
    let handle = stack.watched_node(&v.handle()).unwrap();

    let sum = backward_fn("sum_twice", |args: &[Value]| {
        Ok(Value::Sequence(EagerSequence::tuple(vec![
            args[1].clone(),
            args[1].clone(),
        ])))
    });
    let out = stack
        .record_operation(
            vec![scalar(6.0).into()],
            vec![Traced::Node(handle.clone()), Traced::Node(handle.clone())],
            vec![],
            sum,
        )
        .and_then(|outputs| outputs.item(0))
        .unwrap();

    let grads = backward(out.as_node().unwrap(), scalar(1.5).into()).unwrap();
    assert_eq!(grads.get(&handle), Some(&Value::Tensor(scalar(3.0))));
    let recorded = tape.gradients();
    assert_eq!(recorded.len(), 1, "One append per watched node reached");
    assert_eq!(recorded[0].0, Value::Tensor(scalar(3.0)));
}

#[test]
fn test_only_reached_tape_receives_gradient() {
    let mut stack = TapeStack::new();
    let outer = stack.push_new_tape();
    let inner = stack.push_new_tape();
    let v = Variable::new("v", scalar(1.0));
    stack.watch_variable(&v);

    // `watched_node` picks the innermost tape's node.
    let x = read_variable(&stack, &v);
    let grads = backward(x.as_node().unwrap(), scalar(1.0).into()).unwrap();

    assert_eq!(grads.tapes(), &[inner.clone()]);
    assert_eq!(inner.gradients().len(), 1);
    assert!(outer.gradients().is_empty());
}

#[test]
fn test_gradient_space_mismatch() {
    let mut stack = TapeStack::new();
    stack.push_new_tape();
    let v = Variable::new("v", scalar(1.0));
    stack.watch_variable(&v);
    let x = read_variable(&stack, &v);

    let wrong = Tensor::new(vec![1.0, 2.0, 3.0], vec![3]).unwrap();
    let result = backward(x.as_node().unwrap(), wrong.into());
    assert!(matches!(
        result,
        Err(TapeError::GradientSpaceMismatch { .. })
    ));
}

#[test]
fn test_absent_output_gradient_is_accepted() {
    let mut stack = TapeStack::new();
    let tape = stack.push_new_tape();
    let v = Variable::new("v", scalar(1.0));
    stack.watch_variable(&v);
    let x = read_variable(&stack, &v);

    let grads = backward(x.as_node().unwrap(), Value::Absent).unwrap();
    assert!(!grads.is_empty());
    // The read op saw zeros for the missing upstream gradient.
    let recorded = tape.gradients();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, Value::Tensor(scalar(0.0)));
}

#[test]
fn test_dropped_tape_is_reported() {
    let mut stack = TapeStack::new();
    stack.push_new_tape();
    let v = Variable::new("v", scalar(1.0));
    stack.watch_variable(&v);
    let x = read_variable(&stack, &v);
    stack.pop_tape();

    let result = backward(x.as_node().unwrap(), scalar(1.0).into());
    assert_eq!(
        result.unwrap_err(),
        TapeError::TapeDropped {
            tensor_id: v.handle_id()
        }
    );
}
