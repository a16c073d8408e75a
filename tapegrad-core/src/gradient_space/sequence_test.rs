use super::*;
use crate::tensor::{self, scalar, Tensor};
use crate::types::DType;

fn vector(len: usize) -> Value {
    Value::Tensor(tensor::zeros(&[len], DType::F32))
}

fn eager(items: Vec<Value>) -> SequenceSpace {
    SequenceSpace::new(&EagerSequence::new(items))
}

#[test]
fn test_shape_and_size() {
    let space = eager(vec![vector(3), Value::Absent, vector(2)]);
    assert_eq!(space.len(), 3);
    assert_eq!(space.size(), 5);
    assert!(space.shape()[1].is_absent());
}

#[test]
fn test_zeros_keeps_kind_and_structure() {
    let space = SequenceSpace::new(&EagerSequence::tuple(vec![vector(2), scalar(4.0).into()]));
    let zeros = space.zeros();
    assert_eq!(zeros.kind(), SequenceKind::Tuple);
    assert_eq!(zeros.len(), 2);
    assert_eq!(zeros.items()[0].as_tensor().unwrap().data(), &[0.0, 0.0]);
    assert_eq!(zeros.items()[1].as_tensor().unwrap().item().unwrap(), 0.0);
}

#[test]
fn test_identical_eager_spaces_are_equal() {
    assert_eq!(eager(vec![vector(2), vector(3)]), eager(vec![vector(2), vector(3)]));
}

#[test]
fn test_absent_element_compares_equal() {
    let with_absent = eager(vec![vector(2), Value::Absent]);
    let full = eager(vec![vector(2), vector(3)]);
    assert_eq!(with_absent, full);
    assert_eq!(full, with_absent);
}

#[test]
fn test_resource_element_compares_equal() {
    let handle = Value::Tensor(Tensor::resource_handle());
    let with_resource = eager(vec![handle, vector(2)]);
    let with_float = eager(vec![vector(7), vector(2)]);
    assert_eq!(with_resource, with_float);
}

#[test]
fn test_different_lengths_compare_equal() {
    let short = eager(vec![vector(2)]);
    let long = eager(vec![vector(5), vector(3), vector(1)]);
    assert_eq!(short, long);
}

#[test]
fn test_mismatched_element_is_not_equal() {
    let a = eager(vec![vector(2), vector(3)]);
    let b = eager(vec![vector(2), vector(4)]);
    assert_ne!(a, b);
}

#[test]
fn test_different_kinds_never_equal() {
    let items = vec![vector(2), vector(3)];
    let list = SequenceSpace::new(&EagerSequence::new(items.clone()));
    let tuple = SequenceSpace::new(&EagerSequence::tuple(items));
    assert_ne!(list, tuple);
    assert_ne!(tuple, list);
}

#[test]
fn test_tuple_is_strict() {
    let a = SequenceSpace::new(&EagerSequence::tuple(vec![vector(2), Value::Absent]));
    let b = SequenceSpace::new(&EagerSequence::tuple(vec![vector(2), vector(3)]));
    let c = SequenceSpace::new(&EagerSequence::tuple(vec![vector(2)]));
    assert_ne!(a, b);
    assert_ne!(b, c);
}

#[test]
fn test_nested_eager_list_uses_relaxed_rule() {
    let inner_a = Value::Sequence(EagerSequence::new(vec![vector(2), Value::Absent]));
    let inner_b = Value::Sequence(EagerSequence::new(vec![vector(2), vector(9)]));
    assert_eq!(eager(vec![inner_a]), eager(vec![inner_b]));
}
