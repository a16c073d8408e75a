// src/autograd/node.rs

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;

use crate::error::TapeError;
use crate::gradient_space::{GradientSpace, HasGradientSpace, SequenceSpace};
use crate::sequence::{EagerSequence, SequenceKind};
use crate::tape::record::RecordedOperation;
use crate::tape::{Tape, TapeId, WeakTape};
use crate::tensor::Tensor;
use crate::value::Value;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`Node`]. Unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// The primitive that produced a node, with whatever it captured at recording time.
///
/// Argument numbering follows the primitive's forward signature:
/// * `WatchWithTape(tape, tensor)`
/// * `MakeSequence(item_0, .., item_n)`
/// * `SequenceItem(sequence)`
/// * `RecordOperation(outputs, inputs, side_outputs, backward_function)`
#[derive(Debug)]
pub enum Primitive {
    WatchWithTape { tape: WeakTape, tensor: Tensor },
    MakeSequence { kind: SequenceKind },
    SequenceItem { index: usize, space: SequenceSpace },
    RecordOperation(Rc<RecordedOperation>),
}

impl Primitive {
    pub fn name(&self) -> &str {
        match self {
            Primitive::WatchWithTape { .. } => "watch_with_tape",
            Primitive::MakeSequence { .. } => "make_sequence",
            Primitive::SequenceItem { .. } => "sequence_item",
            Primitive::RecordOperation(op) => op.backward_name(),
        }
    }

    /// Argument whose gradient is a tape rather than a parent node.
    fn tape_argnum(&self) -> Option<usize> {
        match self {
            Primitive::WatchWithTape { .. } => Some(0),
            _ => None,
        }
    }

    /// Vector-Jacobian product: gradient of argument `argnum` given the gradient `g` of the
    /// primitive's result `ans`.
    pub fn vjp(&self, argnum: usize, g: &Value, _ans: &Value) -> Result<Value, TapeError> {
        match self {
            Primitive::WatchWithTape { tape, tensor } => match argnum {
                0 => {
                    let tape = tape.upgrade().ok_or(TapeError::TapeDropped {
                        tensor_id: tensor.id(),
                    })?;
                    tape.append_gradient(tensor.id(), g.clone())?;
                    Ok(Value::Tape(tape))
                }
                // The tensor's own gradient does not depend on the watch.
                _ => Ok(g.clone()),
            },
            Primitive::MakeSequence { .. } => match g {
                Value::Sequence(seq) => Ok(seq.get(argnum).cloned().unwrap_or(Value::Absent)),
                Value::Absent => Ok(Value::Absent),
                _ => Err(TapeError::SequenceExpected {
                    operation: "make_sequence backward".to_string(),
                }),
            },
            Primitive::SequenceItem { index, space } => {
                let mut grads = space.zeros();
                grads.replace(*index, g.clone())?;
                Ok(Value::Sequence(grads))
            }
            Primitive::RecordOperation(op) => match argnum {
                1 => op.vjp(g),
                _ => Ok(Value::Absent),
            },
        }
    }
}

/// How a node was produced: a primitive and the traced arguments it was applied to.
#[derive(Debug)]
pub struct Recipe {
    pub primitive: Primitive,
    /// `(argnum, node)` for every traced argument.
    pub parents: Vec<(usize, Node)>,
}

struct NodeInner {
    id: NodeId,
    value: Value,
    progenitors: Vec<TapeId>,
    recipe: Option<Recipe>,
}

/// A raw value tied to the tape(s) tracking it.
///
/// Nodes are cheap handles; clones refer to the same node. Equality and hashing use the
/// [`NodeId`], never the wrapped value.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

/// Gradients produced by one backward step through a node.
#[derive(Debug, Default)]
pub struct BackwardStep {
    /// Gradient for each traced parent, in recipe order.
    pub parents: Vec<(Node, Value)>,
    /// Tapes that received a variable gradient during this step.
    pub tapes: Vec<Tape>,
}

impl Node {
    pub(crate) fn new(value: Value, progenitors: Vec<TapeId>, recipe: Option<Recipe>) -> Self {
        let node = Node(Rc::new(NodeInner {
            id: NodeId::next(),
            value,
            progenitors,
            recipe,
        }));
        trace!(
            "Created node {:?} ({}) for progenitors {:?}",
            node.id(),
            node.primitive_name(),
            node.progenitors()
        );
        node
    }

    /// Wraps `value` as a leaf node tracked by `tape`.
    pub fn wrap(tape: &Tape, value: Value) -> Self {
        Node::new(value, vec![tape.id()], None)
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn value(&self) -> &Value {
        &self.0.value
    }

    pub fn progenitors(&self) -> &[TapeId] {
        &self.0.progenitors
    }

    pub fn recipe(&self) -> Option<&Recipe> {
        self.0.recipe.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.recipe.is_none()
    }

    pub fn primitive_name(&self) -> &str {
        self.recipe().map_or("leaf", |r| r.primitive.name())
    }

    /// Parent nodes, in recipe order.
    pub fn parents(&self) -> impl Iterator<Item = &Node> {
        self.recipe()
            .into_iter()
            .flat_map(|recipe| recipe.parents.iter().map(|(_, node)| node))
    }

    /// Runs this node's backward rule for upstream gradient `g`.
    ///
    /// Leaf nodes have no rule and return an empty step. For watched variables this appends
    /// `(g, variable)` to the owning tape.
    pub fn backward(&self, g: &Value) -> Result<BackwardStep, TapeError> {
        let mut step = BackwardStep::default();
        let recipe = match self.recipe() {
            Some(recipe) => recipe,
            None => return Ok(step),
        };
        trace!("Backward through node {:?} ({})", self.id(), recipe.primitive.name());

        if let Some(argnum) = recipe.primitive.tape_argnum() {
            match recipe.primitive.vjp(argnum, g, self.value())? {
                Value::Tape(tape) => step.tapes.push(tape),
                other => {
                    return Err(TapeError::InternalError(format!(
                        "tape argument of {} received {:?}",
                        recipe.primitive.name(),
                        other.gradient_space()
                    )))
                }
            }
        }
        for (argnum, parent) in &recipe.parents {
            let grad = recipe.primitive.vjp(*argnum, g, self.value())?;
            step.parents.push((parent.clone(), grad));
        }
        Ok(step)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.0.id)
            .field("primitive", &self.primitive_name())
            .field("progenitors", &self.0.progenitors)
            .field("space", &self.0.value.gradient_space())
            .finish()
    }
}

/// A value as seen by the op-dispatch layer: either raw or traced.
#[derive(Debug, Clone)]
pub enum Traced {
    Raw(Value),
    Node(Node),
}

impl Traced {
    pub fn is_node(&self) -> bool {
        matches!(self, Traced::Node(_))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Traced::Node(node) => Some(node),
            Traced::Raw(_) => None,
        }
    }

    /// The underlying raw value.
    pub fn value(&self) -> &Value {
        match self {
            Traced::Raw(value) => value,
            Traced::Node(node) => node.value(),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Traced::Raw(value) => value,
            Traced::Node(node) => node.value().clone(),
        }
    }

    /// Element `index` of a sequence.
    ///
    /// For nodes the element is itself a node: its backward places the gradient at `index`
    /// and the element zeros everywhere else.
    ///
    /// # Errors
    /// `TapeError::SequenceExpected` if the value is not a sequence, or
    /// `TapeError::IndexOutOfBounds`.
    pub fn item(&self, index: usize) -> Result<Traced, TapeError> {
        let sequence = self
            .value()
            .as_sequence()
            .ok_or_else(|| TapeError::SequenceExpected {
                operation: "item".to_string(),
            })?;
        let element = sequence.try_get(index)?.clone();
        match self {
            Traced::Raw(_) => Ok(Traced::Raw(element)),
            Traced::Node(node) => {
                let recipe = Recipe {
                    primitive: Primitive::SequenceItem {
                        index,
                        space: SequenceSpace::new(sequence),
                    },
                    parents: vec![(0, node.clone())],
                };
                let item = Node::new(element, node.progenitors().to_vec(), Some(recipe));
                Ok(Traced::Node(item))
            }
        }
    }
}

impl From<Value> for Traced {
    fn from(value: Value) -> Self {
        Traced::Raw(value)
    }
}

impl From<Tensor> for Traced {
    fn from(tensor: Tensor) -> Self {
        Traced::Raw(Value::Tensor(tensor))
    }
}

impl From<Node> for Traced {
    fn from(node: Node) -> Self {
        Traced::Node(node)
    }
}

/// Returns `true` if `x` is currently wrapped as a node.
pub fn is_node(x: &Traced) -> bool {
    x.is_node()
}

/// Packs traced values into an eager list.
///
/// The list itself holds only raw values. When any item is a node the result is a node whose
/// parents are those items, so gradients of the list flow back to each of them.
pub fn make_sequence(items: Vec<Traced>) -> Result<Traced, TapeError> {
    if !items.iter().any(Traced::is_node) {
        return Ok(Traced::Raw(Value::Sequence(EagerSequence::from_traced(items)?)));
    }

    let mut progenitors: Vec<TapeId> = Vec::new();
    let mut parents = Vec::new();
    let mut values = Vec::with_capacity(items.len());
    for (argnum, item) in items.into_iter().enumerate() {
        match item {
            Traced::Raw(value) => values.push(value),
            Traced::Node(node) => {
                for id in node.progenitors() {
                    if !progenitors.contains(id) {
                        progenitors.push(*id);
                    }
                }
                values.push(node.value().clone());
                parents.push((argnum, node));
            }
        }
    }
    let recipe = Recipe {
        primitive: Primitive::MakeSequence {
            kind: SequenceKind::EagerList,
        },
        parents,
    };
    Ok(Traced::Node(Node::new(
        Value::Sequence(EagerSequence::new(values)),
        progenitors,
        Some(recipe),
    )))
}

/// Gradient space of a traced value's raw value.
impl HasGradientSpace for Traced {
    fn gradient_space(&self) -> GradientSpace {
        self.value().gradient_space()
    }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod tests;
