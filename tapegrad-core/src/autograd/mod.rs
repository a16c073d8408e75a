//! # Autograd
//!
//! Nodes, primitives and backward replay.
//!
//! - [`node`]: [`Node`] (a value tied to its tapes), [`Traced`] (raw or node) and the closed
//!   set of [`Primitive`]s with their vector-Jacobian products.
//! - [`backward_op`]: the [`BackwardOp`] trait implemented by backward rules supplied by the
//!   op-dispatch layer.
//! - [`replay`]: a minimal backward driver over recorded nodes.

pub mod backward_op;
pub(crate) mod graph;
pub mod node;
pub mod replay;

pub use backward_op::{backward_fn, BackwardOp, FnBackward};
pub use node::{is_node, make_sequence, BackwardStep, Node, NodeId, Primitive, Recipe, Traced};
pub use replay::Gradients;
