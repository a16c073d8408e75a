//! # tapegrad-core
//!
//! Eager reverse-mode autodiff tape.
//!
//! The op-dispatch layer owns a [`TapeStack`]. Before running a kernel it asks
//! [`should_record`] whether any input is traced; afterwards it calls
//! [`TapeStack::record_operation`] with the outputs, the inputs, any side outputs and a
//! [`BackwardOp`]. Variables are made traceable with [`TapeStack::watch_variable`]. Replaying
//! the recorded nodes backward ([`autograd::replay::backward`]) delivers gradients to the
//! tapes that watched the variables.

pub mod autograd;
pub mod error;
pub mod gradient_space;
pub mod sequence;
pub mod tape;
pub mod tensor;
pub mod tensor_data;
pub mod types;
pub mod value;
pub mod variable;

pub use autograd::{backward_fn, is_node, BackwardOp, Node, Traced};
pub use error::TapeError;
pub use gradient_space::{GradientSpace, HasGradientSpace};
pub use sequence::{EagerSequence, SequenceKind};
pub use tape::{should_record, Tape, TapeId, TapeStack};
pub use tensor::Tensor;
pub use tensor_data::TensorId;
pub use types::DType;
pub use value::Value;
pub use variable::Variable;
