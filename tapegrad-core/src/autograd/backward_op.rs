use std::fmt::{self, Debug};
use std::rc::Rc;

use crate::error::TapeError;
use crate::value::Value;

/// The backward rule of a recorded operation.
///
/// The op-dispatch layer supplies one `BackwardOp` per recorded operation. During backward
/// replay it is called with a single positional argument list:
///
/// ```text
/// [ output_0, .., output_n, upstream_grad_0, .., upstream_grad_n, side_output_0, .. ]
/// ```
///
/// and must return the gradients with respect to the operation's inputs, in input order. The
/// result may be a nested structure (e.g. a tuple of tuples); it is flattened before being
/// handed back to the tape, so only the order of the leaves matters. Inputs without a
/// gradient should get [`Value::Absent`].
///
/// The trait requires `Debug` so recorded graphs can be inspected.
pub trait BackwardOp: Debug {
    /// Name of the operation, used in logs and errors.
    fn name(&self) -> &str;

    /// Computes the input gradients from `outputs ++ upstream ++ side_outputs`.
    fn backward(&self, args: &[Value]) -> Result<Value, TapeError>;
}

/// A `BackwardOp` made from a named closure.
pub struct FnBackward<F> {
    name: String,
    func: F,
}

impl<F> FnBackward<F>
where
    F: Fn(&[Value]) -> Result<Value, TapeError>,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        FnBackward {
            name: name.into(),
            func,
        }
    }
}

impl<F> BackwardOp for FnBackward<F>
where
    F: Fn(&[Value]) -> Result<Value, TapeError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn backward(&self, args: &[Value]) -> Result<Value, TapeError> {
        (self.func)(args)
    }
}

impl<F> Debug for FnBackward<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBackward").field("name", &self.name).finish()
    }
}

/// Convenience constructor returning a shareable `Rc<dyn BackwardOp>`.
pub fn backward_fn<F>(name: impl Into<String>, func: F) -> Rc<dyn BackwardOp>
where
    F: Fn(&[Value]) -> Result<Value, TapeError> + 'static,
{
    Rc::new(FnBackward::new(name, func))
}
