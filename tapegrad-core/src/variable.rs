// src/variable.rs

use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::TapeError;
use crate::tensor::Tensor;
use crate::tensor_data::TensorId;

#[derive(Debug)]
struct VariableData {
    name: String,
    handle: Tensor,
    value: Tensor,
}

/// A mutable, resource-backed variable.
///
/// The variable is addressed through its `handle`, a resource-typed tensor whose identity
/// never changes across assignments. Watching a variable means watching that handle.
/// Clones share the same storage; equality is identity.
#[derive(Clone)]
pub struct Variable {
    inner: Arc<RwLock<VariableData>>,
}

impl Variable {
    /// Creates a new variable holding `initial_value`.
    pub fn new(name: impl Into<String>, initial_value: Tensor) -> Self {
        Variable {
            inner: Arc::new(RwLock::new(VariableData {
                name: name.into(),
                handle: Tensor::resource_handle(),
                value: initial_value,
            })),
        }
    }

    /// Returns the variable's resource handle.
    pub fn handle(&self) -> Tensor {
        self.read().handle.clone()
    }

    /// Shorthand for `self.handle().id()`.
    pub fn handle_id(&self) -> TensorId {
        self.read().handle.id()
    }

    pub fn name(&self) -> String {
        self.read().name.clone()
    }

    /// Returns the current value.
    pub fn value(&self) -> Tensor {
        self.read().value.clone()
    }

    /// Replaces the current value.
    ///
    /// # Errors
    /// Returns `TapeError::ShapeMismatch` or `TapeError::DTypeMismatch` if `new_value` does not
    /// match the current value.
    pub fn assign(&self, new_value: Tensor) -> Result<(), TapeError> {
        let mut guard = self.write();
        if guard.value.shape() != new_value.shape() {
            return Err(TapeError::ShapeMismatch {
                expected: guard.value.shape(),
                actual: new_value.shape(),
                operation: format!("assign to variable '{}'", guard.name),
            });
        }
        if guard.value.dtype() != new_value.dtype() {
            return Err(TapeError::DTypeMismatch {
                expected: guard.value.dtype(),
                actual: new_value.dtype(),
                operation: format!("assign to variable '{}'", guard.name),
            });
        }
        guard.value = new_value;
        Ok(())
    }

    /// Returns `true` if both handles refer to the same variable.
    pub fn ptr_eq(&self, other: &Variable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, VariableData> {
        // A poisoned lock still holds a consistent VariableData: assign() writes in one step.
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, VariableData> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Variable {}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.read();
        f.debug_struct("Variable")
            .field("name", &guard.name)
            .field("handle_id", &guard.handle.id())
            .field("shape", &guard.value.shape())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DType;

    #[test]
    fn test_handle_is_resource_and_stable() {
        let v = Variable::new("w", Tensor::new(vec![1.0, 2.0], vec![2]).unwrap());
        let handle_id = v.handle_id();
        assert_eq!(v.handle().dtype(), DType::Resource);
        v.assign(Tensor::new(vec![3.0, 4.0], vec![2]).unwrap()).unwrap();
        assert_eq!(v.handle_id(), handle_id, "Assignment must not change the handle");
        assert_eq!(v.value().data(), &[3.0, 4.0]);
    }

    #[test]
    fn test_assign_shape_mismatch() {
        let v = Variable::new("w", Tensor::new(vec![1.0, 2.0], vec![2]).unwrap());
        let result = v.assign(Tensor::new(vec![1.0], vec![1]).unwrap());
        assert!(matches!(result, Err(TapeError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_identity_equality() {
        let value = Tensor::new(vec![1.0], vec![1]).unwrap();
        let v1 = Variable::new("a", value.clone());
        let v2 = Variable::new("a", value);
        assert_eq!(v1, v1.clone());
        assert_ne!(v1, v2);
    }
}
