/// Defines the possible data types for Tensor elements.
///
/// Element storage is always `f32`; the dtype tags how a value participates in
/// gradient computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    /// 32-bit floating-point type.
    #[default]
    F32,
    /// 64-bit floating-point type.
    F64,
    /// 32-bit integer type.
    I32,
    /// Boolean type (true/false values).
    Bool,
    /// Opaque handle to a resource (e.g. a variable's storage).
    ///
    /// Resource tensors carry no meaningful gradient shape.
    Resource,
}

impl DType {
    /// Returns `true` for dtypes whose gradient shape is never compared.
    ///
    /// This is the closed set of resource-like tags; today it is exactly `Resource`.
    pub fn is_resource(&self) -> bool {
        matches!(self, DType::Resource)
    }

    /// Returns `true` if values of this dtype can carry a non-trivial gradient.
    pub fn is_differentiable(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }
}
