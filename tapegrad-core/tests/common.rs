use tapegrad_core::tensor::Tensor;
use tapegrad_core::variable::Variable;

// Shared by several test crates; not every helper is used by each one.
#[allow(dead_code)]
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub(crate) fn vector(data: Vec<f32>) -> Tensor {
    let len = data.len();
    Tensor::new(data, vec![len]).expect("Test tensor creation failed")
}

#[allow(dead_code)]
pub(crate) fn variable(name: &str, data: Vec<f32>) -> Variable {
    Variable::new(name, vector(data))
}
