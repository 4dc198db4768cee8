//! Tape-based autograd engine
//!
//! Tensors carry a shared gradient cell and the operation that produced them.
//! Calling [`backward`] on a scalar loss walks the operations depth-first and
//! accumulates gradients into every tensor that requires them.

mod backward;
mod mode;
mod ops;
mod tensor;

#[cfg(test)]
mod tests;

pub use backward::BackwardOp;
pub use mode::Mode;
pub use ops::*;
pub use tensor::{GradCell, Tensor};

use ndarray::Array1;

/// Seed `tensor`'s gradient and run the tape below it
///
/// Without an explicit seed the gradient is all ones, i.e. `∂L/∂L = 1` for a
/// scalar loss.
pub fn backward(tensor: &mut Tensor, seed: Option<Array1<f32>>) {
    let seed = seed.unwrap_or_else(|| Array1::ones(tensor.len()));
    tensor.set_grad(seed);

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}
