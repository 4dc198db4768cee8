//! Tape operations and the dense kernels behind the model passes

mod basic;
mod matmul;

pub use basic::{add, affine, scale};
pub use matmul::{matmul, matmul_at, matmul_at_acc, matmul_bt};
