//! Elementwise ops used to combine losses: `add` and the affine map
//! `a · factor + offset`

use crate::autograd::{BackwardOp, GradCell, Tensor};
use std::rc::Rc;

/// Elementwise sum of two tensors of equal length
pub fn add(a: &Tensor, b: &Tensor) -> Tensor {
    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(a.data() + b.data(), requires_grad);

    if requires_grad {
        let op = Rc::new(SumBackward {
            inputs: [a.clone(), b.clone()],
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(op);
    }
    result
}

/// `a · factor + offset`
///
/// The offset is a plain number and receives no gradient; this is how
/// detached terms such as the alignment penalties enter a loss.
pub fn affine(a: &Tensor, factor: f32, offset: f32) -> Tensor {
    let data = a.data().mapv(|x| x * factor + offset);
    let mut result = Tensor::new(data, a.requires_grad());

    if a.requires_grad() {
        let op = Rc::new(AffineBackward {
            input: a.clone(),
            factor,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(op);
    }
    result
}

/// `a · factor`
pub fn scale(a: &Tensor, factor: f32) -> Tensor {
    affine(a, factor, 0.0)
}

struct SumBackward {
    inputs: [Tensor; 2],
    result_grad: GradCell,
}

impl BackwardOp for SumBackward {
    fn backward(&self) {
        let Some(grad) = self.result_grad.borrow().clone() else {
            return;
        };
        for input in &self.inputs {
            if input.requires_grad() {
                input.accumulate_grad(grad.clone());
            }
            if let Some(op) = input.backward_op() {
                op.backward();
            }
        }
    }
}

struct AffineBackward {
    input: Tensor,
    factor: f32,
    result_grad: GradCell,
}

impl BackwardOp for AffineBackward {
    fn backward(&self) {
        let Some(grad) = self.result_grad.borrow().clone() else {
            return;
        };
        self.input.accumulate_grad(grad * self.factor);
        if let Some(op) = self.input.backward_op() {
            op.backward();
        }
    }
}
