//! Tensor with gradient tracking

use super::BackwardOp;
use crate::{Error, Result};
use ndarray::Array1;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared gradient slot of a tensor
pub type GradCell = Rc<RefCell<Option<Array1<f32>>>>;

/// Flat `f32` tensor that records how it was produced.
///
/// Clones share the gradient cell and the backward operation, so a clone held
/// by a backward node accumulates into the same gradient the owner reads.
/// Data is copied on clone; parameters are only mutated by the optimizer.
#[derive(Clone)]
pub struct Tensor {
    data: Array1<f32>,
    grad: GradCell,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a tensor from an array
    pub fn new(data: Array1<f32>, requires_grad: bool) -> Self {
        Self { data, grad: Rc::new(RefCell::new(None)), backward_op: None, requires_grad }
    }

    /// Create a tensor from a vector
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data), requires_grad)
    }

    /// Create a zero-filled tensor
    pub fn zeros(len: usize, requires_grad: bool) -> Self {
        Self::new(Array1::zeros(len), requires_grad)
    }

    /// Create a scalar that never receives gradient
    pub fn constant(value: f32) -> Self {
        Self::from_vec(vec![value], false)
    }

    /// Tensor data
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Data as one contiguous slice
    ///
    /// Fails for strided views such as every other element of a larger array.
    pub fn as_slice(&self) -> Result<&[f32]> {
        self.data.as_slice().ok_or_else(|| Error::ShapeMismatch {
            context: "contiguous tensor data",
            expected: vec![1],
            actual: self.data.strides().iter().map(|s| s.unsigned_abs()).collect(),
        })
    }

    /// Mutable tensor data
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// First element, for scalar tensors such as losses
    pub fn item(&self) -> f32 {
        self.data.first().copied().unwrap_or(0.0)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether gradients are tracked for this tensor
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Copy of the accumulated gradient
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Replace the gradient
    pub fn set_grad(&self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Add to the gradient, initialising it on first use
    pub fn accumulate_grad(&self, grad: Array1<f32>) {
        let mut slot = self.grad.borrow_mut();
        match slot.as_mut() {
            Some(existing) => *existing += &grad,
            None => *slot = Some(grad),
        }
    }

    /// Drop the accumulated gradient
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// Shared gradient cell, for backward operations
    pub fn grad_cell(&self) -> GradCell {
        Rc::clone(&self.grad)
    }

    /// Operation that produced this tensor
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    /// Attach the operation that produced this tensor
    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    /// Copy of the data cut from the tape
    pub fn detach(&self) -> Self {
        Self::new(self.data.clone(), false)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("len", &self.data.len())
            .field("requires_grad", &self.requires_grad)
            .field("has_grad", &self.grad.borrow().is_some())
            .field("has_backward_op", &self.backward_op.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, s};

    #[test]
    fn test_clone_shares_gradient() {
        let t = Tensor::from_vec(vec![1.0, 2.0], true);
        let c = t.clone();
        c.accumulate_grad(arr1(&[0.5, 0.5]));
        assert_eq!(t.grad().unwrap(), arr1(&[0.5, 0.5]));
    }

    #[test]
    fn test_zero_grad_clears() {
        let t = Tensor::zeros(3, true);
        t.set_grad(arr1(&[1.0, 1.0, 1.0]));
        t.zero_grad();
        assert!(t.grad().is_none());
    }

    #[test]
    fn test_detach_drops_tape() {
        let t = Tensor::from_vec(vec![3.0], true);
        let d = t.detach();
        assert!(!d.requires_grad());
        assert!(d.backward_op().is_none());
        assert_eq!(d.item(), 3.0);
    }

    #[test]
    fn test_as_slice_rejects_strided_data() {
        let strided = Array1::from(vec![1.0, 2.0, 3.0, 4.0]).slice_move(s![..;2]);
        let t = Tensor::new(strided, false);
        assert!(matches!(t.as_slice(), Err(Error::ShapeMismatch { .. })));

        let dense = Tensor::from_vec(vec![1.0, 2.0], false);
        assert_eq!(dense.as_slice().unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn test_constant_is_scalar() {
        let c = Tensor::constant(2.5);
        assert_eq!(c.len(), 1);
        assert!(!c.requires_grad());
        assert_eq!(c.item(), 2.5);
    }
}
