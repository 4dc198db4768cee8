//! Unit tests for autograd operations and matrix kernels

use crate::autograd::{add, affine, backward, matmul, matmul_at, matmul_at_acc, matmul_bt, scale, Tensor};
use approx::assert_abs_diff_eq;

#[test]
fn test_tensor_grad_accumulation() {
    let t = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);

    t.accumulate_grad(ndarray::arr1(&[1.0, 1.0, 1.0]));
    t.accumulate_grad(ndarray::arr1(&[0.5, 0.5, 0.5]));

    let grad = t.grad().expect("gradient should be available");
    assert_eq!(grad[0], 1.5);
}

#[test]
fn test_add_backward_reaches_both_inputs() {
    let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
    let b = Tensor::from_vec(vec![4.0, 5.0, 6.0], true);
    let mut c = add(&a, &b);
    assert_abs_diff_eq!(c.data()[2], 9.0);

    backward(&mut c, Some(ndarray::arr1(&[1.0, 2.0, 3.0])));

    assert_abs_diff_eq!(a.grad().expect("gradient should be available")[1], 2.0);
    assert_abs_diff_eq!(b.grad().expect("gradient should be available")[2], 3.0);
}

#[test]
fn test_constant_receives_no_gradient() {
    let loss = Tensor::from_vec(vec![2.0], true);
    let penalty = Tensor::constant(0.5);
    let mut total = add(&loss, &penalty);
    assert_abs_diff_eq!(total.item(), 2.5);

    backward(&mut total, None);

    assert_abs_diff_eq!(loss.grad().expect("gradient should be available")[0], 1.0);
    assert!(penalty.grad().is_none());
}

#[test]
fn test_affine_is_how_a_loss_term_is_built() {
    // CE / B + d with CE = 6, B = 2, d = 0.25
    let ce = Tensor::from_vec(vec![6.0], true);
    let mut term = affine(&ce, 0.5, 0.25);
    assert_abs_diff_eq!(term.item(), 3.25);

    backward(&mut term, None);
    assert_abs_diff_eq!(ce.grad().expect("gradient should be available")[0], 0.5);
}

#[test]
fn test_scale_without_grad_builds_no_tape() {
    let a = Tensor::from_vec(vec![1.0, 2.0], false);
    let s = scale(&a, 3.0);
    assert!(s.backward_op().is_none());
    assert_abs_diff_eq!(s.data()[1], 6.0);
}

#[test]
fn test_matmul_small() {
    // [1 2; 3 4] @ [5 6; 7 8] = [19 22; 43 50]
    let c = matmul(&[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0, 7.0, 8.0], 2, 2, 2);
    assert_eq!(c, vec![19.0, 22.0, 43.0, 50.0]);
}

#[test]
fn test_transposed_products_agree_with_plain_product() {
    // A 2×3, B 3×2
    let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let b = [7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
    let expected = matmul(&a, &b, 2, 3, 2);

    // Bᵀ stored 2×3
    let b_t = [7.0, 9.0, 11.0, 8.0, 10.0, 12.0];
    assert_eq!(matmul_bt(&a, &b_t, 2, 3, 2), expected);

    // Aᵀ stored 3×2
    let a_t = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
    assert_eq!(matmul_at(&a_t, &b, 2, 3, 2), expected);
}

#[test]
fn test_matmul_at_acc_adds_into_output() {
    let mut out = vec![1.0; 4];
    // Aᵀ·B with A = B = I₂
    matmul_at_acc(&mut out, &[1.0, 0.0, 0.0, 1.0], &[1.0, 0.0, 0.0, 1.0], 2, 2, 2);
    assert_eq!(out, vec![2.0, 1.0, 1.0, 2.0]);
}
