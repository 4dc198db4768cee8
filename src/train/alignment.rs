//! Alignment-consistency regularizer
//!
//! Each direction's attention context is compared against the other
//! direction's encoder states. For a pair `(A [B,n,H], O [B,m,H])` with
//! `M = A · Oᵀ`:
//!
//! ```text
//! d = (L1(diag M) / |diag M|) / ((L1(M) − L1(diag M)) / (|M| − |diag M|))
//! ```
//!
//! i.e. the mean absolute diagonal score over the mean absolute off-diagonal
//! score. Everything is computed on host copies in `f64`; the result enters the
//! loss as a constant.

use crate::{Error, Result};
use ndarray::{Array2, Array3, ArrayView3, Axis};
use tracing::warn;

/// Penalties for both directions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentPenalty {
    /// `d`: forward context vs reverse encoder states
    pub forward: f64,
    /// `d_rev`: reverse context vs forward encoder states
    pub reverse: f64,
}

impl AlignmentPenalty {
    /// `d + d_rev`
    pub fn total(&self) -> f64 {
        self.forward + self.reverse
    }

    /// Whether both terms are finite
    pub fn is_finite(&self) -> bool {
        self.forward.is_finite() && self.reverse.is_finite()
    }
}

/// Compute `d` and `d_rev`
///
/// * `att` `[B, T, S]`, `src_out` `[S, B, H]` from the forward model
/// * `att_rev` `[B, S, T]`, `src_out_rev` `[T, B, H]` from the reverse model
///
/// Non-finite penalties are logged and returned as is.
pub fn alignment_penalty(
    att: ArrayView3<'_, f32>,
    src_out: ArrayView3<'_, f32>,
    att_rev: ArrayView3<'_, f32>,
    src_out_rev: ArrayView3<'_, f32>,
) -> Result<AlignmentPenalty> {
    let (b, t, s) = att.dim();
    let (s_enc, b_enc, h) = src_out.dim();
    check_shape("reverse attention", [b, s, t], att_rev.dim())?;
    check_shape("forward encoder output", [s, b, h], (s_enc, b_enc, h))?;
    check_shape("reverse encoder output", [t, b, h], src_out_rev.dim())?;

    let enc = batch_major(src_out);
    let enc_rev = batch_major(src_out_rev);
    let acontext = attend(&att.mapv(f64::from), &enc);
    let acontext_rev = attend(&att_rev.mapv(f64::from), &enc_rev);

    let penalty = AlignmentPenalty {
        forward: diagonal_consistency(&acontext, &enc_rev),
        reverse: diagonal_consistency(&acontext_rev, &enc),
    };
    if !penalty.is_finite() {
        warn!(
            d = penalty.forward,
            d_rev = penalty.reverse,
            "alignment penalty is not finite"
        );
    }
    Ok(penalty)
}

/// Ratio of mean |diagonal| to mean |off-diagonal| of `a · otherᵀ`, pooled
/// over the batch
///
/// `a` is `[B, n, H]`, `other` is `[B, m, H]`. The diagonal runs up to
/// `min(n, m)` in every batch element, and the diagonal mean divides by the
/// pooled entry count `Σ_b min(n, m)`, not by `B`. No guard against a zero
/// denominator.
pub fn diagonal_consistency(a: &Array3<f64>, other: &Array3<f64>) -> f64 {
    let mut total_l1 = 0.0;
    let mut diag_l1 = 0.0;
    let mut total_count = 0usize;
    let mut diag_count = 0usize;

    for (lhs, rhs) in a.axis_iter(Axis(0)).zip(other.axis_iter(Axis(0))) {
        let m: Array2<f64> = lhs.dot(&rhs.t());
        let (n, cols) = m.dim();
        let k = n.min(cols);
        total_l1 += m.iter().map(|x| x.abs()).sum::<f64>();
        diag_l1 += (0..k).map(|i| m[[i, i]].abs()).sum::<f64>();
        total_count += n * cols;
        diag_count += k;
    }

    let numerator = diag_l1 / diag_count as f64;
    let denominator = (total_l1 - diag_l1) / (total_count - diag_count) as f64;
    numerator / denominator
}

/// `[len, B, H]` → `[B, len, H]` in f64
fn batch_major(x: ArrayView3<'_, f32>) -> Array3<f64> {
    x.permuted_axes([1, 0, 2]).mapv(f64::from)
}

/// Per batch element `att_b · enc_b`
fn attend(att: &Array3<f64>, enc: &Array3<f64>) -> Array3<f64> {
    let (b, rows, _) = att.dim();
    let h = enc.dim().2;
    let mut out = Array3::zeros((b, rows, h));
    for (i, mut slot) in out.axis_iter_mut(Axis(0)).enumerate() {
        slot.assign(&att.index_axis(Axis(0), i).dot(&enc.index_axis(Axis(0), i)));
    }
    out
}

fn check_shape(
    context: &'static str,
    expected: [usize; 3],
    actual: (usize, usize, usize),
) -> Result<()> {
    if expected == [actual.0, actual.1, actual.2] {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            context,
            expected: expected.to_vec(),
            actual: vec![actual.0, actual.1, actual.2],
        })
    }
}
