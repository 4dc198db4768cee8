//! Reverse-direction inputs derived from a forward batch
//!
//! The reverse model reads the target sentence and predicts the source
//! sentence. Its decoder input is the source row rotated right by one (the
//! trailing `</s>` moves to the front), and its encoder lengths are the source
//! lengths re-expressed against the padded target width.

use crate::{Error, Result};
use ndarray::{Array2, ArrayView2};

/// Decoder inputs and encoder lengths for the reverse model
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseInputs {
    /// Source rows rotated right by one `[B, S]`
    pub src_inputs_rotated: Array2<u32>,
    /// `src_lengths + (T - S)` per row
    pub tgt_lengths_adjusted: Vec<usize>,
}

/// Rotate every row of `src_tokens` right by one and adjust lengths by `T - S`
///
/// Returns `MalformedBatch` when any adjusted length drops below 1, and
/// `ShapeMismatch` when `src_lengths` does not cover every row.
pub fn shift_for_reverse(
    src_tokens: ArrayView2<'_, u32>,
    src_lengths: &[usize],
    tgt_len: usize,
) -> Result<ReverseInputs> {
    let (b, s) = src_tokens.dim();
    if src_lengths.len() != b {
        return Err(Error::ShapeMismatch {
            context: "src_lengths for reverse direction",
            expected: vec![b],
            actual: vec![src_lengths.len()],
        });
    }
    if s == 0 {
        return Err(Error::MalformedBatch("source width is zero".to_string()));
    }

    let src_inputs_rotated = Array2::from_shape_fn((b, s), |(i, j)| src_tokens[[i, (j + s - 1) % s]]);

    let offset = tgt_len as i64 - s as i64;
    let tgt_lengths_adjusted = src_lengths
        .iter()
        .map(|&len| {
            let adjusted = len as i64 + offset;
            if adjusted < 1 {
                Err(Error::MalformedBatch(format!(
                    "reverse length {adjusted} (source length {len}, T={tgt_len}, S={s})"
                )))
            } else {
                Ok(adjusted as usize)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ReverseInputs { src_inputs_rotated, tgt_lengths_adjusted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rotation_moves_last_column_first() {
        let src = array![[5u32, 6, 7, 1], [8, 9, 1, 0]];
        let out = shift_for_reverse(src.view(), &[4, 3], 4).unwrap();
        assert_eq!(out.src_inputs_rotated, array![[1u32, 5, 6, 7], [0, 8, 9, 1]]);
        assert_eq!(out.tgt_lengths_adjusted, vec![4, 3]);
    }

    #[test]
    fn test_lengths_adjusted_by_width_difference() {
        let src = array![[5u32, 6, 1], [7, 1, 0]];
        // T = 5, S = 3 → +2
        let out = shift_for_reverse(src.view(), &[3, 2], 5).unwrap();
        assert_eq!(out.tgt_lengths_adjusted, vec![5, 4]);

        // T = 2, S = 3 → -1
        let out = shift_for_reverse(src.view(), &[3, 2], 2).unwrap();
        assert_eq!(out.tgt_lengths_adjusted, vec![2, 1]);
    }

    #[test]
    fn test_adjusted_length_below_one_is_malformed() {
        let src = array![[5u32, 6, 7, 1], [8, 1, 0, 0]];
        // second row: 2 + (1 - 4) = -1
        let err = shift_for_reverse(src.view(), &[4, 2], 1).unwrap_err();
        assert!(matches!(err, Error::MalformedBatch(_)));
        assert!(err.is_batch_local());
    }

    #[test]
    fn test_length_count_mismatch() {
        let src = array![[5u32, 1]];
        let err = shift_for_reverse(src.view(), &[2, 2], 2).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_single_column_is_unchanged() {
        let src = array![[1u32], [1]];
        let out = shift_for_reverse(src.view(), &[1, 1], 3).unwrap();
        assert_eq!(out.src_inputs_rotated, src);
        assert_eq!(out.tgt_lengths_adjusted, vec![3, 3]);
    }
}
