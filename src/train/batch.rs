//! Batch data structure

use crate::{Error, Result};
use ndarray::Array2;

/// A collated batch of parallel sentences.
///
/// Token matrices are right-padded, row-major `[batch, len]`. `tgt_inputs` is
/// `tgt_tokens` with the end-of-sentence marker moved to the front (teacher
/// forcing input of the decoder).
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Dataset indices of the rows
    pub ids: Vec<usize>,
    /// Source token ids `[B, S]`
    pub src_tokens: Array2<u32>,
    /// Valid length of each source row
    pub src_lengths: Vec<usize>,
    /// Decoder input ids `[B, T]`
    pub tgt_inputs: Array2<u32>,
    /// Decoder target ids `[B, T]`
    pub tgt_tokens: Array2<u32>,
    /// Non-padding target tokens
    pub num_tokens: usize,
}

impl Batch {
    /// Batch with no rows, as produced for an empty index list
    pub fn empty() -> Self {
        Self {
            ids: Vec::new(),
            src_tokens: Array2::zeros((0, 0)),
            src_lengths: Vec::new(),
            tgt_inputs: Array2::zeros((0, 0)),
            tgt_tokens: Array2::zeros((0, 0)),
            num_tokens: 0,
        }
    }

    /// Number of sentences
    pub fn size(&self) -> usize {
        self.src_tokens.nrows()
    }

    /// Whether the batch carries nothing to train on
    pub fn is_empty(&self) -> bool {
        self.size() == 0 || self.src_len() == 0 || self.tgt_len() == 0
    }

    /// Padded source length `S`
    pub fn src_len(&self) -> usize {
        self.src_tokens.ncols()
    }

    /// Padded target length `T`
    pub fn tgt_len(&self) -> usize {
        self.tgt_tokens.ncols()
    }

    /// Check that all fields agree on batch size and lengths
    pub fn validate(&self) -> Result<()> {
        let b = self.size();
        if self.src_lengths.len() != b {
            return Err(Error::ShapeMismatch {
                context: "src_lengths",
                expected: vec![b],
                actual: vec![self.src_lengths.len()],
            });
        }
        if self.tgt_inputs.dim() != self.tgt_tokens.dim() || self.tgt_tokens.nrows() != b {
            return Err(Error::ShapeMismatch {
                context: "tgt_inputs/tgt_tokens",
                expected: vec![b, self.tgt_len()],
                actual: vec![self.tgt_inputs.nrows(), self.tgt_inputs.ncols()],
            });
        }
        let s = self.src_len();
        if let Some(&bad) = self.src_lengths.iter().find(|&&l| l == 0 || l > s) {
            return Err(Error::MalformedBatch(format!(
                "source length {bad} outside 1..={s}"
            )));
        }
        Ok(())
    }
}
