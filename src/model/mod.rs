//! Sequence-to-sequence model contract and architecture registry
//!
//! The trainer only depends on [`Seq2SeqModel`]; concrete architectures are
//! looked up by tag in a [`ModelRegistry`].

mod attention;
mod registry;

pub use attention::AttentionSeq2Seq;
pub use registry::{ArchSpec, ModelBuilder, ModelRegistry};

use crate::{Result, Tensor};
use ndarray::{Array3, ArrayView2};
use serde::{Deserialize, Serialize};

/// Typed architecture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Registry tag the model was built from
    pub arch: String,
    /// Embedding and hidden dimension
    pub embed_dim: usize,
}

impl ModelConfig {
    /// Default attention model
    pub fn attention() -> Self {
        Self { arch: "attention".to_string(), embed_dim: 64 }
    }

    /// Small attention model for smoke runs and tests
    pub fn attention_tiny() -> Self {
        Self { arch: "attention_tiny".to_string(), embed_dim: 16 }
    }
}

/// Output of one forward pass
#[derive(Debug)]
pub struct Seq2SeqOutput {
    /// Flattened logits `[B, T, V]`
    pub logits: Tensor,
    /// Output vocabulary size `V`
    pub vocab_size: usize,
    /// Attention weights `[B, T, S]`
    pub attention: Array3<f32>,
    /// Encoder outputs, time-major `[S, B, H]`
    pub encoder_out: Array3<f32>,
}

/// A model mapping source tokens to target logits with attention.
pub trait Seq2SeqModel {
    /// Run the model on a padded batch
    ///
    /// In training mode the returned logits carry a backward operation into
    /// the model's parameters; in evaluation mode they do not.
    fn forward(
        &self,
        src_tokens: ArrayView2<'_, u32>,
        src_lengths: &[usize],
        decoder_inputs: ArrayView2<'_, u32>,
    ) -> Result<Seq2SeqOutput>;

    /// Switch to training mode
    fn train(&mut self);

    /// Switch to evaluation mode
    fn eval(&mut self);

    /// Whether in training mode
    fn is_training(&self) -> bool;

    /// Configuration the model was built with
    fn config(&self) -> &ModelConfig;

    /// Parameters with stable names, in a stable order
    fn named_parameters(&self) -> Vec<(&'static str, &Tensor)>;

    /// Mutable parameters with stable names, same order as `named_parameters`
    fn named_parameters_mut(&mut self) -> Vec<(&'static str, &mut Tensor)>;

    /// Mutable parameters for the optimizer
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.named_parameters_mut().into_iter().map(|(_, t)| t).collect()
    }

    /// Total number of scalar parameters
    fn num_parameters(&self) -> usize {
        self.named_parameters().iter().map(|(_, t)| t.len()).sum()
    }
}
