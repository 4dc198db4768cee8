//! Data collaborators: vocabulary, parallel corpus and batch sampling
//!
//! These are deliberately small: a `word count` dictionary file, whitespace
//! tokenised parallel text, and a length-bucketing sampler.

mod dataset;
mod dictionary;
mod sampler;

pub use dataset::{Seq2SeqDataset, SentencePair};
pub use dictionary::{Dictionary, TokenId};
pub use sampler::BatchSampler;
