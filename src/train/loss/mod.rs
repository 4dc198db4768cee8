//! Loss functions for training
//!
//! - [`TokenCrossEntropy`] - summed token-level cross-entropy that ignores padding

mod token_cross_entropy;
mod traits;

pub use token_cross_entropy::TokenCrossEntropy;
pub use traits::LossFn;
