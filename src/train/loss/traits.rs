//! Loss function trait

use crate::{Result, Tensor};

/// Trait for loss functions over token sequences
pub trait LossFn {
    /// Compute the loss of flattened `[N, V]` logits against `N` target ids
    ///
    /// Returns a scalar tensor; when `logits` requires gradients, the result
    /// carries a backward operation that feeds them.
    fn forward(&self, logits: &Tensor, targets: &[u32]) -> Result<Tensor>;

    /// Name of the loss function
    fn name(&self) -> &str;
}
