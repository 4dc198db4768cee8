//! Backward operation trait

/// A node of the gradient tape.
///
/// Implementors read the gradient accumulated on their output, push
/// gradients into their inputs, then recurse into the inputs' own
/// backward operations.
pub trait BackwardOp {
    /// Propagate gradients to inputs
    fn backward(&self);
}
