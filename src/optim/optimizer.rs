//! Optimizer trait

use crate::{Error, Result, Tensor};
use serde::{Deserialize, Serialize};

/// Serialisable optimizer state, stored alongside parameters in checkpoints.
///
/// Moment buffers are indexed by parameter position; `None` marks a parameter
/// that has not received a gradient yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizerState {
    /// Optimizer name, checked on restore
    pub kind: String,
    /// Learning rate at save time
    pub lr: f32,
    /// Number of steps taken
    pub step: u64,
    /// First moment buffers
    pub first_moments: Vec<Option<Vec<f32>>>,
    /// Second moment buffers
    pub second_moments: Vec<Option<Vec<f32>>>,
}

/// Trait for optimization algorithms
///
/// Parameters are passed as borrowed references collected from a model, in a
/// stable order; per-parameter state is keyed by that position.
pub trait Optimizer {
    /// Perform a single optimization step
    fn step(&mut self, params: &mut [&mut Tensor]);

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [&mut Tensor]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);

    /// Snapshot state for checkpointing
    fn state(&self) -> OptimizerState;

    /// Restore state from a checkpoint
    fn load_state(&mut self, state: OptimizerState) -> Result<()>;
}

/// Reject a state written by a different optimizer
pub(crate) fn check_kind(state: &OptimizerState, expected: &str) -> Result<()> {
    if state.kind == expected {
        Ok(())
    } else {
        Err(Error::Serialization(format!(
            "optimizer state is for '{}', expected '{expected}'",
            state.kind
        )))
    }
}
