//! Dual-direction training loop
//!
//! This module provides:
//! - Token cross-entropy loss with padding mask
//! - The reverse-direction shift adapter and the alignment-consistency penalty
//! - [`DualTrainer`] for steps, epochs and validation over a model pair
//! - [`TrainingController`] for the epoch loop with early stopping
//! - [`DualSession`] binding a trainer to its corpora and checkpoints
//!
//! # Example
//!
//! ```no_run
//! use entrenar_dual::train::{ControllerConfig, DualSession, TrainingController};
//!
//! # let mut session: DualSession = todo!();
//! let restored = session.restore();
//! let mut controller = TrainingController::new(ControllerConfig {
//!     max_epoch: 100,
//!     patience: 5,
//!     save_interval: 1,
//! })
//! .with_restored(restored);
//!
//! let outcome = controller.run(&mut session).unwrap();
//! println!("{:?} after {} epochs", outcome.status, outcome.epochs_run);
//! ```

pub mod alignment;
mod batch;
mod controller;
mod loss;
mod session;
pub mod shift;
mod stats;
mod trainer;

pub use alignment::{alignment_penalty, diagonal_consistency, AlignmentPenalty};
pub use batch::Batch;
pub use controller::{
    ControllerConfig, EarlyStopping, EpochHooks, TrainingController, TrainingOutcome,
    TrainingState, TrainingStatus,
};
pub use loss::{LossFn, TokenCrossEntropy};
pub use session::DualSession;
pub use shift::{shift_for_reverse, ReverseInputs};
pub use stats::{EpochStats, RunningStats, StepReport, ValidationStats};
pub use trainer::{DualTrainer, ReverseUpdate};

#[cfg(test)]
pub(crate) use trainer::test_support as trainer_test_support;
