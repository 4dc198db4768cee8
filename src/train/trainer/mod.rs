//! Dual-direction trainer
//!
//! [`DualTrainer`] owns a forward and a reverse model and provides:
//! - Single training steps over both directions with the alignment penalty
//! - Epoch-level training with running statistics
//! - Validation with perplexity
//!
//! # Example
//!
//! ```no_run
//! use entrenar_dual::train::{Batch, DualTrainer};
//! use indicatif::ProgressBar;
//!
//! # let mut trainer: DualTrainer = todo!();
//! # let train_batches: Vec<Batch> = vec![];
//! # let valid_batches: Vec<Batch> = vec![];
//! let stats = trainer.train_epoch(0, train_batches, &ProgressBar::hidden()).unwrap();
//! let valid = trainer.validate(0, valid_batches).unwrap();
//! println!("loss {:.4}, perplexity {:.2}", stats.loss, valid.perplexity);
//! ```

mod core;
mod epoch;
mod step;

pub use self::core::{DualTrainer, ReverseUpdate};
