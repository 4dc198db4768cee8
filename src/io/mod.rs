//! Checkpoint persistence
//!
//! Checkpoints are JSON files holding the parameters of one model together
//! with its optimizer state and the training progress. A dual run writes one
//! file per direction.
//!
//! # Example
//!
//! ```no_run
//! use entrenar_dual::io::CheckpointManager;
//! # use entrenar_dual::train::DualTrainer;
//! # let mut trainer: DualTrainer = todo!();
//!
//! let manager = CheckpointManager::new("checkpoints");
//! if let Some(restored) = manager.restore(&mut trainer) {
//!     println!("resuming after epoch {}", restored.last_epoch);
//! }
//! manager.save(&trainer, 0, 12.0, 12.0).unwrap();
//! ```

mod checkpoint;
mod load;
mod model;
mod save;

pub use checkpoint::{CheckpointManager, RestoredState};
pub use load::load_checkpoint;
pub use model::{CheckpointState, ModelState, ParameterInfo};
pub use save::save_checkpoint;
