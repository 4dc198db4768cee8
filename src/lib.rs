//! Entrenar-dual: joint forward/reverse sequence-to-sequence training
//!
//! A forward model (source → target) and a reverse model (target → source)
//! are trained on the same parallel batches. Their cross-entropy losses are
//! summed with an alignment-consistency penalty comparing how sharply each
//! model's attention-weighted encoder states line up along the diagonal.
//!
//! # Modules
//!
//! - [`autograd`]: tape-based automatic differentiation
//! - [`model`]: the model contract, a reference attention architecture and
//!   the architecture registry
//! - [`data`]: dictionaries, parallel corpora and length-bucketed batching
//! - [`optim`]: Adam and gradient-norm clipping
//! - [`train`]: losses, the reverse-input shift, the alignment penalty, the
//!   dual trainer and the epoch controller with early stopping
//! - [`io`]: checkpoint files for both directions
//! - [`config`]: typed YAML configuration and CLI arguments
//!
//! # Example
//!
//! ```no_run
//! use entrenar_dual::config::{train_from_config, TrainConfig};
//! use entrenar_dual::model::ModelRegistry;
//!
//! let mut config = TrainConfig::default();
//! config.data.path = "data/iwslt14".into();
//! config.model.arch = "attention_tiny".into();
//!
//! let outcome = train_from_config(&config, &ModelRegistry::builtin(), true)?;
//! println!("best perplexity {:.3}", outcome.state.best_validate);
//! # Ok::<(), entrenar_dual::Error>(())
//! ```

pub mod autograd;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod optim;
pub mod train;

pub use autograd::Tensor;
pub use error::{Error, Result};
