//! Declarative training configuration
//!
//! A run is described by a [`TrainConfig`], read from YAML with
//! [`load_config`] and overridden by command-line flags.

pub mod cli;
mod schema;
mod train;
mod validate;

pub use cli::{apply_overrides, parse_args, Cli, Command, TrainArgs, ValidateArgs};
pub use schema::{CheckpointConfig, DataConfig, ModelSection, OptimConfig, TrainConfig};
pub use train::{build_session, load_config, train_from_config};
pub use validate::{validate_config, ValidationError};
