//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! entrenar-dual train --data data/iwslt14 --source-lang de --target-lang en
//! entrenar-dual train --config run.yaml --lr 0.001 --save-dir ./checkpoints
//! entrenar-dual validate run.yaml
//! ```

mod core;

pub use self::core::{apply_overrides, parse_args, Cli, Command, TrainArgs, ValidateArgs};
