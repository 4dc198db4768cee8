//! Core CLI types - Cli, Command, and argument structs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::TrainConfig;
use crate::train::ReverseUpdate;

/// Entrenar-dual: joint forward/reverse sequence-to-sequence training
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "entrenar-dual")]
#[command(author = "PAIML")]
#[command(version)]
#[command(
    about = "Train a forward and a reverse seq2seq model jointly with an alignment-consistency penalty"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train a model pair
    Train(TrainArgs),

    /// Validate a configuration file without training
    Validate(ValidateArgs),
}

/// Arguments for the train command
///
/// Every flag overrides the matching value of `--config`.
#[derive(Parser, Debug, Clone, PartialEq, Default)]
pub struct TrainArgs {
    /// YAML configuration file
    #[arg(long, value_name = "YAML")]
    pub config: Option<PathBuf>,

    /// Data directory with dictionaries and splits
    #[arg(long, value_name = "DIR")]
    pub data: Option<PathBuf>,

    /// Source language code
    #[arg(long)]
    pub source_lang: Option<String>,

    /// Target language code
    #[arg(long)]
    pub target_lang: Option<String>,

    /// Padded token budget per batch
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Maximum sentences per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Train on the tiny_train split
    #[arg(long)]
    pub train_on_tiny: bool,

    /// Model architecture
    #[arg(long)]
    pub arch: Option<String>,

    /// Override the architecture's embedding dimension
    #[arg(long)]
    pub embed_dim: Option<usize>,

    /// Force stop training at this epoch
    #[arg(long)]
    pub max_epoch: Option<usize>,

    /// Clip gradients to this norm
    #[arg(long)]
    pub clip_norm: Option<f32>,

    /// Learning rate
    #[arg(long)]
    pub lr: Option<f32>,

    /// Epochs without validation improvement before stopping
    #[arg(long)]
    pub patience: Option<usize>,

    /// How the reverse model is updated
    #[arg(long, value_enum)]
    pub reverse_update: Option<ReverseUpdate>,

    /// Append log output to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Checkpoint directory
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,

    /// Forward checkpoint to resume from, relative to the save directory
    #[arg(long)]
    pub restore_file: Option<String>,

    /// Reverse checkpoint to resume from, relative to the save directory
    #[arg(long)]
    pub restore_file_rev: Option<String>,

    /// Save checkpoints every N epochs
    #[arg(long)]
    pub save_interval: Option<usize>,

    /// Do not write checkpoints
    #[arg(long)]
    pub no_save: bool,

    /// Keep a checkpoint pair for every epoch
    #[arg(long)]
    pub epoch_checkpoints: bool,

    /// Random seed for initialisation and shuffling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Validate the configuration and load the data, but don't train
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Also check that dictionaries and corpus files exist
    #[arg(short, long)]
    pub detailed: bool,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a configuration
pub fn apply_overrides(config: &mut TrainConfig, args: &TrainArgs) {
    if let Some(path) = &args.data {
        config.data.path = path.clone();
    }
    if let Some(lang) = &args.source_lang {
        config.data.source_lang = lang.clone();
    }
    if let Some(lang) = &args.target_lang {
        config.data.target_lang = lang.clone();
    }
    if args.max_tokens.is_some() {
        config.data.max_tokens = args.max_tokens;
    }
    if let Some(batch_size) = args.batch_size {
        config.data.batch_size = batch_size;
    }
    if args.train_on_tiny {
        config.data.train_on_tiny = true;
    }

    if let Some(arch) = &args.arch {
        config.model.arch = arch.clone();
    }
    if args.embed_dim.is_some() {
        config.model.embed_dim = args.embed_dim;
    }

    if let Some(max_epoch) = args.max_epoch {
        config.optim.max_epoch = max_epoch;
    }
    if let Some(clip_norm) = args.clip_norm {
        config.optim.clip_norm = clip_norm;
    }
    if let Some(lr) = args.lr {
        config.optim.lr = lr;
    }
    if let Some(patience) = args.patience {
        config.optim.patience = patience;
    }
    if let Some(mode) = args.reverse_update {
        config.optim.reverse_update = mode;
    }

    if let Some(dir) = &args.save_dir {
        config.checkpoint.save_dir = dir.clone();
    }
    if let Some(file) = &args.restore_file {
        config.checkpoint.restore_file = file.clone();
    }
    if let Some(file) = &args.restore_file_rev {
        config.checkpoint.restore_file_rev = file.clone();
    }
    if let Some(interval) = args.save_interval {
        config.checkpoint.save_interval = interval;
    }
    if args.no_save {
        config.checkpoint.no_save = true;
    }
    if args.epoch_checkpoints {
        config.checkpoint.epoch_checkpoints = true;
    }

    if args.log_file.is_some() {
        config.log_file = args.log_file.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
}
