//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, TrainConfig, ValidateArgs};
use crate::model::ModelRegistry;

/// Format data configuration as a string
pub fn format_data_info(config: &TrainConfig) -> String {
    let data = &config.data;
    let mut lines = vec![
        format!("  Data directory: {}", data.path.display()),
        format!("  Languages: {} <-> {}", data.source_lang, data.target_lang),
        format!("  Training split: {}", data.train_split()),
        format!("  Batch size: {}", data.batch_size),
    ];
    if let Some(max_tokens) = data.max_tokens {
        lines.push(format!("  Max tokens: {max_tokens}"));
    }
    lines.join("\n")
}

/// Format model and optimizer configuration as a string
pub fn format_optim_info(config: &TrainConfig) -> String {
    let mut lines = vec![format!("  Architecture: {}", config.model.arch)];
    if let Some(dim) = config.model.embed_dim {
        lines.push(format!("  Embedding dim: {dim}"));
    }
    lines.push(format!("  Learning rate: {}", config.optim.lr));
    lines.push(format!("  Clip norm: {}", config.optim.clip_norm));
    lines.push(format!("  Max epoch: {}", config.optim.max_epoch));
    lines.push(format!("  Patience: {}", config.optim.patience));
    lines.push(format!("  Reverse update: {:?}", config.optim.reverse_update));
    lines.join("\n")
}

/// Format checkpoint configuration as a string
pub fn format_checkpoint_info(config: &TrainConfig) -> String {
    let ckpt = &config.checkpoint;
    if ckpt.no_save {
        return "  Checkpoints: disabled".to_string();
    }
    let mut lines = vec![
        format!("  Save dir: {}", ckpt.save_dir.display()),
        format!("  Restore files: {} / {}", ckpt.restore_file, ckpt.restore_file_rev),
        format!("  Save interval: {}", ckpt.save_interval),
    ];
    if ckpt.epoch_checkpoints {
        lines.push("  Per-epoch checkpoints: on".to_string());
    }
    lines.join("\n")
}

/// Input files a run will read that do not exist
pub fn missing_files(config: &TrainConfig) -> Vec<String> {
    let data = &config.data;
    let mut expected = Vec::new();
    for lang in [&data.source_lang, &data.target_lang] {
        expected.push(data.dict_file(lang));
        expected.push(data.split_file(data.train_split(), lang));
        expected.push(data.split_file("valid", lang));
    }
    expected
        .into_iter()
        .filter(|p| !p.exists())
        .map(|p| p.display().to_string())
        .collect()
}

/// Print detailed configuration summary
pub fn print_detailed_summary(config: &TrainConfig) {
    println!();
    println!("Configuration Summary:");
    println!("{}", format_data_info(config));
    println!();
    println!("{}", format_optim_info(config));
    println!();
    println!("{}", format_checkpoint_info(config));
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let config = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    config
        .validate(&ModelRegistry::builtin())
        .map_err(|e| format!("Validation failed: {e}"))?;

    if args.detailed {
        let missing = missing_files(&config);
        if !missing.is_empty() {
            return Err(format!("Validation failed: missing files: {}", missing.join(", ")));
        }
    }

    log(level, LogLevel::Normal, "Configuration is valid");

    if args.detailed && level != LogLevel::Quiet {
        print_detailed_summary(&config);
    }

    Ok(())
}
