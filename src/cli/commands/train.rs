//! Train command implementation

use crate::cli::logging::{init_logging, log};
use crate::cli::LogLevel;
use crate::config::{
    apply_overrides, build_session, load_config, train_from_config, TrainArgs, TrainConfig,
};
use crate::model::ModelRegistry;
use crate::train::TrainingStatus;

/// Configuration from `--config` (or defaults) with flags applied
pub(crate) fn resolve_config(args: &TrainArgs) -> Result<TrainConfig, String> {
    let mut config = match &args.config {
        Some(path) => load_config(path).map_err(|e| format!("Config error: {e}"))?,
        None => TrainConfig::default(),
    };
    apply_overrides(&mut config, args);
    Ok(config)
}

pub fn run_train(args: TrainArgs, level: LogLevel) -> Result<(), String> {
    let config = resolve_config(&args)?;
    init_logging(level, config.log_file.as_deref()).map_err(|e| format!("Logging error: {e}"))?;

    let registry = ModelRegistry::builtin();
    config.validate(&registry).map_err(|e| format!("Config error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!(
            "Entrenar-dual: {} <-> {} from {}",
            config.data.source_lang,
            config.data.target_lang,
            config.data.path.display()
        ),
    );
    log(
        level,
        LogLevel::Verbose,
        &format!("  Architecture: {}", config.model.arch),
    );
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  Optimizer: adam (lr={}, clip_norm={}, reverse={:?})",
            config.optim.lr, config.optim.clip_norm, config.optim.reverse_update
        ),
    );
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  Max epoch: {}, patience: {}",
            config.optim.max_epoch, config.optim.patience
        ),
    );

    if args.dry_run {
        build_session(&config, &registry).map_err(|e| format!("Setup error: {e}"))?;
        log(level, LogLevel::Normal, "Dry run - data and models loaded successfully");
        return Ok(());
    }

    let outcome = train_from_config(&config, &registry, level != LogLevel::Quiet)
        .map_err(|e| format!("Training error: {e}"))?;

    let reason = match outcome.status {
        TrainingStatus::EarlyStopped => "early stopped",
        TrainingStatus::MaxEpochReached => "max epoch reached",
        TrainingStatus::Running => "interrupted",
    };
    log(
        level,
        LogLevel::Normal,
        &format!(
            "Training complete ({reason}): {} epochs run, best valid perplexity {:.3}",
            outcome.epochs_run, outcome.state.best_validate
        ),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_flags_override_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"optim:\n  lr: 0.01\n  patience: 7\n").unwrap();
        let args = TrainArgs {
            config: Some(file.path().to_path_buf()),
            patience: Some(2),
            ..Default::default()
        };
        let config = resolve_config(&args).unwrap();
        assert!((config.optim.lr - 0.01).abs() < 1e-9);
        assert_eq!(config.optim.patience, 2);
    }

    #[test]
    fn test_defaults_without_config_file() {
        let config = resolve_config(&TrainArgs::default()).unwrap();
        assert_eq!(config, TrainConfig::default());
    }

    #[test]
    fn test_unknown_arch_fails_before_loading_data() {
        let args = TrainArgs { arch: Some("lstm".into()), ..Default::default() };
        let err = run_train(args, LogLevel::Quiet).unwrap_err();
        assert!(err.contains("Unknown architecture 'lstm'"));
    }

    #[test]
    fn test_missing_config_file_reported() {
        let args = TrainArgs { config: Some("/nonexistent.yaml".into()), ..Default::default() };
        assert!(resolve_config(&args).unwrap_err().starts_with("Config error"));
    }
}
