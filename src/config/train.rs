//! Loading a training configuration and assembling a run from it

use super::schema::TrainConfig;
use super::validate::validate_config;
use crate::data::{BatchSampler, Dictionary, Seq2SeqDataset};
use crate::io::CheckpointManager;
use crate::model::ModelRegistry;
use crate::optim::Adam;
use crate::train::{
    ControllerConfig, DualSession, DualTrainer, TokenCrossEntropy, TrainingController,
    TrainingOutcome,
};
use crate::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Read, parse and range-check a YAML configuration file
///
/// The architecture tag is checked later against the model registry by
/// [`TrainConfig::validate`].
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<TrainConfig> {
    let path = config_path.as_ref();
    let yaml_content = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading config file {}", path.display()), e))?;

    let config: TrainConfig = serde_yaml::from_str(&yaml_content)?;
    validate_config(&config)?;

    Ok(config)
}

impl TrainConfig {
    /// Epoch-loop settings
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            max_epoch: self.optim.max_epoch,
            patience: self.optim.patience,
            save_interval: self.checkpoint.save_interval,
        }
    }
}

/// Load dictionaries and corpora, build both models and bind them to
/// their checkpoints
///
/// The forward model is initialised from `seed`, the reverse model from
/// `seed + 1`.
pub fn build_session(config: &TrainConfig, registry: &ModelRegistry) -> Result<DualSession> {
    config.validate(registry)?;
    let data = &config.data;
    let (src, tgt) = (data.source_lang.as_str(), data.target_lang.as_str());

    let src_dict = Dictionary::load(data.dict_file(src))?;
    let tgt_dict = Dictionary::load(data.dict_file(tgt))?;
    info!("| [{src}] dictionary: {} types", src_dict.len());
    info!("| [{tgt}] dictionary: {} types", tgt_dict.len());

    let load_split = |split: &str| -> Result<Seq2SeqDataset> {
        let dataset = Seq2SeqDataset::from_files(
            data.split_file(split, src),
            data.split_file(split, tgt),
            &src_dict,
            &tgt_dict,
        )?;
        info!("| {} {split} {} examples", data.path.display(), dataset.len());
        Ok(dataset)
    };
    let train_data = load_split(data.train_split())?;
    let valid_data = load_split("valid")?;

    let model_config = registry.resolve(&config.model.arch, config.model.embed_dim)?;
    let model = registry.build(&model_config, src_dict.len(), tgt_dict.len(), config.seed)?;
    let model_rev =
        registry.build(&model_config, tgt_dict.len(), src_dict.len(), config.seed.wrapping_add(1))?;
    info!(
        "| model {}, {} parameters per direction",
        model_config.arch,
        model.num_parameters()
    );

    let lr = config.optim.lr;
    let trainer = DualTrainer::new(
        model,
        model_rev,
        Box::new(Adam::default_params(lr)),
        Box::new(Adam::default_params(lr)),
        Box::new(TokenCrossEntropy::new(tgt_dict.pad_idx())),
        Box::new(TokenCrossEntropy::new(src_dict.pad_idx())),
        config.optim.clip_norm,
    )
    .with_reverse_update(config.optim.reverse_update);

    let ckpt = &config.checkpoint;
    let checkpoints = CheckpointManager::new(&ckpt.save_dir)
        .with_restore_files(&ckpt.restore_file, &ckpt.restore_file_rev)
        .with_no_save(ckpt.no_save)
        .with_epoch_checkpoints(ckpt.epoch_checkpoints);

    Ok(DualSession::new(
        trainer,
        train_data,
        valid_data,
        BatchSampler::new(data.max_tokens, data.batch_size, true, config.seed),
        BatchSampler::new(data.max_tokens, data.batch_size, false, config.seed),
        checkpoints,
    ))
}

/// Run a complete training from a configuration
///
/// Resumes from the configured restore files when they exist.
pub fn train_from_config(
    config: &TrainConfig,
    registry: &ModelRegistry,
    show_progress: bool,
) -> Result<TrainingOutcome> {
    let mut session = build_session(config, registry)?.with_progress(show_progress);
    let restored = session.restore();
    let mut controller = TrainingController::new(config.controller_config()).with_restored(restored);
    controller.run(&mut session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_yaml(
            "
data:
  path: /corpus
  source_lang: fr
  target_lang: en
model:
  arch: attention_tiny
optim:
  patience: 3
seed: 7
",
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.data.source_lang, "fr");
        assert_eq!(config.model.arch, "attention_tiny");
        assert_eq!(config.optim.patience, 3);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config("/nonexistent/train.yaml").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("train.yaml"));
    }

    #[test]
    fn test_malformed_yaml_is_serialization_error() {
        let file = write_yaml("data: [unclosed\n");
        assert!(matches!(load_config(file.path()).unwrap_err(), Error::Serialization(_)));
    }

    #[test]
    fn test_controller_config_from_sections() {
        let mut config = TrainConfig::default();
        config.optim.patience = 2;
        config.checkpoint.save_interval = 4;
        let controller = config.controller_config();
        assert_eq!(controller.patience, 2);
        assert_eq!(controller.save_interval, 4);
        assert_eq!(controller.max_epoch, 10000);
    }

    #[test]
    fn test_missing_dictionary_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = TrainConfig::default();
        config.data.path = dir.path().to_path_buf();
        let err = build_session(&config, &ModelRegistry::builtin()).err().unwrap();
        assert!(matches!(err, Error::DictionaryNotFound { ref path } if path.ends_with("dict.de")));
    }

    #[test]
    fn test_out_of_range_value_rejected() {
        let file = write_yaml("optim:\n  lr: 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigValue { ref field, .. } if field == "optim.lr"));
    }
}
