//! Configuration validation logic
//!
//! Runs before anything is loaded, so only the values themselves are
//! checked. Missing files surface when the corpus is read.

use super::error::ValidationError;
use crate::config::schema::TrainConfig;
use crate::model::ModelRegistry;
use crate::{Error, Result};

/// Check value ranges of a configuration
pub fn validate_config(config: &TrainConfig) -> std::result::Result<(), ValidationError> {
    let data = &config.data;
    if data.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(data.batch_size));
    }
    if let Some(0) = data.max_tokens {
        return Err(ValidationError::InvalidMaxTokens(0));
    }
    if data.source_lang.trim().is_empty() {
        return Err(ValidationError::EmptyLanguage("data.source_lang"));
    }
    if data.target_lang.trim().is_empty() {
        return Err(ValidationError::EmptyLanguage("data.target_lang"));
    }
    if data.source_lang == data.target_lang {
        return Err(ValidationError::SameLanguage(data.source_lang.clone()));
    }

    if let Some(0) = config.model.embed_dim {
        return Err(ValidationError::InvalidEmbedDim(0));
    }

    let optim = &config.optim;
    if !(optim.lr > 0.0 && optim.lr <= 1.0) {
        return Err(ValidationError::InvalidLearningRate(optim.lr));
    }
    if !(optim.clip_norm > 0.0 && optim.clip_norm.is_finite()) {
        return Err(ValidationError::InvalidClipNorm(optim.clip_norm));
    }
    if optim.max_epoch == 0 {
        return Err(ValidationError::InvalidMaxEpoch(optim.max_epoch));
    }
    if optim.patience == 0 {
        return Err(ValidationError::InvalidPatience(optim.patience));
    }

    let checkpoint = &config.checkpoint;
    if checkpoint.save_interval == 0 {
        return Err(ValidationError::InvalidSaveInterval(checkpoint.save_interval));
    }
    if checkpoint.restore_file.is_empty() {
        return Err(ValidationError::EmptyRestoreFile("checkpoint.restore_file"));
    }
    if checkpoint.restore_file_rev.is_empty() {
        return Err(ValidationError::EmptyRestoreFile("checkpoint.restore_file_rev"));
    }
    if checkpoint.restore_file == checkpoint.restore_file_rev {
        return Err(ValidationError::SharedRestoreFile(checkpoint.restore_file.clone()));
    }

    Ok(())
}

impl TrainConfig {
    /// Validate values and the architecture tag against `registry`
    pub fn validate(&self, registry: &ModelRegistry) -> Result<()> {
        validate_config(self)?;
        if registry.get(&self.model.arch).is_none() {
            return Err(Error::UnknownArchitecture {
                name: self.model.arch.clone(),
                available: registry.names().join(", "),
            });
        }
        Ok(())
    }
}
