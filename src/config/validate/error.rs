//! Validation error types

/// Validation error type
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid learning rate: {0} (must be > 0.0 and <= 1.0)")]
    InvalidLearningRate(f32),

    #[error("Invalid clip norm: {0} (must be > 0.0)")]
    InvalidClipNorm(f32),

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid max tokens: {0} (must be > 0)")]
    InvalidMaxTokens(usize),

    #[error("Invalid max epoch: {0} (must be > 0)")]
    InvalidMaxEpoch(usize),

    #[error("Invalid patience: {0} (must be > 0)")]
    InvalidPatience(usize),

    #[error("Invalid save interval: {0} (must be > 0)")]
    InvalidSaveInterval(usize),

    #[error("Invalid embedding dimension: {0} (must be > 0)")]
    InvalidEmbedDim(usize),

    #[error("Empty language code for {0}")]
    EmptyLanguage(&'static str),

    #[error("Source and target language are both '{0}'")]
    SameLanguage(String),

    #[error("Empty checkpoint file name for {0}")]
    EmptyRestoreFile(&'static str),

    #[error("Forward and reverse checkpoints share the file name '{0}'")]
    SharedRestoreFile(String),
}

impl ValidationError {
    /// Configuration key the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidLearningRate(_) => "optim.lr",
            Self::InvalidClipNorm(_) => "optim.clip_norm",
            Self::InvalidBatchSize(_) => "data.batch_size",
            Self::InvalidMaxTokens(_) => "data.max_tokens",
            Self::InvalidMaxEpoch(_) => "optim.max_epoch",
            Self::InvalidPatience(_) => "optim.patience",
            Self::InvalidSaveInterval(_) => "checkpoint.save_interval",
            Self::InvalidEmbedDim(_) => "model.embed_dim",
            Self::EmptyLanguage(field) => field,
            Self::SameLanguage(_) => "data.target_lang",
            Self::EmptyRestoreFile(field) => field,
            Self::SharedRestoreFile(_) => "checkpoint.restore_file_rev",
        }
    }
}

impl From<ValidationError> for crate::Error {
    fn from(e: ValidationError) -> Self {
        crate::Error::config(e.field(), e.to_string())
    }
}
