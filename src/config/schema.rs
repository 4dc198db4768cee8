//! YAML schema for a dual training run
//!
//! Every field has a default, so an empty document is a valid configuration
//! and the command line only needs to supply what differs.

use crate::train::ReverseUpdate;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

/// Complete training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainConfig {
    /// Corpus and batching
    #[serde(default)]
    pub data: DataConfig,

    /// Architecture
    #[serde(default)]
    pub model: ModelSection,

    /// Optimization and stopping
    #[serde(default)]
    pub optim: OptimConfig,

    /// Checkpoint files
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Append log output to this file as well
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Seed for model initialisation and batch shuffling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            model: ModelSection::default(),
            optim: OptimConfig::default(),
            checkpoint: CheckpointConfig::default(),
            log_file: None,
            seed: default_seed(),
        }
    }
}

/// Corpus location and batching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Directory holding `dict.{lang}` and `{split}.{lang}` files
    #[serde(default = "default_data_path")]
    pub path: PathBuf,

    /// Source language code
    #[serde(default = "default_source_lang")]
    pub source_lang: String,

    /// Target language code
    #[serde(default = "default_target_lang")]
    pub target_lang: String,

    /// Padded token budget per batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Maximum sentences per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Train on the `tiny_train` split instead of `train`
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub train_on_tiny: bool,
}

impl DataConfig {
    /// Name of the training split
    pub fn train_split(&self) -> &'static str {
        if self.train_on_tiny {
            "tiny_train"
        } else {
            "train"
        }
    }

    /// `{split}.{lang}` under the data directory
    pub fn split_file(&self, split: &str, lang: &str) -> PathBuf {
        self.path.join(format!("{split}.{lang}"))
    }

    /// `dict.{lang}` under the data directory
    pub fn dict_file(&self, lang: &str) -> PathBuf {
        self.path.join(format!("dict.{lang}"))
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            max_tokens: None,
            batch_size: default_batch_size(),
            train_on_tiny: false,
        }
    }
}

/// Architecture selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSection {
    /// Registry tag
    #[serde(default = "default_arch")]
    pub arch: String,

    /// Overrides the preset's embedding dimension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_dim: Option<usize>,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self { arch: default_arch(), embed_dim: None }
    }
}

/// Optimization and early stopping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimConfig {
    /// Upper bound on epochs
    #[serde(default = "default_max_epoch")]
    pub max_epoch: usize,

    /// Gradient norm threshold
    #[serde(default = "default_clip_norm")]
    pub clip_norm: f32,

    /// Learning rate of both optimizers
    #[serde(default = "default_lr")]
    pub lr: f32,

    /// Epochs without improvement before stopping
    #[serde(default = "default_patience")]
    pub patience: usize,

    /// How the reverse model is updated
    #[serde(default)]
    pub reverse_update: ReverseUpdate,
}

impl Default for OptimConfig {
    fn default() -> Self {
        Self {
            max_epoch: default_max_epoch(),
            clip_norm: default_clip_norm(),
            lr: default_lr(),
            patience: default_patience(),
            reverse_update: ReverseUpdate::default(),
        }
    }
}

/// Checkpoint files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointConfig {
    /// Checkpoint directory
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,

    /// Latest forward checkpoint, relative to `save_dir`
    #[serde(default = "default_restore_file")]
    pub restore_file: String,

    /// Latest reverse checkpoint, relative to `save_dir`
    #[serde(default = "default_restore_file_rev")]
    pub restore_file_rev: String,

    /// Save every N epochs
    #[serde(default = "default_save_interval")]
    pub save_interval: usize,

    /// Never write checkpoints
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub no_save: bool,

    /// Keep one checkpoint pair per epoch
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub epoch_checkpoints: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            save_dir: default_save_dir(),
            restore_file: default_restore_file(),
            restore_file_rev: default_restore_file_rev(),
            save_interval: default_save_interval(),
            no_save: false,
            epoch_checkpoints: false,
        }
    }
}

fn default_seed() -> u64 {
    42
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_source_lang() -> String {
    "de".to_string()
}

fn default_target_lang() -> String {
    "en".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_arch() -> String {
    "attention".to_string()
}

fn default_max_epoch() -> usize {
    10000
}

fn default_clip_norm() -> f32 {
    4.0
}

fn default_lr() -> f32 {
    0.0003
}

fn default_patience() -> usize {
    5
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

fn default_restore_file() -> String {
    "checkpoint_last.json".to_string()
}

fn default_restore_file_rev() -> String {
    "checkpoint_last_rev.json".to_string()
}

fn default_save_interval() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config: TrainConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, TrainConfig::default());
        assert_eq!(config.seed, 42);
        assert_eq!(config.data.batch_size, 100);
        assert_eq!(config.optim.max_epoch, 10000);
        assert_eq!(config.optim.clip_norm, 4.0);
        assert_eq!(config.optim.lr, 0.0003);
        assert_eq!(config.optim.patience, 5);
        assert_eq!(config.checkpoint.save_interval, 1);
        assert_eq!(config.optim.reverse_update, ReverseUpdate::Independent);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let yaml = "
data:
  path: corpus/iwslt
  max_tokens: 4000
optim:
  lr: 0.001
  reverse_update: frozen
checkpoint:
  no_save: \"true\"
";
        let config: TrainConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.data.path, PathBuf::from("corpus/iwslt"));
        assert_eq!(config.data.max_tokens, Some(4000));
        assert_eq!(config.data.batch_size, 100);
        assert_eq!(config.optim.lr, 0.001);
        assert_eq!(config.optim.reverse_update, ReverseUpdate::Frozen);
        assert!(config.checkpoint.no_save);
        assert_eq!(config.checkpoint.restore_file, "checkpoint_last.json");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = serde_yaml::from_str::<TrainConfig>("optim:\n  momentum: 0.9\n").unwrap_err();
        assert!(err.to_string().contains("momentum"));
    }

    #[test]
    fn test_split_and_dict_paths() {
        let mut data = DataConfig { path: PathBuf::from("/corpus"), ..Default::default() };
        assert_eq!(data.split_file(data.train_split(), "de"), PathBuf::from("/corpus/train.de"));
        data.train_on_tiny = true;
        assert_eq!(data.split_file(data.train_split(), "en"), PathBuf::from("/corpus/tiny_train.en"));
        assert_eq!(data.dict_file("en"), PathBuf::from("/corpus/dict.en"));
    }
}
