//! Architecture registry: tag → preset configuration + builder

use super::{AttentionSeq2Seq, ModelConfig, Seq2SeqModel};
use crate::{Error, Result};

/// Builds a model for the given vocabulary sizes and seed
pub type ModelBuilder = fn(&ModelConfig, usize, usize, u64) -> Box<dyn Seq2SeqModel>;

/// A registered architecture
#[derive(Clone)]
pub struct ArchSpec {
    /// Tag used on the command line
    pub name: &'static str,
    /// Default configuration for the tag
    pub preset: fn() -> ModelConfig,
    /// Model constructor
    pub build: ModelBuilder,
}

/// Maps architecture tags to their presets and builders
#[derive(Clone, Default)]
pub struct ModelRegistry {
    archs: Vec<ArchSpec>,
}

impl ModelRegistry {
    /// Registry with no architectures
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the reference attention architectures
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ArchSpec {
            name: "attention",
            preset: ModelConfig::attention,
            build: AttentionSeq2Seq::build,
        });
        registry.register(ArchSpec {
            name: "attention_tiny",
            preset: ModelConfig::attention_tiny,
            build: AttentionSeq2Seq::build,
        });
        registry
    }

    /// Add an architecture, replacing any existing one with the same tag
    pub fn register(&mut self, spec: ArchSpec) {
        self.archs.retain(|a| a.name != spec.name);
        self.archs.push(spec);
    }

    /// Look up a tag
    pub fn get(&self, name: &str) -> Option<&ArchSpec> {
        self.archs.iter().find(|a| a.name == name)
    }

    /// Registered tags in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.archs.iter().map(|a| a.name).collect()
    }

    /// Preset configuration for a tag, with an optional dimension override
    pub fn resolve(&self, name: &str, embed_dim: Option<usize>) -> Result<ModelConfig> {
        let spec = self.get(name).ok_or_else(|| Error::UnknownArchitecture {
            name: name.to_string(),
            available: self.names().join(", "),
        })?;
        let mut config = (spec.preset)();
        if let Some(dim) = embed_dim {
            if dim == 0 {
                return Err(Error::config("model.embed_dim", "must be positive"));
            }
            config.embed_dim = dim;
        }
        Ok(config)
    }

    /// Build a model from a resolved configuration
    pub fn build(
        &self,
        config: &ModelConfig,
        src_vocab: usize,
        tgt_vocab: usize,
        seed: u64,
    ) -> Result<Box<dyn Seq2SeqModel>> {
        let spec = self.get(&config.arch).ok_or_else(|| Error::UnknownArchitecture {
            name: config.arch.clone(),
            available: self.names().join(", "),
        })?;
        Ok((spec.build)(config, src_vocab, tgt_vocab, seed))
    }
}
