//! Core DualTrainer struct and basic methods

use crate::model::Seq2SeqModel;
use crate::optim::Optimizer;
use crate::train::LossFn;
use serde::{Deserialize, Serialize};

/// How the reverse model's parameters are updated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReverseUpdate {
    /// Reverse model has its own optimizer and gradient clipping
    #[default]
    Independent,
    /// Reverse model only contributes to the loss and is never updated
    Frozen,
}

/// Trainer for a forward/reverse model pair
///
/// The forward model maps source to target, the reverse model target to
/// source. Both are run on every batch and their losses are combined with
/// the alignment penalty into one backward pass.
///
/// # Example
///
/// ```no_run
/// use entrenar_dual::model::ModelRegistry;
/// use entrenar_dual::optim::Adam;
/// use entrenar_dual::train::{DualTrainer, TokenCrossEntropy};
///
/// let registry = ModelRegistry::builtin();
/// let config = registry.resolve("attention_tiny", None).unwrap();
/// let model = registry.build(&config, 100, 120, 42).unwrap();
/// let model_rev = registry.build(&config, 120, 100, 43).unwrap();
///
/// let trainer = DualTrainer::new(
///     model,
///     model_rev,
///     Box::new(Adam::default_params(3e-4)),
///     Box::new(Adam::default_params(3e-4)),
///     Box::new(TokenCrossEntropy::new(0)),
///     Box::new(TokenCrossEntropy::new(0)),
///     4.0,
/// );
/// assert_eq!(trainer.clip_norm(), 4.0);
/// ```
pub struct DualTrainer {
    /// Source → target model
    pub(crate) model: Box<dyn Seq2SeqModel>,

    /// Target → source model
    pub(crate) model_rev: Box<dyn Seq2SeqModel>,

    /// Forward optimizer
    pub(crate) optimizer: Box<dyn Optimizer>,

    /// Reverse optimizer, unused when frozen
    pub(crate) optimizer_rev: Box<dyn Optimizer>,

    /// Loss over target tokens
    pub(crate) criterion: Box<dyn LossFn>,

    /// Loss over source tokens
    pub(crate) criterion_rev: Box<dyn LossFn>,

    /// Gradient norm threshold
    pub(crate) clip_norm: f32,

    pub(crate) reverse_update: ReverseUpdate,
}

impl DualTrainer {
    /// Create a trainer with independent reverse updates
    pub fn new(
        model: Box<dyn Seq2SeqModel>,
        model_rev: Box<dyn Seq2SeqModel>,
        optimizer: Box<dyn Optimizer>,
        optimizer_rev: Box<dyn Optimizer>,
        criterion: Box<dyn LossFn>,
        criterion_rev: Box<dyn LossFn>,
        clip_norm: f32,
    ) -> Self {
        Self {
            model,
            model_rev,
            optimizer,
            optimizer_rev,
            criterion,
            criterion_rev,
            clip_norm,
            reverse_update: ReverseUpdate::default(),
        }
    }

    /// Set the reverse-model update policy
    pub fn with_reverse_update(mut self, policy: ReverseUpdate) -> Self {
        self.reverse_update = policy;
        self
    }

    /// Reverse-model update policy
    pub fn reverse_update(&self) -> ReverseUpdate {
        self.reverse_update
    }

    /// Gradient norm threshold
    pub fn clip_norm(&self) -> f32 {
        self.clip_norm
    }

    /// Get current learning rate
    pub fn lr(&self) -> f32 {
        self.optimizer.lr()
    }

    /// Set learning rate on both optimizers
    pub fn set_lr(&mut self, lr: f32) {
        self.optimizer.set_lr(lr);
        self.optimizer_rev.set_lr(lr);
    }

    /// Forward model
    pub fn model(&self) -> &dyn Seq2SeqModel {
        self.model.as_ref()
    }

    /// Reverse model
    pub fn model_rev(&self) -> &dyn Seq2SeqModel {
        self.model_rev.as_ref()
    }

    /// Mutable forward model
    pub fn model_mut(&mut self) -> &mut dyn Seq2SeqModel {
        self.model.as_mut()
    }

    /// Mutable reverse model
    pub fn model_rev_mut(&mut self) -> &mut dyn Seq2SeqModel {
        self.model_rev.as_mut()
    }

    /// Forward optimizer
    pub fn optimizer(&self) -> &dyn Optimizer {
        self.optimizer.as_ref()
    }

    /// Reverse optimizer
    pub fn optimizer_rev(&self) -> &dyn Optimizer {
        self.optimizer_rev.as_ref()
    }

    /// Mutable forward optimizer
    pub fn optimizer_mut(&mut self) -> &mut dyn Optimizer {
        self.optimizer.as_mut()
    }

    /// Mutable reverse optimizer
    pub fn optimizer_rev_mut(&mut self) -> &mut dyn Optimizer {
        self.optimizer_rev.as_mut()
    }

    /// Put both models in training mode
    pub fn train_mode(&mut self) {
        self.model.train();
        self.model_rev.train();
    }

    /// Put both models in evaluation mode
    pub fn eval_mode(&mut self) {
        self.model.eval();
        self.model_rev.eval();
    }

    /// Drop accumulated gradients of both models
    pub(crate) fn zero_grad(&mut self) {
        self.optimizer.zero_grad(&mut self.model.parameters_mut());
        self.optimizer_rev.zero_grad(&mut self.model_rev.parameters_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::tiny_trainer;
    use super::*;

    #[test]
    fn test_trainer_creation() {
        let trainer = tiny_trainer();
        assert_eq!(trainer.lr(), 0.01);
        assert_eq!(trainer.clip_norm(), 4.0);
        assert_eq!(trainer.reverse_update(), ReverseUpdate::Independent);
        assert!(trainer.model().is_training());
    }

    #[test]
    fn test_set_lr_applies_to_both_directions() {
        let mut trainer = tiny_trainer();
        trainer.set_lr(0.5);
        assert_eq!(trainer.optimizer().lr(), 0.5);
        assert_eq!(trainer.optimizer_rev().lr(), 0.5);
    }

    #[test]
    fn test_mode_switches_both_models() {
        let mut trainer = tiny_trainer();
        trainer.eval_mode();
        assert!(!trainer.model().is_training());
        assert!(!trainer.model_rev().is_training());
        trainer.train_mode();
        assert!(trainer.model().is_training());
        assert!(trainer.model_rev().is_training());
    }

    #[test]
    fn test_with_reverse_update() {
        let trainer = tiny_trainer().with_reverse_update(ReverseUpdate::Frozen);
        assert_eq!(trainer.reverse_update(), ReverseUpdate::Frozen);
    }

    #[test]
    fn test_reverse_update_serde_names() {
        let yaml = serde_yaml::to_string(&ReverseUpdate::Frozen).unwrap();
        assert_eq!(yaml.trim(), "frozen");
    }
}
