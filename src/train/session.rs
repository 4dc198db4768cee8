//! Corpus-backed epoch hooks for the training controller

use super::controller::{EpochHooks, TrainingState};
use super::{DualTrainer, EpochStats, ValidationStats};
use crate::data::{BatchSampler, Seq2SeqDataset};
use crate::io::{CheckpointManager, RestoredState};
use crate::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// A trainer bound to its training and validation corpora and checkpoint
/// files
pub struct DualSession {
    trainer: DualTrainer,
    train_data: Seq2SeqDataset,
    valid_data: Seq2SeqDataset,
    train_sampler: BatchSampler,
    valid_sampler: BatchSampler,
    checkpoints: CheckpointManager,
    show_progress: bool,
}

impl DualSession {
    /// Bind a trainer to its data and checkpoints
    pub fn new(
        trainer: DualTrainer,
        train_data: Seq2SeqDataset,
        valid_data: Seq2SeqDataset,
        train_sampler: BatchSampler,
        valid_sampler: BatchSampler,
        checkpoints: CheckpointManager,
    ) -> Self {
        Self {
            trainer,
            train_data,
            valid_data,
            train_sampler,
            valid_sampler,
            checkpoints,
            show_progress: true,
        }
    }

    /// Show or hide the per-epoch progress bar
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Load the latest checkpoints into the trainer
    pub fn restore(&mut self) -> Option<RestoredState> {
        self.checkpoints.restore(&mut self.trainer)
    }

    /// The trainer
    pub fn trainer(&self) -> &DualTrainer {
        &self.trainer
    }

    /// Give back the trainer
    pub fn into_trainer(self) -> DualTrainer {
        self.trainer
    }

    fn progress_bar(&self, epoch: usize, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("| Epoch {prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_prefix(format!("{epoch:03}"));
        pb
    }
}

impl EpochHooks for DualSession {
    fn train_epoch(&mut self, epoch: usize) -> Result<EpochStats> {
        let batches = self.train_sampler.batches(&self.train_data);
        let progress = self.progress_bar(epoch, batches.len());
        let data = &self.train_data;

        let result = self.trainer.train_epoch(
            epoch,
            batches.iter().map(|indices| data.collate(indices)),
            &progress,
        );
        progress.finish_and_clear();
        result
    }

    fn validate(&mut self, epoch: usize) -> Result<ValidationStats> {
        let batches = self.valid_sampler.batches(&self.valid_data);
        let data = &self.valid_data;
        self.trainer.validate(epoch, batches.iter().map(|indices| data.collate(indices)))
    }

    fn save_checkpoint(&mut self, epoch: usize, state: &TrainingState, valid: &ValidationStats) -> Result<()> {
        self.checkpoints.save(&self.trainer, epoch, state.best_validate, valid.perplexity)
    }
}
