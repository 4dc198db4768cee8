//! Forward/reverse checkpoint files of a dual training run

use super::load::load_checkpoint;
use super::model::{optimizer_incompatibility, CheckpointState};
use super::save::save_checkpoint;
use crate::model::Seq2SeqModel;
use crate::optim::Optimizer;
use crate::train::DualTrainer;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Resume point read from the forward checkpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestoredState {
    /// Last completed epoch
    pub last_epoch: usize,
    /// Lowest validation perplexity so far
    pub best_validate: f64,
}

/// Saves and restores the checkpoint files of both directions
///
/// Files under `save_dir`:
/// - `restore_file` / `restore_file_rev`: latest state, rewritten every save
/// - `checkpoint_best.json` / `checkpoint_best_rev.json`: state of the best epoch
/// - `checkpoint{epoch}_{ppl}.json` / `..._rev.json`: one per epoch, when enabled
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    save_dir: PathBuf,
    restore_file: String,
    restore_file_rev: String,
    no_save: bool,
    epoch_checkpoints: bool,
}

impl CheckpointManager {
    /// Manager with the default file names
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            restore_file: "checkpoint_last.json".to_string(),
            restore_file_rev: "checkpoint_last_rev.json".to_string(),
            no_save: false,
            epoch_checkpoints: false,
        }
    }

    /// Override the latest-state file names
    pub fn with_restore_files(mut self, forward: impl Into<String>, reverse: impl Into<String>) -> Self {
        self.restore_file = forward.into();
        self.restore_file_rev = reverse.into();
        self
    }

    /// Disable all writes
    pub fn with_no_save(mut self, no_save: bool) -> Self {
        self.no_save = no_save;
        self
    }

    /// Keep one file pair per epoch
    pub fn with_epoch_checkpoints(mut self, enabled: bool) -> Self {
        self.epoch_checkpoints = enabled;
        self
    }

    /// Checkpoint directory
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Latest forward checkpoint
    pub fn last_path(&self) -> PathBuf {
        self.save_dir.join(&self.restore_file)
    }

    /// Latest reverse checkpoint
    pub fn last_rev_path(&self) -> PathBuf {
        self.save_dir.join(&self.restore_file_rev)
    }

    /// Best forward checkpoint
    pub fn best_path(&self) -> PathBuf {
        self.save_dir.join("checkpoint_best.json")
    }

    /// Best reverse checkpoint
    pub fn best_rev_path(&self) -> PathBuf {
        self.save_dir.join("checkpoint_best_rev.json")
    }

    /// Per-epoch checkpoint pair
    pub fn epoch_paths(&self, epoch: usize, val_loss: f64) -> (PathBuf, PathBuf) {
        (
            self.save_dir.join(format!("checkpoint{epoch}_{val_loss:.3}.json")),
            self.save_dir.join(format!("checkpoint{epoch}_{val_loss:.3}_rev.json")),
        )
    }

    /// Write the checkpoints of both directions for `epoch`
    ///
    /// `best_validate` is the best perplexity including this epoch; the best
    /// files are rewritten when `val_loss` reaches it.
    pub fn save(&self, trainer: &DualTrainer, epoch: usize, best_validate: f64, val_loss: f64) -> Result<()> {
        if self.no_save {
            return Ok(());
        }

        let forward = CheckpointState::capture(
            trainer.model(),
            trainer.optimizer().state(),
            epoch,
            best_validate,
            val_loss,
        );
        let reverse = CheckpointState::capture(
            trainer.model_rev(),
            trainer.optimizer_rev().state(),
            epoch,
            best_validate,
            val_loss,
        );

        save_checkpoint(&forward, self.last_path())?;
        save_checkpoint(&reverse, self.last_rev_path())?;

        if val_loss.is_finite() && val_loss <= best_validate {
            save_checkpoint(&forward, self.best_path())?;
            save_checkpoint(&reverse, self.best_rev_path())?;
        }

        if self.epoch_checkpoints {
            let (fwd_path, rev_path) = self.epoch_paths(epoch, val_loss);
            save_checkpoint(&forward, fwd_path)?;
            save_checkpoint(&reverse, rev_path)?;
        }

        info!(epoch, dir = %self.save_dir.display(), "saved checkpoints");
        Ok(())
    }

    /// Load the latest checkpoints into `trainer`
    ///
    /// Forward and reverse files are restored independently. A missing file
    /// leaves that direction untouched; a file that cannot be read or does
    /// not fit the model is reported and ignored. The resume point comes from
    /// the forward file only.
    pub fn restore(&self, trainer: &mut DualTrainer) -> Option<RestoredState> {
        let restored = match restore_direction(
            &self.last_path(),
            trainer.model.as_mut(),
            trainer.optimizer.as_mut(),
        ) {
            Ok(Some(state)) => Some(RestoredState {
                last_epoch: state.epoch,
                best_validate: state.best_validate(),
            }),
            Ok(None) => None,
            Err(e) => {
                warn!("ignoring forward checkpoint: {e}");
                None
            }
        };

        if let Err(e) = restore_direction(
            &self.last_rev_path(),
            trainer.model_rev.as_mut(),
            trainer.optimizer_rev.as_mut(),
        ) {
            warn!("ignoring reverse checkpoint: {e}");
        }

        restored
    }
}

/// Load one checkpoint file into a model and its optimizer
///
/// Nothing is applied unless both the parameters and the optimizer moments
/// fit.
fn restore_direction(
    path: &Path,
    model: &mut dyn Seq2SeqModel,
    optimizer: &mut dyn Optimizer,
) -> Result<Option<CheckpointState>> {
    if !path.exists() {
        info!(path = %path.display(), "no checkpoint found");
        return Ok(None);
    }

    let state = load_checkpoint(path)?;
    let mismatch = state
        .model
        .incompatibility(&*model)
        .or_else(|| optimizer_incompatibility(&state.optimizer, &*model));
    if let Some(message) = mismatch {
        return Err(Error::Checkpoint { path: path.to_path_buf(), message });
    }

    optimizer.load_state(state.optimizer.clone())?;
    state.model.apply(model);
    info!(path = %path.display(), epoch = state.epoch, "loaded checkpoint");
    Ok(Some(state))
}
