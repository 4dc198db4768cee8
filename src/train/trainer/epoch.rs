//! Epoch-level training and validation operations

use super::core::DualTrainer;
use crate::train::{Batch, EpochStats, RunningStats, ValidationStats};
use crate::Result;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

impl DualTrainer {
    /// Train for one epoch
    ///
    /// Empty batches are skipped silently, malformed ones with a warning;
    /// neither contributes to the statistics. The progress bar advances once
    /// per batch and shows the running averages.
    ///
    /// # Returns
    ///
    /// Averages over the processed batches
    pub fn train_epoch<I>(&mut self, epoch: usize, batches: I, progress: &ProgressBar) -> Result<EpochStats>
    where
        I: IntoIterator<Item = Batch>,
    {
        self.train_mode();
        let mut stats = RunningStats::new();

        for batch in batches {
            progress.inc(1);
            if batch.is_empty() {
                continue;
            }
            match self.train_step(&batch) {
                Ok(report) => {
                    stats.push(&report);
                    let avg = stats.averages();
                    progress.set_message(format!(
                        "loss {:.4} | grad_norm {:.4} | clip {:.3}",
                        avg.loss, avg.grad_norm, avg.clip
                    ));
                    debug!(epoch, loss = report.loss, d = report.penalty.forward, d_rev = report.penalty.reverse, "step");
                }
                Err(e) if e.is_batch_local() => {
                    warn!(epoch, batch = ?batch.ids, "skipping batch: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        let averages = stats.averages();
        info!("Epoch {epoch:03}: {averages}");
        Ok(averages)
    }

    /// Validate on a held-out set without updating parameters
    ///
    /// Both models run in evaluation mode and are switched back to training
    /// mode on exit, also when an error is returned. The per-batch loss is
    /// `CE_fwd + d + CE_rev/B + d_rev`.
    pub fn validate<I>(&mut self, epoch: usize, batches: I) -> Result<ValidationStats>
    where
        I: IntoIterator<Item = Batch>,
    {
        self.eval_mode();
        let result = self.validation_pass(batches);
        self.train_mode();

        let stats = result?;
        info!("Epoch {epoch:03}: {stats}");
        Ok(stats)
    }

    fn validation_pass<I>(&self, batches: I) -> Result<ValidationStats>
    where
        I: IntoIterator<Item = Batch>,
    {
        let mut stats = ValidationStats::default();

        for batch in batches {
            if batch.is_empty() {
                continue;
            }
            let losses = match self.pair_losses(&batch) {
                Ok(losses) => losses,
                Err(e) if e.is_batch_local() => {
                    warn!(batch = ?batch.ids, "skipping validation batch: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let b = batch.size() as f64;
            stats.loss += f64::from(losses.ce_forward.item())
                + losses.penalty.forward
                + f64::from(losses.ce_reverse.item()) / b
                + losses.penalty.reverse;
            stats.num_tokens += batch.num_tokens;
            stats.num_sentences += batch.size();
        }

        stats.perplexity = if stats.num_tokens == 0 {
            warn!("validation set produced no tokens");
            f64::INFINITY
        } else {
            stats.per_token_loss().exp()
        };
        Ok(stats)
    }
}
