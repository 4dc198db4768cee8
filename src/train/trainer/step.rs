//! Training step operations

use super::core::{DualTrainer, ReverseUpdate};
use crate::autograd::{add, affine, backward};
use crate::optim::clip_grad_norm;
use crate::train::alignment::{alignment_penalty, AlignmentPenalty};
use crate::train::shift::shift_for_reverse;
use crate::train::{Batch, StepReport};
use crate::{Error, Result, Tensor};

/// Losses of both directions on one batch, before combination
pub(crate) struct PairLosses {
    /// Summed forward cross-entropy (on the tape in training mode)
    pub ce_forward: Tensor,
    /// Summed reverse cross-entropy (on the tape in training mode)
    pub ce_reverse: Tensor,
    /// Alignment penalties, constants
    pub penalty: AlignmentPenalty,
}

impl DualTrainer {
    /// Run both models on a batch and score them
    ///
    /// The reverse model reads `tgt_tokens` with shifted lengths and is
    /// teacher-forced on the rotated source row.
    pub(crate) fn pair_losses(&self, batch: &Batch) -> Result<PairLosses> {
        batch.validate()?;

        let fwd =
            self.model.forward(batch.src_tokens.view(), &batch.src_lengths, batch.tgt_inputs.view())?;

        let rev_inputs =
            shift_for_reverse(batch.src_tokens.view(), &batch.src_lengths, batch.tgt_len())?;
        let rev = self.model_rev.forward(
            batch.tgt_tokens.view(),
            &rev_inputs.tgt_lengths_adjusted,
            rev_inputs.src_inputs_rotated.view(),
        )?;

        let penalty = alignment_penalty(
            fwd.attention.view(),
            fwd.encoder_out.view(),
            rev.attention.view(),
            rev.encoder_out.view(),
        )?;

        let tgt_targets: Vec<u32> = batch.tgt_tokens.iter().copied().collect();
        let src_targets: Vec<u32> = batch.src_tokens.iter().copied().collect();
        let ce_forward = self.criterion.forward(&fwd.logits, &tgt_targets)?;
        let ce_reverse = self.criterion_rev.forward(&rev.logits, &src_targets)?;

        Ok(PairLosses { ce_forward, ce_reverse, penalty })
    }

    /// Perform a single training step
    ///
    /// `loss = CE_fwd/B + d + CE_rev/B + d_rev`, one backward pass, clip the
    /// forward gradients (and the reverse ones unless frozen), step, clear
    /// gradients.
    ///
    /// Empty batches are rejected with `MalformedBatch`; callers skip them
    /// before stepping.
    pub fn train_step(&mut self, batch: &Batch) -> Result<StepReport> {
        if batch.is_empty() {
            return Err(Error::MalformedBatch("empty batch".to_string()));
        }
        self.zero_grad();

        let losses = self.pair_losses(batch)?;
        let b = batch.size() as f32;
        let inv_b = 1.0 / b;

        let forward_term = affine(&losses.ce_forward, inv_b, losses.penalty.forward as f32);
        let reverse_term = affine(&losses.ce_reverse, inv_b, losses.penalty.reverse as f32);
        let mut loss = add(&forward_term, &reverse_term);
        let loss_value = loss.item();

        backward(&mut loss, None);

        let grad_norm = {
            let mut params = self.model.parameters_mut();
            let norm = clip_grad_norm(&mut params, self.clip_norm);
            self.optimizer.step(&mut params);
            norm
        };

        if self.reverse_update == ReverseUpdate::Independent {
            let mut params = self.model_rev.parameters_mut();
            clip_grad_norm(&mut params, self.clip_norm);
            self.optimizer_rev.step(&mut params);
        }

        self.zero_grad();

        Ok(StepReport {
            loss: f64::from(loss_value),
            ce_forward: f64::from(losses.ce_forward.item()),
            ce_reverse: f64::from(losses.ce_reverse.item()),
            penalty: losses.penalty,
            batch_size: batch.size(),
            num_tokens: batch.num_tokens,
            lr: f64::from(self.lr()),
            grad_norm: f64::from(grad_norm),
            clipped: grad_norm > self.clip_norm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{pair_batch, tiny_trainer};
    use super::*;
    use approx::assert_relative_eq;

    fn snapshot(model: &dyn crate::model::Seq2SeqModel) -> Vec<Vec<f32>> {
        model.named_parameters().iter().map(|(_, t)| t.data().to_vec()).collect()
    }

    #[test]
    fn test_report_loss_is_sum_of_its_components() {
        let mut trainer = tiny_trainer();
        let batch = pair_batch();
        let b = batch.size() as f64;

        let report = trainer.train_step(&batch).unwrap();
        let expected = report.ce_forward / b
            + report.penalty.forward
            + report.ce_reverse / b
            + report.penalty.reverse;
        assert_relative_eq!(report.loss, expected, max_relative = 1e-5);
        assert_eq!(report.batch_size, 2);
        assert_eq!(report.num_tokens, batch.num_tokens);
    }

    #[test]
    fn test_step_updates_both_models_when_independent() {
        let mut trainer = tiny_trainer();
        let before_fwd = snapshot(trainer.model());
        let before_rev = snapshot(trainer.model_rev());

        trainer.train_step(&pair_batch()).unwrap();

        assert_ne!(snapshot(trainer.model()), before_fwd);
        assert_ne!(snapshot(trainer.model_rev()), before_rev);
    }

    #[test]
    fn test_frozen_reverse_model_is_not_updated() {
        let mut trainer = tiny_trainer().with_reverse_update(ReverseUpdate::Frozen);
        let before_fwd = snapshot(trainer.model());
        let before_rev = snapshot(trainer.model_rev());

        trainer.train_step(&pair_batch()).unwrap();

        assert_ne!(snapshot(trainer.model()), before_fwd);
        assert_eq!(snapshot(trainer.model_rev()), before_rev);
    }

    #[test]
    fn test_gradients_cleared_after_step() {
        let mut trainer = tiny_trainer().with_reverse_update(ReverseUpdate::Frozen);
        trainer.train_step(&pair_batch()).unwrap();
        for (_, p) in trainer.model().named_parameters() {
            assert!(p.grad().is_none());
        }
        for (_, p) in trainer.model_rev().named_parameters() {
            assert!(p.grad().is_none());
        }
    }

    #[test]
    fn test_clip_flag_follows_threshold() {
        let mut trainer = tiny_trainer();
        trainer.clip_norm = 1e-6;
        let report = trainer.train_step(&pair_batch()).unwrap();
        assert!(report.clipped);
        assert!(report.grad_norm > 1e-6);

        let mut trainer = tiny_trainer();
        trainer.clip_norm = 1e6;
        assert!(!trainer.train_step(&pair_batch()).unwrap().clipped);
    }

    #[test]
    fn test_repeated_steps_reduce_loss() {
        let mut trainer = tiny_trainer();
        let batch = pair_batch();
        let first = trainer.train_step(&batch).unwrap();
        let mut last = first;
        for _ in 0..30 {
            last = trainer.train_step(&batch).unwrap();
        }
        assert!(last.ce_forward < first.ce_forward);
        assert!(last.ce_reverse < first.ce_reverse);
    }

    #[test]
    fn test_empty_batch_rejected() {
        let mut trainer = tiny_trainer();
        let err = trainer.train_step(&Batch::empty()).unwrap_err();
        assert!(err.is_batch_local());
    }

    #[test]
    fn test_negative_reverse_length_is_batch_local() {
        let mut trainer = tiny_trainer();
        let mut batch = pair_batch();
        // Shrink the target side so that T - S pushes a length below 1
        batch.tgt_tokens = batch.tgt_tokens.slice(ndarray::s![.., ..1]).to_owned();
        batch.tgt_inputs = batch.tgt_inputs.slice(ndarray::s![.., ..1]).to_owned();
        let err = trainer.train_step(&batch).unwrap_err();
        assert!(matches!(err, Error::MalformedBatch(_)));
    }
}
