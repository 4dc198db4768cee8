//! Per-step reports and per-epoch aggregates

use super::alignment::AlignmentPenalty;
use serde::Serialize;
use std::fmt;

/// Outcome of one training step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Combined loss `CE_fwd/B + d + CE_rev/B + d_rev`
    pub loss: f64,
    /// Summed forward cross-entropy
    pub ce_forward: f64,
    /// Summed reverse cross-entropy
    pub ce_reverse: f64,
    /// Alignment penalties added to the loss
    pub penalty: AlignmentPenalty,
    /// Sentences in the batch
    pub batch_size: usize,
    /// Non-padding target tokens in the batch
    pub num_tokens: usize,
    /// Learning rate used for the update
    pub lr: f64,
    /// Forward-model gradient norm before clipping
    pub grad_norm: f64,
    /// Whether clipping was applied
    pub clipped: bool,
}

impl StepReport {
    /// Loss without the alignment terms, per target token
    pub fn per_token_loss(&self) -> f64 {
        (self.loss - self.penalty.forward - self.penalty.reverse) * self.batch_size as f64
            / self.num_tokens as f64
    }
}

/// Running sums of the per-batch statistics of one epoch
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    loss: f64,
    lr: f64,
    num_tokens: f64,
    batch_size: f64,
    grad_norm: f64,
    clip: f64,
    batches: usize,
}

impl RunningStats {
    /// Empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one processed batch
    pub fn push(&mut self, step: &StepReport) {
        self.loss += step.per_token_loss();
        self.lr += step.lr;
        self.num_tokens += step.num_tokens as f64 / step.batch_size as f64;
        self.batch_size += step.batch_size as f64;
        self.grad_norm += step.grad_norm;
        self.clip += if step.clipped { 1.0 } else { 0.0 };
        self.batches += 1;
    }

    /// Number of batches pushed
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Averages over the pushed batches
    pub fn averages(&self) -> EpochStats {
        let n = self.batches.max(1) as f64;
        EpochStats {
            loss: self.loss / n,
            lr: self.lr / n,
            num_tokens: self.num_tokens / n,
            batch_size: self.batch_size / n,
            grad_norm: self.grad_norm / n,
            clip: self.clip / n,
            batches: self.batches,
        }
    }
}

/// Epoch averages of the training statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpochStats {
    /// Per-token loss without alignment terms
    pub loss: f64,
    /// Learning rate
    pub lr: f64,
    /// Target tokens per sentence
    pub num_tokens: f64,
    /// Sentences per batch
    pub batch_size: f64,
    /// Gradient norm before clipping
    pub grad_norm: f64,
    /// Fraction of steps that were clipped
    pub clip: f64,
    /// Batches that contributed
    pub batches: usize,
}

impl EpochStats {
    /// Named values in reporting order
    pub fn fields(&self) -> [(&'static str, f64); 6] {
        [
            ("loss", self.loss),
            ("lr", self.lr),
            ("num_tokens", self.num_tokens),
            ("batch_size", self.batch_size),
            ("grad_norm", self.grad_norm),
            ("clip", self.clip),
        ]
    }
}

impl fmt::Display for EpochStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> =
            self.fields().iter().map(|(name, value)| format!("{name} {value:.4}")).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

/// Aggregate of one validation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationStats {
    /// Summed validation loss
    pub loss: f64,
    /// Non-padding target tokens seen
    pub num_tokens: usize,
    /// Sentences seen
    pub num_sentences: usize,
    /// `exp(loss / num_tokens)`
    pub perplexity: f64,
}

impl ValidationStats {
    /// Per-token validation loss
    pub fn per_token_loss(&self) -> f64 {
        self.loss / self.num_tokens as f64
    }

    /// Target tokens per sentence
    pub fn tokens_per_sentence(&self) -> f64 {
        self.num_tokens as f64 / self.num_sentences.max(1) as f64
    }
}

impl fmt::Display for ValidationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "valid_loss {:.3} | num_tokens {:.3} | batch_size {} | valid_perplexity {:.3}",
            self.per_token_loss(),
            self.tokens_per_sentence(),
            self.num_sentences,
            self.perplexity
        )
    }
}
