//! Length-bucketing batch sampler

use super::dataset::Seq2SeqDataset;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Groups examples of similar length under a token and sentence budget.
///
/// Examples are sorted by size, packed greedily so that
/// `sentences * longest_sentence <= max_tokens` and
/// `sentences <= batch_size`, then the batch order is shuffled with a fixed
/// seed. The same seed is used every epoch, so the order repeats.
#[derive(Debug, Clone)]
pub struct BatchSampler {
    max_tokens: Option<usize>,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
}

impl BatchSampler {
    /// Create a sampler; `batch_size` of zero is treated as one
    pub fn new(max_tokens: Option<usize>, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        Self { max_tokens, batch_size: batch_size.max(1), shuffle, seed }
    }

    /// Index lists, one per batch
    pub fn batches(&self, dataset: &Seq2SeqDataset) -> Vec<Vec<usize>> {
        let mut order: Vec<usize> = (0..dataset.len()).collect();
        order.sort_by_key(|&i| (dataset.num_tokens(i), dataset.src_len(i)));

        let mut batches = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut longest = 0;

        for idx in order {
            let size = dataset.num_tokens(idx);
            let widened = longest.max(size);
            let over_tokens =
                self.max_tokens.is_some_and(|budget| (current.len() + 1) * widened > budget);
            if !current.is_empty() && (current.len() == self.batch_size || over_tokens) {
                batches.push(std::mem::take(&mut current));
                longest = 0;
            }
            longest = longest.max(size);
            current.push(idx);
        }
        if !current.is_empty() {
            batches.push(current);
        }

        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed);
            batches.shuffle(&mut rng);
        }
        batches
    }
}
