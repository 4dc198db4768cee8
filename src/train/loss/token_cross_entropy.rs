//! Token-level cross-entropy with padding mask

use crate::autograd::{BackwardOp, GradCell};
use crate::{Error, Result, Tensor};
use ndarray::Array1;
use std::rc::Rc;

use super::LossFn;

/// Cross-entropy summed over non-padding target positions
///
/// L = Σ_{i: y_i ≠ pad} (logsumexp(x_i) − x_i[y_i])
///
/// The sum (not mean) is returned; callers divide by batch size or token
/// count as they need.
///
/// # Example
///
/// ```
/// use entrenar_dual::train::{LossFn, TokenCrossEntropy};
/// use entrenar_dual::Tensor;
///
/// let loss_fn = TokenCrossEntropy::new(0);
/// let logits = Tensor::from_vec(vec![0.0; 2 * 4], true); // 2 positions, vocab 4
/// let loss = loss_fn.forward(&logits, &[3, 0]).unwrap(); // second position is padding
/// assert!((loss.item() - 4f32.ln()).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TokenCrossEntropy {
    pad_idx: u32,
}

impl TokenCrossEntropy {
    /// Create a loss that ignores `pad_idx` targets
    pub fn new(pad_idx: u32) -> Self {
        Self { pad_idx }
    }

    /// Padding id ignored by the loss
    pub fn pad_idx(&self) -> u32 {
        self.pad_idx
    }
}

impl LossFn for TokenCrossEntropy {
    fn forward(&self, logits: &Tensor, targets: &[u32]) -> Result<Tensor> {
        let positions = targets.len();
        if positions == 0 || logits.len() % positions != 0 || logits.is_empty() {
            return Err(Error::ShapeMismatch {
                context: "cross-entropy logits",
                expected: vec![positions],
                actual: vec![logits.len()],
            });
        }
        let vocab = logits.len() / positions;
        let data = logits.as_slice()?;

        let mut total = 0.0f64;
        let mut grad = vec![0.0f32; logits.len()];

        for (pos, &target) in targets.iter().enumerate() {
            if target == self.pad_idx {
                continue;
            }
            let t = target as usize;
            if t >= vocab {
                return Err(Error::MalformedBatch(format!(
                    "target id {target} >= vocabulary size {vocab}"
                )));
            }
            let row = &data[pos * vocab..(pos + 1) * vocab];
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let sum: f32 = row.iter().map(|&x| (x - max).exp()).sum();
            let log_z = max + sum.ln();
            total += f64::from(log_z - row[t]);

            // ∂L/∂x = softmax(x) − onehot(y)
            let g = &mut grad[pos * vocab..(pos + 1) * vocab];
            for (gi, &x) in g.iter_mut().zip(row) {
                *gi = (x - log_z).exp();
            }
            g[t] -= 1.0;
        }

        let mut loss = Tensor::from_vec(vec![total as f32], logits.requires_grad());
        if logits.requires_grad() {
            loss.set_backward_op(Rc::new(TokenCrossEntropyBackward {
                logits_grad: logits.grad_cell(),
                logits_op: logits.backward_op(),
                local_grad: Array1::from(grad),
                result_grad: loss.grad_cell(),
            }));
        }
        Ok(loss)
    }

    fn name(&self) -> &'static str {
        "TokenCrossEntropy"
    }
}

struct TokenCrossEntropyBackward {
    logits_grad: GradCell,
    logits_op: Option<Rc<dyn BackwardOp>>,
    local_grad: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for TokenCrossEntropyBackward {
    fn backward(&self) {
        let upstream = match self.result_grad.borrow().as_ref() {
            Some(g) => g[0],
            None => return,
        };
        {
            let scaled = &self.local_grad * upstream;
            let mut slot = self.logits_grad.borrow_mut();
            match slot.as_mut() {
                Some(existing) => *existing += &scaled,
                None => *slot = Some(scaled),
            }
        }
        if let Some(op) = &self.logits_op {
            op.backward();
        }
    }
}
