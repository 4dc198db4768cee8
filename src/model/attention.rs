//! Single-layer dot-product attention encoder/decoder
//!
//! encoder:   e_s = E_src[x_s]
//! decoder:   d_t = E_tgt[y_t]
//! attention: a_t = softmax_{s < len}(d_t · e_s / √H)
//! output:    logits_t = tanh(Σ_s a_ts e_s + d_t) · W + b
//!
//! The backward pass is written out by hand and attached to the logits as a
//! single tape node.

use super::{ModelConfig, Seq2SeqModel, Seq2SeqOutput};
use crate::autograd::{matmul, matmul_at, matmul_at_acc, matmul_bt, BackwardOp, GradCell, Mode, Tensor};
use crate::{Error, Result};
use ndarray::{Array1, Array3, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;

/// Reference attention model used by the `attention*` architectures
pub struct AttentionSeq2Seq {
    config: ModelConfig,
    src_vocab: usize,
    tgt_vocab: usize,
    src_embed: Tensor,
    tgt_embed: Tensor,
    out_proj: Tensor,
    out_bias: Tensor,
    mode: Mode,
}

impl AttentionSeq2Seq {
    /// Create a model with weights drawn uniformly from ±1/√H
    pub fn new(config: ModelConfig, src_vocab: usize, tgt_vocab: usize, seed: u64) -> Self {
        let h = config.embed_dim.max(1);
        let scale = (1.0 / h as f32).sqrt();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut uniform = |n: usize| {
            Tensor::from_vec((0..n).map(|_| rng.random_range(-scale..scale)).collect(), true)
        };

        let src_embed = uniform(src_vocab * h);
        let tgt_embed = uniform(tgt_vocab * h);
        let out_proj = uniform(h * tgt_vocab);

        Self {
            config: ModelConfig { embed_dim: h, ..config },
            src_vocab,
            tgt_vocab,
            src_embed,
            tgt_embed,
            out_proj,
            out_bias: Tensor::zeros(tgt_vocab, true),
            mode: Mode::Train,
        }
    }

    /// Registry builder
    pub fn build(
        config: &ModelConfig,
        src_vocab: usize,
        tgt_vocab: usize,
        seed: u64,
    ) -> Box<dyn Seq2SeqModel> {
        Box::new(Self::new(config.clone(), src_vocab, tgt_vocab, seed))
    }

    /// Source vocabulary size
    pub fn src_vocab(&self) -> usize {
        self.src_vocab
    }

    /// Target vocabulary size
    pub fn tgt_vocab(&self) -> usize {
        self.tgt_vocab
    }
}

/// Gather embedding rows for a token sequence
fn embed_rows(
    table: &[f32],
    tokens: ArrayView1<'_, u32>,
    vocab: usize,
    hidden: usize,
) -> Result<Vec<f32>> {
    let mut out = Vec::with_capacity(tokens.len() * hidden);
    for &tok in tokens {
        let idx = tok as usize;
        if idx >= vocab {
            return Err(Error::MalformedBatch(format!("token id {tok} >= vocabulary size {vocab}")));
        }
        out.extend_from_slice(&table[idx * hidden..(idx + 1) * hidden]);
    }
    Ok(out)
}

/// Row-wise softmax of `scores * scale` over the first `len` columns; the
/// remaining columns get zero weight
fn masked_softmax(scores: &[f32], out: &mut [f32], rows: usize, cols: usize, len: usize, scale: f32) {
    for i in 0..rows {
        let row = &scores[i * cols..i * cols + len];
        let out_row = &mut out[i * cols..(i + 1) * cols];
        let max = row.iter().map(|&x| x * scale).fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for (o, &x) in out_row.iter_mut().zip(row) {
            *o = (x * scale - max).exp();
            sum += *o;
        }
        for o in &mut out_row[..len] {
            *o /= sum;
        }
        for o in &mut out_row[len..] {
            *o = 0.0;
        }
    }
}

fn shaped(dims: (usize, usize, usize), data: Vec<f32>, context: &'static str) -> Result<Array3<f32>> {
    let actual = data.len();
    Array3::from_shape_vec(dims, data).map_err(|_| Error::ShapeMismatch {
        context,
        expected: vec![dims.0, dims.1, dims.2],
        actual: vec![actual],
    })
}

fn accumulate(cell: &GradCell, grad: Vec<f32>) {
    let grad = Array1::from(grad);
    let mut slot = cell.borrow_mut();
    match slot.as_mut() {
        Some(existing) => *existing += &grad,
        None => *slot = Some(grad),
    }
}

impl Seq2SeqModel for AttentionSeq2Seq {
    fn forward(
        &self,
        src_tokens: ArrayView2<'_, u32>,
        src_lengths: &[usize],
        decoder_inputs: ArrayView2<'_, u32>,
    ) -> Result<Seq2SeqOutput> {
        let (b, s) = src_tokens.dim();
        let (b_dec, t) = decoder_inputs.dim();
        if b_dec != b || src_lengths.len() != b {
            return Err(Error::ShapeMismatch {
                context: "attention forward batch size",
                expected: vec![b, b],
                actual: vec![b_dec, src_lengths.len()],
            });
        }
        if b == 0 || s == 0 || t == 0 {
            return Err(Error::MalformedBatch(format!("empty input [{b}, {s}] -> [{b}, {t}]")));
        }

        let h = self.config.embed_dim;
        let v = self.tgt_vocab;
        let inv_sqrt = 1.0 / (h as f32).sqrt();
        let src_table = self.src_embed.as_slice()?;
        let tgt_table = self.tgt_embed.as_slice()?;
        let proj = self.out_proj.as_slice()?;
        let bias = self.out_bias.data();

        let mut enc_all = Vec::with_capacity(b * s * h);
        let mut dec_all = Vec::with_capacity(b * t * h);
        let mut hid_all = Vec::with_capacity(b * t * h);
        let mut att_all = vec![0.0f32; b * t * s];
        let mut logits = Vec::with_capacity(b * t * v);

        for row in 0..b {
            let enc = embed_rows(src_table, src_tokens.row(row), self.src_vocab, h)?;
            let dec = embed_rows(tgt_table, decoder_inputs.row(row), v, h)?;

            let scores = matmul_bt(&dec, &enc, t, h, s);
            let att = &mut att_all[row * t * s..(row + 1) * t * s];
            masked_softmax(&scores, att, t, s, src_lengths[row].clamp(1, s), inv_sqrt);

            let context = matmul(att, &enc, t, s, h);
            let hidden: Vec<f32> =
                context.iter().zip(&dec).map(|(c, d)| (c + d).tanh()).collect();

            let mut out = matmul(&hidden, proj, t, h, v);
            for (i, o) in out.iter_mut().enumerate() {
                *o += bias[i % v];
            }

            logits.extend(out);
            enc_all.extend(enc);
            dec_all.extend(dec);
            hid_all.extend(hidden);
        }

        let attention = shaped((b, t, s), att_all.clone(), "attention weights")?;
        let encoder_out = shaped((b, s, h), enc_all.clone(), "encoder outputs")?
            .permuted_axes([1, 0, 2])
            .as_standard_layout()
            .into_owned();

        let record = self.mode.records_tape();
        let mut logits = Tensor::from_vec(logits, record);
        if record {
            let backward_op = Rc::new(AttentionBackward {
                batch: b,
                src_len: s,
                tgt_len: t,
                hidden: h,
                src_vocab: self.src_vocab,
                tgt_vocab: v,
                inv_sqrt,
                src_tokens: src_tokens.iter().copied().collect(),
                dec_tokens: decoder_inputs.iter().copied().collect(),
                enc: enc_all,
                dec: dec_all,
                att: att_all,
                hid: hid_all,
                out_proj: proj.to_vec(),
                src_embed_grad: self.src_embed.grad_cell(),
                tgt_embed_grad: self.tgt_embed.grad_cell(),
                out_proj_grad: self.out_proj.grad_cell(),
                out_bias_grad: self.out_bias.grad_cell(),
                result_grad: logits.grad_cell(),
            });
            logits.set_backward_op(backward_op);
        }

        Ok(Seq2SeqOutput { logits, vocab_size: v, attention, encoder_out })
    }

    fn train(&mut self) {
        self.mode = Mode::Train;
    }

    fn eval(&mut self) {
        self.mode = Mode::Eval;
    }

    fn is_training(&self) -> bool {
        self.mode.is_training()
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn named_parameters(&self) -> Vec<(&'static str, &Tensor)> {
        vec![
            ("encoder.embed_tokens", &self.src_embed),
            ("decoder.embed_tokens", &self.tgt_embed),
            ("decoder.output_projection.weight", &self.out_proj),
            ("decoder.output_projection.bias", &self.out_bias),
        ]
    }

    fn named_parameters_mut(&mut self) -> Vec<(&'static str, &mut Tensor)> {
        vec![
            ("encoder.embed_tokens", &mut self.src_embed),
            ("decoder.embed_tokens", &mut self.tgt_embed),
            ("decoder.output_projection.weight", &mut self.out_proj),
            ("decoder.output_projection.bias", &mut self.out_bias),
        ]
    }
}

/// Activations cached by the forward pass; all buffers are batch-major
struct AttentionBackward {
    batch: usize,
    src_len: usize,
    tgt_len: usize,
    hidden: usize,
    src_vocab: usize,
    tgt_vocab: usize,
    inv_sqrt: f32,
    src_tokens: Vec<u32>,
    dec_tokens: Vec<u32>,
    enc: Vec<f32>,
    dec: Vec<f32>,
    att: Vec<f32>,
    hid: Vec<f32>,
    out_proj: Vec<f32>,
    src_embed_grad: GradCell,
    tgt_embed_grad: GradCell,
    out_proj_grad: GradCell,
    out_bias_grad: GradCell,
    result_grad: GradCell,
}

impl BackwardOp for AttentionBackward {
    fn backward(&self) {
        let Some(grad) = self.result_grad.borrow().as_ref().map(|g| g.to_vec()) else {
            return;
        };
        let (s, t, h, v) = (self.src_len, self.tgt_len, self.hidden, self.tgt_vocab);

        let mut d_src = vec![0.0f32; self.src_vocab * h];
        let mut d_tgt = vec![0.0f32; v * h];
        let mut d_proj = vec![0.0f32; h * v];
        let mut d_bias = vec![0.0f32; v];

        for row in 0..self.batch {
            let dl = &grad[row * t * v..(row + 1) * t * v];
            let enc = &self.enc[row * s * h..(row + 1) * s * h];
            let dec = &self.dec[row * t * h..(row + 1) * t * h];
            let att = &self.att[row * t * s..(row + 1) * t * s];
            let hid = &self.hid[row * t * h..(row + 1) * t * h];

            // logits = hid · W + b
            matmul_at_acc(&mut d_proj, hid, dl, h, t, v);
            for (i, g) in dl.iter().enumerate() {
                d_bias[i % v] += g;
            }
            let dh = matmul_bt(dl, &self.out_proj, t, v, h);

            // hid = tanh(context + dec)
            let dpre: Vec<f32> = dh.iter().zip(hid).map(|(g, y)| g * (1.0 - y * y)).collect();

            // context = att · enc
            let datt = matmul_bt(&dpre, enc, t, h, s);
            let mut denc = matmul_at(att, &dpre, s, t, h);
            let mut ddec = dpre;

            // att = softmax(scores), masked columns carry zero weight
            let mut dscores = vec![0.0f32; t * s];
            for i in 0..t {
                let a = &att[i * s..(i + 1) * s];
                let g = &datt[i * s..(i + 1) * s];
                let dot: f32 = a.iter().zip(g).map(|(x, y)| x * y).sum();
                for j in 0..s {
                    dscores[i * s + j] = a[j] * (g[j] - dot) * self.inv_sqrt;
                }
            }

            // scores = dec · encᵀ
            let ddec_scores = matmul(&dscores, enc, t, s, h);
            let denc_scores = matmul_at(&dscores, dec, s, t, h);
            for (acc, g) in ddec.iter_mut().zip(&ddec_scores) {
                *acc += g;
            }
            for (acc, g) in denc.iter_mut().zip(&denc_scores) {
                *acc += g;
            }

            scatter_rows(&mut d_src, &self.src_tokens[row * s..(row + 1) * s], &denc, h);
            scatter_rows(&mut d_tgt, &self.dec_tokens[row * t..(row + 1) * t], &ddec, h);
        }

        accumulate(&self.src_embed_grad, d_src);
        accumulate(&self.tgt_embed_grad, d_tgt);
        accumulate(&self.out_proj_grad, d_proj);
        accumulate(&self.out_bias_grad, d_bias);
    }
}

fn scatter_rows(table_grad: &mut [f32], tokens: &[u32], rows: &[f32], hidden: usize) {
    for (pos, &tok) in tokens.iter().enumerate() {
        let base = tok as usize * hidden;
        let src = &rows[pos * hidden..(pos + 1) * hidden];
        for (acc, g) in table_grad[base..base + hidden].iter_mut().zip(src) {
            *acc += g;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::backward;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn tiny() -> AttentionSeq2Seq {
        AttentionSeq2Seq::new(ModelConfig { arch: "attention_tiny".into(), embed_dim: 4 }, 6, 5, 7)
    }

    #[test]
    fn test_forward_shapes() {
        let model = tiny();
        let src = array![[3u32, 4, 1], [5, 1, 0]];
        let dec = array![[1u32, 3], [1, 4]];

        let out = model.forward(src.view(), &[3, 2], dec.view()).unwrap();

        assert_eq!(out.logits.len(), 2 * 2 * 5);
        assert_eq!(out.vocab_size, 5);
        assert_eq!(out.attention.dim(), (2, 2, 3));
        assert_eq!(out.encoder_out.dim(), (3, 2, 4));
    }

    #[test]
    fn test_attention_rows_are_distributions_over_valid_positions() {
        let model = tiny();
        let src = array![[3u32, 4, 1], [5, 1, 0]];
        let dec = array![[1u32, 3], [1, 4]];

        let out = model.forward(src.view(), &[3, 2], dec.view()).unwrap();

        for b in 0..2 {
            for t in 0..2 {
                let row = out.attention.slice(ndarray::s![b, t, ..]);
                assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-5);
            }
        }
        // Padding position of the second sentence is masked out
        assert_eq!(out.attention[[1, 0, 2]], 0.0);
    }

    #[test]
    fn test_encoder_out_is_time_major() {
        let model = tiny();
        let src = array![[3u32, 4], [5, 1]];
        let dec = array![[1u32], [1]];
        let out = model.forward(src.view(), &[2, 2], dec.view()).unwrap();

        let table = model.src_embed.data();
        // encoder_out[s, b, :] is the embedding of src[b, s]
        for k in 0..4 {
            assert_eq!(out.encoder_out[[1, 0, k]], table[4 * 4 + k]);
            assert_eq!(out.encoder_out[[0, 1, k]], table[5 * 4 + k]);
        }
    }

    #[test]
    fn test_eval_mode_records_no_tape() {
        let mut model = tiny();
        model.eval();
        let src = array![[3u32, 1]];
        let dec = array![[1u32, 2]];
        let out = model.forward(src.view(), &[2], dec.view()).unwrap();
        assert!(out.logits.backward_op().is_none());
        assert!(!out.logits.requires_grad());
    }

    #[test]
    fn test_out_of_vocab_token_is_malformed() {
        let model = tiny();
        let src = array![[9u32]];
        let dec = array![[1u32]];
        let err = model.forward(src.view(), &[1], dec.view()).unwrap_err();
        assert!(matches!(err, Error::MalformedBatch(_)));
    }

    #[test]
    fn test_backward_matches_finite_differences() {
        let mut model = tiny();
        let src = array![[3u32, 4, 1], [5, 1, 0]];
        let dec = array![[1u32, 3], [1, 4]];
        let lens = [3usize, 2];
        // Arbitrary fixed upstream gradient: L = Σ w_i logits_i
        let weights: Vec<f32> = (0..20).map(|i| ((i as f32) * 0.37).sin()).collect();

        let out = model.forward(src.view(), &lens, dec.view()).unwrap();
        let mut logits = out.logits;
        backward(&mut logits, Some(Array1::from(weights.clone())));

        let names: Vec<&str> = model.named_parameters().iter().map(|(n, _)| *n).collect();
        for (p, name) in names.iter().enumerate() {
            let analytic = model.named_parameters()[p].1.grad().unwrap();
            let len = analytic.len();
            for i in (0..len).step_by(3) {
                let eps = 1e-2f32;
                let mut eval_at = |delta: f32| {
                    let mut params = model.named_parameters_mut();
                    params[p].1.data_mut()[i] += delta;
                    drop(params);
                    let out = model.forward(src.view(), &lens, dec.view()).unwrap();
                    let loss: f32 =
                        out.logits.data().iter().zip(&weights).map(|(l, w)| l * w).sum();
                    let mut params = model.named_parameters_mut();
                    params[p].1.data_mut()[i] -= delta;
                    loss
                };
                let numeric = (eval_at(eps) - eval_at(-eps)) / (2.0 * eps);
                assert!(
                    (numeric - analytic[i]).abs() < 2e-2,
                    "{name}[{i}]: analytic {} vs numeric {numeric}",
                    analytic[i]
                );
            }
        }
    }
}
