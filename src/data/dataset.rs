//! Parallel corpus and batch collation

use super::dictionary::{Dictionary, TokenId};
use crate::train::Batch;
use crate::{Error, Result};
use ndarray::Array2;
use std::fs;
use std::path::Path;

/// One binarised sentence pair, both sides terminated by `</s>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentencePair {
    pub src: Vec<TokenId>,
    pub tgt: Vec<TokenId>,
}

/// In-memory parallel corpus
#[derive(Debug, Clone)]
pub struct Seq2SeqDataset {
    pairs: Vec<SentencePair>,
    pad_idx: TokenId,
    eos_idx: TokenId,
}

impl Seq2SeqDataset {
    /// Build from already binarised pairs
    pub fn from_pairs(pairs: Vec<SentencePair>, pad_idx: TokenId, eos_idx: TokenId) -> Self {
        Self { pairs, pad_idx, eos_idx }
    }

    /// Read line-aligned, whitespace tokenised source and target files
    pub fn from_files(
        src_file: impl AsRef<Path>,
        tgt_file: impl AsRef<Path>,
        src_dict: &Dictionary,
        tgt_dict: &Dictionary,
    ) -> Result<Self> {
        let (src_file, tgt_file) = (src_file.as_ref(), tgt_file.as_ref());
        let read = |path: &Path| {
            fs::read_to_string(path)
                .map_err(|e| Error::io(format!("reading corpus {}", path.display()), e))
        };
        let src_text = read(src_file)?;
        let tgt_text = read(tgt_file)?;

        let src_lines: Vec<&str> = src_text.lines().collect();
        let tgt_lines: Vec<&str> = tgt_text.lines().collect();
        if src_lines.len() != tgt_lines.len() {
            return Err(Error::config(
                tgt_file.display().to_string(),
                format!(
                    "{} target lines for {} source lines in {}",
                    tgt_lines.len(),
                    src_lines.len(),
                    src_file.display()
                ),
            ));
        }

        let pairs = src_lines
            .iter()
            .zip(&tgt_lines)
            .map(|(s, t)| SentencePair { src: src_dict.binarize(s), tgt: tgt_dict.binarize(t) })
            .collect();
        Ok(Self::from_pairs(pairs, src_dict.pad_idx(), src_dict.eos_idx()))
    }

    /// Number of sentence pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the corpus is empty
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pair at `index`
    pub fn get(&self, index: usize) -> Option<&SentencePair> {
        self.pairs.get(index)
    }

    /// Source length of a pair, `</s>` included
    pub fn src_len(&self, index: usize) -> usize {
        self.pairs[index].src.len()
    }

    /// Target length of a pair, `</s>` included
    pub fn tgt_len(&self, index: usize) -> usize {
        self.pairs[index].tgt.len()
    }

    /// Size used for token budgeting: the longer side
    pub fn num_tokens(&self, index: usize) -> usize {
        self.src_len(index).max(self.tgt_len(index))
    }

    /// Collate pairs into a right-padded batch
    ///
    /// Out-of-range indices are a sampler bug and panic.
    pub fn collate(&self, indices: &[usize]) -> Batch {
        if indices.is_empty() {
            return Batch::empty();
        }
        let rows: Vec<&SentencePair> = indices.iter().map(|&i| &self.pairs[i]).collect();
        let b = rows.len();
        let s = rows.iter().map(|p| p.src.len()).max().unwrap_or(0);
        let t = rows.iter().map(|p| p.tgt.len()).max().unwrap_or(0);

        let mut src_tokens = Array2::from_elem((b, s), self.pad_idx);
        let mut tgt_tokens = Array2::from_elem((b, t), self.pad_idx);
        let mut tgt_inputs = Array2::from_elem((b, t), self.pad_idx);

        for (row, pair) in rows.iter().enumerate() {
            for (col, &tok) in pair.src.iter().enumerate() {
                src_tokens[[row, col]] = tok;
            }
            for (col, &tok) in pair.tgt.iter().enumerate() {
                tgt_tokens[[row, col]] = tok;
            }
            // Teacher forcing input: </s> moved to the front
            if !pair.tgt.is_empty() {
                tgt_inputs[[row, 0]] = self.eos_idx;
                for (col, &tok) in pair.tgt[..pair.tgt.len() - 1].iter().enumerate() {
                    tgt_inputs[[row, col + 1]] = tok;
                }
            }
        }

        Batch {
            ids: indices.to_vec(),
            src_tokens,
            src_lengths: rows.iter().map(|p| p.src.len()).collect(),
            tgt_inputs,
            tgt_tokens,
            num_tokens: rows.iter().map(|p| p.tgt.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toy() -> Seq2SeqDataset {
        Seq2SeqDataset::from_pairs(
            vec![
                SentencePair { src: vec![4, 5, 1], tgt: vec![7, 8, 9, 1] },
                SentencePair { src: vec![6, 1], tgt: vec![10, 1] },
            ],
            0,
            1,
        )
    }

    #[test]
    fn test_collate_pads_and_shifts() {
        let batch = toy().collate(&[0, 1]);

        assert_eq!(batch.src_tokens, array![[4, 5, 1], [6, 1, 0]]);
        assert_eq!(batch.src_lengths, vec![3, 2]);
        assert_eq!(batch.tgt_tokens, array![[7, 8, 9, 1], [10, 1, 0, 0]]);
        assert_eq!(batch.tgt_inputs, array![[1, 7, 8, 9], [1, 10, 0, 0]]);
        assert_eq!(batch.num_tokens, 6);
        batch.validate().unwrap();
    }

    #[test]
    fn test_collate_empty_indices() {
        assert!(toy().collate(&[]).is_empty());
    }

    #[test]
    fn test_num_tokens_is_longer_side() {
        let ds = toy();
        assert_eq!(ds.num_tokens(0), 4);
        assert_eq!(ds.num_tokens(1), 2);
    }

    #[test]
    fn test_from_files_binarizes_both_sides() {
        let mut src_dict = Dictionary::new();
        src_dict.add_word("ein", 1);
        let mut tgt_dict = Dictionary::new();
        tgt_dict.add_word("a", 1);

        let mut src = NamedTempFile::new().unwrap();
        let mut tgt = NamedTempFile::new().unwrap();
        writeln!(src, "ein haus\nein").unwrap();
        writeln!(tgt, "a house\na").unwrap();

        let ds = Seq2SeqDataset::from_files(src.path(), tgt.path(), &src_dict, &tgt_dict).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0).unwrap().src, vec![3, 2, 1]);
        assert_eq!(ds.get(1).unwrap().tgt, vec![3, 1]);
    }

    #[test]
    fn test_from_files_rejects_misaligned_corpus() {
        let dict = Dictionary::new();
        let mut src = NamedTempFile::new().unwrap();
        let mut tgt = NamedTempFile::new().unwrap();
        writeln!(src, "a\nb").unwrap();
        writeln!(tgt, "a").unwrap();
        assert!(Seq2SeqDataset::from_files(src.path(), tgt.path(), &dict, &dict).is_err());
    }
}
