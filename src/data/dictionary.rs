//! Word-level dictionary

use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Token identifier
pub type TokenId = u32;

const PAD: &str = "<pad>";
const EOS: &str = "</s>";
const UNK: &str = "<unk>";

/// Mapping between words and ids.
///
/// Special symbols always occupy the first ids: `<pad>` = 0, `</s>` = 1,
/// `<unk>` = 2.
#[derive(Debug, Clone)]
pub struct Dictionary {
    words: Vec<String>,
    counts: Vec<u64>,
    index: HashMap<String, TokenId>,
}

impl Dictionary {
    /// Dictionary holding only the special symbols
    pub fn new() -> Self {
        let mut dict = Self { words: Vec::new(), counts: Vec::new(), index: HashMap::new() };
        for special in [PAD, EOS, UNK] {
            dict.add_word(special, 0);
        }
        dict
    }

    /// Load a dictionary file with one `word count` pair per line
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DictionaryNotFound { path: path.to_path_buf() });
        }
        let text = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading dictionary {}", path.display()), e))?;
        Self::parse(&text).map_err(|message| Error::config(path.display().to_string(), message))
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        let mut dict = Self::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let word = fields.next().unwrap_or_default();
            let count = match fields.next() {
                Some(c) => c
                    .parse::<u64>()
                    .map_err(|_| format!("line {}: bad count '{c}'", lineno + 1))?,
                None => 0,
            };
            dict.add_word(word, count);
        }
        Ok(dict)
    }

    /// Add a word, or add to its count if present
    pub fn add_word(&mut self, word: &str, count: u64) -> TokenId {
        if let Some(&id) = self.index.get(word) {
            self.counts[id as usize] += count;
            return id;
        }
        let id = self.words.len() as TokenId;
        self.words.push(word.to_string());
        self.counts.push(count);
        self.index.insert(word.to_string(), id);
        id
    }

    /// Number of entries, specials included
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether only the specials are present
    pub fn is_empty(&self) -> bool {
        self.words.len() <= 3
    }

    /// Padding id
    pub fn pad_idx(&self) -> TokenId {
        0
    }

    /// End-of-sentence id
    pub fn eos_idx(&self) -> TokenId {
        1
    }

    /// Unknown-word id
    pub fn unk_idx(&self) -> TokenId {
        2
    }

    /// Id of a word, `<unk>` when absent
    pub fn index(&self, word: &str) -> TokenId {
        self.index.get(word).copied().unwrap_or(self.unk_idx())
    }

    /// Word of an id
    pub fn word(&self, id: TokenId) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }

    /// Frequency recorded for an id
    pub fn count(&self, id: TokenId) -> Option<u64> {
        self.counts.get(id as usize).copied()
    }

    /// Map a whitespace-tokenised line to ids, appending `</s>`
    pub fn binarize(&self, line: &str) -> Vec<TokenId> {
        line.split_whitespace()
            .map(|w| self.index(w))
            .chain(std::iter::once(self.eos_idx()))
            .collect()
    }

    /// Render ids back to text, stopping at `</s>` and skipping padding
    pub fn string(&self, ids: &[TokenId]) -> String {
        ids.iter()
            .take_while(|&&id| id != self.eos_idx())
            .filter(|&&id| id != self.pad_idx())
            .map(|&id| self.word(id).unwrap_or(UNK))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_specials_come_first() {
        let dict = Dictionary::new();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.index("<pad>"), dict.pad_idx());
        assert_eq!(dict.index("</s>"), dict.eos_idx());
        assert_eq!(dict.index("<unk>"), dict.unk_idx());
        assert!(dict.is_empty());
    }

    #[test]
    fn test_load_word_counts() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "das 10\nhaus 4\n\nist 2").unwrap();

        let dict = Dictionary::load(file.path()).unwrap();

        assert_eq!(dict.len(), 6);
        assert_eq!(dict.index("das"), 3);
        assert_eq!(dict.count(4), Some(4));
        assert_eq!(dict.word(5), Some("ist"));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = Dictionary::load("/nonexistent/dict.xx").unwrap_err();
        assert!(matches!(err, Error::DictionaryNotFound { .. }));
    }

    #[test]
    fn test_load_rejects_bad_count() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "das ten").unwrap();
        assert!(matches!(Dictionary::load(file.path()), Err(Error::ConfigValue { .. })));
    }

    #[test]
    fn test_binarize_appends_eos_and_maps_unknown() {
        let mut dict = Dictionary::new();
        dict.add_word("hallo", 1);
        let ids = dict.binarize("hallo welt");
        assert_eq!(ids, vec![3, dict.unk_idx(), dict.eos_idx()]);
        assert_eq!(dict.string(&ids), "hallo <unk>");
    }

    #[test]
    fn test_add_word_accumulates_count() {
        let mut dict = Dictionary::new();
        let a = dict.add_word("a", 2);
        let b = dict.add_word("a", 3);
        assert_eq!(a, b);
        assert_eq!(dict.count(a), Some(5));
    }
}
