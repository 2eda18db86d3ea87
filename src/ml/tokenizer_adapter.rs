// ============================================================
// Layer 5 — Tokenizer Adapter
// ============================================================
// Turns a batch of one-hot windows into padded token rows plus
// the [start, end) range of each row that carries genomic
// content.
//
// Boundary policy, per row:
//   start = index of the first start token + 1   (start token set)
//         = 0, shared by the whole batch         (no start token)
//   end   = index of the first end token after start (end token set)
//         = sum of the encoder's attention mask  (no end token)
//
// Tokens the encoder itself marked as padding never count as
// content. Rows are then right-padded to the batch width with
// the family's pad token. Families
// whose architecture has no attention-mask input get `None`
// instead of a mask; that is a normal outcome, not an error.

use std::sync::Arc;

use crate::domain::error::{EvalError, EvalResult};
use crate::domain::sequence::{windows_to_strings, SequenceWindow};
use crate::domain::tokens::{Boundaries, EncodedSequence, Starts, TokenConfig, TokenizedBatch};
use crate::domain::traits::TokenEncoder;

// ─── HuggingFace tokenizer ────────────────────────────────────────────────────
impl TokenEncoder for tokenizers::Tokenizer {
    fn encode_sequence(&self, text: &str) -> EvalResult<EncodedSequence> {
        let encoding = self
            .encode(text, true)
            .map_err(|e| EvalError::Tokenization(format!("cannot encode sequence: {e}")))?;
        Ok(EncodedSequence {
            ids:            encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
        })
    }

    fn token_id(&self, token: &str) -> Option<u32> {
        self.token_to_id(token)
    }

    fn vocab_size(&self) -> usize {
        self.get_vocab_size(true)
    }
}

// ─── NucleotideTokenizer ──────────────────────────────────────────────────────
/// Built-in single-base vocabulary.
pub const NUCLEOTIDE_VOCAB: [&str; 10] =
    ["[UNK]", "[CLS]", "[SEP]", "[PAD]", "[MASK]", "A", "C", "G", "T", "N"];

pub const CLS_ID: u32 = 1;
pub const SEP_ID: u32 = 2;

/// One token per base, with optional [CLS] / [SEP] framing.
#[derive(Debug, Clone, Default)]
pub struct NucleotideTokenizer {
    prepend_cls: bool,
    append_sep:  bool,
}

impl NucleotideTokenizer {
    pub fn new(prepend_cls: bool, append_sep: bool) -> Self {
        Self { prepend_cls, append_sep }
    }

    fn base_id(base: char) -> u32 {
        match base.to_ascii_uppercase() {
            'A' => 5,
            'C' => 6,
            'G' => 7,
            'T' => 8,
            'N' => 9,
            _ => 0,
        }
    }
}

impl TokenEncoder for NucleotideTokenizer {
    fn encode_sequence(&self, text: &str) -> EvalResult<EncodedSequence> {
        let mut ids = Vec::with_capacity(text.len() + 2);
        if self.prepend_cls {
            ids.push(CLS_ID);
        }
        ids.extend(text.chars().map(Self::base_id));
        if self.append_sep {
            ids.push(SEP_ID);
        }
        Ok(EncodedSequence::unpadded(ids))
    }

    fn token_id(&self, token: &str) -> Option<u32> {
        NUCLEOTIDE_VOCAB.iter().position(|t| *t == token).map(|i| i as u32)
    }

    fn vocab_size(&self) -> usize {
        NUCLEOTIDE_VOCAB.len()
    }
}

// ─── TokenizerAdapter ─────────────────────────────────────────────────────────
#[derive(Clone)]
pub struct TokenizerAdapter {
    encoder: Arc<dyn TokenEncoder>,
    config:  TokenConfig,
}

impl TokenizerAdapter {
    pub fn new(encoder: Arc<dyn TokenEncoder>, config: TokenConfig) -> Self {
        Self { encoder, config }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn vocab_size(&self) -> usize {
        self.encoder.vocab_size()
    }

    pub fn tokenize(&self, windows: &[SequenceWindow]) -> EvalResult<TokenizedBatch> {
        let encoded: Vec<EncodedSequence> = windows_to_strings(windows)
            .iter()
            .map(|text| self.encoder.encode_sequence(text))
            .collect::<EvalResult<_>>()?;

        let width = encoded.iter().map(|e| e.ids.len()).max().unwrap_or(0);

        let mut starts = Vec::with_capacity(encoded.len());
        let mut ends = Vec::with_capacity(encoded.len());
        for (row, sequence) in encoded.iter().enumerate() {
            let len = content_len(row, sequence)?;
            let content = &sequence.ids[..len];
            let start = match self.config.start_token {
                Some(tok) => find_token(content, tok, 0).map(|i| i + 1).ok_or_else(|| {
                    EvalError::Tokenization(format!("row {row}: start token {tok} not found"))
                })?,
                None => 0,
            };
            let end = match self.config.end_token {
                Some(tok) => find_token(content, tok, start).ok_or_else(|| {
                    EvalError::Tokenization(format!("row {row}: end token {tok} not found"))
                })?,
                None => len,
            };
            starts.push(start);
            ends.push(end);
        }

        let starts = match self.config.start_token {
            Some(_) => Starts::PerSequence(starts),
            None => Starts::Shared(0),
        };

        let attention_mask = self.config.use_attention_mask.then(|| {
            encoded
                .iter()
                .map(|sequence| {
                    let mut mask = sequence.attention_mask.clone();
                    mask.resize(width, 0);
                    mask
                })
                .collect()
        });

        let tokens = encoded
            .into_iter()
            .map(|sequence| {
                let mut ids = sequence.ids;
                ids.resize(width, self.config.pad_token);
                ids
            })
            .collect();

        TokenizedBatch::new(tokens, attention_mask, Boundaries::new(starts, ends)?)
    }
}

/// Real tokens of a row: sum of its attention mask. Content must come
/// first; left-padded encodings are refused.
fn content_len(row: usize, sequence: &EncodedSequence) -> EvalResult<usize> {
    if sequence.attention_mask.len() != sequence.ids.len() {
        return Err(EvalError::Tokenization(format!(
            "row {row}: {} ids but {} attention-mask entries",
            sequence.ids.len(),
            sequence.attention_mask.len()
        )));
    }
    let len = sequence.content_len();
    if sequence.attention_mask[..len].iter().any(|&m| m == 0) {
        return Err(EvalError::Tokenization(format!(
            "row {row}: padding precedes content; only right padding is supported"
        )));
    }
    Ok(len)
}

fn find_token(ids: &[u32], token: u32, from: usize) -> Option<usize> {
    ids.iter().skip(from).position(|&t| t == token).map(|i| i + from)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn windows() -> Vec<SequenceWindow> {
        vec![SequenceWindow::from_bases(b"ACGT"), SequenceWindow::from_bases(b"GA")]
    }

    fn adapter(cls: bool, sep: bool, use_attention_mask: bool) -> TokenizerAdapter {
        let config = TokenConfig {
            start_token: cls.then_some(CLS_ID),
            end_token: sep.then_some(SEP_ID),
            mask_token: 4,
            pad_token: 3,
            use_attention_mask,
        };
        TokenizerAdapter::new(Arc::new(NucleotideTokenizer::new(cls, sep)), config)
    }

    #[test]
    fn start_and_end_tokens_are_excluded() {
        let batch = adapter(true, true, true).tokenize(&windows()).unwrap();
        assert_eq!(batch.tokens()[0], vec![1, 5, 6, 7, 8, 2]);
        assert_eq!(batch.tokens()[1], vec![1, 7, 5, 2, 3, 3]);
        assert_eq!(batch.boundaries().starts(), &Starts::PerSequence(vec![1, 1]));
        assert_eq!(batch.boundaries().ends(), &[5, 3]);
        assert_eq!(batch.attention_mask().unwrap()[1], vec![1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn start_only_ends_at_unpadded_length() {
        let batch = adapter(true, false, true).tokenize(&windows()).unwrap();
        assert_eq!(batch.boundaries().starts(), &Starts::PerSequence(vec![1, 1]));
        assert_eq!(batch.boundaries().ends(), &[5, 3]);
        assert_eq!(batch.width(), 5);
    }

    #[test]
    fn end_only_starts_at_shared_zero() {
        let batch = adapter(false, true, true).tokenize(&windows()).unwrap();
        assert_eq!(batch.boundaries().starts(), &Starts::Shared(0));
        assert_eq!(batch.boundaries().ends(), &[4, 2]);
    }

    #[test]
    fn no_special_tokens_covers_every_real_token() {
        let batch = adapter(false, false, true).tokenize(&windows()).unwrap();
        assert_eq!(batch.boundaries().starts(), &Starts::Shared(0));
        assert_eq!(batch.boundaries().ends(), &[4, 2]);
        assert_eq!(batch.tokens()[1], vec![7, 5, 3, 3]);
    }

    #[test]
    fn architectures_without_attention_mask_get_none() {
        let batch = adapter(false, true, false).tokenize(&windows()).unwrap();
        assert!(batch.attention_mask().is_none());
        assert_eq!(batch.boundaries().ends(), &[4, 2]);
    }

    #[test]
    fn missing_start_token_is_a_tokenization_error() {
        let config = TokenConfig {
            start_token: Some(CLS_ID),
            end_token: None,
            mask_token: 4,
            pad_token: 3,
            use_attention_mask: true,
        };
        let adapter = TokenizerAdapter::new(Arc::new(NucleotideTokenizer::new(false, false)), config);
        assert!(matches!(adapter.tokenize(&windows()), Err(EvalError::Tokenization(_))));
    }

    #[test]
    fn vocabulary_lookup() {
        let tok = NucleotideTokenizer::default();
        assert_eq!(tok.token_id("[MASK]"), Some(4));
        assert_eq!(tok.token_id("[PAD]"), Some(3));
        assert_eq!(tok.token_id("X"), None);
        assert_eq!(tok.encode_sequence("acgn").unwrap().ids, vec![5, 6, 7, 9]);
    }

    /// WordLevel tokenizer that pads every encoding to 6 tokens itself
    fn self_padding_tokenizer() -> tokenizers::Tokenizer {
        let json = r#"{
            "version": "1.0",
            "truncation": null,
            "padding": {
                "strategy": {"Fixed": 6},
                "direction": "Right",
                "pad_to_multiple_of": null,
                "pad_id": 3,
                "pad_type_id": 0,
                "pad_token": "[PAD]"
            },
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": {"type": "WhitespaceSplit"},
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": {"[UNK]": 0, "[CLS]": 1, "[SEP]": 2, "[PAD]": 3, "[MASK]": 4, "ACGT": 5, "GA": 6},
                "unk_token": "[UNK]"
            }
        }"#;
        json.parse().unwrap()
    }

    #[test]
    fn huggingface_padding_is_not_content() {
        let config = TokenConfig {
            start_token: None,
            end_token: None,
            mask_token: 4,
            pad_token: 3,
            use_attention_mask: true,
        };
        let adapter = TokenizerAdapter::new(Arc::new(self_padding_tokenizer()), config);
        let batch = adapter.tokenize(&windows()).unwrap();

        assert_eq!(batch.tokens()[0], vec![5, 3, 3, 3, 3, 3]);
        assert_eq!(batch.tokens()[1], vec![6, 3, 3, 3, 3, 3]);
        assert_eq!(batch.boundaries().ends(), &[1, 1]);
        assert_eq!(batch.attention_mask().unwrap()[0], vec![1, 0, 0, 0, 0, 0]);
    }

    /// Returns fixed, already padded encodings
    struct PrePadded(EncodedSequence);

    impl TokenEncoder for PrePadded {
        fn encode_sequence(&self, _text: &str) -> EvalResult<EncodedSequence> {
            Ok(self.0.clone())
        }

        fn token_id(&self, _token: &str) -> Option<u32> {
            None
        }

        fn vocab_size(&self) -> usize {
            NUCLEOTIDE_VOCAB.len()
        }
    }

    #[test]
    fn end_token_is_searched_only_in_content() {
        // [CLS] A C [SEP] then encoder padding that reuses the [SEP] id
        let encoded = EncodedSequence {
            ids:            vec![1, 5, 6, 2, 2, 2],
            attention_mask: vec![1, 1, 1, 1, 0, 0],
        };
        let adapter = TokenizerAdapter::new(Arc::new(PrePadded(encoded)), adapter(true, true, true).config);
        let batch = adapter.tokenize(&windows()[..1]).unwrap();
        assert_eq!(batch.boundaries().starts(), &Starts::PerSequence(vec![1]));
        assert_eq!(batch.boundaries().ends(), &[3]);
        assert_eq!(batch.attention_mask().unwrap()[0], vec![1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn left_padded_encodings_are_refused() {
        let encoded = EncodedSequence {
            ids:            vec![3, 3, 5, 6],
            attention_mask: vec![0, 0, 1, 1],
        };
        let adapter = TokenizerAdapter::new(Arc::new(PrePadded(encoded)), adapter(false, false, true).config);
        assert!(matches!(adapter.tokenize(&windows()[..1]), Err(EvalError::Tokenization(_))));
    }
}
