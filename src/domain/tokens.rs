// ============================================================
// Layer 3 — Token Batches and Boundaries
// ============================================================
// After tokenisation every sequence becomes a row of token IDs,
// padded to the width of the longest row in the batch:
//
//   [CLS]  A  C  G  T [SEP] [PAD] [PAD]
//     0    1  2  3  4   5     6     7
//          └── start = 1    └── end = 5
//
// Only positions in the half-open range [start, end) carry
// genomic content. Special tokens and padding never contribute
// to a likelihood score; the clip mask built here is what
// enforces that.
//
// start is either one value shared by the whole batch (models
// without a start token always begin at 0) or one value per row.

use serde::{Deserialize, Serialize};

use crate::domain::error::{EvalError, EvalResult};

// ─── TokenConfig ──────────────────────────────────────────────────────────────
/// Special-token conventions of one model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token preceding genomic content; content starts right after it
    pub start_token: Option<u32>,

    /// Token following genomic content; content ends right before it
    pub end_token: Option<u32>,

    /// Token substituted at the scored position by the masked strategy
    pub mask_token: u32,

    /// Token used to right-pad rows to the batch width
    pub pad_token: u32,

    /// Architectures without an attention-mask input get `None`
    #[serde(default = "default_true")]
    pub use_attention_mask: bool,
}

fn default_true() -> bool {
    true
}

// ─── EncodedSequence ──────────────────────────────────────────────────────────
/// One encoded sequence before batch padding. Encoders that pad or
/// truncate on their own mark their padding with 0 in the mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSequence {
    pub ids:            Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl EncodedSequence {
    /// Every token is real content
    pub fn unpadded(ids: Vec<u32>) -> Self {
        let attention_mask = vec![1; ids.len()];
        Self { ids, attention_mask }
    }

    /// Number of real (unpadded) tokens
    pub fn content_len(&self) -> usize {
        self.attention_mask.iter().map(|&m| m as usize).sum()
    }
}

// ─── Starts ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Starts {
    /// One start for every row (0 when there is no start token)
    Shared(usize),
    /// One start per row
    PerSequence(Vec<usize>),
}

impl Starts {
    pub fn get(&self, row: usize) -> usize {
        match self {
            Starts::Shared(start) => *start,
            Starts::PerSequence(starts) => starts[row],
        }
    }
}

// ─── Boundaries ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundaries {
    starts: Starts,
    ends:   Vec<usize>,
}

impl Boundaries {
    pub fn new(starts: Starts, ends: Vec<usize>) -> EvalResult<Self> {
        if let Starts::PerSequence(s) = &starts {
            if s.len() != ends.len() {
                return Err(EvalError::Tokenization(format!(
                    "{} start offsets for {} end offsets",
                    s.len(),
                    ends.len()
                )));
            }
        }
        Ok(Self { starts, ends })
    }

    pub fn starts(&self) -> &Starts {
        &self.starts
    }

    pub fn ends(&self) -> &[usize] {
        &self.ends
    }

    /// Number of rows described
    fn len(&self) -> usize {
        self.ends.len()
    }

    /// Whether token `pos` of row `row` is genomic content
    pub fn contains(&self, row: usize, pos: usize) -> bool {
        self.starts.get(row) <= pos && pos < self.ends[row]
    }

    /// Clip mask for one token position across every row: 1.0 inside
    /// [start, end), 0.0 outside.
    pub fn clip_column(&self, pos: usize) -> Vec<f32> {
        (0..self.len())
            .map(|row| if self.contains(row, pos) { 1.0 } else { 0.0 })
            .collect()
    }

    /// Full clip mask, row-major `[rows × width]`.
    pub fn clip_mask(&self, width: usize) -> Vec<Vec<f32>> {
        (0..self.len())
            .map(|row| {
                (0..width)
                    .map(|pos| if self.contains(row, pos) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect()
    }

    fn split_at(&self, mid: usize) -> (Self, Self) {
        let (head_ends, tail_ends) = self.ends.split_at(mid);
        let (head_starts, tail_starts) = match &self.starts {
            Starts::Shared(s) => (Starts::Shared(*s), Starts::Shared(*s)),
            Starts::PerSequence(s) => {
                let (h, t) = s.split_at(mid);
                (Starts::PerSequence(h.to_vec()), Starts::PerSequence(t.to_vec()))
            }
        };
        (
            Self { starts: head_starts, ends: head_ends.to_vec() },
            Self { starts: tail_starts, ends: tail_ends.to_vec() },
        )
    }
}

// ─── TokenizedBatch ───────────────────────────────────────────────────────────
/// Padded token rows plus everything the scorer needs to clip them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedBatch {
    tokens:         Vec<Vec<u32>>,
    attention_mask: Option<Vec<Vec<u32>>>,
    boundaries:     Boundaries,
}

impl TokenizedBatch {
    pub fn new(
        tokens:         Vec<Vec<u32>>,
        attention_mask: Option<Vec<Vec<u32>>>,
        boundaries:     Boundaries,
    ) -> EvalResult<Self> {
        let width = tokens.first().map(Vec::len).unwrap_or(0);
        if tokens.iter().any(|row| row.len() != width) {
            return Err(EvalError::Tokenization("token rows are not padded to one width".into()));
        }
        if boundaries.len() != tokens.len() {
            return Err(EvalError::Tokenization(format!(
                "{} boundary rows for {} token rows",
                boundaries.len(),
                tokens.len()
            )));
        }
        if let Some(mask) = &attention_mask {
            if mask.len() != tokens.len() || mask.iter().any(|row| row.len() != width) {
                return Err(EvalError::Tokenization(
                    "attention mask shape does not match tokens".into(),
                ));
            }
        }
        if let Some(row) = (0..boundaries.len()).find(|&r| boundaries.ends[r] > width) {
            return Err(EvalError::Tokenization(format!(
                "row {row}: end offset {} beyond width {width}",
                boundaries.ends[row]
            )));
        }
        Ok(Self { tokens, attention_mask, boundaries })
    }

    pub fn batch_size(&self) -> usize {
        self.tokens.len()
    }

    /// Padded token width T
    pub fn width(&self) -> usize {
        self.tokens.first().map(Vec::len).unwrap_or(0)
    }

    pub fn tokens(&self) -> &[Vec<u32>] {
        &self.tokens
    }

    pub fn attention_mask(&self) -> Option<&[Vec<u32>]> {
        self.attention_mask.as_deref()
    }

    pub fn boundaries(&self) -> &Boundaries {
        &self.boundaries
    }

    /// Row-major token IDs, widened for tensor construction
    pub fn flat_tokens(&self) -> Vec<i64> {
        self.tokens.iter().flatten().map(|&t| t as i64).collect()
    }

    pub fn flat_attention_mask(&self) -> Option<Vec<i64>> {
        self.attention_mask
            .as_ref()
            .map(|mask| mask.iter().flatten().map(|&m| m as i64).collect())
    }

    /// Split rows into `[0, mid)` and `[mid, n)`. Width is unchanged.
    pub fn split_at(&self, mid: usize) -> (Self, Self) {
        let (head_tokens, tail_tokens) = self.tokens.split_at(mid);
        let (head_mask, tail_mask) = match &self.attention_mask {
            Some(mask) => {
                let (h, t) = mask.split_at(mid);
                (Some(h.to_vec()), Some(t.to_vec()))
            }
            None => (None, None),
        };
        let (head_bounds, tail_bounds) = self.boundaries.split_at(mid);
        (
            Self { tokens: head_tokens.to_vec(), attention_mask: head_mask, boundaries: head_bounds },
            Self { tokens: tail_tokens.to_vec(), attention_mask: tail_mask, boundaries: tail_bounds },
        )
    }
}
