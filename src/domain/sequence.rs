// ============================================================
// Layer 3 — Sequence Windows
// ============================================================
// A SequenceWindow is a fixed-length one-hot encoded stretch
// of genome: one row of four flags per position, in A, C, G, T
// order. Anything that is not one of the four canonical bases
// (N, IUPAC ambiguity codes) becomes an all-zero row.
//
// Example:
//   "ACGN" → [1,0,0,0] [0,1,0,0] [0,0,1,0] [0,0,0,0]
//
// Windows are immutable once built; the tokenizer adapter only
// ever reads them back as characters.

use serde::{Deserialize, Serialize};

use crate::domain::error::{EvalError, EvalResult};

/// Column order of the one-hot encoding
pub const ALPHABET: [u8; 4] = *b"ACGT";

/// Character rendered for an all-zero (unknown) row
pub const UNKNOWN_BASE: u8 = b'N';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceWindow {
    rows: Vec<[u8; 4]>,
}

impl SequenceWindow {
    /// Encode raw bases. Case-insensitive.
    pub fn from_bases(bases: &[u8]) -> Self {
        let rows = bases.iter().map(|&b| encode_base(b)).collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Render back to an upper-case base string, unknown rows as `N`.
    pub fn to_chars(&self) -> String {
        self.rows.iter().map(|r| decode_row(r) as char).collect()
    }
}

fn encode_base(base: u8) -> [u8; 4] {
    let upper = base.to_ascii_uppercase();
    let mut row = [0u8; 4];
    if let Some(col) = ALPHABET.iter().position(|&a| a == upper) {
        row[col] = 1;
    }
    row
}

fn decode_row(row: &[u8; 4]) -> u8 {
    row.iter()
        .position(|&flag| flag == 1)
        .map(|col| ALPHABET[col])
        .unwrap_or(UNKNOWN_BASE)
}

/// Render a batch of windows as strings for the tokenizer.
pub fn windows_to_strings(windows: &[SequenceWindow]) -> Vec<String> {
    windows.iter().map(SequenceWindow::to_chars).collect()
}

// ─── PairedSample ─────────────────────────────────────────────────────────────
/// An element window and its matched background window.
///
/// `index` is the position of the element in the dataset and is
/// what restores dataset order after multi-worker loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedSample {
    pub index:    usize,
    pub sequence: SequenceWindow,
    pub control:  SequenceWindow,
}

impl PairedSample {
    /// Both arms must have the same length so they are scored
    /// by exactly the same procedure.
    pub fn new(index: usize, sequence: SequenceWindow, control: SequenceWindow) -> EvalResult<Self> {
        if sequence.len() != control.len() {
            return Err(EvalError::Config(format!(
                "element {index}: sequence length {} differs from control length {}",
                sequence.len(),
                control.len()
            )));
        }
        Ok(Self { index, sequence, control })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_bases_become_unit_rows() {
        let w = SequenceWindow::from_bases(b"ACGT");
        assert_eq!(w.rows, vec![[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]]);
    }

    #[test]
    fn unknown_bases_are_zero_rows_rendered_as_n() {
        let w = SequenceWindow::from_bases(b"aRnT");
        assert_eq!(w.rows[1], [0, 0, 0, 0]);
        assert_eq!(w.rows[2], [0, 0, 0, 0]);
        assert_eq!(w.to_chars(), "ANNT");
    }

    #[test]
    fn paired_sample_requires_equal_lengths() {
        let a = SequenceWindow::from_bases(b"ACGT");
        let b = SequenceWindow::from_bases(b"ACG");
        assert!(PairedSample::new(0, a.clone(), b).is_err());
        assert!(PairedSample::new(0, a.clone(), a).is_ok());
    }
}
