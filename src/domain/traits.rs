// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the evaluation core and its external
// collaborators. The scoring code only ever sees these traits,
// so a HuggingFace tokenizer and the built-in nucleotide
// vocabulary are interchangeable, and tests can feed genomes
// from memory instead of FASTA files.

use crate::domain::error::EvalResult;
use crate::domain::tokens::EncodedSequence;

// ─── TokenEncoder ─────────────────────────────────────────────────────────────
/// Anything that can turn a base string into model token IDs.
///
/// Implementations:
///   - tokenizers::Tokenizer   → tokenizer.json shipped with a checkpoint
///   - NucleotideTokenizer     → built-in single-base vocabulary
pub trait TokenEncoder: Send + Sync {
    /// Encode one sequence, special tokens included, with the
    /// encoder's own attention mask.
    fn encode_sequence(&self, text: &str) -> EvalResult<EncodedSequence>;

    /// Look up the ID of a token string, if the vocabulary has it.
    fn token_id(&self, token: &str) -> Option<u32>;

    fn vocab_size(&self) -> usize;
}

// ─── GenomeSource ─────────────────────────────────────────────────────────────
/// Random access to reference bases.
pub trait GenomeSource: Send + Sync {
    /// Bases of the half-open, 0-based interval [start, end) on `chrom`.
    /// Positions outside the chromosome come back as `N`.
    fn fetch(&self, chrom: &str, start: i64, end: i64) -> EvalResult<Vec<u8>>;

    fn has_chrom(&self, chrom: &str) -> bool;
}
