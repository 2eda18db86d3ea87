// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what the benchmark works on:
// one-hot genomic windows, token boundaries, the error
// taxonomy, and the paired statistics computed at the end of
// a run.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, traits and arithmetic
//
// Everything tensor-shaped lives in Layer 5 (ml); this layer
// stays testable without a device.

/// One-hot encoded sequence windows and paired samples
pub mod sequence;

/// Token configuration, tokenised batches and [start, end) boundaries
pub mod tokens;

/// Error taxonomy shared by every layer
pub mod error;

/// Paired-difference statistics (Wilcoxon signed-rank, percentiles)
pub mod statistics;

/// Core abstractions implemented by other layers
pub mod traits;
