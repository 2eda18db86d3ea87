// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches checkpoint and output directories:
//
//   checkpoint.rs      — model card (family + architecture) and
//                        weights via Burn's CompactRecorder
//
//   tokenizer_store.rs — tokenizer.json or the built-in
//                        nucleotide vocabulary, plus token
//                        configuration resolution
//
//   metrics.rs         — metrics.json and the
//                        TSV sidecars of each task
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model card and weights loading/saving
pub mod checkpoint;

/// Tokenizer loading and token configuration
pub mod tokenizer_store;

/// Metrics and sidecar files
pub mod metrics;
