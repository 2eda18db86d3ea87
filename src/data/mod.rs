// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from files on disk to batches
// of one-hot windows ready for tokenisation.
//
// The pipeline flows in this order:
//
//   genome.fa + elements.tsv / variants.tsv
//       │
//       ▼
//   FastaGenome       → reads the split's chromosomes
//   elements          → reads intervals / variants
//       │
//       ▼
//   controls          → dinucleotide-shuffled controls (seeded)
//       │
//       ▼
//   *Dataset          → implements Burn's Dataset trait
//       │
//       ▼
//   *Batcher          → stacks samples, keeps dataset indices
//       │
//       ▼
//   DataLoader        → background prefetch with num_workers
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reference genome loaded from FASTA with bio
pub mod genome;

/// Elements and variants TSV readers
pub mod elements;

/// Seeded dinucleotide-shuffle controls
pub mod controls;

/// Implements Burn's Dataset trait for the three tasks
pub mod dataset;

/// Implements Burn's Batcher trait, preserving dataset indices
pub mod batcher;
