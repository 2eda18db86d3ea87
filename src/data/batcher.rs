// ============================================================
// Layer 4 — Window Batchers
// ============================================================
// Implements Burn's Batcher trait to stack samples into batches
// the evaluator can tokenise.
//
// Unlike a training batcher, no tensors are built here: token
// widths depend on the tokenizer, so tensor construction waits
// until the model adapter has padded the token rows. What the
// batcher guarantees is that every window keeps its dataset
// index, because the multi-worker DataLoader may hand batches
// back in any order.
//
//   Input:  Vec of N PairedSamples
//   Output: PairedBatch { indices: [N], sequences: [N], controls: [N] }
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::IndexedWindow;
use crate::domain::sequence::{PairedSample, SequenceWindow};

// ─── PairedBatch ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedBatch {
    /// Dataset positions, one per row
    pub indices: Vec<usize>,

    /// Element (or allele1) windows
    pub sequences: Vec<SequenceWindow>,

    /// Control (or allele2) windows, row-aligned with `sequences`
    pub controls: Vec<SequenceWindow>,
}

#[derive(Clone, Debug, Default)]
pub struct PairedBatcher;

impl<B: Backend> Batcher<B, PairedSample, PairedBatch> for PairedBatcher {
    fn batch(&self, items: Vec<PairedSample>, _device: &B::Device) -> PairedBatch {
        let mut batch = PairedBatch {
            indices:   Vec::with_capacity(items.len()),
            sequences: Vec::with_capacity(items.len()),
            controls:  Vec::with_capacity(items.len()),
        };
        for item in items {
            batch.indices.push(item.index);
            batch.sequences.push(item.sequence);
            batch.controls.push(item.control);
        }
        batch
    }
}

// ─── SequenceBatch ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceBatch {
    pub indices:   Vec<usize>,
    pub sequences: Vec<SequenceWindow>,
}

#[derive(Clone, Debug, Default)]
pub struct SequenceBatcher;

impl<B: Backend> Batcher<B, IndexedWindow, SequenceBatch> for SequenceBatcher {
    fn batch(&self, items: Vec<IndexedWindow>, _device: &B::Device) -> SequenceBatch {
        let (indices, sequences) = items.into_iter().map(|item| (item.index, item.window)).unzip();
        SequenceBatch { indices, sequences }
    }
}
