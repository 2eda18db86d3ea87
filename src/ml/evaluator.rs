// ============================================================
// Layer 5 — Paired Evaluator
// ============================================================
// Drives one evaluation pass:
//
//   INIT
//     → for each batch from the DataLoader:
//         FETCH_BATCH → TOKENIZE_BOTH → SCORE_BOTH → ACCUMULATE
//     → FINALIZE → DONE
//
// Both arms of a batch go through the same adapter and the same
// strategy. Per pair:  diff = score(sequence) − score(control),
// correct = diff > 0.
//
// The accumulator is owned by this loop alone. Batches may
// arrive out of dataset order (worker threads), so each record
// keeps its dataset index and results are sorted before they
// are reported or written.
//
// Retry policy:
//   Propagate          any forward-pass error aborts the run
//   SplitOnExhaustion  on ResourceExhausted, halve the batch
//                      once and score each half; if a half
//                      still fails the error propagates

use burn::prelude::*;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use crate::data::batcher::{PairedBatch, SequenceBatch};
use crate::domain::error::{EvalError, EvalResult};
use crate::domain::sequence::SequenceWindow;
use crate::domain::statistics::AggregateMetrics;
use crate::domain::tokens::TokenizedBatch;
use crate::ml::adapter::LanguageModelAdapter;
use crate::ml::scoring::ScoringStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    Propagate,
    #[default]
    SplitOnExhaustion,
}

// ─── PairRecord ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairRecord {
    pub index:      usize,
    pub seq_score:  f64,
    pub ctrl_score: f64,
    pub diff:       f64,
    pub correct:    bool,
}

// ─── PairedAccumulator ────────────────────────────────────────────────────────
#[derive(Debug, Default)]
pub struct PairedAccumulator {
    records: Vec<PairRecord>,
}

impl PairedAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, indices: &[usize], seq: &[f64], ctrl: &[f64]) -> EvalResult<()> {
        if indices.len() != seq.len() || seq.len() != ctrl.len() {
            return Err(EvalError::Model(format!(
                "{} indices, {} sequence scores, {} control scores",
                indices.len(),
                seq.len(),
                ctrl.len()
            )));
        }
        for ((&index, &s), &c) in indices.iter().zip(seq).zip(ctrl) {
            let diff = s - c;
            self.records.push(PairRecord {
                index,
                seq_score: s,
                ctrl_score: c,
                diff,
                correct: diff > 0.0,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in dataset order
    pub fn records(&self) -> Vec<PairRecord> {
        let mut records = self.records.clone();
        records.sort_by_key(|r| r.index);
        records
    }

    pub fn finalize(&self) -> EvalResult<AggregateMetrics> {
        if self.is_empty() {
            return Err(EvalError::EmptyEvaluation);
        }
        let records = self.records();
        let diffs: Vec<f64> = records.iter().map(|r| r.diff).collect();
        let correct: Vec<bool> = records.iter().map(|r| r.correct).collect();
        AggregateMetrics::compute(&diffs, &correct)
    }
}

// ─── PairedReport ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct PairedReport {
    pub metrics: AggregateMetrics,
    /// Per-pair scores in dataset order
    pub records: Vec<PairRecord>,
}

// ─── PairedEvaluator ──────────────────────────────────────────────────────────
pub struct PairedEvaluator<'a, B: Backend, M: LanguageModelAdapter<B> + ?Sized> {
    model:    &'a M,
    strategy: ScoringStrategy,
    retry:    RetryPolicy,
    progress: Option<ProgressBar>,
    _backend: PhantomData<B>,
}

impl<'a, B, M> PairedEvaluator<'a, B, M>
where
    B: Backend,
    M: LanguageModelAdapter<B> + ?Sized,
{
    pub fn new(model: &'a M, strategy: ScoringStrategy, retry: RetryPolicy) -> Self {
        Self { model, strategy, retry, progress: None, _backend: PhantomData }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Tokenise and score windows, one score per window.
    pub fn score_windows(&self, windows: &[SequenceWindow]) -> EvalResult<Vec<f64>> {
        let batch = self.model.tokenize(windows)?;
        self.score_with_retry(&batch)
    }

    fn score_with_retry(&self, batch: &TokenizedBatch) -> EvalResult<Vec<f64>> {
        tracing::trace!(
            "{} rows × {} tokens, {} forward passes",
            batch.batch_size(),
            batch.width(),
            self.strategy.passes_per_batch(batch.width())
        );
        match self.strategy.score(self.model, batch) {
            Err(e) if e.is_resource_exhausted()
                && self.retry == RetryPolicy::SplitOnExhaustion
                && batch.batch_size() > 1 =>
            {
                let mid = batch.batch_size() / 2;
                tracing::warn!(
                    "{e}; retrying as two halves of {} and {} rows",
                    mid,
                    batch.batch_size() - mid
                );
                let (head, tail) = batch.split_at(mid);
                let mut scores = self.strategy.score(self.model, &head)?;
                scores.extend(self.strategy.score(self.model, &tail)?);
                Ok(scores)
            }
            other => other,
        }
    }

    /// Scores of both arms of one batch.
    pub fn score_pair_batch(&self, batch: &PairedBatch) -> EvalResult<(Vec<f64>, Vec<f64>)> {
        let seq = self.score_windows(&batch.sequences)?;
        let ctrl = self.score_windows(&batch.controls)?;
        Ok((seq, ctrl))
    }

    fn accumulate<I>(&self, batches: I, expected: usize) -> EvalResult<PairedAccumulator>
    where
        I: IntoIterator<Item = PairedBatch>,
    {
        let mut acc = PairedAccumulator::new();
        for batch in batches {
            let (seq, ctrl) = self.score_pair_batch(&batch)?;
            acc.record(&batch.indices, &seq, &ctrl)?;
            tracing::debug!("Scored {} / {} pairs", acc.len(), expected);
            if let Some(pb) = &self.progress {
                pb.inc(batch.indices.len() as u64);
            }
        }
        if let Some(pb) = &self.progress {
            pb.finish();
        }
        check_count(acc.len(), expected)?;
        Ok(acc)
    }

    /// Score every pair, returning records in dataset order.
    pub fn score_pairs<I>(&self, batches: I, expected: usize) -> EvalResult<Vec<PairRecord>>
    where
        I: IntoIterator<Item = PairedBatch>,
    {
        Ok(self.accumulate(batches, expected)?.records())
    }

    /// Full paired evaluation: per-pair records plus aggregate metrics.
    pub fn evaluate<I>(&self, batches: I, expected: usize) -> EvalResult<PairedReport>
    where
        I: IntoIterator<Item = PairedBatch>,
    {
        let acc = self.accumulate(batches, expected)?;
        let metrics = acc.finalize()?;
        Ok(PairedReport { metrics, records: acc.records() })
    }

    /// Single-arm scores as (index, score), in dataset order.
    pub fn score_sequences<I>(&self, batches: I, expected: usize) -> EvalResult<Vec<(usize, f64)>>
    where
        I: IntoIterator<Item = SequenceBatch>,
    {
        let mut scored = Vec::with_capacity(expected);
        for batch in batches {
            let scores = self.score_windows(&batch.sequences)?;
            scored.extend(batch.indices.iter().copied().zip(scores));
            if let Some(pb) = &self.progress {
                pb.inc(batch.indices.len() as u64);
            }
        }
        if let Some(pb) = &self.progress {
            pb.finish();
        }
        check_count(scored.len(), expected)?;
        scored.sort_by_key(|(index, _)| *index);
        Ok(scored)
    }
}

fn check_count(scored: usize, expected: usize) -> EvalResult<()> {
    if scored != expected {
        return Err(EvalError::Config(format!(
            "scored {scored} of {expected} dataset entries; earlier errors name the missing ones"
        )));
    }
    Ok(())
}
