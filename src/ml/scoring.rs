// ============================================================
// Layer 5 — Scoring Strategies
// ============================================================
// Reduce a tokenised batch to one log-likelihood per row, summed
// over the row's [start, end) range only.
//
// Masked (bidirectional models):
//   for each position i in [0, T):
//     replace column i with the mask token in every row
//     one forward pass
//     ll_i = log P(original token at i | everything else)
//     total += ll_i × clip[:, i]
//   → T forward passes per batch
//
// Causal (autoregressive models):
//   one forward pass over the unmodified tokens
//   ll_i = log P(token i | tokens < i), read from the logits at
//   position i − 1; position 0 has no context and scores 0
//   total = Σ ll_i × clip[:, i]
//   → 1 forward pass per batch
//
// The clip mask comes from Boundaries, so a start shared by the
// whole batch is compared against each row's own end.

use burn::{prelude::*, tensor::activation::log_softmax};
use serde::{Deserialize, Serialize};

use crate::domain::error::{EvalError, EvalResult};
use crate::domain::tokens::TokenizedBatch;
use crate::ml::adapter::LanguageModelAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringStrategy {
    Masked,
    Causal,
}

impl ScoringStrategy {
    /// One summed log-likelihood per row of `batch`.
    pub fn score<B, M>(&self, model: &M, batch: &TokenizedBatch) -> EvalResult<Vec<f64>>
    where
        B: Backend,
        M: LanguageModelAdapter<B> + ?Sized,
    {
        if batch.batch_size() == 0 || batch.width() == 0 {
            return Ok(vec![0.0; batch.batch_size()]);
        }
        match self {
            ScoringStrategy::Masked => masked_score(model, batch),
            ScoringStrategy::Causal => causal_score(model, batch),
        }
    }

    /// Forward passes issued per batch of `width` tokens
    pub fn passes_per_batch(&self, width: usize) -> usize {
        match self {
            ScoringStrategy::Masked => width,
            ScoringStrategy::Causal => 1,
        }
    }
}

// ─── Tensor helpers ───────────────────────────────────────────────────────────
fn token_tensors<B: Backend>(
    batch:  &TokenizedBatch,
    device: &B::Device,
) -> (Tensor<B, 2, Int>, Option<Tensor<B, 2, Int>>) {
    let shape = [batch.batch_size(), batch.width()];
    let tokens = Tensor::<B, 2, Int>::from_data(TensorData::new(batch.flat_tokens(), shape), device);
    let mask = batch
        .flat_attention_mask()
        .map(|m| Tensor::<B, 2, Int>::from_data(TensorData::new(m, shape), device));
    (tokens, mask)
}

fn check_logits<B: Backend>(logits: &Tensor<B, 3>, n: usize, t: usize) -> EvalResult<usize> {
    let [ln, lt, vocab] = logits.dims();
    if ln != n || lt != t {
        return Err(EvalError::Model(format!(
            "expected logits for {n}×{t} tokens, got {ln}×{lt}"
        )));
    }
    Ok(vocab)
}

fn into_scores<B: Backend>(totals: Tensor<B, 1>) -> EvalResult<Vec<f64>> {
    let values = totals
        .into_data()
        .convert::<f32>()
        .into_vec::<f32>()
        .map_err(|e| EvalError::Model(format!("cannot read scores back: {e:?}")))?;
    Ok(values.into_iter().map(f64::from).collect())
}

// ─── Masked ───────────────────────────────────────────────────────────────────
fn masked_score<B, M>(model: &M, batch: &TokenizedBatch) -> EvalResult<Vec<f64>>
where
    B: Backend,
    M: LanguageModelAdapter<B> + ?Sized,
{
    let device = model.device();
    let (n, t) = (batch.batch_size(), batch.width());
    let (tokens, attention_mask) = token_tensors::<B>(batch, &device);
    let mask_column =
        Tensor::<B, 2, Int>::full([n, 1], model.token_config().mask_token as i64, &device);

    let mut totals = Tensor::<B, 1>::zeros([n], &device);
    for i in 0..t {
        let masked = tokens.clone().slice_assign([0..n, i..i + 1], mask_column.clone());
        let logits = model.forward_logits(masked, attention_mask.clone())?;
        let vocab = check_logits(&logits, n, t)?;

        let log_probs = log_softmax(logits.slice([0..n, i..i + 1, 0..vocab]), 2);
        let target = tokens.clone().slice([0..n, i..i + 1]).reshape([n, 1, 1]);
        let ll = log_probs.gather(2, target).reshape([n]);

        let clip = Tensor::<B, 1>::from_data(
            TensorData::new(batch.boundaries().clip_column(i), [n]),
            &device,
        );
        totals = totals + ll * clip;
    }

    into_scores(totals)
}

// ─── Causal ───────────────────────────────────────────────────────────────────
fn causal_score<B, M>(model: &M, batch: &TokenizedBatch) -> EvalResult<Vec<f64>>
where
    B: Backend,
    M: LanguageModelAdapter<B> + ?Sized,
{
    let device = model.device();
    let (n, t) = (batch.batch_size(), batch.width());
    let (tokens, attention_mask) = token_tensors::<B>(batch, &device);

    let logits = model.forward_logits(tokens.clone(), attention_mask)?;
    let vocab = check_logits(&logits, n, t)?;
    if t < 2 {
        return Ok(vec![0.0; n]);
    }

    // Logits at i − 1 predict token i
    let log_probs = log_softmax(logits.slice([0..n, 0..t - 1, 0..vocab]), 2);
    let next = tokens.slice([0..n, 1..t]).reshape([n, t - 1, 1]);
    let shifted = log_probs.gather(2, next).reshape([n, t - 1]);
    let ll = Tensor::cat(vec![Tensor::<B, 2>::zeros([n, 1], &device), shifted], 1);

    let clip: Vec<f32> = batch.boundaries().clip_mask(t).into_iter().flatten().collect();
    let clip = Tensor::<B, 2>::from_data(TensorData::new(clip, [n, t]), &device);

    into_scores((ll * clip).sum_dim(1).reshape([n]))
}
