// ============================================================
// Layer 5 — Model Adapter
// ============================================================
// The one interface the scoring strategies see:
//
//   tokenize        → windows to padded tokens + boundaries
//   forward_logits  → tokens (+ optional mask) to logits
//
// Scoring is chosen separately (see scoring.rs), so any adapter
// can be scored either way; the model family decides which.
//
// The transformer adapter also enforces the logits budget: a
// pass whose [batch × tokens × vocab] f32 logits would exceed
// `max_logits_mib` is refused with ResourceExhausted before
// anything is allocated. The evaluator's retry policy reacts to
// exactly that error.

use burn::prelude::*;

use crate::domain::error::{EvalError, EvalResult};
use crate::domain::sequence::SequenceWindow;
use crate::domain::tokens::{TokenConfig, TokenizedBatch};
use crate::ml::model::TransformerLm;
use crate::ml::tokenizer_adapter::TokenizerAdapter;

pub trait LanguageModelAdapter<B: Backend> {
    fn tokenize(&self, windows: &[SequenceWindow]) -> EvalResult<TokenizedBatch>;

    fn token_config(&self) -> &TokenConfig;

    /// tokens: [batch, T] → logits: [batch, T, vocab]
    fn forward_logits(
        &self,
        tokens:         Tensor<B, 2, Int>,
        attention_mask: Option<Tensor<B, 2, Int>>,
    ) -> EvalResult<Tensor<B, 3>>;

    fn device(&self) -> B::Device;
}

// ─── TransformerLmAdapter ─────────────────────────────────────────────────────
pub struct TransformerLmAdapter<B: Backend> {
    model:          TransformerLm<B>,
    tokenizer:      TokenizerAdapter,
    device:         B::Device,
    max_logits_mib: Option<usize>,
}

impl<B: Backend> TransformerLmAdapter<B> {
    pub fn new(
        model:          TransformerLm<B>,
        tokenizer:      TokenizerAdapter,
        device:         B::Device,
        max_logits_mib: Option<usize>,
    ) -> EvalResult<Self> {
        if tokenizer.vocab_size() > model.vocab_size {
            return Err(EvalError::Config(format!(
                "tokenizer has {} tokens but the model head only {}",
                tokenizer.vocab_size(),
                model.vocab_size
            )));
        }
        check_token_ids(tokenizer.config(), model.vocab_size)?;
        Ok(Self { model, tokenizer, device, max_logits_mib })
    }

    fn check_budget(&self, batch: usize, width: usize) -> EvalResult<()> {
        let Some(limit) = self.max_logits_mib else {
            return Ok(());
        };
        let bytes = batch * width * self.model.vocab_size * std::mem::size_of::<f32>();
        if bytes > limit * 1024 * 1024 {
            return Err(EvalError::ResourceExhausted(format!(
                "{batch}×{width}×{} logits need {:.1} MiB, budget is {limit} MiB",
                self.model.vocab_size,
                bytes as f64 / (1024.0 * 1024.0)
            )));
        }
        Ok(())
    }
}

/// Every special token must index a row of the embedding table.
fn check_token_ids(config: &TokenConfig, vocab_size: usize) -> EvalResult<()> {
    let ids = [
        ("start", config.start_token),
        ("end", config.end_token),
        ("mask", Some(config.mask_token)),
        ("pad", Some(config.pad_token)),
    ];
    for (name, id) in ids {
        if let Some(id) = id.filter(|&id| id as usize >= vocab_size) {
            return Err(EvalError::Config(format!(
                "{name} token id {id} is outside the model vocabulary of {vocab_size}"
            )));
        }
    }
    Ok(())
}

impl<B: Backend> LanguageModelAdapter<B> for TransformerLmAdapter<B> {
    fn tokenize(&self, windows: &[SequenceWindow]) -> EvalResult<TokenizedBatch> {
        self.tokenizer.tokenize(windows)
    }

    fn token_config(&self) -> &TokenConfig {
        self.tokenizer.config()
    }

    fn forward_logits(
        &self,
        tokens:         Tensor<B, 2, Int>,
        attention_mask: Option<Tensor<B, 2, Int>>,
    ) -> EvalResult<Tensor<B, 3>> {
        let [batch, width] = tokens.dims();
        if width > self.model.max_seq_len {
            return Err(EvalError::Model(format!(
                "{width} tokens exceed the model's maximum of {}",
                self.model.max_seq_len
            )));
        }
        self.check_budget(batch, width)?;
        Ok(self.model.forward(tokens, attention_mask))
    }

    fn device(&self) -> B::Device {
        self.device.clone()
    }
}
