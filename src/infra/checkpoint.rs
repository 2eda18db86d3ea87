// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Restores a language model from a checkpoint directory using
// Burn's CompactRecorder.
//
// What a checkpoint directory holds:
//
//   checkpoint/
//     model_card.json   ← family + architecture (+ token overrides)
//     model.mpk         ← weights written by CompactRecorder
//     tokenizer.json    ← optional HuggingFace tokenizer
//
// Why a separate card?
//   The weights file only stores parameters. To load it we must
//   first rebuild the exact architecture (d_model, num_layers,
//   …), and the family decides how the model is scored.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//   - Stores floats at half precision
//   - Type-safe: loading fails if architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf};

use crate::domain::tokens::TokenConfig;
use crate::ml::model::{TransformerLm, TransformerLmConfig};
use crate::ml::scoring::ScoringStrategy;

const CARD_FILE: &str = "model_card.json";
const WEIGHTS_STEM: &str = "model";

// ─── ModelFamily ──────────────────────────────────────────────────────────────
/// Capability tag of a model family: how it is scored, which
/// special tokens frame the sequence, whether it takes a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFamily {
    Dnabert2,
    GenaLm,
    NucleotideTransformer,
    HyenaDna,
    MistralDna,
}

impl ModelFamily {
    pub fn strategy(&self) -> ScoringStrategy {
        match self {
            ModelFamily::Dnabert2
            | ModelFamily::GenaLm
            | ModelFamily::NucleotideTransformer => ScoringStrategy::Masked,
            ModelFamily::HyenaDna | ModelFamily::MistralDna => ScoringStrategy::Causal,
        }
    }

    /// (start_token, end_token) ids in the family's own vocabulary
    pub fn special_tokens(&self) -> (Option<u32>, Option<u32>) {
        match self {
            ModelFamily::Dnabert2 | ModelFamily::GenaLm | ModelFamily::MistralDna => (Some(1), Some(2)),
            ModelFamily::NucleotideTransformer => (Some(3), None),
            ModelFamily::HyenaDna => (None, Some(1)),
        }
    }

    pub fn uses_attention_mask(&self) -> bool {
        !matches!(self, ModelFamily::HyenaDna)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelFamily::Dnabert2 => "dnabert2",
            ModelFamily::GenaLm => "gena-lm",
            ModelFamily::NucleotideTransformer => "nucleotide-transformer",
            ModelFamily::HyenaDna => "hyena-dna",
            ModelFamily::MistralDna => "mistral-dna",
        };
        f.write_str(name)
    }
}

// ─── ModelCard ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCard {
    pub family:       ModelFamily,
    pub architecture: Architecture,

    /// Replaces the token conventions derived from the family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenConfig>,
}

impl ModelCard {
    pub fn model_config(&self) -> TransformerLmConfig {
        let a = &self.architecture;
        TransformerLmConfig::new(a.vocab_size, a.max_seq_len, a.d_model, a.num_heads, a.num_layers, a.d_ff)
            .with_causal(self.family.strategy() == ScoringStrategy::Causal)
    }
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn load_card(&self) -> Result<ModelCard> {
        let path = self.dir.join(CARD_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read model card '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid model card '{}'", path.display()))
    }

    pub fn save_card(&self, card: &ModelCard) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.dir.join(CARD_FILE);
        fs::write(&path, serde_json::to_string_pretty(card)?)
            .with_context(|| format!("Cannot write model card '{}'", path.display()))?;
        tracing::debug!("Saved model card to '{}'", path.display());
        Ok(())
    }

    /// Rebuild the architecture from `card` and load its weights.
    pub fn load_model<B: Backend>(&self, card: &ModelCard, device: &B::Device) -> Result<TransformerLm<B>> {
        let path = self.dir.join(WEIGHTS_STEM);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load weights '{}.mpk' for a {} model",
                    path.display(),
                    card.family
                )
            })?;

        tracing::info!(
            "Loaded {} model ({} layers, d_model={})",
            card.family,
            card.architecture.num_layers,
            card.architecture.d_model
        );
        Ok(card.model_config().init::<B>(device).load_record(record))
    }

    pub fn save_model<B: Backend>(&self, model: &TransformerLm<B>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.dir.join(WEIGHTS_STEM);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save weights to '{}'", path.display()))?;
        tracing::debug!("Saved weights to '{}.mpk'", path.display());
        Ok(())
    }
}
