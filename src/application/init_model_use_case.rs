// ============================================================
// Layer 2 — InitModelUseCase
// ============================================================
// Writes a checkpoint directory for a model family with seeded,
// randomly initialised weights:
//
//   Step 1: Validate the architecture     (fail fast)
//   Step 2: Seed the backend + init model (Layer 5 - ml)
//   Step 3: Save model card + weights     (Layer 6 - infra)
//
// The result loads exactly like any other checkpoint, so every
// evaluation task can run end to end without external weights.

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::error::EvalError;
use crate::infra::checkpoint::{Architecture, CheckpointManager, ModelCard, ModelFamily};
use crate::ml::tokenizer_adapter::NUCLEOTIDE_VOCAB;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitModelConfig {
    pub checkpoint_dir: PathBuf,
    pub family:         ModelFamily,
    pub architecture:   Architecture,
    pub seed:           u64,
}

impl InitModelConfig {
    pub fn validate(&self) -> Result<(), EvalError> {
        let a = &self.architecture;
        if a.d_model == 0 || a.num_heads == 0 || a.num_layers == 0 || a.max_seq_len == 0 {
            return Err(EvalError::Config("architecture sizes must be at least 1".into()));
        }
        if a.d_model % a.num_heads != 0 {
            return Err(EvalError::Config(format!(
                "d_model {} is not divisible by num_heads {}",
                a.d_model, a.num_heads
            )));
        }
        if a.vocab_size < NUCLEOTIDE_VOCAB.len() {
            return Err(EvalError::Config(format!(
                "vocab_size {} is smaller than the built-in nucleotide vocabulary ({})",
                a.vocab_size,
                NUCLEOTIDE_VOCAB.len()
            )));
        }
        Ok(())
    }
}

pub struct InitModelUseCase {
    config: InitModelConfig,
}

impl InitModelUseCase {
    pub fn new(config: InitModelConfig) -> Self {
        Self { config }
    }

    /// Returns the model card that was written
    pub fn execute(&self) -> Result<ModelCard> {
        let cfg = &self.config;
        cfg.validate()?;

        let card = ModelCard { family: cfg.family, architecture: cfg.architecture, tokens: None };
        let device = NdArrayDevice::default();
        <NdArray as Backend>::seed(cfg.seed);
        let model = card.model_config().init::<NdArray>(&device);

        let checkpoint = CheckpointManager::new(&cfg.checkpoint_dir);
        checkpoint.save_card(&card)?;
        checkpoint.save_model(&model)?;

        tracing::info!(
            "Initialised {} checkpoint in '{}' (seed {})",
            card.family,
            checkpoint.dir().display(),
            cfg.seed
        );
        Ok(card)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(dir: PathBuf) -> InitModelConfig {
        InitModelConfig {
            checkpoint_dir: dir,
            family:         ModelFamily::MistralDna,
            architecture:   Architecture {
                vocab_size:  10,
                max_seq_len: 16,
                d_model:     8,
                num_heads:   2,
                num_layers:  1,
                d_ff:        16,
            },
            seed: 3,
        }
    }

    #[test]
    fn written_checkpoint_loads_back() {
        let dir = tempdir().unwrap();
        let ckpt = dir.path().join("ckpt");
        let card = InitModelUseCase::new(config(ckpt.clone())).execute().unwrap();

        let manager = CheckpointManager::new(&ckpt);
        assert_eq!(manager.load_card().unwrap(), card);
        let model = manager.load_model::<NdArray>(&card, &NdArrayDevice::default()).unwrap();

        let tokens = Tensor::<NdArray, 2, Int>::zeros([1, 4], &NdArrayDevice::default());
        assert_eq!(model.forward(tokens, None).dims(), [1, 4, 10]);
    }

    #[test]
    fn indivisible_heads_are_rejected() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path().join("ckpt"));
        cfg.architecture.num_heads = 3;
        assert!(InitModelUseCase::new(cfg).execute().is_err());
        assert!(!dir.path().join("ckpt").exists());
    }

    #[test]
    fn vocabulary_smaller_than_nucleotides_is_rejected() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path().to_path_buf());
        cfg.architecture.vocab_size = 4;
        assert!(matches!(cfg.validate(), Err(EvalError::Config(_))));
    }
}
