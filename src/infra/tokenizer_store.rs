// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Finds the tokenizer of a checkpoint and resolves the token
// conventions the adapter needs.
//
//   tokenizer.json present → HuggingFace tokenizer, family ids
//   tokenizer.json absent  → built-in nucleotide vocabulary
//
// With the built-in vocabulary the family's start/end ids do not
// apply; a family that has a start token gets [CLS], one with an
// end token gets [SEP].
//
// Mask and pad ids are always looked up by name in whichever
// vocabulary is in use. A model card may replace the whole
// TokenConfig.

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::domain::tokens::TokenConfig;
use crate::domain::traits::TokenEncoder;
use crate::infra::checkpoint::ModelCard;
use crate::ml::scoring::ScoringStrategy;
use crate::ml::tokenizer_adapter::{NucleotideTokenizer, TokenizerAdapter, CLS_ID, SEP_ID};

const MASK_NAMES: [&str; 3] = ["[MASK]", "<mask>", "MASK"];
const PAD_NAMES: [&str; 3] = ["[PAD]", "<pad>", "PAD"];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Tokenizer adapter for the model described by `card`.
    pub fn load_adapter(&self, card: &ModelCard) -> Result<TokenizerAdapter> {
        let path = self.dir.join("tokenizer.json");
        let (start, end) = card.family.special_tokens();

        let (encoder, start, end) = if path.exists() {
            tracing::info!("Loading tokenizer from '{}'", path.display());
            let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
                anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e)
            })?;
            let encoder: Arc<dyn TokenEncoder> = Arc::new(tokenizer);
            (encoder, start, end)
        } else {
            tracing::info!("No tokenizer.json in '{}', using the nucleotide vocabulary", self.dir.display());
            // Framing follows the card's override when there is one
            let (frame_start, frame_end) = match &card.tokens {
                Some(t) => (t.start_token.is_some(), t.end_token.is_some()),
                None => (start.is_some(), end.is_some()),
            };
            let encoder: Arc<dyn TokenEncoder> =
                Arc::new(NucleotideTokenizer::new(frame_start, frame_end));
            (encoder, start.map(|_| CLS_ID), end.map(|_| SEP_ID))
        };

        let config = match card.tokens {
            Some(config) => {
                tracing::info!("Using token configuration from the model card");
                config
            }
            None => resolve(encoder.as_ref(), card, start, end)?,
        };
        tracing::debug!("Token configuration: {:?}", config);

        Ok(TokenizerAdapter::new(encoder, config))
    }
}

fn lookup(encoder: &dyn TokenEncoder, names: &[&str]) -> Option<u32> {
    names.iter().find_map(|name| encoder.token_id(name))
}

fn resolve(
    encoder: &dyn TokenEncoder,
    card:    &ModelCard,
    start:   Option<u32>,
    end:     Option<u32>,
) -> Result<TokenConfig> {
    let Some(pad_token) = lookup(encoder, &PAD_NAMES) else {
        bail!("Tokenizer has no padding token (tried {})", PAD_NAMES.join(", "));
    };
    let mask_token = match lookup(encoder, &MASK_NAMES) {
        Some(id) => id,
        // Causal scoring never substitutes a mask token
        None if card.family.strategy() == ScoringStrategy::Causal => pad_token,
        None => bail!(
            "A {} model needs a mask token (tried {})",
            card.family,
            MASK_NAMES.join(", ")
        ),
    };

    Ok(TokenConfig {
        start_token: start,
        end_token: end,
        mask_token,
        pad_token,
        use_attention_mask: card.family.uses_attention_mask(),
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::checkpoint::{Architecture, ModelFamily};
    use crate::domain::sequence::SequenceWindow;
    use crate::domain::tokens::Starts;
    use tempfile::tempdir;

    fn card(family: ModelFamily) -> ModelCard {
        ModelCard {
            family,
            architecture: Architecture {
                vocab_size: 10,
                max_seq_len: 32,
                d_model: 8,
                num_heads: 2,
                num_layers: 1,
                d_ff: 16,
            },
            tokens: None,
        }
    }

    #[test]
    fn builtin_vocabulary_maps_family_tokens_to_cls_and_sep() {
        let dir = tempdir().expect("tempdir");
        let store = TokenizerStore::new(dir.path());

        let adapter = store.load_adapter(&card(ModelFamily::NucleotideTransformer)).unwrap();
        let config = adapter.config();
        assert_eq!(config.start_token, Some(CLS_ID));
        assert_eq!(config.end_token, None);
        assert_eq!(config.mask_token, 4);
        assert_eq!(config.pad_token, 3);

        let batch = adapter.tokenize(&[SequenceWindow::from_bases(b"ACG")]).unwrap();
        assert_eq!(batch.tokens()[0], vec![CLS_ID, 5, 6, 7]);
        assert_eq!(batch.boundaries().starts(), &Starts::PerSequence(vec![1]));
        assert_eq!(batch.boundaries().ends(), &[4]);
    }

    #[test]
    fn hyena_has_no_attention_mask() {
        let dir = tempdir().expect("tempdir");
        let adapter = TokenizerStore::new(dir.path()).load_adapter(&card(ModelFamily::HyenaDna)).unwrap();
        assert!(!adapter.config().use_attention_mask);
        assert_eq!(adapter.config().end_token, Some(SEP_ID));
        let batch = adapter.tokenize(&[SequenceWindow::from_bases(b"AC")]).unwrap();
        assert!(batch.attention_mask().is_none());
        assert_eq!(batch.boundaries().ends(), &[2]);
    }

    #[test]
    fn model_card_overrides_token_configuration() {
        let dir = tempdir().expect("tempdir");
        let mut card = card(ModelFamily::Dnabert2);
        let custom = TokenConfig {
            start_token: None,
            end_token: None,
            mask_token: 4,
            pad_token: 3,
            use_attention_mask: false,
        };
        card.tokens = Some(custom);
        let adapter = TokenizerStore::new(dir.path()).load_adapter(&card).unwrap();
        assert_eq!(adapter.config(), &custom);
        let batch = adapter.tokenize(&[SequenceWindow::from_bases(b"GT")]).unwrap();
        assert_eq!(batch.tokens()[0], vec![7, 8]);
    }

    #[test]
    fn unreadable_tokenizer_json_is_an_error() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("tokenizer.json"), "{ not json").expect("write");
        assert!(TokenizerStore::new(dir.path()).load_adapter(&card(ModelFamily::Dnabert2)).is_err());
    }
}
