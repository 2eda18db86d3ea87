// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// Everything one evaluation run needs, as plain serialisable
// structs. The CLI fills them; every use case validates before
// it opens a single file, so bad paths and empty chromosome
// lists fail before any batch exists.
//
// The resolved configuration is written next to the outputs as
// run_config.json.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::error::{EvalError, EvalResult};
use crate::ml::evaluator::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    Wgpu,
}

// ─── RunConfig ────────────────────────────────────────────────────────────────
/// Settings shared by every evaluation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory holding model_card.json, model.mpk and optionally tokenizer.json
    pub checkpoint_dir: PathBuf,
    pub genome:         PathBuf,
    /// Chromosomes of the evaluation split
    pub chroms:         Vec<String>,
    pub batch_size:     usize,
    /// DataLoader prefetch threads; 0 loads on the scoring thread
    pub num_workers:    usize,
    pub seed:           u64,
    pub device:         DeviceKind,
    pub output_dir:     PathBuf,
    /// Refuse forward passes whose logits exceed this many MiB
    pub max_logits_mib: Option<usize>,
    pub retry:          RetryPolicy,
    pub progress:       bool,
}

impl RunConfig {
    pub fn validate(&self) -> EvalResult<()> {
        require_dir(&self.checkpoint_dir, "checkpoint directory")?;
        require_file(&self.checkpoint_dir.join("model_card.json"), "model card")?;
        require_file(&self.genome, "genome FASTA")?;
        if self.chroms.is_empty() {
            return Err(EvalError::Config("chromosome list is empty".into()));
        }
        if let Some(bad) = self.chroms.iter().find(|c| c.trim().is_empty()) {
            return Err(EvalError::Config(format!("invalid chromosome name '{bad}'")));
        }
        if self.batch_size == 0 {
            return Err(EvalError::Config("batch size must be at least 1".into()));
        }
        Ok(())
    }
}

// ─── Task configurations ──────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedControlConfig {
    #[serde(flatten)]
    pub run:      RunConfig,
    pub elements: PathBuf,
}

impl PairedControlConfig {
    pub fn validate(&self) -> EvalResult<()> {
        self.run.validate()?;
        require_file(&self.elements, "elements file")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikelihoodConfig {
    #[serde(flatten)]
    pub run:      RunConfig,
    pub elements: PathBuf,
}

impl LikelihoodConfig {
    pub fn validate(&self) -> EvalResult<()> {
        self.run.validate()?;
        require_file(&self.elements, "elements file")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    #[serde(flatten)]
    pub run:      RunConfig,
    pub variants: PathBuf,
    /// Window length in bases, centred on the variant
    pub window:   usize,
}

impl VariantConfig {
    pub fn validate(&self) -> EvalResult<()> {
        self.run.validate()?;
        require_file(&self.variants, "variants file")?;
        if self.window == 0 {
            return Err(EvalError::Config("variant window must be at least 1".into()));
        }
        Ok(())
    }
}

fn require_file(path: &Path, what: &str) -> EvalResult<()> {
    if !path.is_file() {
        return Err(EvalError::Config(format!("{what} '{}' does not exist", path.display())));
    }
    Ok(())
}

fn require_dir(path: &Path, what: &str) -> EvalResult<()> {
    if !path.is_dir() {
        return Err(EvalError::Config(format!("{what} '{}' does not exist", path.display())));
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    /// A directory with a model card, a genome and an elements file
    pub(crate) fn fixture() -> (TempDir, RunConfig) {
        let dir = tempdir().expect("tempdir");
        let ckpt = dir.path().join("ckpt");
        fs::create_dir_all(&ckpt).expect("mkdir");
        fs::write(ckpt.join("model_card.json"), "{}").expect("write card");
        fs::write(dir.path().join("genome.fa"), ">chr1\nACGT\n").expect("write genome");
        fs::write(dir.path().join("elements.tsv"), "chr\tstart\tend\nchr1\t0\t4\n").expect("write elements");

        let run = RunConfig {
            checkpoint_dir: ckpt,
            genome:         dir.path().join("genome.fa"),
            chroms:         vec!["chr1".into()],
            batch_size:     4,
            num_workers:    0,
            seed:           0,
            device:         DeviceKind::Cpu,
            output_dir:     dir.path().join("out"),
            max_logits_mib: None,
            retry:          RetryPolicy::SplitOnExhaustion,
            progress:       false,
        };
        (dir, run)
    }

    #[test]
    fn valid_configuration_passes() {
        let (dir, run) = fixture();
        let cfg = PairedControlConfig { run, elements: dir.path().join("elements.tsv") };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_chromosome_list_is_rejected() {
        let (_dir, mut run) = fixture();
        run.chroms.clear();
        assert!(matches!(run.validate(), Err(EvalError::Config(msg)) if msg.contains("chromosome")));
    }

    #[test]
    fn missing_genome_is_rejected() {
        let (dir, mut run) = fixture();
        run.genome = dir.path().join("absent.fa");
        assert!(matches!(run.validate(), Err(EvalError::Config(msg)) if msg.contains("absent.fa")));
    }

    #[test]
    fn missing_model_card_is_rejected() {
        let (dir, mut run) = fixture();
        run.checkpoint_dir = dir.path().to_path_buf();
        assert!(matches!(run.validate(), Err(EvalError::Config(msg)) if msg.contains("model card")));
    }

    #[test]
    fn missing_elements_file_is_rejected() {
        let (dir, run) = fixture();
        let cfg = LikelihoodConfig { run, elements: dir.path().join("nope.tsv") };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_batch_size_and_zero_window_are_rejected() {
        let (dir, mut run) = fixture();
        run.batch_size = 0;
        assert!(run.validate().is_err());

        let (_dir2, run) = fixture();
        let cfg = VariantConfig { run, variants: dir.path().join("elements.tsv"), window: 0 };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn run_config_json_is_flat() {
        let (dir, run) = fixture();
        let cfg = PairedControlConfig { run, elements: dir.path().join("elements.tsv") };
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["device"], serde_json::json!("cpu"));
        assert_eq!(json["retry"], serde_json::json!("split_on_exhaustion"));
        assert!(json.get("elements").is_some());
    }
}
