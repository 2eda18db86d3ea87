// ============================================================
// Layer 2 — Evaluation Session
// ============================================================
// The collaborators every task opens the same way, in the same
// order:
//
//   Step 1: Write run_config.json         (Layer 6 - infra)
//   Step 2: Open the genome split         (Layer 4 - data)
//   Step 3: Load model card + weights     (Layer 6 - infra)
//   Step 4: Load tokenizer, build adapter (Layer 6 / Layer 5)
//
// Tasks then build their dataset, wrap it in a DataLoader and
// hand the batches to a PairedEvaluator.

use anyhow::{Context, Result};
use burn::{
    data::dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
    data::dataset::Dataset,
    prelude::*,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;

use crate::application::run_config::RunConfig;
use crate::data::genome::FastaGenome;
use crate::domain::traits::GenomeSource;
use crate::infra::{
    checkpoint::{CheckpointManager, ModelCard},
    metrics::MetricsReporter,
    tokenizer_store::TokenizerStore,
};
use crate::ml::{adapter::TransformerLmAdapter, evaluator::PairedEvaluator};

pub struct Session<B: Backend> {
    pub card:     ModelCard,
    pub adapter:  TransformerLmAdapter<B>,
    pub genome:   Arc<dyn GenomeSource>,
    pub reporter: MetricsReporter,
}

impl<B: Backend> Session<B> {
    /// Open every collaborator of a run. `task_config` is what gets
    /// written to run_config.json.
    pub fn open<C: Serialize>(run: &RunConfig, task_config: &C, device: B::Device) -> Result<Self> {
        let reporter = MetricsReporter::new(&run.output_dir)?;
        reporter.write_json("run_config.json", task_config)?;

        let genome = FastaGenome::open(&run.genome, Some(run.chroms.as_slice()))
            .with_context(|| format!("Cannot open genome '{}'", run.genome.display()))?;

        let checkpoint = CheckpointManager::new(&run.checkpoint_dir);
        let card = checkpoint.load_card()?;
        let model = checkpoint.load_model::<B>(&card, &device)?;
        let tokenizer = TokenizerStore::new(&run.checkpoint_dir).load_adapter(&card)?;
        let adapter = TransformerLmAdapter::new(model, tokenizer, device, run.max_logits_mib)
            .context("Tokenizer and model do not fit together")?;

        tracing::info!(
            "Session ready: {} model, {:?} scoring, chromosomes [{}]",
            card.family,
            card.family.strategy(),
            run.chroms.join(", ")
        );

        Ok(Self { card, adapter, genome: Arc::new(genome), reporter })
    }

    pub fn evaluator(&self, run: &RunConfig, total: usize, msg: &str) -> PairedEvaluator<'_, B, TransformerLmAdapter<B>> {
        let evaluator = PairedEvaluator::new(&self.adapter, self.card.family.strategy(), run.retry);
        if run.progress {
            evaluator.with_progress(progress_bar(total as u64, msg))
        } else {
            evaluator
        }
    }
}

/// DataLoader over `dataset` with the run's batch size and prefetch workers.
pub fn data_loader<B, I, O, Bt, D>(run: &RunConfig, batcher: Bt, dataset: D) -> Arc<dyn DataLoader<B, O>>
where
    B: Backend,
    I: Send + Sync + Clone + Debug + 'static,
    O: Send + Clone + Debug + 'static,
    Bt: Batcher<B, I, O> + 'static,
    D: Dataset<I> + 'static,
{
    let builder = DataLoaderBuilder::<B, I, O>::new(batcher).batch_size(run.batch_size);
    let builder = if run.num_workers > 0 {
        builder.num_workers(run.num_workers)
    } else {
        builder
    };
    builder.build(dataset)
}

pub fn progress_bar(length: u64, msg: &str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    let bar = ProgressBar::new(length);
    bar.set_style(style);
    bar.set_message(msg.to_string());
    bar
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    use crate::application::init_model_use_case::{InitModelConfig, InitModelUseCase};
    use crate::application::run_config::DeviceKind;
    use crate::data::batcher::{SequenceBatch, SequenceBatcher};
    use crate::data::dataset::{ElementDataset, IndexedWindow};
    use crate::data::elements::read_elements;
    use crate::infra::checkpoint::{Architecture, ModelFamily};
    use crate::ml::evaluator::RetryPolicy;

    pub(crate) const GENOME: &str =
        "ACGTTGCAAGCTTACGGATCCATGCATGGCTAGCTAACGTGGCCTTAAGGCCATATCGCGTACG";

    /// A freshly initialised checkpoint, a two-chromosome genome, an
    /// elements file and a variants file, run with two prefetch workers.
    pub(crate) fn workspace(family: ModelFamily) -> (TempDir, RunConfig) {
        let dir = tempdir().expect("tempdir");
        let ckpt = dir.path().join("ckpt");
        InitModelUseCase::new(InitModelConfig {
            checkpoint_dir: ckpt.clone(),
            family,
            architecture: Architecture {
                vocab_size:  10,
                max_seq_len: 16,
                d_model:     8,
                num_heads:   2,
                num_layers:  1,
                d_ff:        16,
            },
            seed: 11,
        })
        .execute()
        .expect("init model");

        fs::write(dir.path().join("genome.fa"), format!(">chr1\n{GENOME}\n>chr2\n{GENOME}\n"))
            .expect("write genome");

        // Four explicit controls, two shuffled ones and a row off the split
        let mut elements = String::from("chr\tstart\tend\tctrl_start\tctrl_end\n");
        for i in 0..6i64 {
            if i < 4 {
                elements.push_str(&format!("chr1\t{}\t{}\t{}\t{}\n", i * 8, i * 8 + 8, i * 8 + 4, i * 8 + 12));
            } else {
                elements.push_str(&format!("chr1\t{}\t{}\t\t\n", i * 8, i * 8 + 8));
            }
        }
        elements.push_str("chr2\t0\t8\t\t\n");
        fs::write(dir.path().join("elements.tsv"), elements).expect("write elements");

        fs::write(
            dir.path().join("variants.tsv"),
            "chr\tpos\tallele1\tallele2\nchr1\t10\tG\tA\nchr1\t20\tC\tT\nchr1\t30\tC\tG\n",
        )
        .expect("write variants");

        let run = RunConfig {
            checkpoint_dir: ckpt,
            genome:         dir.path().join("genome.fa"),
            chroms:         vec!["chr1".into()],
            batch_size:     2,
            num_workers:    2,
            seed:           7,
            device:         DeviceKind::Cpu,
            output_dir:     dir.path().join("out"),
            max_logits_mib: None,
            retry:          RetryPolicy::SplitOnExhaustion,
            progress:       false,
        };
        (dir, run)
    }

    #[test]
    fn prefetching_loader_yields_every_index_once() {
        let (dir, run) = workspace(ModelFamily::MistralDna);
        let genome = FastaGenome::open(&run.genome, Some(run.chroms.as_slice())).unwrap();
        let elements = read_elements(&dir.path().join("elements.tsv"), Some(run.chroms.as_slice())).unwrap();
        let dataset = ElementDataset::new(Arc::new(genome), elements).unwrap();

        let loader = data_loader::<NdArray, IndexedWindow, SequenceBatch, _, _>(&run, SequenceBatcher, dataset);
        let mut seen: Vec<usize> = loader.iter().flat_map(|batch| batch.indices).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn open_writes_run_config_and_loads_the_checkpoint() {
        let (_dir, run) = workspace(ModelFamily::Dnabert2);
        let session = Session::<NdArray>::open(&run, &run, NdArrayDevice::default()).unwrap();
        assert_eq!(session.card.family, ModelFamily::Dnabert2);
        assert!(session.genome.has_chrom("chr1"));
        assert!(!session.genome.has_chrom("chr2"));
        assert!(run.output_dir.join("run_config.json").is_file());
    }
}
