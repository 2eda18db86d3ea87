// ============================================================
// Layer 2 — PairedControlUseCase
// ============================================================
// Zero-shot paired-control evaluation:
//
//   Step 1: Validate the configuration       (fail fast)
//   Step 2: Open the session                 (genome, model, tokenizer)
//   Step 3: Read the elements of the split   (Layer 4 - data)
//   Step 4: Build dataset + DataLoader       (Layer 4 - data)
//   Step 5: Score every (element, control)   (Layer 5 - ml)
//   Step 6: Aggregate + write sidecars       (Layer 3 / Layer 6)

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};

use crate::application::run_config::{DeviceKind, PairedControlConfig};
use crate::application::session::{data_loader, Session};
use crate::data::{
    batcher::{PairedBatch, PairedBatcher},
    dataset::PairedControlDataset,
    elements::read_elements,
};
use crate::domain::sequence::PairedSample;
use crate::ml::evaluator::PairedReport;

pub struct PairedControlUseCase {
    config: PairedControlConfig,
}

impl PairedControlUseCase {
    pub fn new(config: PairedControlConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PairedReport> {
        self.config.validate()?;
        match self.config.run.device {
            DeviceKind::Cpu => self.execute_on::<NdArray>(NdArrayDevice::default()),
            DeviceKind::Wgpu => self.execute_on::<Wgpu>(WgpuDevice::default()),
        }
    }

    fn execute_on<B: Backend>(&self, device: B::Device) -> Result<PairedReport> {
        let cfg = &self.config;
        let session = Session::<B>::open(&cfg.run, cfg, device)?;

        let elements = read_elements(&cfg.elements, Some(cfg.run.chroms.as_slice()))?;
        let dataset = PairedControlDataset::new(session.genome.clone(), elements.clone(), cfg.run.seed)?;
        let total = elements.len();
        tracing::info!("Evaluating {} element/control pairs", total);

        let loader = data_loader::<B, PairedSample, PairedBatch, _, _>(&cfg.run, PairedBatcher, dataset);
        let report = session
            .evaluator(&cfg.run, total, "pairs")
            .evaluate(loader.iter(), total)
            .context("Paired-control evaluation failed")?;

        session.reporter.write_metrics(&report.metrics)?;
        session.reporter.write_paired_scores(&report.records, &elements)?;

        tracing::info!(
            "Done: acc={:.4}, pval={:.3e} over {} pairs",
            report.metrics.acc,
            report.metrics.pval,
            report.records.len()
        );
        Ok(report)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::application::session::tests::workspace;
    use crate::infra::checkpoint::ModelFamily;

    const METRIC_KEYS: [&str; 9] = [
        "acc",
        "pval",
        "signed_rank_sum",
        "mean_diff",
        "q05_diff",
        "q25_diff",
        "median_diff",
        "q75_diff",
        "q95_diff",
    ];

    fn run_family(family: ModelFamily) {
        let (dir, run) = workspace(family);
        let out = run.output_dir.clone();
        let cfg = PairedControlConfig { run, elements: dir.path().join("elements.tsv") };
        let report = PairedControlUseCase::new(cfg).execute().unwrap();

        let indices: Vec<usize> = report.records.iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());

        let scores = fs::read_to_string(out.join("paired_scores.tsv")).unwrap();
        let mut lines = scores.lines();
        assert!(lines.next().unwrap().starts_with("index\tchr\tstart\tend"));
        let rows: Vec<Vec<&str>> = lines.map(|l| l.split('\t').collect()).collect();
        assert_eq!(rows.len(), 6);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row[0], i.to_string());
            assert_eq!(row[1], "chr1");
            assert_eq!(row[2], (i * 8).to_string());
        }

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("metrics.json")).unwrap()).unwrap();
        for key in METRIC_KEYS {
            assert!(json[key].is_number(), "metrics.json is missing '{key}'");
        }
        assert!(out.join("run_config.json").is_file());
    }

    #[test]
    fn causal_run_writes_ordered_scores_and_metrics() {
        run_family(ModelFamily::MistralDna);
    }

    #[test]
    fn masked_run_writes_ordered_scores_and_metrics() {
        run_family(ModelFamily::Dnabert2);
    }

    #[test]
    fn missing_elements_file_fails_before_scoring() {
        let (dir, run) = workspace(ModelFamily::MistralDna);
        let out = run.output_dir.clone();
        let cfg = PairedControlConfig { run, elements: dir.path().join("absent.tsv") };
        assert!(PairedControlUseCase::new(cfg).execute().is_err());
        assert!(!out.exists());
    }
}
