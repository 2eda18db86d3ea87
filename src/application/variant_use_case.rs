// ============================================================
// Layer 2 — VariantUseCase
// ============================================================
// Allele likelihoods: each variant becomes two windows centred
// on it, one per allele, scored with the family's strategy.
// Output is allele1 \t allele2 per variant, in file order.

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};
use std::path::PathBuf;

use crate::application::run_config::{DeviceKind, VariantConfig};
use crate::application::session::{data_loader, Session};
use crate::data::{
    batcher::{PairedBatch, PairedBatcher},
    dataset::VariantDataset,
    elements::read_variants,
};
use crate::domain::sequence::PairedSample;

pub struct VariantUseCase {
    config: VariantConfig,
}

impl VariantUseCase {
    pub fn new(config: VariantConfig) -> Self {
        Self { config }
    }

    /// Returns the path of variant_likelihoods.tsv
    pub fn execute(&self) -> Result<PathBuf> {
        self.config.validate()?;
        match self.config.run.device {
            DeviceKind::Cpu => self.execute_on::<NdArray>(NdArrayDevice::default()),
            DeviceKind::Wgpu => self.execute_on::<Wgpu>(WgpuDevice::default()),
        }
    }

    fn execute_on<B: Backend>(&self, device: B::Device) -> Result<PathBuf> {
        let cfg = &self.config;
        let session = Session::<B>::open(&cfg.run, cfg, device)?;

        let variants = read_variants(&cfg.variants, Some(cfg.run.chroms.as_slice()))?;
        let total = variants.len();
        let dataset = VariantDataset::new(session.genome.clone(), variants, cfg.window)?;
        tracing::info!("Scoring {} variants with {} bp windows", total, cfg.window);

        let loader = data_loader::<B, PairedSample, PairedBatch, _, _>(&cfg.run, PairedBatcher, dataset);
        let records = session
            .evaluator(&cfg.run, total, "variants")
            .score_pairs(loader.iter(), total)
            .context("Variant scoring failed")?;

        session.reporter.write_variant_likelihoods(&records)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::application::session::tests::workspace;
    use crate::infra::checkpoint::ModelFamily;

    #[test]
    fn writes_both_allele_likelihoods_per_variant() {
        let (dir, run) = workspace(ModelFamily::NucleotideTransformer);
        let cfg = VariantConfig { run, variants: dir.path().join("variants.tsv"), window: 8 };
        let path = VariantUseCase::new(cfg).execute().unwrap();

        let text = fs::read_to_string(path).unwrap();
        let rows: Vec<Vec<f64>> = text
            .lines()
            .map(|l| l.split('\t').map(|v| v.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.len(), 2);
            assert!(row.iter().all(|s| s.is_finite()));
            assert_ne!(row[0], row[1]);
        }
    }
}
