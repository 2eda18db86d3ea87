// ============================================================
// Layer 2 — LikelihoodUseCase
// ============================================================
// Scores every element of a split on its own (no control arm)
// and writes one log-likelihood per line, in file order.

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};
use std::path::PathBuf;

use crate::application::run_config::{DeviceKind, LikelihoodConfig};
use crate::application::session::{data_loader, Session};
use crate::data::{
    batcher::{SequenceBatch, SequenceBatcher},
    dataset::{ElementDataset, IndexedWindow},
    elements::read_elements,
};

pub struct LikelihoodUseCase {
    config: LikelihoodConfig,
}

impl LikelihoodUseCase {
    pub fn new(config: LikelihoodConfig) -> Self {
        Self { config }
    }

    /// Returns the path of likelihoods.tsv
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

        let elements = read_elements(&cfg.elements, Some(cfg.run.chroms.as_slice()))?;
        let total = elements.len();
        let dataset = ElementDataset::new(session.genome.clone(), elements)?;
        tracing::info!("Scoring {} elements", total);

        let loader = data_loader::<B, IndexedWindow, SequenceBatch, _, _>(&cfg.run, SequenceBatcher, dataset);
        let scores = session
            .evaluator(&cfg.run, total, "elements")
            .score_sequences(loader.iter(), total)
            .context("Likelihood scoring failed")?;

        session.reporter.write_likelihoods(&scores)
    }
}
