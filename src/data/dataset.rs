// ============================================================
// Layer 4 — Burn Datasets
// ============================================================
// Three views over the same genome, one per task:
//
//   PairedControlDataset → (element window, control window)
//   ElementDataset       → element window only
//   VariantDataset       → (allele1 window, allele2 window)
//
// Windows are fetched lazily in `get`, which the DataLoader
// calls from its worker threads, so genome access overlaps with
// scoring. Everything `get` can fail on is checked when the
// dataset is built; a `get` that still fails is logged and ends
// iteration early, which the evaluator reports as a count
// mismatch.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use burn::data::dataset::Dataset;
use std::sync::Arc;

use crate::data::controls::shuffled_control;
use crate::data::elements::{ElementRecord, VariantRecord};
use crate::domain::error::{EvalError, EvalResult};
use crate::domain::sequence::{PairedSample, SequenceWindow};
use crate::domain::traits::GenomeSource;

fn check_chromosomes<'a>(
    genome: &dyn GenomeSource,
    chroms: impl IntoIterator<Item = &'a str>,
) -> EvalResult<()> {
    for chrom in chroms {
        if !genome.has_chrom(chrom) {
            return Err(EvalError::Config(format!(
                "chromosome '{chrom}' is not loaded from the genome"
            )));
        }
    }
    Ok(())
}

// ─── PairedControlDataset ─────────────────────────────────────────────────────
pub struct PairedControlDataset {
    genome:   Arc<dyn GenomeSource>,
    elements: Vec<ElementRecord>,
    seed:     u64,
}

impl PairedControlDataset {
    pub fn new(
        genome:   Arc<dyn GenomeSource>,
        elements: Vec<ElementRecord>,
        seed:     u64,
    ) -> EvalResult<Self> {
        check_chromosomes(genome.as_ref(), elements.iter().map(|e| e.chr.as_str()))?;
        Ok(Self { genome, elements, seed })
    }

    pub fn sample(&self, index: usize) -> EvalResult<PairedSample> {
        let element = self
            .elements
            .get(index)
            .ok_or_else(|| EvalError::Config(format!("element index {index} out of range")))?;

        let bases = self.genome.fetch(&element.chr, element.start, element.end)?;
        let control = match element.control_interval() {
            Some((cs, ce)) => self.genome.fetch(&element.chr, cs, ce)?,
            None => shuffled_control(&bases, self.seed, index),
        };

        PairedSample::new(
            index,
            SequenceWindow::from_bases(&bases),
            SequenceWindow::from_bases(&control),
        )
    }
}

impl Dataset<PairedSample> for PairedControlDataset {
    fn get(&self, index: usize) -> Option<PairedSample> {
        self.sample(index)
            .map_err(|e| tracing::error!("Element {index}: {e}"))
            .ok()
    }

    fn len(&self) -> usize {
        self.elements.len()
    }
}

// ─── ElementDataset ───────────────────────────────────────────────────────────
/// One window tagged with its dataset position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedWindow {
    pub index:  usize,
    pub window: SequenceWindow,
}

pub struct ElementDataset {
    genome:   Arc<dyn GenomeSource>,
    elements: Vec<ElementRecord>,
}

impl ElementDataset {
    pub fn new(genome: Arc<dyn GenomeSource>, elements: Vec<ElementRecord>) -> EvalResult<Self> {
        check_chromosomes(genome.as_ref(), elements.iter().map(|e| e.chr.as_str()))?;
        Ok(Self { genome, elements })
    }
}

impl Dataset<IndexedWindow> for ElementDataset {
    fn get(&self, index: usize) -> Option<IndexedWindow> {
        let element = self.elements.get(index)?;
        self.genome
            .fetch(&element.chr, element.start, element.end)
            .map(|bases| IndexedWindow { index, window: SequenceWindow::from_bases(&bases) })
            .map_err(|e| tracing::error!("Element {index}: {e}"))
            .ok()
    }

    fn len(&self) -> usize {
        self.elements.len()
    }
}

// ─── VariantDataset ───────────────────────────────────────────────────────────
/// Windows of `window` bases centred on each variant, once with
/// allele1 and once with allele2 substituted. The two alleles
/// travel as the two arms of a `PairedSample` (allele1 in
/// `sequence`, allele2 in `control`).
pub struct VariantDataset {
    genome:   Arc<dyn GenomeSource>,
    variants: Vec<VariantRecord>,
    window:   usize,
}

impl VariantDataset {
    pub fn new(
        genome:   Arc<dyn GenomeSource>,
        variants: Vec<VariantRecord>,
        window:   usize,
    ) -> EvalResult<Self> {
        if window == 0 {
            return Err(EvalError::Config("variant window must be at least one base".into()));
        }
        if let Some(v) = variants.iter().find(|v| v.allele1.is_empty() || v.allele2.is_empty()) {
            return Err(EvalError::Config(format!("variant {}:{} has an empty allele", v.chr, v.pos)));
        }
        check_chromosomes(genome.as_ref(), variants.iter().map(|v| v.chr.as_str()))?;
        Ok(Self { genome, variants, window })
    }

    pub fn sample(&self, index: usize) -> EvalResult<PairedSample> {
        let variant = self
            .variants
            .get(index)
            .ok_or_else(|| EvalError::Config(format!("variant index {index} out of range")))?;

        // 0-based variant start; allele1's span is what gets replaced
        let pos = variant.pos - 1;
        let left = (self.window / 2) as i64;
        let start = pos - left;
        let ref_len = variant.allele1.len() as i64;

        let reference = self.genome.fetch(&variant.chr, pos, pos + ref_len)?;
        let a1 = variant.allele1.to_ascii_uppercase().into_bytes();
        let a2 = variant.allele2.to_ascii_uppercase().into_bytes();
        if reference != a1 && reference != a2 {
            tracing::warn!(
                "Variant {}:{}: reference '{}' matches neither allele",
                variant.chr,
                variant.pos,
                String::from_utf8_lossy(&reference)
            );
        }

        let prefix = self.genome.fetch(&variant.chr, start, pos)?;
        let suffix = self
            .genome
            .fetch(&variant.chr, pos + ref_len, start + self.window as i64 + ref_len)?;

        let build = |allele: &[u8]| {
            let mut bases: Vec<u8> = prefix.iter().chain(allele).chain(&suffix).copied().collect();
            bases.resize(self.window, b'N');
            SequenceWindow::from_bases(&bases)
        };

        PairedSample::new(index, build(&a1), build(&a2))
    }
}

impl Dataset<PairedSample> for VariantDataset {
    fn get(&self, index: usize) -> Option<PairedSample> {
        self.sample(index)
            .map_err(|e| tracing::error!("Variant {index}: {e}"))
            .ok()
    }

    fn len(&self) -> usize {
        self.variants.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::genome::FastaGenome;

    fn genome() -> Arc<dyn GenomeSource> {
        Arc::new(FastaGenome::from_sequences([
            ("chr1", b"AACCGGTTACGTACGTAAAACCCCGGGGTTTT".to_vec()),
        ]))
    }

    fn element(start: i64, end: i64, ctrl: Option<(i64, i64)>) -> ElementRecord {
        ElementRecord {
            chr: "chr1".into(),
            start,
            end,
            ctrl_start: ctrl.map(|c| c.0),
            ctrl_end: ctrl.map(|c| c.1),
        }
    }

    #[test]
    fn explicit_control_interval_is_fetched() {
        let ds = PairedControlDataset::new(genome(), vec![element(0, 4, Some((16, 20)))], 0).unwrap();
        let sample = ds.get(0).unwrap();
        assert_eq!(sample.sequence.to_chars(), "AACC");
        assert_eq!(sample.control.to_chars(), "AAAA");
    }

    #[test]
    fn generated_control_is_a_shuffle_of_the_element() {
        let ds = PairedControlDataset::new(genome(), vec![element(8, 24, None)], 11).unwrap();
        let sample = ds.get(0).unwrap();
        let mut seq = sample.sequence.to_chars().into_bytes();
        let mut ctrl = sample.control.to_chars().into_bytes();
        seq.sort_unstable();
        ctrl.sort_unstable();
        assert_eq!(seq, ctrl);
        // Same index, same seed, same control
        assert_eq!(ds.get(0).unwrap().control, sample.control);
    }

    #[test]
    fn unknown_chromosome_is_rejected_at_construction() {
        let mut e = element(0, 4, None);
        e.chr = "chr9".into();
        assert!(matches!(
            PairedControlDataset::new(genome(), vec![e], 0),
            Err(EvalError::Config(_))
        ));
    }

    #[test]
    fn element_dataset_keeps_indices() {
        let ds = ElementDataset::new(genome(), vec![element(0, 2, None), element(2, 6, None)]).unwrap();
        assert_eq!(ds.len(), 2);
        let item = ds.get(1).unwrap();
        assert_eq!(item.index, 1);
        assert_eq!(item.window.to_chars(), "CCGG");
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn variant_windows_substitute_each_allele() {
        // pos 5 (1-based) is the G at 0-based offset 4
        let v = VariantRecord { chr: "chr1".into(), pos: 5, allele1: "G".into(), allele2: "T".into() };
        let ds = VariantDataset::new(genome(), vec![v], 6).unwrap();
        let sample = ds.get(0).unwrap();
        assert_eq!(sample.sequence.to_chars(), "ACCGGT");
        assert_eq!(sample.control.to_chars(), "ACCTGT");
    }

    #[test]
    fn variant_window_near_chromosome_start_is_padded() {
        let v = VariantRecord { chr: "chr1".into(), pos: 1, allele1: "A".into(), allele2: "C".into() };
        let ds = VariantDataset::new(genome(), vec![v], 4).unwrap();
        let sample = ds.get(0).unwrap();
        assert_eq!(sample.sequence.to_chars(), "NNAA");
        assert_eq!(sample.control.to_chars(), "NNCA");
    }
}
