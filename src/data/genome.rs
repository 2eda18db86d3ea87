// ============================================================
// Layer 4 — Reference Genome
// ============================================================
// Loads the chromosomes of one evaluation split from a FASTA
// file using bio::io::fasta and serves half-open intervals.
//
// Only the requested chromosomes are kept in memory; asking for
// a chromosome the FASTA does not contain is a configuration
// error raised at open time, before any batch is built.
//
// Intervals that run off either end of a chromosome are padded
// with N so every window keeps its requested length.

use bio::io::fasta;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::domain::error::{EvalError, EvalResult};
use crate::domain::traits::GenomeSource;

pub struct FastaGenome {
    chroms: HashMap<String, Vec<u8>>,
}

impl FastaGenome {
    /// Read `path`, keeping only `chroms` (every record when `None`).
    pub fn open(path: &Path, chroms: Option<&[String]>) -> EvalResult<Self> {
        let wanted: Option<HashSet<&str>> =
            chroms.map(|c| c.iter().map(String::as_str).collect());

        let reader = fasta::Reader::from_file(path).map_err(|e| {
            EvalError::Config(format!("cannot open genome '{}': {e}", path.display()))
        })?;

        let mut sequences = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let keep = wanted.as_ref().map_or(true, |w| w.contains(record.id()));
            if keep {
                tracing::debug!("Loaded {} ({} bp)", record.id(), record.seq().len());
                sequences.insert(record.id().to_string(), record.seq().to_ascii_uppercase());
            }
        }

        if let Some(wanted) = wanted {
            let mut missing: Vec<&str> = wanted
                .into_iter()
                .filter(|c| !sequences.contains_key(*c))
                .collect();
            if !missing.is_empty() {
                missing.sort_unstable();
                return Err(EvalError::Config(format!(
                    "chromosomes not found in '{}': {}",
                    path.display(),
                    missing.join(", ")
                )));
            }
        }

        tracing::info!("Genome ready: {} chromosomes from '{}'", sequences.len(), path.display());
        Ok(Self { chroms: sequences })
    }

    /// Build from in-memory sequences
    pub fn from_sequences<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let chroms = sequences
            .into_iter()
            .map(|(name, seq)| (name.into(), seq.to_ascii_uppercase()))
            .collect();
        Self { chroms }
    }
}

impl GenomeSource for FastaGenome {
    fn fetch(&self, chrom: &str, start: i64, end: i64) -> EvalResult<Vec<u8>> {
        let seq = self
            .chroms
            .get(chrom)
            .ok_or_else(|| EvalError::Config(format!("unknown chromosome '{chrom}'")))?;
        if end < start {
            return Err(EvalError::Config(format!(
                "{chrom}:{start}-{end} has end before start"
            )));
        }

        let chrom_len = seq.len() as i64;
        let out = (start..end)
            .map(|pos| {
                if (0..chrom_len).contains(&pos) {
                    seq[pos as usize]
                } else {
                    b'N'
                }
            })
            .collect();
        Ok(out)
    }

    fn has_chrom(&self, chrom: &str) -> bool {
        self.chroms.contains_key(chrom)
    }
}
