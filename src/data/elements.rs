// ============================================================
// Layer 4 — Elements and Variants Tables
// ============================================================
// Tab-separated inputs with a header row, read with the csv
// crate and deserialised through serde.
//
// Elements file, required columns:
//   chr    start    end
// (aliases: chrom / #chr, input_start / input_end)
// Optional columns ctrl_start / ctrl_end pick an explicit
// control interval on the same chromosome; without them the
// control is generated (see controls.rs).
//
// Variants file, required columns:
//   chr    pos    allele1    allele2
// pos is 1-based, as in VCF.
//
// Extra columns are ignored. Rows on chromosomes outside the
// evaluation split are dropped; surviving rows keep file order,
// which becomes the dataset index.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::error::{EvalError, EvalResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRecord {
    #[serde(alias = "chrom", alias = "#chr")]
    pub chr: String,

    #[serde(alias = "input_start")]
    pub start: i64,

    #[serde(alias = "input_end")]
    pub end: i64,

    #[serde(default)]
    pub ctrl_start: Option<i64>,

    #[serde(default)]
    pub ctrl_end: Option<i64>,
}

impl ElementRecord {
    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    /// Explicit control interval, when both columns are present
    pub fn control_interval(&self) -> Option<(i64, i64)> {
        match (self.ctrl_start, self.ctrl_end) {
            (Some(s), Some(e)) => Some((s, e)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    #[serde(alias = "chrom", alias = "#chr")]
    pub chr: String,

    /// 1-based position of the variant base
    pub pos: i64,

    #[serde(alias = "ref")]
    pub allele1: String,

    #[serde(alias = "alt")]
    pub allele2: String,
}

/// Read an elements file, keeping rows on `chroms` (all rows when `None`).
pub fn read_elements(path: &Path, chroms: Option<&[String]>) -> EvalResult<Vec<ElementRecord>> {
    let records: Vec<ElementRecord> = read_tsv(path)?;

    let mut kept = Vec::with_capacity(records.len());
    for (line, rec) in records.into_iter().enumerate() {
        if !in_split(&rec.chr, chroms) {
            continue;
        }
        if rec.end <= rec.start {
            return Err(EvalError::Config(format!(
                "'{}' row {}: {}:{}-{} is empty",
                path.display(),
                line + 1,
                rec.chr,
                rec.start,
                rec.end
            )));
        }
        if let Some((cs, ce)) = rec.control_interval() {
            if ce - cs != rec.len() {
                return Err(EvalError::Config(format!(
                    "'{}' row {}: control length {} differs from element length {}",
                    path.display(),
                    line + 1,
                    ce - cs,
                    rec.len()
                )));
            }
        }
        kept.push(rec);
    }

    tracing::info!("Read {} elements from '{}'", kept.len(), path.display());
    Ok(kept)
}

/// Read a variants file, keeping rows on `chroms` (all rows when `None`).
pub fn read_variants(path: &Path, chroms: Option<&[String]>) -> EvalResult<Vec<VariantRecord>> {
    let records: Vec<VariantRecord> = read_tsv(path)?;
    let kept: Vec<VariantRecord> = records
        .into_iter()
        .filter(|rec| in_split(&rec.chr, chroms))
        .collect();

    if let Some(bad) = kept.iter().find(|v| v.pos < 1) {
        return Err(EvalError::Config(format!(
            "variant {}:{} has a non-positive 1-based position",
            bad.chr, bad.pos
        )));
    }

    tracing::info!("Read {} variants from '{}'", kept.len(), path.display());
    Ok(kept)
}

fn in_split(chrom: &str, chroms: Option<&[String]>) -> bool {
    chroms.map_or(true, |c| c.iter().any(|name| name == chrom))
}

fn read_tsv<T: for<'de> Deserialize<'de>>(path: &Path) -> EvalResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .map_err(|e| EvalError::Config(format!("cannot open '{}': {e}", path.display())))?;

    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|e| EvalError::Config(format!("cannot parse '{}': {e}", path.display())))
}
