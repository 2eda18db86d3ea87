// ============================================================
// Layer 6 — Metrics Reporter
// ============================================================
// Writes the aggregate metrics and the sidecar files of a run
// into the output directory.
//
// Files written, depending on the task:
//
//   metrics.json              aggregate metrics (paired-control)
//   paired_scores.tsv         one row per pair, dataset order
//   likelihoods.tsv           one log-likelihood per line
//   variant_likelihoods.tsv   allele1 \t allele2 per line
//   run_config.json           resolved configuration of the run
//
// Example paired_scores.tsv:
//   index  chr   start  end   seq_score  ctrl_score  diff   correct
//   0      chr1  100    600   -612.41    -618.02     5.61   true
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::PathBuf};

use crate::data::elements::ElementRecord;
use crate::domain::statistics::AggregateMetrics;
use crate::ml::evaluator::PairRecord;

/// One row of paired_scores.tsv
#[derive(Debug, Serialize)]
struct PairedScoreRow<'a> {
    index:      usize,
    chr:        &'a str,
    start:      i64,
    end:        i64,
    seq_score:  f64,
    ctrl_score: f64,
    diff:       f64,
    correct:    bool,
}

pub struct MetricsReporter {
    dir: PathBuf,
}

impl MetricsReporter {
    /// Creates the output directory if it doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.path(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(path)
    }

    pub fn write_metrics(&self, metrics: &AggregateMetrics) -> Result<PathBuf> {
        self.write_json("metrics.json", metrics)
    }

    /// Per-pair scores joined with their element coordinates.
    pub fn write_paired_scores(
        &self,
        records:  &[PairRecord],
        elements: &[ElementRecord],
    ) -> Result<PathBuf> {
        let path = self.path("paired_scores.tsv");
        let mut writer = tsv_writer(&path, true)?;
        for r in records {
            let element = elements
                .get(r.index)
                .with_context(|| format!("No element for pair index {}", r.index))?;
            writer.serialize(PairedScoreRow {
                index:      r.index,
                chr:        &element.chr,
                start:      element.start,
                end:        element.end,
                seq_score:  r.seq_score,
                ctrl_score: r.ctrl_score,
                diff:       r.diff,
                correct:    r.correct,
            })?;
        }
        writer.flush()?;
        tracing::info!("Wrote {} pair scores to '{}'", records.len(), path.display());
        Ok(path)
    }

    /// One log-likelihood per line, no header.
    pub fn write_likelihoods(&self, scores: &[(usize, f64)]) -> Result<PathBuf> {
        let path = self.path("likelihoods.tsv");
        let mut writer = tsv_writer(&path, false)?;
        for (_, score) in scores {
            writer.serialize((score,))?;
        }
        writer.flush()?;
        tracing::info!("Wrote {} likelihoods to '{}'", scores.len(), path.display());
        Ok(path)
    }

    /// allele1 and allele2 log-likelihoods per variant, no header.
    pub fn write_variant_likelihoods(&self, records: &[PairRecord]) -> Result<PathBuf> {
        let path = self.path("variant_likelihoods.tsv");
        let mut writer = tsv_writer(&path, false)?;
        for r in records {
            writer.serialize((r.seq_score, r.ctrl_score))?;
        }
        writer.flush()?;
        tracing::info!("Wrote {} variant likelihood pairs to '{}'", records.len(), path.display());
        Ok(path)
    }
}

fn tsv_writer(path: &PathBuf, headers: bool) -> Result<csv::Writer<fs::File>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(headers)
        .from_path(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(index: usize, seq: f64, ctrl: f64) -> PairRecord {
        PairRecord { index, seq_score: seq, ctrl_score: ctrl, diff: seq - ctrl, correct: seq > ctrl }
    }

    #[test]
    fn paired_scores_have_header_and_coordinates() {
        let dir = tempdir().expect("tempdir");
        let reporter = MetricsReporter::new(dir.path().join("out")).unwrap();
        let elements = vec![ElementRecord {
            chr: "chr1".into(),
            start: 100,
            end: 110,
            ctrl_start: None,
            ctrl_end: None,
        }];
        let path = reporter.write_paired_scores(&[record(0, -1.5, -2.0)], &elements).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("index\tchr\tstart\tend\tseq_score\tctrl_score\tdiff\tcorrect")
        );
        assert_eq!(lines.next(), Some("0\tchr1\t100\t110\t-1.5\t-2.0\t0.5\ttrue"));
    }

    #[test]
    fn likelihood_files_have_one_line_per_entry() {
        let dir = tempdir().expect("tempdir");
        let reporter = MetricsReporter::new(dir.path()).unwrap();

        let path = reporter.write_likelihoods(&[(0, -3.25), (1, -1.0)]).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "-3.25\n-1.0\n");

        let path = reporter
            .write_variant_likelihoods(&[record(0, -4.0, -4.5)])
            .unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "-4.0\t-4.5\n");
    }

    #[test]
    fn metrics_json_uses_metric_names() {
        let dir = tempdir().expect("tempdir");
        let reporter = MetricsReporter::new(dir.path()).unwrap();
        let metrics = AggregateMetrics::compute(&[1.0, -2.0, 0.5, -0.1], &[true, false, true, false]).unwrap();
        let path = reporter.write_metrics(&metrics).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["acc"], serde_json::json!(0.5));
        assert!(json.get("signed_rank_sum").is_some());
        assert!(json.get("q95_diff").is_some());
    }
}
