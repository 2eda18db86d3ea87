// ============================================================
// Layer 3 — Paired-Difference Statistics
// ============================================================
// Turns the per-pair differences D = score(seq) − score(ctrl)
// into the final metric set of a run.
//
//   acc              fraction of pairs with D > 0
//   pval             one-sided Wilcoxon signed-rank p-value,
//                    alternative: median(D) > 0
//   signed_rank_sum  W+, the sum of ranks of positive D
//   mean_diff        mean(D)
//   q05 … q95_diff   linear-interpolation percentiles of D
//
// The test is deliberately one-sided: the benchmark asks
// whether the model prefers the element over its control,
// never the reverse.
//
// Signed-rank procedure (zero_method = "wilcox"):
//   1. drop D = 0
//   2. rank |D| ascending, ties get the average rank
//   3. W+ = Σ ranks of positive D
//   4. n ≤ 50, no ties, no zeros → exact null distribution
//      otherwise → normal approximation with tie correction
//
// Reference: Wilcoxon (1945), Individual Comparisons by Ranking Methods

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;

use crate::domain::error::{EvalError, EvalResult};

/// Largest sample size for which the exact null distribution is used
const EXACT_MAX_N: usize = 50;

// ─── AggregateMetrics ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub acc:             f64,
    pub pval:            f64,
    pub signed_rank_sum: f64,
    pub mean_diff:       f64,
    pub q05_diff:        f64,
    pub q25_diff:        f64,
    pub median_diff:     f64,
    pub q75_diff:        f64,
    pub q95_diff:        f64,
}

impl AggregateMetrics {
    /// Compute every metric from the collected differences and
    /// their sign flags. Order of the inputs does not matter.
    pub fn compute(diffs: &[f64], correct: &[bool]) -> EvalResult<Self> {
        if diffs.is_empty() {
            return Err(EvalError::EmptyEvaluation);
        }
        if diffs.len() != correct.len() {
            return Err(EvalError::Model(format!(
                "{} differences but {} sign flags",
                diffs.len(),
                correct.len()
            )));
        }

        let acc = correct.iter().filter(|&&c| c).count() as f64 / correct.len() as f64;
        let test = wilcoxon_greater(diffs)?;
        tracing::debug!(
            "signed-rank test over {} non-zero differences ({})",
            test.n,
            if test.exact { "exact" } else { "normal approximation" }
        );

        Ok(Self {
            acc,
            pval:            test.p_value,
            signed_rank_sum: test.statistic,
            mean_diff:       mean(diffs),
            q05_diff:        percentile(diffs, 5.0),
            q25_diff:        percentile(diffs, 25.0),
            median_diff:     median(diffs),
            q75_diff:        percentile(diffs, 75.0),
            q95_diff:        percentile(diffs, 95.0),
        })
    }

    /// Metrics in reporting order, keyed by their output names
    pub fn entries(&self) -> [(&'static str, f64); 9] {
        [
            ("acc",             self.acc),
            ("pval",            self.pval),
            ("signed_rank_sum", self.signed_rank_sum),
            ("mean_diff",       self.mean_diff),
            ("q05_diff",        self.q05_diff),
            ("q25_diff",        self.q25_diff),
            ("median_diff",     self.median_diff),
            ("q75_diff",        self.q75_diff),
            ("q95_diff",        self.q95_diff),
        ]
    }
}

/// One `name: value` line per metric
impl fmt::Display for AggregateMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.entries() {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

// ─── Signed-rank test ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignedRankTest {
    /// W+, sum of ranks of the positive differences
    pub statistic: f64,
    pub p_value:   f64,
    /// Non-zero differences that entered the ranking
    pub n:         usize,
    pub exact:     bool,
}

/// One-sided Wilcoxon signed-rank test, H1: median(D) > 0.
///
/// Returns `EvalError::NoSignal` when every difference is zero.
pub fn wilcoxon_greater(diffs: &[f64]) -> EvalResult<SignedRankTest> {
    if diffs.is_empty() {
        return Err(EvalError::EmptyEvaluation);
    }
    if let Some(bad) = diffs.iter().find(|d| !d.is_finite()) {
        return Err(EvalError::Model(format!("non-finite score difference {bad}")));
    }

    let nonzero: Vec<f64> = diffs.iter().copied().filter(|&d| d != 0.0).collect();
    let n_zero = diffs.len() - nonzero.len();
    if nonzero.is_empty() {
        return Err(EvalError::NoSignal(diffs.len()));
    }

    let (ranks, tie_groups) = average_ranks(&nonzero);
    let statistic: f64 = nonzero
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();

    let n = nonzero.len();
    let has_ties = tie_groups.iter().any(|&t| t > 1);

    if n <= EXACT_MAX_N && !has_ties && n_zero == 0 {
        let p_value = exact_upper_tail(n, statistic.round() as usize);
        return Ok(SignedRankTest { statistic, p_value, n, exact: true });
    }

    let nf = n as f64;
    let mean = nf * (nf + 1.0) / 4.0;
    let tie_term: f64 = tie_groups
        .iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum::<f64>()
        / 48.0;
    let variance = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_term;
    let z = (statistic - mean) / variance.sqrt();

    let normal = Normal::new(0.0, 1.0).map_err(|e| EvalError::Model(e.to_string()))?;
    let p_value = normal.sf(z);

    tracing::debug!(n, statistic, z, p_value, "signed-rank normal approximation");
    Ok(SignedRankTest { statistic, p_value, n, exact: false })
}

/// Average ranks of |values| (1-based) plus the size of each tie group
fn average_ranks(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].abs().total_cmp(&values[b].abs()));

    let mut ranks = vec![0.0; values.len()];
    let mut groups = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]].abs() == values[order[i]].abs() {
            j += 1;
        }
        // positions i..j share the average of ranks i+1 ..= j
        let avg = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg;
        }
        groups.push(j - i);
        i = j;
    }
    (ranks, groups)
}

/// P(W+ ≥ w) under H0 for n untied, non-zero differences.
///
/// Counts the subsets of {1..n} by rank sum; each of the 2^n sign
/// assignments is equally likely.
fn exact_upper_tail(n: usize, w: usize) -> f64 {
    let max_sum = n * (n + 1) / 2;
    let mut counts = vec![0u64; max_sum + 1];
    counts[0] = 1;
    for rank in 1..=n {
        for s in (rank..=max_sum).rev() {
            counts[s] += counts[s - rank];
        }
    }
    let total = 2f64.powi(n as i32);
    let upper: u64 = counts.iter().skip(w.min(max_sum + 1)).sum();
    upper as f64 / total
}

// ─── Distribution summaries ───────────────────────────────────────────────────
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Percentile `q` in [0, 100] with linear interpolation between the
/// two closest order statistics (rank = q/100 · (n − 1)).
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
