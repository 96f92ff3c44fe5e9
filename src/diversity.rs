//! Alpha diversity for a single sample: Shannon entropy, Simpson dominance and
//! the Chao1 richness estimator.
//!
//! Every function works on raw read counts and rejects inputs whose total is
//! zero, so no metric is ever NaN.
//!
//! `simpson` is the dominance form `Σ p_i²` (lower = more diverse). The
//! complementary diversity form `1 - Σ p_i²` is
//! [`DiversityMetrics::simpson_diversity`].

use serde::Serialize;

use crate::abundance::AbundanceTable;
use crate::error::{AnalysisError, AnalysisResult};

fn total_reads(sample_id: &str, counts: &[u64]) -> AnalysisResult<f64> {
    let total = counts
        .iter()
        .try_fold(0u64, |acc, &c| acc.checked_add(c))
        .ok_or_else(|| AnalysisError::invalid_sample(sample_id, "total read count overflows u64"))?;
    if total == 0 {
        return Err(AnalysisError::invalid_sample(sample_id, "zero total reads"));
    }
    Ok(total as f64)
}

/// Number of taxa with at least one read.
pub fn observed_species(counts: &[u64]) -> usize {
    counts.iter().filter(|&&c| c > 0).count()
}

/// Shannon entropy `H = -Σ p_i ln p_i`, natural log.
pub fn shannon(sample_id: &str, counts: &[u64]) -> AnalysisResult<f64> {
    let total = total_reads(sample_id, counts)?;

    let mut h = 0.0;
    for &c in counts {
        if c > 0 {
            let p = c as f64 / total;
            h -= p * p.ln();
        }
    }
    // A single taxon gives -1·ln(1) = -0.0
    Ok(h.max(0.0))
}

/// Simpson dominance `D = Σ p_i²`, in `[1/S_obs, 1]`.
pub fn simpson(sample_id: &str, counts: &[u64]) -> AnalysisResult<f64> {
    let total = total_reads(sample_id, counts)?;

    let mut sum_p2 = 0.0;
    for &c in counts {
        if c > 0 {
            let p = c as f64 / total;
            sum_p2 += p * p;
        }
    }
    Ok(sum_p2.min(1.0))
}

/// Chao1 richness estimator.
///
/// `S_obs + f1(f1-1) / (2(f2+1))`, or `S_obs + f1(f1-1)/2` when there are no doubletons.
pub fn chao1(sample_id: &str, counts: &[u64]) -> AnalysisResult<f64> {
    total_reads(sample_id, counts)?;
    let (s_obs, f1, f2) = richness_counts(counts);
    Ok(chao1_from(s_obs, f1, f2))
}

fn richness_counts(counts: &[u64]) -> (usize, usize, usize) {
    let mut s_obs = 0;
    let mut f1 = 0;
    let mut f2 = 0;
    for &c in counts {
        match c {
            0 => {}
            1 => {
                s_obs += 1;
                f1 += 1;
            }
            2 => {
                s_obs += 1;
                f2 += 1;
            }
            _ => s_obs += 1,
        }
    }
    (s_obs, f1, f2)
}

fn chao1_from(s_obs: usize, f1: usize, f2: usize) -> f64 {
    let s_obs = s_obs as f64;
    let f1 = f1 as f64;
    let f2 = f2 as f64;
    if f2 > 0.0 {
        s_obs + (f1 * (f1 - 1.0)) / (2.0 * (f2 + 1.0))
    } else {
        s_obs + (f1 * (f1 - 1.0).max(0.0)) / 2.0
    }
}

/// Summary alpha diversity for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiversityMetrics {
    pub shannon: f64,
    /// Dominance form `Σ p_i²`.
    pub simpson: f64,
    pub chao1: f64,
    pub observed_species_count: usize,
    pub total_reads: u64,
    pub singletons: usize,
    pub doubletons: usize,
}

impl DiversityMetrics {
    /// Compute every metric from the table's counts.
    pub fn compute(table: &AbundanceTable) -> AnalysisResult<Self> {
        table.ensure_has_reads()?;
        let counts = table.counts();
        let sample_id = table.sample_id();

        let (_, f1, f2) = richness_counts(&counts);
        Ok(Self {
            shannon: shannon(sample_id, &counts)?,
            simpson: simpson(sample_id, &counts)?,
            chao1: chao1(sample_id, &counts)?,
            observed_species_count: observed_species(&counts),
            total_reads: table.total_reads(),
            singletons: f1,
            doubletons: f2,
        })
    }

    /// Simpson diversity `1 - Σ p_i²`, in `[0, 1 - 1/S_obs]`.
    pub fn simpson_diversity(&self) -> f64 {
        1.0 - self.simpson
    }

    /// Pielou's evenness `H / ln(S_obs)`; 0 when fewer than two taxa were observed.
    pub fn pielou_evenness(&self) -> f64 {
        if self.observed_species_count <= 1 {
            0.0
        } else {
            self.shannon / (self.observed_species_count as f64).ln()
        }
    }

    /// Estimated taxa present but not sampled.
    pub fn unseen_estimate(&self) -> f64 {
        self.chao1 - self.observed_species_count as f64
    }
}
