// src/classify/classify_stats.rs

use ahash::AHashMap;

use super::annotate::AnnotatedTaxon;
use crate::types::{ConservationStatus, DriftStatus};

/// Status tallies over the observed taxa (read count > 0) of one run.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ClassificationStats {
    /// Observed taxa
    pub total: usize,
    /// Taxa without a reference match
    pub novel: usize,
    pub by_conservation: AHashMap<ConservationStatus, usize>,
    pub by_drift: AHashMap<DriftStatus, usize>,
}

impl ClassificationStats {
    pub fn from_taxa<'a, I>(taxa: I) -> Self
    where
        I: IntoIterator<Item = &'a AnnotatedTaxon>,
    {
        let mut stats = Self::default();
        for taxon in taxa.into_iter().filter(|t| t.is_observed()) {
            stats.total += 1;
            if taxon.is_novel() {
                stats.novel += 1;
            }
            *stats
                .by_conservation
                .entry(taxon.classification.conservation_status)
                .or_insert(0) += 1;
            *stats
                .by_drift
                .entry(taxon.classification.drift_status)
                .or_insert(0) += 1;
        }
        stats
    }

    pub fn conservation(&self, status: ConservationStatus) -> usize {
        self.by_conservation.get(&status).copied().unwrap_or(0)
    }

    pub fn drift(&self, status: DriftStatus) -> usize {
        self.by_drift.get(&status).copied().unwrap_or(0)
    }

    pub fn local(&self) -> usize {
        self.drift(DriftStatus::Local)
    }

    /// Confirmed drifters only; `possible` is tallied separately.
    pub fn drifted(&self) -> usize {
        self.drift(DriftStatus::Confirmed)
    }

    pub fn possibly_drifted(&self) -> usize {
        self.drift(DriftStatus::Possible)
    }

    /// Share of drifted among taxa with a settled origin, in percent with one decimal.
    /// Taxa of uncertain origin are excluded from both sides.
    pub fn drift_ratio_percent(&self) -> f64 {
        drift_ratio_percent(self.local(), self.drifted())
    }

    /// `(status, count)` in display order, zero counts included.
    pub fn conservation_breakdown(&self) -> Vec<(ConservationStatus, usize)> {
        ConservationStatus::ALL
            .iter()
            .map(|&s| (s, self.conservation(s)))
            .collect()
    }

    pub fn drift_breakdown(&self) -> Vec<(DriftStatus, usize)> {
        DriftStatus::ALL.iter().map(|&s| (s, self.drift(s))).collect()
    }
}

/// `drifted / (drifted + local) * 100`, rounded to one decimal; 0 when both are 0.
pub fn drift_ratio_percent(local: usize, drifted: usize) -> f64 {
    let settled = local + drifted;
    if settled == 0 {
        return 0.0;
    }
    round_to(100.0 * drifted as f64 / settled as f64, 1)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
