//src/report.rs

use serde::Serialize;
use std::fmt;

use crate::abundance::AbundanceTable;
use crate::classify::classify_stats::round_to;
use crate::classify::{AnnotatedTaxon, ClassificationStats};
use crate::config::ReportConfig;
use crate::diversity::DiversityMetrics;
use crate::error::{AnalysisError, AnalysisResult};
use crate::types::SampleMetadata;

/// Result of one analysis run. Immutable once assembled.
///
/// Every display quantity (percentages, status counts, dominant taxon) is derived
/// on request from the stored taxa and metrics rather than cached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    sample_id: String,
    metadata: SampleMetadata,
    metrics: DiversityMetrics,
    taxa: Vec<AnnotatedTaxon>,
}

/// The flat summary block read by dashboards and exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiodiversitySummary {
    pub shannon: f64,
    pub simpson: f64,
    pub simpson_diversity: f64,
    pub chao1: f64,
    pub total_species: usize,
    pub novel_species: usize,
    pub local_species: usize,
    pub drifted_species: usize,
    pub possibly_drifted_species: usize,
    pub drift_ratio_percent: f64,
    pub dominant_species: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiversityBand {
    High,
    Moderate,
    Low,
}

impl DiversityBand {
    pub fn from_shannon(shannon: f64, config: &ReportConfig) -> Self {
        if shannon > config.shannon_high {
            Self::High
        } else if shannon > config.shannon_moderate {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for DiversityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "High Diversity",
            Self::Moderate => "Moderate Diversity",
            Self::Low => "Low Diversity",
        })
    }
}

/// Badge for a taxon's match confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub const ALL: [ConfidenceBand; 3] = [Self::High, Self::Medium, Self::Low];

    /// High from 90%, Medium from 70%.
    pub fn from_percent(confidence: u8) -> Self {
        if confidence >= 90 {
            Self::High
        } else if confidence >= 70 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn of(taxon: &AnnotatedTaxon) -> Self {
        Self::from_percent(taxon.classification.confidence)
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        })
    }
}

/// Merges metrics, per-taxon classification and sample metadata into a report.
pub struct ReportAssembler;

impl ReportAssembler {
    /// `taxa` must be the classification of `table`, one entry per observation in table order.
    pub fn assemble(
        table: &AbundanceTable,
        metrics: DiversityMetrics,
        taxa: Vec<AnnotatedTaxon>,
        metadata: SampleMetadata,
    ) -> AnalysisResult<AnalysisReport> {
        if taxa.len() != table.len() {
            return Err(AnalysisError::invalid_sample(
                table.sample_id(),
                format!(
                    "classification covers {} taxa but the table has {}",
                    taxa.len(),
                    table.len()
                ),
            ));
        }
        if let Some((obs, taxon)) = table
            .iter()
            .zip(&taxa)
            .find(|(obs, taxon)| obs.id != taxon.observation.id)
        {
            return Err(AnalysisError::invalid_taxon(
                table.sample_id(),
                &taxon.observation.id,
                format!("classified out of order; expected '{}'", obs.id),
            ));
        }

        Ok(AnalysisReport {
            sample_id: table.sample_id().to_string(),
            metadata,
            metrics,
            taxa,
        })
    }
}

impl AnalysisReport {
    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    pub fn metadata(&self) -> &SampleMetadata {
        &self.metadata
    }

    pub fn metrics(&self) -> &DiversityMetrics {
        &self.metrics
    }

    /// Taxa in the order they appeared in the abundance table.
    pub fn taxa(&self) -> &[AnnotatedTaxon] {
        &self.taxa
    }

    pub fn stats(&self) -> ClassificationStats {
        ClassificationStats::from_taxa(&self.taxa)
    }

    /// Share of the sample's reads assigned to `taxon`, in percent.
    pub fn relative_abundance_percent(&self, taxon: &AnnotatedTaxon) -> f64 {
        let total = self.metrics.total_reads;
        if total == 0 {
            return 0.0;
        }
        100.0 * taxon.observation.read_count as f64 / total as f64
    }

    /// Relative abundance for every taxon, table order.
    pub fn relative_abundances(&self) -> Vec<(&AnnotatedTaxon, f64)> {
        self.taxa
            .iter()
            .map(|t| (t, self.relative_abundance_percent(t)))
            .collect()
    }

    /// Highest read count wins; ties go to the taxon listed first.
    pub fn dominant_species(&self) -> Option<&AnnotatedTaxon> {
        let mut best: Option<&AnnotatedTaxon> = None;
        for taxon in self.taxa.iter().filter(|t| t.is_observed()) {
            match best {
                Some(b) if b.observation.read_count >= taxon.observation.read_count => {}
                _ => best = Some(taxon),
            }
        }
        best
    }

    /// Observed taxa ordered by read count, most abundant first, table order within ties.
    pub fn top_taxa(&self, n: usize) -> Vec<&AnnotatedTaxon> {
        let mut ranked: Vec<&AnnotatedTaxon> =
            self.taxa.iter().filter(|t| t.is_observed()).collect();
        ranked.sort_by_key(|t| std::cmp::Reverse(t.observation.read_count));
        ranked.truncate(n);
        ranked
    }

    pub fn diversity_band(&self, config: &ReportConfig) -> DiversityBand {
        DiversityBand::from_shannon(self.metrics.shannon, config)
    }

    /// Observed taxa per confidence band, High first, zero counts included.
    pub fn confidence_breakdown(&self) -> Vec<(ConfidenceBand, usize)> {
        ConfidenceBand::ALL
            .iter()
            .map(|&band| {
                let n = self
                    .taxa
                    .iter()
                    .filter(|t| t.is_observed() && ConfidenceBand::of(t) == band)
                    .count();
                (band, n)
            })
            .collect()
    }

    pub fn summary(&self) -> BiodiversitySummary {
        let stats = self.stats();
        BiodiversitySummary {
            shannon: self.metrics.shannon,
            simpson: self.metrics.simpson,
            simpson_diversity: self.metrics.simpson_diversity(),
            chao1: self.metrics.chao1,
            total_species: self.metrics.observed_species_count,
            novel_species: stats.novel,
            local_species: stats.local(),
            drifted_species: stats.drifted(),
            possibly_drifted_species: stats.possibly_drifted(),
            drift_ratio_percent: stats.drift_ratio_percent(),
            dominant_species: self
                .dominant_species()
                .map(|t| t.display_name().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Percentage rounded for display, two decimals as on the species cards.
pub fn display_percent(value: f64) -> f64 {
    round_to(value, 2)
}
