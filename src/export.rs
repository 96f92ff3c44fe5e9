//src/export.rs

use serde::Serialize;
use std::fmt::Write as _;

use crate::config::ReportConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::report::{display_percent, AnalysisReport, BiodiversitySummary, ConfidenceBand};
use crate::types::Taxonomy;

/// Turns a finished report into a document for some output surface.
pub trait ReportRenderer {
    fn render(&self, report: &AnalysisReport) -> AnalysisResult<String>;

    /// Conventional file extension for the rendered document.
    fn extension(&self) -> &'static str;
}

/// Human-readable summary laid out like the exported PDF report.
pub struct TextRenderer {
    config: ReportConfig,
}

impl TextRenderer {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new(ReportConfig::default())
    }
}

impl ReportRenderer for TextRenderer {
    fn render(&self, report: &AnalysisReport) -> AnalysisResult<String> {
        let summary = report.summary();
        let stats = report.stats();
        let meta = report.metadata();
        let mut out = String::new();

        let _ = writeln!(out, "{}", self.config.title);
        let _ = writeln!(out, "{}", "=".repeat(self.config.title.chars().count()));
        let _ = writeln!(out);
        let _ = writeln!(out, "Sample: {}", report.sample_id());
        if let Some(location) = &meta.location {
            let _ = writeln!(out, "Location: {location}");
        }
        if let Some(depth) = meta.depth {
            let _ = writeln!(out, "Depth: {depth} m");
        }
        if let Some(temperature) = meta.temperature {
            let _ = writeln!(out, "Temperature: {temperature} °C");
        }
        if let Some(notes) = &meta.notes {
            let _ = writeln!(out, "Notes: {notes}");
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "Total Species Identified: {}", summary.total_species);
        let _ = writeln!(out, "Novel Species: {}", summary.novel_species);
        let _ = writeln!(
            out,
            "Shannon Diversity Index: {:.3} ({})",
            summary.shannon,
            report.diversity_band(&self.config)
        );
        let _ = writeln!(out, "Simpson Dominance (sum p^2): {:.3}", summary.simpson);
        let _ = writeln!(out, "Simpson Diversity (1 - sum p^2): {:.3}", summary.simpson_diversity);
        let _ = writeln!(
            out,
            "Chao1 Estimate: {} (vs {} observed)",
            summary.chao1.round(),
            summary.total_species
        );
        let _ = writeln!(
            out,
            "Drift Analysis: {} local, {} drifted, {} possibly drifted ({:.1}% drifted)",
            summary.local_species,
            summary.drifted_species,
            summary.possibly_drifted_species,
            summary.drift_ratio_percent
        );
        let _ = writeln!(out, "Dominant Species: {}", summary.dominant_species);
        let _ = writeln!(out);

        let conservation: Vec<String> = stats
            .conservation_breakdown()
            .iter()
            .map(|(status, n)| format!("{status} {n}"))
            .collect();
        let _ = writeln!(out, "Conservation: {}", conservation.join(", "));
        let drift: Vec<String> = stats
            .drift_breakdown()
            .iter()
            .map(|(status, n)| format!("{} {n}", status.label()))
            .collect();
        let _ = writeln!(out, "Drift: {}", drift.join(", "));
        let confidence: Vec<String> = report
            .confidence_breakdown()
            .iter()
            .map(|(band, n)| format!("{band} {n}"))
            .collect();
        let _ = writeln!(out, "Confidence: {}", confidence.join(", "));
        let _ = writeln!(out);

        let _ = writeln!(out, "Species Identified:");
        for (index, taxon) in report.top_taxa(self.config.top_taxa).iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. {} ({:.2}%) [{}, {}] {}% confidence ({})",
                index + 1,
                taxon.display_name(),
                display_percent(report.relative_abundance_percent(taxon)),
                taxon.classification.conservation_status,
                taxon.classification.drift_status.label(),
                taxon.classification.confidence,
                ConfidenceBand::of(taxon)
            );
        }
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}

/// One row per taxon, table order, tab separated with a header line.
#[derive(Default)]
pub struct TsvRenderer;

impl ReportRenderer for TsvRenderer {
    fn render(&self, report: &AnalysisReport) -> AnalysisResult<String> {
        let mut out = String::new();
        out.push_str(
            "id\tname\treads\tpct\tnovel\tconfidence\tconservation\tdrift\tkingdom\tphylum\tclass\tfamily\tgenus\n",
        );

        for (taxon, pct) in report.relative_abundances() {
            let obs = &taxon.observation;
            let empty = Taxonomy::default();
            let t = obs.taxonomy.as_ref().unwrap_or(&empty);
            let rank = |r: &Option<String>| r.clone().unwrap_or_else(|| "-".to_string());

            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{:.4}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                obs.id,
                obs.name,
                obs.read_count,
                pct,
                taxon.is_novel(),
                taxon.classification.confidence,
                taxon.classification.conservation_status,
                taxon.classification.drift_status,
                rank(&t.kingdom),
                rank(&t.phylum),
                rank(&t.class),
                rank(&t.family),
                rank(&t.genus)
            );
        }
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "tsv"
    }
}

/// Full report plus its summary block as JSON.
#[derive(Default)]
pub struct JsonRenderer {
    pub pretty: bool,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    summary: BiodiversitySummary,
    report: &'a AnalysisReport,
}

impl ReportRenderer for JsonRenderer {
    fn render(&self, report: &AnalysisReport) -> AnalysisResult<String> {
        let doc = JsonDocument {
            summary: report.summary(),
            report,
        };
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&doc)
        } else {
            serde_json::to_string(&doc)
        };
        rendered.map_err(|e| AnalysisError::Export(e.to_string()))
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
