// src/lib.rs
pub mod abundance;
pub mod classify;
pub mod config;
pub mod diversity;
pub mod error;
pub mod export;
pub mod ingest;
pub mod report;
pub mod session;
pub mod taxdb;
pub mod types;

pub use crate::abundance::AbundanceTable;
pub use crate::config::AnalysisConfig;
pub use crate::diversity::DiversityMetrics;
pub use crate::error::{AnalysisError, AnalysisResult, ErrorKind, LookupError};
pub use crate::report::{AnalysisReport, BiodiversitySummary, ConfidenceBand, DiversityBand, ReportAssembler};
pub use crate::taxdb::{LookupOutcome, ReferenceDb, ReferenceLookup, ReferenceRecord, TaxonSignature};
pub use crate::types::{
    ClassificationResult, ConservationStatus, DriftStatus, SampleMetadata, TaxonObservation, Taxonomy,
};

use crate::classify::classify_table;
use crate::session::{check_cancelled, CancelToken};

/// Analyse one sample with the default configuration.
///
/// Fails with [`AnalysisError::InvalidInput`] when the table holds no reads; lookup
/// failures for individual taxa are absorbed (the taxon is reported as novel).
pub fn analyze<L: ReferenceLookup + ?Sized>(
    table: &AbundanceTable,
    metadata: SampleMetadata,
    lookup: &L,
) -> AnalysisResult<AnalysisReport> {
    analyze_with(table, metadata, lookup, &AnalysisConfig::default())
}

pub fn analyze_with<L: ReferenceLookup + ?Sized>(
    table: &AbundanceTable,
    metadata: SampleMetadata,
    lookup: &L,
    config: &AnalysisConfig,
) -> AnalysisResult<AnalysisReport> {
    run_analysis(table, metadata, lookup, config, None)
}

pub(crate) fn run_analysis<L: ReferenceLookup + ?Sized>(
    table: &AbundanceTable,
    metadata: SampleMetadata,
    lookup: &L,
    config: &AnalysisConfig,
    cancel: Option<(&str, &CancelToken)>,
) -> AnalysisResult<AnalysisReport> {
    // 1. Diversity metrics; rejects empty tables before any lookup is made
    check_cancelled(cancel)?;
    let metrics = DiversityMetrics::compute(table)?;

    // 2. Classify every taxon against the reference, checking for cancellation per taxon
    let taxa = classify_table(table, lookup, config.classification.parallel_lookups, cancel)?;

    // 3. Assemble
    check_cancelled(cancel)?;
    let report = ReportAssembler::assemble(table, metrics, taxa, metadata)?;

    log::info!(
        "Sample {}: {} taxa observed, shannon={:.3}, chao1={:.1}",
        report.sample_id(),
        metrics.observed_species_count,
        metrics.shannon,
        metrics.chao1
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxdb::EmptyReference;

    fn vent_reference() -> ReferenceDb {
        let mut db = ReferenceDb::new();
        for (sig, name, c, d, confidence) in [
            ("SP001", "Bathymodiolus thermophilus", ConservationStatus::Normal, DriftStatus::Local, 94),
            ("SP003", "Calyptogena magnifica", ConservationStatus::Endangered, DriftStatus::Local, 91),
            ("SP004", "Alvinella pompejana", ConservationStatus::Normal, DriftStatus::Confirmed, 87),
            ("SP006", "Riftia pachyptila", ConservationStatus::Invasive, DriftStatus::Confirmed, 96),
        ] {
            db.insert(
                sig,
                ReferenceRecord {
                    name: name.to_string(),
                    conservation_status: c,
                    drift_status: d,
                    confidence,
                    taxonomy: None,
                },
            );
        }
        db
    }

    #[test]
    fn test_analyze_api() {
        let table = AbundanceTable::from_counts(
            "vent-03",
            [
                ("SP001", "Bathymodiolus thermophilus", 235),
                ("SP002", "otu-2", 182),
                ("SP003", "Calyptogena magnifica", 157),
                ("SP004", "Alvinella pompejana", 123),
                ("SP005", "otu-5", 108),
                ("SP006", "Riftia pachyptila", 94),
                ("SP007", "otu-7", 1),
                ("SP008", "otu-8", 1),
            ],
        )
        .expect("valid table");

        let metadata = SampleMetadata {
            location: Some("East Pacific Rise".into()),
            depth: Some(2510.0),
            temperature: Some(2.0),
            notes: Some("ROV push core".into()),
        };
        let report = analyze(&table, metadata.clone(), &vent_reference()).expect("analysis failed");

        assert_eq!(report.metadata(), &metadata);
        assert_eq!(report.taxa().len(), 8);

        let summary = report.summary();
        assert_eq!(summary.total_species, 8);
        assert_eq!(summary.novel_species, 4);
        assert_eq!(summary.local_species, 2);
        assert_eq!(summary.drifted_species, 2);
        assert_eq!(summary.possibly_drifted_species, 4);
        assert_eq!(summary.drift_ratio_percent, 50.0);
        assert_eq!(summary.dominant_species, "Bathymodiolus thermophilus");

        // f1 = 2, f2 = 0 => 8 + 2*1/2
        assert_eq!(summary.chao1, 9.0);
        assert!(summary.shannon > 0.0);
        assert!(summary.simpson >= 1.0 / 8.0 && summary.simpson <= 1.0);
    }

    #[test]
    fn test_analyze_empty_table_is_invalid_input() {
        for table in [
            AbundanceTable::new("empty"),
            AbundanceTable::from_counts("zeros", [("A", "a", 0), ("B", "b", 0)]).unwrap(),
        ] {
            let err = analyze(&table, SampleMetadata::default(), &EmptyReference).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_analyze_is_deterministic() {
        let table = AbundanceTable::from_counts(
            "s",
            (0..50).map(|i| (format!("T{i}"), format!("taxon {i}"), (i * 7 % 13) as i64)),
        )
        .unwrap();
        let db = vent_reference();
        let parallel = analyze(&table, SampleMetadata::default(), &db).unwrap();
        let mut config = AnalysisConfig::default();
        config.classification.parallel_lookups = false;
        let sequential = analyze_with(&table, SampleMetadata::default(), &db, &config).unwrap();
        assert_eq!(parallel.taxa(), sequential.taxa());
        assert_eq!(parallel.summary(), sequential.summary());
    }

    #[test]
    fn test_analyze_through_trait_object() {
        let table = AbundanceTable::from_counts("s", [("A", "a", 3)]).unwrap();
        let lookup: Box<dyn ReferenceLookup> = Box::new(EmptyReference);
        let report = analyze(&table, SampleMetadata::default(), lookup.as_ref()).unwrap();
        assert_eq!(report.metrics().shannon, 0.0);
        assert_eq!(report.summary().novel_species, 1);
    }
}
