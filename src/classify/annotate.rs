use rayon::prelude::*;
use serde::Serialize;

use super::{ReferenceLookup, TaxonSignature};
use crate::abundance::AbundanceTable;
use crate::error::AnalysisResult;
use crate::session::{check_cancelled, CancelToken};
use crate::taxdb::LookupOutcome;
use crate::types::{ClassificationResult, TaxonObservation, Taxonomy};

/// An observation together with the classification it received in this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedTaxon {
    #[serde(flatten)]
    pub observation: TaxonObservation,
    #[serde(flatten)]
    pub classification: ClassificationResult,
}

impl AnnotatedTaxon {
    pub fn is_novel(&self) -> bool {
        self.classification.is_novel
    }

    pub fn is_observed(&self) -> bool {
        self.observation.read_count > 0
    }

    /// Name shown to users; novel taxa are not given a scientific name.
    pub fn display_name(&self) -> &str {
        if self.is_novel() {
            "Novel Species"
        } else {
            &self.observation.name
        }
    }
}

/// Classify a single observation.
///
/// A lookup error never aborts the run: the taxon is logged and treated as unresolved.
pub fn classify_taxon<L: ReferenceLookup + ?Sized>(
    observation: &TaxonObservation,
    lookup: &L,
) -> AnnotatedTaxon {
    let signature = TaxonSignature::from(observation);
    let outcome = match lookup.lookup(&signature) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::warn!("{}; treating as unresolved", e.into_analysis_error(&observation.id));
            LookupOutcome::NotFound
        }
    };

    match outcome {
        LookupOutcome::Found(record) => {
            let mut observation = observation.clone();
            if observation.taxonomy.as_ref().map_or(true, Taxonomy::is_empty) {
                observation.taxonomy = record.taxonomy;
            }
            AnnotatedTaxon {
                observation,
                classification: ClassificationResult {
                    is_novel: false,
                    conservation_status: record.conservation_status,
                    drift_status: record.drift_status,
                    confidence: record.confidence,
                },
            }
        }
        LookupOutcome::NotFound => AnnotatedTaxon {
            observation: observation.clone(),
            classification: ClassificationResult::NOVEL,
        },
    }
}

/// Classify every taxon of a table, returning results in table order.
///
/// With `parallel` set the lookups fan out over the rayon pool; `collect` on an
/// indexed parallel iterator keeps the input order. The cancel token is checked
/// before each lookup, so once it is set no new lookup starts and the pass
/// returns `Cancelled`.
pub fn classify_table<L: ReferenceLookup + ?Sized>(
    table: &AbundanceTable,
    lookup: &L,
    parallel: bool,
    cancel: Option<(&str, &CancelToken)>,
) -> AnalysisResult<Vec<AnnotatedTaxon>> {
    let classify = |obs: &TaxonObservation| -> AnalysisResult<AnnotatedTaxon> {
        check_cancelled(cancel)?;
        Ok(classify_taxon(obs, lookup))
    };
    let annotated: Vec<AnnotatedTaxon> = if parallel {
        table
            .observations()
            .par_iter()
            .map(classify)
            .collect::<AnalysisResult<_>>()?
    } else {
        table.iter().map(classify).collect::<AnalysisResult<_>>()?
    };

    log::debug!(
        "Classified {} taxa for sample {} ({} novel)",
        annotated.len(),
        table.sample_id(),
        annotated.iter().filter(|t| t.is_novel()).count()
    );
    Ok(annotated)
}
