//src/abundance.rs

use ahash::AHashSet;
use serde::Serialize;

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::TaxonObservation;

/// Ordered per-taxon read counts for a single sample.
///
/// Insertion order is kept; ids are unique within a table; the total read count fits a `u64`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbundanceTable {
    sample_id: String,
    observations: Vec<TaxonObservation>,
    #[serde(skip)]
    ids: AHashSet<String>,
    #[serde(skip)]
    total_reads: u64,
}

impl AbundanceTable {
    pub fn new(sample_id: impl Into<String>) -> Self {
        Self {
            sample_id: sample_id.into(),
            observations: Vec::new(),
            ids: AHashSet::new(),
            total_reads: 0,
        }
    }

    /// Build a table from `(id, name, count)` triples as they come off an upload.
    ///
    /// Counts are signed so that malformed input can be rejected here instead of wrapping.
    pub fn from_counts<I, S, N>(sample_id: &str, rows: I) -> AnalysisResult<Self>
    where
        I: IntoIterator<Item = (S, N, i64)>,
        S: Into<String>,
        N: Into<String>,
    {
        let mut table = Self::new(sample_id);
        for (id, name, count) in rows {
            let id = id.into();
            let read_count = checked_read_count(sample_id, &id, count)?;
            table.insert(TaxonObservation::new(id, name, read_count))?;
        }
        Ok(table)
    }

    /// Append an observation. Fails if the id is already recorded for this sample,
    /// or if its reads would push the sample total past `u64::MAX`.
    pub fn insert(&mut self, observation: TaxonObservation) -> AnalysisResult<()> {
        if self.ids.contains(&observation.id) {
            return Err(AnalysisError::invalid_taxon(
                &self.sample_id,
                &observation.id,
                "duplicate taxon id",
            ));
        }
        let total_reads = self
            .total_reads
            .checked_add(observation.read_count)
            .ok_or_else(|| {
                AnalysisError::invalid_taxon(
                    &self.sample_id,
                    &observation.id,
                    format!(
                        "read count {} overflows the sample total of {}",
                        observation.read_count, self.total_reads
                    ),
                )
            })?;

        self.ids.insert(observation.id.clone());
        self.total_reads = total_reads;
        self.observations.push(observation);
        Ok(())
    }

    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    pub fn observations(&self) -> &[TaxonObservation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TaxonObservation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TaxonObservation> {
        self.observations.iter().find(|o| o.id == id)
    }

    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    pub fn counts(&self) -> Vec<u64> {
        self.observations.iter().map(|o| o.read_count).collect()
    }

    /// Diversity metrics are undefined on a table with no reads.
    pub fn ensure_has_reads(&self) -> AnalysisResult<()> {
        if self.total_reads() == 0 {
            return Err(AnalysisError::invalid_sample(
                &self.sample_id,
                format!("zero total reads across {} taxa", self.len()),
            ));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a AbundanceTable {
    type Item = &'a TaxonObservation;
    type IntoIter = std::slice::Iter<'a, TaxonObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

/// Validate a raw signed count for one taxon.
pub fn checked_read_count(sample_id: &str, taxon_id: &str, count: i64) -> AnalysisResult<u64> {
    u64::try_from(count).map_err(|_| {
        AnalysisError::invalid_taxon(sample_id, taxon_id, format!("negative read count {count}"))
    })
}
