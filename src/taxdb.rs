//src/taxdb.rs

use ahash::AHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{AnalysisError, AnalysisResult, LookupError};
use crate::types::{ConservationStatus, DriftStatus, TaxonObservation, Taxonomy};

/// What a reference backend is asked to identify.
#[derive(Debug, Clone, Copy)]
pub struct TaxonSignature<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub taxonomy: Option<&'a Taxonomy>,
}

impl<'a> From<&'a TaxonObservation> for TaxonSignature<'a> {
    fn from(obs: &'a TaxonObservation) -> Self {
        Self {
            id: &obs.id,
            name: &obs.name,
            taxonomy: obs.taxonomy.as_ref(),
        }
    }
}

/// A known taxon in a reference database.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRecord {
    pub name: String,
    pub conservation_status: ConservationStatus,
    pub drift_status: DriftStatus,
    /// Percent, `0..=100`.
    pub confidence: u8,
    pub taxonomy: Option<Taxonomy>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(ReferenceRecord),
    NotFound,
}

/// Capability to resolve a taxon against reference data.
///
/// Implementations may be backed by a local file, a remote service, or a test double.
/// They are shared across rayon workers, hence `Sync`.
pub trait ReferenceLookup: Sync {
    fn lookup(&self, signature: &TaxonSignature<'_>) -> Result<LookupOutcome, LookupError>;
}

impl<T: ReferenceLookup + Send + ?Sized> ReferenceLookup for std::sync::Arc<T> {
    fn lookup(&self, signature: &TaxonSignature<'_>) -> Result<LookupOutcome, LookupError> {
        (**self).lookup(signature)
    }
}

impl<T: ReferenceLookup + ?Sized> ReferenceLookup for &T {
    fn lookup(&self, signature: &TaxonSignature<'_>) -> Result<LookupOutcome, LookupError> {
        (**self).lookup(signature)
    }
}

/// Lookup that knows nothing; every taxon comes back novel.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyReference;

impl ReferenceLookup for EmptyReference {
    fn lookup(&self, _signature: &TaxonSignature<'_>) -> Result<LookupOutcome, LookupError> {
        Ok(LookupOutcome::NotFound)
    }
}

/// In-memory reference database keyed by scientific name and by taxon id.
#[derive(Debug, Default, Clone)]
pub struct ReferenceDb {
    records: Vec<ReferenceRecord>,
    by_name: AHashMap<String, usize>,
    by_signature: AHashMap<String, usize>,
}

impl ReferenceDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record under `signature` (usually the taxon id) and its lowercase name.
    /// A later record with the same key replaces the earlier mapping.
    pub fn insert(&mut self, signature: impl Into<String>, record: ReferenceRecord) {
        let idx = self.records.len();
        self.by_name.insert(record.name.to_lowercase(), idx);
        self.by_signature.insert(signature.into(), idx);
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn find(&self, signature: &TaxonSignature<'_>) -> Option<&ReferenceRecord> {
        self.by_name
            .get(&signature.name.trim().to_lowercase())
            .or_else(|| self.by_signature.get(signature.id))
            .map(|&idx| &self.records[idx])
    }
}

impl ReferenceLookup for ReferenceDb {
    fn lookup(&self, signature: &TaxonSignature<'_>) -> Result<LookupOutcome, LookupError> {
        Ok(match self.find(signature) {
            Some(record) => LookupOutcome::Found(record.clone()),
            None => LookupOutcome::NotFound,
        })
    }
}

/// Parses a reference file in the format:
/// ```text
/// <signature>\t<name>\t<conservation>\t<drift>\t<confidence>[\t<kingdom>\t<phylum>\t<class>\t<family>\t<genus>]
/// ```
/// `confidence` is a whole percentage, 0 to 100. Blank lines and lines starting
/// with `#` are skipped. A malformed row is an error: silently dropping it would
/// turn a known taxon into a novel one.
pub fn parse_reference_db<P: AsRef<Path>>(filepath: P) -> AnalysisResult<ReferenceDb> {
    let path = filepath.as_ref();
    let file = File::open(path).map_err(|e| AnalysisError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut db = ReferenceDb::new();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| AnalysisError::io(path, e))?;
        let line = line.trim_end();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let parse_err = |reason: String| AnalysisError::Parse {
            path: path.to_path_buf(),
            line: line_no + 1,
            reason,
        };

        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 5 {
            return Err(parse_err(format!(
                "expected at least 5 tab-separated fields, found {}",
                parts.len()
            )));
        }

        let signature = parts[0].trim();
        let name = parts[1].trim();
        if signature.is_empty() || name.is_empty() {
            return Err(parse_err("empty signature or name".to_string()));
        }
        let conservation_status: ConservationStatus = parts[2].parse().map_err(parse_err)?;
        let drift_status: DriftStatus = parts[3].parse().map_err(parse_err)?;
        let confidence = parse_confidence(parts[4]).map_err(parse_err)?;
        let taxonomy = Taxonomy::from_ranks(parts[5..].iter().copied());

        db.insert(
            signature,
            ReferenceRecord {
                name: name.to_string(),
                conservation_status,
                drift_status,
                confidence,
                taxonomy,
            },
        );
    }

    log::info!("Loaded {} reference records from {}", db.len(), path.display());
    Ok(db)
}

fn parse_confidence(field: &str) -> Result<u8, String> {
    match field.trim().parse::<u8>() {
        Ok(pct) if pct <= 100 => Ok(pct),
        _ => Err(format!("confidence '{}' is not a percentage in 0..=100", field.trim())),
    }
}
