//src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Broad category of an [`AnalysisError`], stable enough to key user-facing messages on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    LookupFailure,
    Cancelled,
    Io,
    Parse,
    Config,
    Export,
}

/// Umbrella error surfaced to callers of the analysis core.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid input in sample '{sample_id}'{}: {reason}", taxon_suffix(.taxon_id))]
    InvalidInput {
        sample_id: String,
        taxon_id: Option<String>,
        reason: String,
    },

    #[error("reference lookup failed for taxon '{taxon_id}': {reason}")]
    LookupFailure { taxon_id: String, reason: String },

    #[error("analysis for session '{session_id}' was cancelled")]
    Cancelled { session_id: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("export error: {0}")]
    Export(String),
}

fn taxon_suffix(taxon_id: &Option<String>) -> String {
    taxon_id
        .as_ref()
        .map(|id| format!(" (taxon '{id}')"))
        .unwrap_or_default()
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::LookupFailure { .. } => ErrorKind::LookupFailure,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Io { .. } => ErrorKind::Io,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Config(_) => ErrorKind::Config,
            Self::Export(_) => ErrorKind::Export,
        }
    }

    /// Shorthand for a table-level validation failure.
    pub fn invalid_sample(sample_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            sample_id: sample_id.to_string(),
            taxon_id: None,
            reason: reason.into(),
        }
    }

    /// Shorthand for a validation failure pinned to one taxon.
    pub fn invalid_taxon(sample_id: &str, taxon_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            sample_id: sample_id.to_string(),
            taxon_id: Some(taxon_id.to_string()),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Error returned by a [`ReferenceLookup`](crate::taxdb::ReferenceLookup) backend.
///
/// The annotator never propagates these; they are downgraded to
/// [`AnalysisError::LookupFailure`] for logging and the taxon is treated as unresolved.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LookupError(pub String);

impl LookupError {
    pub fn into_analysis_error(self, taxon_id: &str) -> AnalysisError {
        AnalysisError::LookupFailure {
            taxon_id: taxon_id.to_string(),
            reason: self.0,
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_names_sample_and_taxon() {
        let err = AnalysisError::invalid_taxon("S1", "SP002", "negative read count -3");
        let msg = err.to_string();
        assert!(msg.contains("S1"));
        assert!(msg.contains("SP002"));
        assert!(msg.contains("negative"));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn invalid_sample_has_no_taxon_suffix() {
        let err = AnalysisError::invalid_sample("S1", "zero total reads");
        assert_eq!(err.to_string(), "invalid input in sample 'S1': zero total reads");
    }

    #[test]
    fn lookup_error_converts_with_taxon() {
        let err = LookupError("timeout".into()).into_analysis_error("SP009");
        assert_eq!(err.kind(), ErrorKind::LookupFailure);
        assert!(err.to_string().contains("SP009"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn io_error_keeps_path() {
        let err = AnalysisError::io(
            "tables/sample.tsv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("sample.tsv"));
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
