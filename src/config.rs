//src/config.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{AnalysisError, AnalysisResult};

/// Tunables for an analysis run. Every field has a default, so an empty file is valid.
///
/// ```toml
/// [classification]
/// parallel_lookups = true
///
/// [report]
/// title = "eDNA Biodiversity Analysis Report"
/// shannon_high = 3.0
/// shannon_moderate = 2.0
/// top_taxa = 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub classification: ClassificationConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassificationConfig {
    /// Run reference lookups on the rayon pool.
    pub parallel_lookups: bool,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            parallel_lookups: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub title: String,
    /// Shannon index above which a sample is banded "High Diversity".
    pub shannon_high: f64,
    /// Shannon index above which a sample is banded "Moderate Diversity".
    pub shannon_moderate: f64,
    /// Number of taxa listed in the most-abundant section of rendered reports.
    pub top_taxa: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "eDNA Biodiversity Analysis Report".to_string(),
            shannon_high: 3.0,
            shannon_moderate: 2.0,
            top_taxa: 10,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(content: &str) -> AnalysisResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| AnalysisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
        let config = Self::from_toml_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        let r = &self.report;
        if !(r.shannon_moderate.is_finite() && r.shannon_high.is_finite()) {
            return Err(AnalysisError::Config(
                "shannon thresholds must be finite".to_string(),
            ));
        }
        if r.shannon_moderate < 0.0 || r.shannon_moderate > r.shannon_high {
            return Err(AnalysisError::Config(format!(
                "expected 0 <= shannon_moderate ({}) <= shannon_high ({})",
                r.shannon_moderate, r.shannon_high
            )));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> AnalysisResult<String> {
        toml::to_string_pretty(self).map_err(|e| AnalysisError::Config(e.to_string()))
    }
}
