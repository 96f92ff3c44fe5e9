//src/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Linnaean ranks carried for a taxon, when known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kingdom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phylum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
}

impl Taxonomy {
    /// Build from up to five rank columns in kingdom..genus order; empty or `-` cells are unknown.
    pub fn from_ranks<'a, I: IntoIterator<Item = &'a str>>(ranks: I) -> Option<Self> {
        let mut cells = ranks.into_iter().map(|s| {
            let s = s.trim();
            if s.is_empty() || s == "-" {
                None
            } else {
                Some(s.to_string())
            }
        });
        let taxonomy = Taxonomy {
            kingdom: cells.next().flatten(),
            phylum: cells.next().flatten(),
            class: cells.next().flatten(),
            family: cells.next().flatten(),
            genus: cells.next().flatten(),
        };
        if taxonomy.is_empty() {
            None
        } else {
            Some(taxonomy)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kingdom.is_none()
            && self.phylum.is_none()
            && self.class.is_none()
            && self.family.is_none()
            && self.genus.is_none()
    }
}

/// One taxon and its read count within a single sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonObservation {
    pub id: String,
    pub name: String,
    pub read_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<Taxonomy>,
}

impl TaxonObservation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, read_count: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            read_count,
            taxonomy: None,
        }
    }

    pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = Some(taxonomy);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConservationStatus {
    Normal,
    Invasive,
    Endangered,
}

/// Likelihood that a detected taxon was carried in from elsewhere rather than resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftStatus {
    Local,
    Possible,
    Confirmed,
}

impl ConservationStatus {
    pub const ALL: [ConservationStatus; 3] = [Self::Normal, Self::Invasive, Self::Endangered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Invasive => "invasive",
            Self::Endangered => "endangered",
        }
    }
}

impl DriftStatus {
    pub const ALL: [DriftStatus; 3] = [Self::Local, Self::Possible, Self::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Possible => "possible",
            Self::Confirmed => "confirmed",
        }
    }

    /// Label used on badges and in exported reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local => "Local",
            Self::Possible => "Possibly Drifted",
            Self::Confirmed => "Drifted",
        }
    }
}

impl fmt::Display for ConservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "invasive" => Ok(Self::Invasive),
            "endangered" => Ok(Self::Endangered),
            other => Err(format!("unknown conservation status '{other}'")),
        }
    }
}

impl FromStr for DriftStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "possible" => Ok(Self::Possible),
            "confirmed" | "drifted" => Ok(Self::Confirmed),
            other => Err(format!("unknown drift status '{other}'")),
        }
    }
}

/// Per-taxon outcome of one classification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub is_novel: bool,
    pub conservation_status: ConservationStatus,
    pub drift_status: DriftStatus,
    /// Match confidence in percent, `0..=100`. Novel taxa carry 0.
    pub confidence: u8,
}

impl ClassificationResult {
    /// Taxa without a reference match have unknown provenance: not flagged for
    /// conservation, origin uncertain, nothing to be confident about.
    pub const NOVEL: ClassificationResult = ClassificationResult {
        is_novel: true,
        conservation_status: ConservationStatus::Normal,
        drift_status: DriftStatus::Possible,
        confidence: 0,
    };
}

/// Free-form context recorded with an uploaded sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Metres below surface.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    /// Degrees Celsius.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
