pub mod annotate;
pub mod classify_stats;

pub use annotate::{classify_table, classify_taxon, AnnotatedTaxon};
pub use classify_stats::{drift_ratio_percent, ClassificationStats};

use super::taxdb::{ReferenceLookup, TaxonSignature};
