//! # litrev Core Record Model
//!
//! Bibliographic records and their status state machine. Every record
//! carries a [`RecordState`] that advances strictly along the review
//! pipeline; invalid transitions are rejected.
pub mod dataset;
pub mod error;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use dataset::Dataset;
pub use error::RecordError;

/// Review status of a record. Variants serialize to the snake_case names
/// used in the record store and in CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Retrieved from a search source, not yet imported
    MdRetrieved,
    /// Imported into the record store
    MdImported,
    /// Metadata preparation requires manual work
    MdNeedsManualPreparation,
    /// Metadata prepared
    MdPrepared,
    /// Metadata processed (deduplicated)
    MdProcessed,
    /// Excluded in the prescreen
    RevPrescreenExcluded,
    /// Included in the prescreen
    RevPrescreenIncluded,
    /// PDF could not be retrieved automatically
    PdfNeedsManualRetrieval,
    /// PDF retrieved
    PdfImported,
    /// PDF preparation requires manual work
    PdfNeedsManualPreparation,
    /// PDF prepared
    PdfPrepared,
    /// Excluded in the screen
    RevExcluded,
    /// Included in the screen
    RevIncluded,
    /// Synthesized into the data extraction
    RevSynthesized,
}

impl RecordState {
    /// States a record may move to directly from this one.
    pub fn valid_transitions(&self) -> &'static [RecordState] {
        use RecordState::*;
        match self {
            MdRetrieved => &[MdImported],
            MdImported => &[MdNeedsManualPreparation, MdPrepared],
            MdNeedsManualPreparation => &[MdPrepared],
            MdPrepared => &[MdProcessed],
            MdProcessed => &[RevPrescreenExcluded, RevPrescreenIncluded],
            RevPrescreenExcluded => &[],
            RevPrescreenIncluded => &[PdfNeedsManualRetrieval, PdfImported],
            PdfNeedsManualRetrieval => &[PdfImported],
            PdfImported => &[PdfNeedsManualPreparation, PdfPrepared],
            PdfNeedsManualPreparation => &[PdfPrepared],
            PdfPrepared => &[RevExcluded, RevIncluded],
            RevExcluded => &[],
            RevIncluded => &[RevSynthesized],
            RevSynthesized => &[],
        }
    }

    /// Whether `to` is a permitted direct successor of this state.
    pub fn can_transition_to(&self, to: RecordState) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// All states, in pipeline order.
    pub fn all() -> &'static [RecordState] {
        use RecordState::*;
        &[
            MdRetrieved,
            MdImported,
            MdNeedsManualPreparation,
            MdPrepared,
            MdProcessed,
            RevPrescreenExcluded,
            RevPrescreenIncluded,
            PdfNeedsManualRetrieval,
            PdfImported,
            PdfNeedsManualPreparation,
            PdfPrepared,
            RevExcluded,
            RevIncluded,
            RevSynthesized,
        ]
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RecordState::*;
        let name = match self {
            MdRetrieved => "md_retrieved",
            MdImported => "md_imported",
            MdNeedsManualPreparation => "md_needs_manual_preparation",
            MdPrepared => "md_prepared",
            MdProcessed => "md_processed",
            RevPrescreenExcluded => "rev_prescreen_excluded",
            RevPrescreenIncluded => "rev_prescreen_included",
            PdfNeedsManualRetrieval => "pdf_needs_manual_retrieval",
            PdfImported => "pdf_imported",
            PdfNeedsManualPreparation => "pdf_needs_manual_preparation",
            PdfPrepared => "pdf_prepared",
            RevExcluded => "rev_excluded",
            RevIncluded => "rev_included",
            RevSynthesized => "rev_synthesized",
        };
        write!(f, "{}", name)
    }
}

/// A bibliographic record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Citation key, unique within the record store
    pub id: String,
    /// Entry type (article, inproceedings, ...)
    pub entrytype: String,
    /// Review status
    pub status: RecordState,
    /// Search-source origins, `<source_identifier>/<id-in-source>`
    #[serde(default)]
    pub origins: Vec<String>,
    /// Bibliographic fields (title, author, year, doi, file, ...)
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Record {
    /// Create a freshly retrieved record.
    pub fn new(id: &str, entrytype: &str) -> Self {
        Self {
            id: id.to_string(),
            entrytype: entrytype.to_string(),
            status: RecordState::MdRetrieved,
            origins: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Get a bibliographic field.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|s| s.as_str())
    }

    /// Set a bibliographic field, returning self for chaining.
    pub fn with_field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    /// Set a bibliographic field.
    pub fn set_field(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), value.to_string());
    }

    /// Advance the record status, rejecting transitions the state machine
    /// does not permit.
    pub fn set_status(&mut self, to: RecordState) -> Result<(), RecordError> {
        if self.status == to {
            return Ok(());
        }
        if !self.status.can_transition_to(to) {
            return Err(RecordError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Merge a duplicate into this record: union of origins, fields of the
    /// duplicate fill gaps but never overwrite.
    pub fn merge(&mut self, duplicate: &Record) {
        for origin in &duplicate.origins {
            if !self.origins.contains(origin) {
                self.origins.push(origin.clone());
            }
        }
        for (key, value) in &duplicate.fields {
            self.fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

// Test module declaration
#[cfg(test)]
mod tests;
