//! Cross-case checks over one batch run.
//!
//! The assembler owns the set of names already emitted in this run. Cases
//! must be fed in document-arrival order; the set is never reset until a
//! new assembler is created for the next run.

use std::collections::HashSet;

use super::types::CaseStatus;
use crate::pipeline::structuring::{Field, FieldRecord, FormType};

/// Fields an administration case cannot be filed without.
pub const ADMIN_REQUIRED: [Field; 4] = [
    Field::DeceasedName,
    Field::PetitionerName,
    Field::Relationship,
    Field::PropertyValue,
];

/// Outcome of assembling one case.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub record: FieldRecord,
    pub warnings: Vec<String>,
    pub status: CaseStatus,
}

#[derive(Debug, Default)]
pub struct RecordAssembler {
    seen_names: HashSet<String>,
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen_names(&self) -> &HashSet<String> {
        &self.seen_names
    }

    /// Apply the leakage check, the source-presence check and the
    /// required-field gate, then remember this case's surviving names.
    pub fn assemble(&mut self, mut record: FieldRecord, segment_text: &str, form: FormType) -> Assembled {
        let mut warnings = Vec::new();
        let mut status = CaseStatus::Ok;

        for field in Field::NAMES {
            let value = record.get(field);
            if !value.is_empty() && self.seen_names.contains(value) {
                tracing::warn!(field = field.as_str(), "name already emitted earlier in run, clearing");
                record.clear(field);
                warnings.push(format!("BLEED_GUARD_TRIP:{field}"));
            }
        }

        let segment_lower = segment_text.to_lowercase();
        for field in Field::NAMES {
            let value = record.get(field);
            if !value.is_empty() && !segment_lower.contains(&value.to_lowercase()) {
                tracing::warn!(field = field.as_str(), "name not found in segment text, clearing");
                record.clear(field);
                warnings.push(format!("NAME_NOT_IN_PDF:{field}"));
                status = CaseStatus::NeedsReview;
            }
        }

        if form == FormType::FormAdmin {
            let missing: Vec<&str> = ADMIN_REQUIRED
                .iter()
                .filter(|f| record.is_blank(**f))
                .map(|f| f.as_str())
                .collect();
            if !missing.is_empty() {
                status = CaseStatus::NeedsReview;
                warnings.push(format!("REQUIRED_MISSING:{}", missing.join(",")));
            }
        }

        for field in Field::NAMES {
            let value = record.get(field);
            if !value.is_empty() {
                self.seen_names.insert(value.to_string());
            }
        }

        Assembled {
            record,
            warnings,
            status,
        }
    }
}
