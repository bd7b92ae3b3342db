//! Form type to extractor selection, with the generic retry.

use std::panic::{catch_unwind, AssertUnwindSafe};

use super::classify::FormType;
use super::form_admin::AdminExtractor;
use super::form_labeled::{FORM_B_EXTRACTOR, FORM_C_EXTRACTOR, FORM_D_EXTRACTOR};
use super::form_probate::ProbateExtractor;
use super::generic::GenericExtractor;
use super::types::{CandidateLedger, FieldRecord};
use super::{ExtractionError, FieldExtractor, SegmentInput};

static PROBATE: ProbateExtractor = ProbateExtractor;
static ADMIN: AdminExtractor = AdminExtractor;
static GENERIC: GenericExtractor = GenericExtractor;

/// Warning code attached when the form extractor had to be replaced.
pub const EXTRACTOR_FALLBACK: &str = "EXTRACTOR_FALLBACK";

/// Extractor registered for a form type. UNKNOWN gets the generic one.
pub fn extractor_for(form: FormType) -> &'static dyn FieldExtractor {
    match form {
        FormType::FormA => &PROBATE,
        FormType::FormAdmin => &ADMIN,
        FormType::FormB => &FORM_B_EXTRACTOR,
        FormType::FormC => &FORM_C_EXTRACTOR,
        FormType::FormD => &FORM_D_EXTRACTOR,
        FormType::Unknown => &GENERIC,
    }
}

/// Output of one segment extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: FieldRecord,
    pub ledger: CandidateLedger,
    /// Name of the extractor whose record was kept.
    pub extractor: &'static str,
    /// Set when the form extractor failed and the generic one ran instead.
    pub fallback: Option<String>,
}

/// Run the extractor for `form` over one segment.
pub fn extract_segment(form: FormType, input: &SegmentInput<'_>) -> Extraction {
    run_with_fallback(extractor_for(form), input)
}

/// Run `extractor`, retrying with the generic extractor on a fresh ledger
/// when it returns an error or panics. Never fails.
pub fn run_with_fallback(extractor: &dyn FieldExtractor, input: &SegmentInput<'_>) -> Extraction {
    let mut ledger = CandidateLedger::new();
    let outcome = catch_unwind(AssertUnwindSafe(|| extractor.extract(input, &mut ledger)));

    let reason = match outcome {
        Ok(Ok(record)) => {
            return Extraction {
                record,
                ledger,
                extractor: extractor.name(),
                fallback: None,
            }
        }
        Ok(Err(e)) => e.to_string(),
        Err(panic) => panic_message(panic.as_ref()),
    };

    tracing::warn!(
        extractor = extractor.name(),
        error = %reason,
        "form extractor failed, using generic"
    );

    let mut ledger = CandidateLedger::new();
    ledger.warn(EXTRACTOR_FALLBACK);
    let record = match GENERIC.extract(input, &mut ledger) {
        Ok(record) => record,
        Err(e) => {
            tracing::error!(error = %e, "generic extractor failed");
            FieldRecord::new()
        }
    };
    Extraction {
        record,
        ledger,
        extractor: GENERIC.name(),
        fallback: Some(format!("{}: {reason}", extractor.name())),
    }
}

/// Text of a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        ExtractionError::Internal("panic".into()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::types::Field;
    use crate::pipeline_config::ExtractionConfig;

    struct Failing;

    impl FieldExtractor for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn extract(
            &self,
            _input: &SegmentInput<'_>,
            ledger: &mut CandidateLedger,
        ) -> Result<FieldRecord, ExtractionError> {
            ledger.accept(Field::DeceasedName, "partial", "Should Vanish", 120);
            Err(ExtractionError::Internal("table parse".into()))
        }
    }

    struct Panicking;

    impl FieldExtractor for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn extract(
            &self,
            _input: &SegmentInput<'_>,
            _ledger: &mut CandidateLedger,
        ) -> Result<FieldRecord, ExtractionError> {
            panic!("index out of range")
        }
    }

    const TEXT: &str = "Estate of Mary Ann Jones, Deceased\nPetitioner: Robert Jones\nRelationship: Son";

    fn with_input<T>(f: impl FnOnce(&SegmentInput<'_>) -> T) -> T {
        let config = ExtractionConfig::default();
        let pages = vec![TEXT.to_string()];
        let input = SegmentInput::new(TEXT, &pages, &config);
        f(&input)
    }

    #[test]
    fn every_form_type_has_an_extractor() {
        assert_eq!(extractor_for(FormType::FormA).name(), "probate");
        assert_eq!(extractor_for(FormType::FormAdmin).name(), "administration");
        assert_eq!(extractor_for(FormType::FormB).name(), "form_b");
        assert_eq!(extractor_for(FormType::FormC).name(), "form_c");
        assert_eq!(extractor_for(FormType::FormD).name(), "form_d");
        assert_eq!(extractor_for(FormType::Unknown).name(), "generic");
    }

    #[test]
    fn error_falls_back_to_generic_on_fresh_ledger() {
        let out = with_input(|input| run_with_fallback(&Failing, input));
        assert_eq!(out.extractor, "generic");
        assert_eq!(out.record.get(Field::DeceasedName), "Mary Ann Jones");
        assert!(out.ledger.candidates(Field::DeceasedName).iter().all(|c| c.source != "partial"));
        assert_eq!(out.ledger.warnings(), &[EXTRACTOR_FALLBACK.to_string()]);
        assert!(out.fallback.unwrap().contains("table parse"));
    }

    #[test]
    fn panic_falls_back_to_generic() {
        let out = with_input(|input| run_with_fallback(&Panicking, input));
        assert_eq!(out.extractor, "generic");
        assert_eq!(out.record.get(Field::Relationship), "Son");
        assert_eq!(out.fallback.as_deref(), Some("panicking: index out of range"));
    }

    #[test]
    fn unknown_runs_generic_without_fallback() {
        let out = with_input(|input| extract_segment(FormType::Unknown, input));
        assert_eq!(out.extractor, "generic");
        assert!(out.fallback.is_none());
        assert_eq!(out.record.get(Field::PetitionerName), "Robert Jones");
    }
}
