//! Per-document entry point.
//!
//! Drives one extracted document through the pipeline:
//! segment → hint → classify → extract → normalize → assemble.
//!
//! Nothing here performs I/O. The assembler passed in carries the names
//! already emitted in this batch run, so documents must be processed in
//! arrival order.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::pipeline::batch::assembler::RecordAssembler;
use crate::pipeline::batch::types::CaseResult;
use crate::pipeline::source::ExtractedDocument;
use crate::pipeline::structuring::{
    classify, extract_segment, missing_names, normalize_record, simple_form_hint, split_cases,
    Field, FormType, SegmentInput, EXTRACTOR_FALLBACK,
};
use crate::pipeline_config::ExtractionConfig;

/// Warning code for a caption hint that disagrees with the marker scores.
pub const FORM_TYPE_CONFLICT: &str = "FORM_TYPE_CONFLICT";

/// Process every case segment of `doc`, in page order.
pub fn process_document(
    doc: &ExtractedDocument,
    assembler: &mut RecordAssembler,
    config: &ExtractionConfig,
) -> Vec<CaseResult> {
    split_cases(&doc.page_texts)
        .into_iter()
        .enumerate()
        .map(|(idx, range)| process_case(doc, idx + 1, range, assembler, config))
        .collect()
}

fn process_case(
    doc: &ExtractedDocument,
    case_id: usize,
    range: Range<usize>,
    assembler: &mut RecordAssembler,
    config: &ExtractionConfig,
) -> CaseResult {
    let pages: Vec<String> = doc.page_texts.get(range.clone()).unwrap_or_default().to_vec();
    let text = pages.join("\n");

    let hint = simple_form_hint(&pages);
    let classification = classify(&text, hint);
    let detection = classification.detection;
    let form = detection.form_type;

    let input = SegmentInput::new(&text, &pages, config);
    let extraction = extract_segment(form, &input);
    let mut ledger = extraction.ledger;
    let normalized = normalize_record(&extraction.record, &input, &doc.source_id, &mut ledger);

    for field in Field::ALL {
        if let Some(best) = ledger.best(field) {
            tracing::debug!(
                case_id,
                field = field.as_str(),
                source = %best.source,
                score = best.score,
                candidates = ledger.candidates(field).len(),
                "field resolved"
            );
        }
    }

    let field_sources: BTreeMap<String, String> = ledger
        .sources()
        .into_iter()
        .map(|(field, source)| (field.as_str().to_string(), source))
        .collect();

    let assembled = assembler.assemble(normalized.record, &text, form);

    let mut warnings = Vec::new();
    if extraction.fallback.is_some() {
        warnings.push(EXTRACTOR_FALLBACK.to_string());
    }
    if classification.conflict {
        warnings.push(FORM_TYPE_CONFLICT.to_string());
    }
    warnings.extend(assembled.warnings);

    let record = assembled.record;
    let missing = missing_names(&record.missing());
    let form_type = hint.unwrap_or(form).as_str().to_string();

    tracing::info!(
        file = %doc.source_id,
        case_id,
        method = doc.method.as_str(),
        form_type = %form_type,
        extractor = extraction.extractor,
        missing = %if missing.is_empty() { "none".to_string() } else { missing.join(", ") },
        "case processed"
    );
    if form == FormType::Unknown {
        tracing::warn!(
            file = %doc.source_id,
            case_id,
            "unknown form type; extraction may be incomplete"
        );
    }

    CaseResult {
        case_id,
        row: record.to_row(),
        fields: record,
        missing,
        warnings,
        status: assembled.status,
        detection,
        form_type,
        method: doc.method,
        extraction_info: doc.info.clone(),
        field_sources,
        pages_used: pages.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::batch::types::CaseStatus;
    use crate::pipeline::source::{ExtractionInfo, ExtractionMethod};

    fn doc(pages: &[&str]) -> ExtractedDocument {
        let pages: Vec<String> = pages.iter().map(|p| p.to_string()).collect();
        let info = ExtractionInfo {
            file: "case.pdf".into(),
            extraction_mode: ExtractionMethod::TextLayer,
            render_dpi: 300,
            renderer: "memory".into(),
            pages: pages.len(),
            text_len: 0,
        };
        ExtractedDocument::from_pages("case.pdf", pages, ExtractionMethod::TextLayer, info)
    }

    const ADMIN_PAGE: &str = "SURROGATE'S COURT OF THE STATE OF NEW YORK\n\
        PETITION FOR LETTERS OF ADMINISTRATION\n\
        Administration Proceeding, Estate of Walter Scott\n\
        File No. 2024-118\n";

    #[test]
    fn one_case_per_single_type_document() {
        let mut asm = RecordAssembler::new();
        let results = process_document(&doc(&[ADMIN_PAGE, "page two"]), &mut asm, &ExtractionConfig::default());
        assert_eq!(results.len(), 1);
        let case = &results[0];
        assert_eq!(case.case_id, 1);
        assert_eq!(case.pages_used, 2);
        assert_eq!(case.form_type, "FORM_ADMIN");
        assert_eq!(case.detection.matched_markers, vec!["form_hint"]);
        assert_eq!(case.row.len(), 9);
        assert_eq!(case.fields.get(Field::Relationship), "Unknown");
    }

    #[test]
    fn empty_document_yields_one_empty_case() {
        let mut asm = RecordAssembler::new();
        let results = process_document(&doc(&[]), &mut asm, &ExtractionConfig::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pages_used, 0);
        assert_eq!(results[0].form_type, "UNKNOWN");
        assert_eq!(results[0].status, CaseStatus::Ok);
    }

    #[test]
    fn admin_case_missing_required_fields_needs_review() {
        let mut asm = RecordAssembler::new();
        let results = process_document(&doc(&[ADMIN_PAGE]), &mut asm, &ExtractionConfig::default());
        let case = &results[0];
        assert_eq!(case.status, CaseStatus::NeedsReview);
        assert!(case.warnings.iter().any(|w| w.starts_with("REQUIRED_MISSING:")));
    }

    #[test]
    fn processing_is_deterministic() {
        let config = ExtractionConfig::default();
        let d = doc(&[ADMIN_PAGE, "Petitioner: Anna Scott"]);
        let a = process_document(&d, &mut RecordAssembler::new(), &config);
        let b = process_document(&d, &mut RecordAssembler::new(), &config);
        assert_eq!(a[0].row, b[0].row);
        assert_eq!(a[0].warnings, b[0].warnings);
    }
}
