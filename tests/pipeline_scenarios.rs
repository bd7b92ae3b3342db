//! Whole-document scenarios through `process_document`.

use estate_intake_lib::pipeline::batch::{CaseStatus, RecordAssembler};
use estate_intake_lib::pipeline::source::{ExtractedDocument, ExtractionInfo, ExtractionMethod};
use estate_intake_lib::{process_document, ExtractionConfig, Field, FormType};
use regex::Regex;

const PROBATE_P1: &str = "SURROGATE'S COURT OF THE STATE OF NEW YORK\n\
    PROBATE PROCEEDING, WILL OF WALTER SCOTT a/k/a WALT SCOTT\n\
    Petitioner Information\n\
    Name (First, Middle, Last)\n\
    ANNA SCOTT\n\
    Domicile or Principal Office: 45 Maple Avenue\n\
    City, Village or Town: Staten Island\n\
    State NY Zip Code 10314\n\
    Interest(s) of Petitioner: Distributee of decedent (state relationship): Spouse\n";
const PROBATE_P2: &str = "2. The name, domicile and date of death of the decedent are as follows:\n\
    Name: Walter Scott\n\
    Domicile: Street 45 Maple Avenue\n\
    City Staten Island\n\
    State New York\n\
    Zip Code 10314\n\
    Improved real property in New York State $350,000.00\n";
const PROBATE_P3: &str = "Signature of Attorney\n\
    Print Name of Attorney: JANE ROE, ESQ.\n\
    Firm Name: Roe Law PLLC\n\
    Telephone (718) 555-0101\n\
    Email (optional): jroe@roelaw.com\n";

fn document(name: &str, pages: &[&str]) -> ExtractedDocument {
    let pages: Vec<String> = pages.iter().map(|p| p.to_string()).collect();
    let info = ExtractionInfo {
        file: name.to_string(),
        extraction_mode: ExtractionMethod::TextLayer,
        render_dpi: 300,
        renderer: "test".into(),
        pages: pages.len(),
        text_len: pages.iter().map(|p| p.len()).sum(),
    };
    ExtractedDocument::from_pages(name, pages, ExtractionMethod::TextLayer, info)
}

fn assert_address_invariant(value: &str) {
    if value.is_empty() {
        return;
    }
    let street_number = Regex::new(r"^\d").unwrap();
    let state = Regex::new(r"\b[A-Z]{2}\b").unwrap();
    assert!(street_number.is_match(value), "no street number: {value}");
    assert!(state.is_match(value), "no state code: {value}");
}

#[test]
fn probate_petition_end_to_end() {
    let config = ExtractionConfig::default();
    let mut assembler = RecordAssembler::new();
    let doc = document("scott.pdf", &[PROBATE_P1, PROBATE_P2, PROBATE_P3]);

    let results = process_document(&doc, &mut assembler, &config);
    assert_eq!(results.len(), 1);
    let case = &results[0];

    assert_eq!(case.form_type, "FORM_A");
    assert_eq!(case.fields.get(Field::DeceasedName), "Walter Scott");
    assert_eq!(case.fields.get(Field::PetitionerName), "Anna Scott");
    assert_eq!(case.fields.get(Field::Relationship), "Spouse");
    assert_eq!(case.fields.get(Field::PropertyValue), "350000");
    assert_eq!(case.fields.get(Field::PhoneNumber), "718-555-0101");
    assert_eq!(case.fields.get(Field::EmailAddress), "jroe@roelaw.com");
    assert_eq!(case.status, CaseStatus::Ok);
    assert!(case.field_sources.contains_key("Deceased Name"));
    assert_eq!(case.pages_used, 3);

    assert_address_invariant(case.fields.get(Field::PetitionerAddress));
    assert_address_invariant(case.fields.get(Field::DeceasedPropertyAddress));
}

#[test]
fn reused_name_in_next_document_trips_bleed_guard() {
    let config = ExtractionConfig::default();
    let mut assembler = RecordAssembler::new();
    process_document(
        &document("first.pdf", &[PROBATE_P1, PROBATE_P2, PROBATE_P3]),
        &mut assembler,
        &config,
    );

    let second = process_document(
        &document("second.pdf", &[PROBATE_P1, PROBATE_P2, PROBATE_P3]),
        &mut assembler,
        &config,
    );
    let case = &second[0];
    assert_eq!(case.fields.get(Field::DeceasedName), "");
    assert_eq!(case.fields.get(Field::PetitionerName), "");
    assert!(case.warnings.contains(&"BLEED_GUARD_TRIP:Deceased Name".to_string()));
    assert!(case.warnings.contains(&"BLEED_GUARD_TRIP:Petitioner Name".to_string()));
    assert!(case.missing.contains(&"Deceased Name".to_string()));
}

#[test]
fn garbled_second_segment_cannot_reuse_first_deceased_name() {
    let config = ExtractionConfig::default();
    let mut assembler = RecordAssembler::new();
    let first = process_document(
        &document("first.pdf", &[PROBATE_P1, PROBATE_P2, PROBATE_P3]),
        &mut assembler,
        &config,
    );
    assert_eq!(first[0].fields.get(Field::DeceasedName), "Walter Scott");

    // Segment 2 is unreadable, but a stale buffer still carries segment 1's values.
    let garbled = "5URR0G@TE ~~ |||| W4lt3r 5c0tt ### ::: pr0b@te";
    let out = assembler.assemble(first[0].fields.clone(), garbled, FormType::FormA);
    assert_eq!(out.record.get(Field::DeceasedName), "");
    assert!(out.warnings.contains(&"BLEED_GUARD_TRIP:Deceased Name".to_string()));
    assert!(!out.warnings.contains(&"NAME_NOT_IN_PDF:Deceased Name".to_string()));
}

#[test]
fn a_fresh_run_does_not_remember_earlier_names() {
    let config = ExtractionConfig::default();
    let doc = document("scott.pdf", &[PROBATE_P1, PROBATE_P2, PROBATE_P3]);
    process_document(&doc, &mut RecordAssembler::new(), &config);

    let again = process_document(&doc, &mut RecordAssembler::new(), &config);
    assert_eq!(again[0].fields.get(Field::DeceasedName), "Walter Scott");
    assert!(again[0].warnings.iter().all(|w| !w.starts_with("BLEED_GUARD_TRIP")));
}

#[test]
fn back_to_back_petitions_split_into_cases() {
    let config = ExtractionConfig::default();
    let mut assembler = RecordAssembler::new();
    let pages = [
        "PETITION FOR LETTERS OF ADMINISTRATION\nAdministration Proceeding",
        "continued",
        "continued",
        "continued",
        "Probate Proceeding, Will of Walter Scott",
        "continued",
    ];
    let results = process_document(&document("stack.pdf", &pages), &mut assembler, &config);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].case_id, 1);
    assert_eq!(results[0].pages_used, 4);
    assert_eq!(results[0].form_type, "FORM_ADMIN");
    assert_eq!(results[1].case_id, 2);
    assert_eq!(results[1].pages_used, 2);
    assert_eq!(results[1].form_type, "FORM_A");
    for case in &results {
        assert!(!case.fields.get(Field::Relationship).is_empty());
        assert_eq!(case.row.len(), 9);
    }
}

#[test]
fn unmarked_document_is_one_unknown_case() {
    let config = ExtractionConfig::default();
    let mut assembler = RecordAssembler::new();
    let results = process_document(
        &document("letter.pdf", &["Dear counsel,", "Please find enclosed the documents."]),
        &mut assembler,
        &config,
    );
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].form_type, "UNKNOWN");
    assert_eq!(results[0].fields.get(Field::Relationship), "Unknown");
}

#[test]
fn arabic_indic_digits_in_a_phone_are_not_read_as_a_number() {
    let config = ExtractionConfig::default();
    let mut assembler = RecordAssembler::new();
    let p3 = "Signature of Attorney\n\
        Print Name of Attorney: JANE ROE, ESQ.\n\
        Telephone (112) \u{0661}45-6789\n";
    let results = process_document(
        &document("scott.pdf", &[PROBATE_P1, PROBATE_P2, p3]),
        &mut assembler,
        &config,
    );
    assert_eq!(results.len(), 1);
    assert!(!results[0].fields.get(Field::PhoneNumber).contains('\u{0661}'));
}
