//! Label-window extractors for the B, C and D templates.
//!
//! These forms have no reliable layout, only captions. Each field takes the
//! lines that follow its captions, keeps the first plausible value, and
//! falls back to the generic strategies over the whole segment.

use std::sync::LazyLock;

use regex::Regex;

use super::address::{clean_address, find_address_near_keywords, find_addresses, pick_best_address};
use super::contact::{extract_email, extract_phone};
use super::generic::{
    extract_attorney, extract_deceased_name, extract_petitioner, extract_property_value, GENERIC_SCORE,
};
use super::names::{clean_person_name, plausible_name};
use super::relationship::{canonical_relationship, extract_relationship, is_allowed, priority_rank};
use super::text::{best_from_candidates, first_line, split_lines, window_after_labels};
use super::types::{CandidateLedger, Field, FieldRecord};
use super::{ExtractionError, FieldExtractor, SegmentInput};

/// Score of a value read from a label window.
const WINDOW_SCORE: i32 = 60;

static KINSHIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(spouse|husband|wife|son|daughter|brother|sister|mother|father|parent|grandson|granddaughter|niece|nephew|cousin|child)\b",
    )
    .expect("valid regex")
});
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?\s*([0-9][0-9,]*\.?\d{0,2})").expect("valid regex"));

/// Caption vocabulary of one template.
#[derive(Debug, Clone, Copy)]
pub struct LabelSet {
    pub deceased: &'static [&'static str],
    pub petitioner: &'static [&'static str],
    pub deceased_address: &'static [&'static str],
    pub deceased_address_near: &'static [&'static str],
    pub petitioner_address: &'static [&'static str],
    pub petitioner_address_near: &'static [&'static str],
    pub relationship: &'static [&'static str],
    pub value: &'static [&'static str],
    pub attorney: &'static [&'static str],
}

/// Probate petitions from the Kings and Queens courts.
pub const FORM_B_LABELS: LabelSet = LabelSet {
    deceased: &["decedent information", "decedent", "deceased", "estate of"],
    petitioner: &["petitioner", "applicant", "person filing", r"petitioner\(s\)"],
    deceased_address: &[
        "domicile",
        "address of decedent",
        "residence",
        "domicile at death",
        "decedent address",
    ],
    deceased_address_near: &["domicile", "residence", "decedent address"],
    petitioner_address: &["mailing address", "petitioner address", "address of petitioner", "present address"],
    petitioner_address_near: &["petitioner", "mailing address", "present address"],
    relationship: &["relationship to decedent", "relationship"],
    value: &["value of property", "gross value", "improved real property"],
    attorney: &["attorney", "counsel", "firm name"],
};

/// Affidavits of heirship and related family-tree filings.
pub const FORM_C_LABELS: LabelSet = LabelSet {
    deceased: &["decedent", "deceased", "affidavit of heirship", "estate of"],
    petitioner: &["affiant", "deponent", "petitioner", "informant"],
    deceased_address: &["domicile", "last address", "resided at", "residence of decedent"],
    deceased_address_near: &["domicile", "resided", "decedent"],
    petitioner_address: &["address of affiant", "affiant resides", "mailing address", "residence address"],
    petitioner_address_near: &["affiant", "deponent", "mailing address"],
    relationship: &["relationship to decedent", "relationship", "family tree"],
    value: &["value of estate", "gross value", "value of property"],
    attorney: &["attorney", "counsel", "law firm"],
};

/// Voluntary (small estate) administration.
pub const FORM_D_LABELS: LabelSet = LabelSet {
    deceased: &["decedent", "deceased", "small estate of", "voluntary administration of"],
    petitioner: &["voluntary administrator", "petitioner", "informant", "applicant"],
    deceased_address: &[
        "domicile",
        "resided at",
        "address of decedent",
        "decedent address",
        "property location",
    ],
    deceased_address_near: &["domicile", "resided", "property location", "decedent"],
    petitioner_address: &[
        "mailing address",
        "address of voluntary administrator",
        "residence address",
        "petitioner address",
    ],
    petitioner_address_near: &["voluntary administrator", "petitioner address", "mailing address"],
    relationship: &["relationship to decedent", "relationship"],
    value: &["improved real property", "value of property", "gross value"],
    attorney: &["attorney", "counsel", "law firm"],
};

/// Highest-priority allow-listed kinship word across all windows.
fn relationship_from_windows(windows: &[String]) -> String {
    windows
        .iter()
        .flat_map(|w| KINSHIP_RE.captures_iter(w))
        .map(|c| canonical_relationship(&c[1]))
        .filter(|rel| is_allowed(rel))
        .min_by_key(|rel| priority_rank(rel))
        .unwrap_or_default()
}

/// First parsable amount in the windows, with cents.
fn value_from_windows(windows: &[String]) -> String {
    windows
        .iter()
        .filter_map(|w| AMOUNT_RE.captures(w))
        .filter_map(|c| c[1].replace(',', "").parse::<f64>().ok())
        .map(|v| format!("{v:.2}"))
        .next()
        .unwrap_or_default()
}

fn first_lines(windows: &[String]) -> Vec<String> {
    windows.iter().map(|w| first_line(w).to_string()).collect()
}

/// Addresses inside the label windows plus the one nearest a keyword.
fn address_from_windows(lines: &[String], text: &str, labels: &[&str], near: &[&str]) -> String {
    let mut candidates: Vec<String> = window_after_labels(lines, labels, 4, false)
        .iter()
        .flat_map(|w| find_addresses(w))
        .collect();
    let nearest = find_address_near_keywords(text, near);
    if !nearest.is_empty() {
        candidates.push(nearest);
    }
    clean_address(&pick_best_address(&candidates))
}

/// Extractor driven by a template's caption vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct LabeledExtractor {
    pub name: &'static str,
    pub labels: LabelSet,
}

pub static FORM_B_EXTRACTOR: LabeledExtractor = LabeledExtractor { name: "form_b", labels: FORM_B_LABELS };
pub static FORM_C_EXTRACTOR: LabeledExtractor = LabeledExtractor { name: "form_c", labels: FORM_C_LABELS };
pub static FORM_D_EXTRACTOR: LabeledExtractor = LabeledExtractor { name: "form_d", labels: FORM_D_LABELS };

impl FieldExtractor for LabeledExtractor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(
        &self,
        input: &SegmentInput<'_>,
        ledger: &mut CandidateLedger,
    ) -> Result<FieldRecord, ExtractionError> {
        let labels = &self.labels;
        let text = input.text;
        let lines = split_lines(text);

        let deceased = first_lines(&window_after_labels(&lines, labels.deceased, 3, false));
        ledger
            .cascade(Field::DeceasedName)
            .attempt("label_window", WINDOW_SCORE, || {
                best_from_candidates(&deceased, clean_person_name, plausible_name)
            })
            .attempt("generic_fallback", GENERIC_SCORE, || extract_deceased_name(text));

        let petitioner = first_lines(&window_after_labels(&lines, labels.petitioner, 3, false));
        ledger
            .cascade(Field::PetitionerName)
            .attempt("label_window", WINDOW_SCORE, || {
                best_from_candidates(&petitioner, clean_person_name, plausible_name)
            })
            .attempt("generic_fallback", GENERIC_SCORE, || extract_petitioner(text));

        ledger
            .cascade(Field::DeceasedPropertyAddress)
            .attempt("label_window", WINDOW_SCORE, || {
                address_from_windows(&lines, text, labels.deceased_address, labels.deceased_address_near)
            });
        ledger
            .cascade(Field::PetitionerAddress)
            .attempt("label_window", WINDOW_SCORE, || {
                address_from_windows(&lines, text, labels.petitioner_address, labels.petitioner_address_near)
            });

        let rel_windows = window_after_labels(&lines, labels.relationship, 2, true);
        ledger
            .cascade(Field::Relationship)
            .attempt("label_window", WINDOW_SCORE, || relationship_from_windows(&rel_windows))
            .attempt("generic_fallback", GENERIC_SCORE, || extract_relationship(text));

        let value_windows = window_after_labels(&lines, labels.value, 3, false);
        ledger
            .cascade(Field::PropertyValue)
            .attempt("label_window", WINDOW_SCORE, || value_from_windows(&value_windows))
            .attempt("generic_fallback", GENERIC_SCORE, || extract_property_value(text));

        let attorney = first_lines(&window_after_labels(&lines, labels.attorney, 2, true));
        let from_window = best_from_candidates(&attorney, clean_person_name, plausible_name);
        let mut c = ledger.cascade(Field::Attorney);
        c.attempt("label_window", WINDOW_SCORE, || from_window);
        if !c.is_settled() {
            let generic = extract_attorney(text, ledger);
            ledger.cascade(Field::Attorney).attempt("generic_fallback", GENERIC_SCORE, || generic);
        }

        ledger
            .cascade(Field::PhoneNumber)
            .attempt("generic_fallback", GENERIC_SCORE, || extract_phone(text));
        ledger
            .cascade(Field::EmailAddress)
            .attempt("generic_fallback", GENERIC_SCORE, || extract_email(text));

        tracing::debug!(extractor = self.name, "label-window extraction done");
        Ok(ledger.to_record())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_config::ExtractionConfig;

    fn run(extractor: &LabeledExtractor, text: &str) -> (FieldRecord, CandidateLedger) {
        let config = ExtractionConfig::default();
        let pages = vec![text.to_string()];
        let input = SegmentInput::new(text, &pages, &config);
        let mut ledger = CandidateLedger::new();
        let rec = extractor.extract(&input, &mut ledger).unwrap();
        (rec, ledger)
    }

    const FORM_B: &str = "PROBATE PETITION\n\
        Decedent Information\n\
        Harold Finch\n\
        Petitioner\n\
        Grace Hendricks\n\
        Relationship to Decedent: Spouse\n\
        Gross Value\n\
        $725,000\n\
        Mailing Address\n\
        77 Carroll Street, Brooklyn, NY 11231\n\
        Attorney\n\
        John Reese\n";

    #[test]
    fn names_follow_captions() {
        let (rec, ledger) = run(&FORM_B_EXTRACTOR, FORM_B);
        assert_eq!(rec.get(Field::DeceasedName), "Harold Finch");
        assert_eq!(rec.get(Field::PetitionerName), "Grace Hendricks");
        assert_eq!(ledger.best(Field::DeceasedName).unwrap().source, "label_window");
    }

    #[test]
    fn relationship_value_and_address_windows() {
        let (rec, _) = run(&FORM_B_EXTRACTOR, FORM_B);
        assert_eq!(rec.get(Field::Relationship), "Spouse");
        assert_eq!(rec.get(Field::PropertyValue), "725000.00");
        assert_eq!(rec.get(Field::PetitionerAddress), "77 Carroll Street, Brooklyn, NY 11231");
        assert_eq!(rec.get(Field::Attorney), "John Reese");
    }

    #[test]
    fn parent_is_not_an_allowed_answer() {
        let windows = vec!["Relationship: Parent".to_string(), "Relationship: Son".to_string()];
        assert_eq!(relationship_from_windows(&windows), "Son");
    }

    #[test]
    fn child_after_sibling_still_wins() {
        let windows = vec!["Relationship: Sister".to_string(), "also listed: Daughter".to_string()];
        assert_eq!(relationship_from_windows(&windows), "Daughter");
    }

    #[test]
    fn affidavit_labels_find_affiant() {
        let text = "AFFIDAVIT OF HEIRSHIP\nAffiant\nLena Ortiz\nDeceased\nCarlos Ortiz\nRelationship: Daughter";
        let (rec, _) = run(&FORM_C_EXTRACTOR, text);
        assert_eq!(rec.get(Field::PetitionerName), "Lena Ortiz");
        assert_eq!(rec.get(Field::DeceasedName), "Carlos Ortiz");
        assert_eq!(rec.get(Field::Relationship), "Daughter");
    }
}
