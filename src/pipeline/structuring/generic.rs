//! Domain-agnostic extractor shared by every form type.
//!
//! Used directly for UNKNOWN segments, as the fallback when a form-specific
//! extractor fails, and as the last strategy in each form cascade.

use std::sync::LazyLock;

use regex::Regex;

use super::address::{clean_address, find_address_near_keywords, find_addresses, pick_best_address};
use super::contact::{extract_email, extract_phone};
use super::lexicon::ROLE_WORDS;
use super::names::{clean_person_name, is_label_noise, plausible_name, validate_person_name};
use super::relationship::extract_relationship;
use super::text::{around, lower, normalize_text, trim_chars};
use super::types::{CandidateLedger, Field, FieldRecord};
use super::{ExtractionError, FieldExtractor, SegmentInput};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// Score every generic strategy records its value with.
pub const GENERIC_SCORE: i32 = 10;

static WILL_OF_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)will of\s+([A-Z][A-Za-z ,.'-]+)"));
static NAME_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)name[:\s]+([A-Z][A-Za-z ,.'-]+)"));
static DECEDENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(?is)decedent information[:\s]+.*?name[^A-Za-z]+([A-Z][A-Za-z ,.'-]+)"),
        re(r"(?is)(?:decedent|deceased)[:\s]+([A-Z][A-Za-z ,.'-]+)"),
    ]
});
static ESTATE_OF_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)estate of\s+([A-Z][A-Za-z ,.'-]+)"));
static PETITIONER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(?is)petitioner information[:\s]+.*?([A-Z][A-Za-z ,.'-]+)\s+United States"),
        re(r"(?is)petitioner(?:'s)?(?: name)?s?[:\s]+([A-Z][A-Za-z ,.'-]+)"),
        re(r"(?is)signature of petitioner[^A-Za-z]{0,20}([A-Z][A-Za-z ,.'-]+)"),
        re(r"(?is)name[:\s]+([A-Z][A-Za-z ,.'-]+)\s*(?:,?\s*petitioner|\(petitioner\)|petitioner)"),
        re(r"(?is)name relationship[^\n]{0,80}?([A-Z][A-Za-z ,.'-]+)\s+Spouse"),
    ]
});
static DOMICILE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)domicile[:\s]+([^\n]{0,200})"));
static RESIDENCE_CHUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)(?:domicile address|domicile|place of death|residence)[:\s]+([^\n]{0,150})")
});
static IMPROVED_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)improved[\s\S]{0,200}?[$;:, ]*([0-9][0-9,]*\.?\d{0,2})"));
static ATTORNEY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(?i)print name of attorney[^A-Za-z]{0,30}([A-Z][A-Za-z ,.'-]{2,})"),
        re(r"(?i)attorney(?: for [^:\n]+)?:?\s*([A-Z][A-Za-z ,.'-]{2,})"),
        re(r"(?i)name of attorney:?\s*([A-Z][A-Za-z ,.'-]{2,})"),
    ]
});
static ESQ_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i),?\s*esq\.?"));
static INSTRUCTION_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:comply|with|must|check)\b"));

fn accepted_name(raw: &str) -> Option<String> {
    let candidate = clean_person_name(raw);
    (validate_person_name(&candidate) && plausible_name(&candidate)).then_some(candidate)
}

/// Decedent from "will of", a name label near decedent vocabulary, a
/// decedent label, or "estate of", in that order.
pub fn extract_deceased_name(text: &str) -> String {
    if let Some(name) = WILL_OF_RE.captures(text).and_then(|c| accepted_name(&c[1])) {
        return name;
    }
    for c in NAME_LABEL_RE.captures_iter(text) {
        let Some(m) = c.get(0) else { continue };
        let context = lower(around(text, m.start(), m.start(), 80, 40));
        if ["decedent", "deceased", "above-named decedent", "estate of"]
            .iter()
            .any(|kw| context.contains(kw))
        {
            if let Some(name) = accepted_name(&c[1]) {
                return name;
            }
        }
    }
    for pattern in DECEDENT_PATTERNS.iter() {
        if let Some(name) = pattern.captures(text).and_then(|c| accepted_name(&c[1])) {
            return name;
        }
    }
    ESTATE_OF_RE
        .captures(text)
        .and_then(|c| accepted_name(&c[1]))
        .unwrap_or_default()
}

/// First plausible petitioner name: a name label near "petitioner", then
/// the petitioner phrasings.
pub fn extract_petitioner(text: &str) -> String {
    let mut candidates: Vec<String> = Vec::new();
    let mut push = |raw: &str| {
        let name = clean_person_name(raw);
        if plausible_name(&name) && !candidates.contains(&name) {
            candidates.push(name);
        }
    };
    for c in NAME_LABEL_RE.captures_iter(text) {
        let Some(m) = c.get(0) else { continue };
        if lower(around(text, m.start(), m.start(), 80, 60)).contains("petitioner") {
            push(&c[1]);
        }
    }
    for pattern in PETITIONER_PATTERNS.iter() {
        for c in pattern.captures_iter(text) {
            push(&c[1]);
        }
    }
    candidates.into_iter().next().unwrap_or_default()
}

/// Address near petitioner vocabulary unless it looks like a hospital or
/// place of death, else the best address anywhere.
pub fn extract_petitioner_address(text: &str) -> String {
    let mut candidates = Vec::new();
    let near = find_address_near_keywords(text, &["petitioner", "mailing address", "petitioner address"]);
    if !near.is_empty() {
        let low = lower(&near);
        if !["hospital", "place of death", "broadway"].iter().any(|w| low.contains(w)) {
            return near;
        }
        candidates.push(near);
    }
    candidates.extend(find_addresses(text));
    pick_best_address(&candidates)
}

/// Best address among domicile/residence labels, decedent vocabulary and
/// every address in the text.
pub fn extract_deceased_address(text: &str) -> String {
    let mut candidates = Vec::new();
    if let Some(c) = DOMICILE_LINE_RE.captures(text) {
        candidates.extend(find_addresses(&c[1]));
    }
    for c in RESIDENCE_CHUNK_RE.captures_iter(text) {
        candidates.extend(find_addresses(&c[1]));
    }
    let near = find_address_near_keywords(
        text,
        &["domicile", "decedent", "deceased", "resided", "residence", "place of death"],
    );
    if !near.is_empty() {
        candidates.push(near);
    }
    candidates.extend(find_addresses(text));
    pick_best_address(&candidates)
}

/// Amount following "improved", with cents.
pub fn extract_property_value(text: &str) -> String {
    IMPROVED_VALUE_RE
        .captures(text)
        .and_then(|c| c[1].replace(',', "").parse::<f64>().ok())
        .map(|v| format!("{v:.2}"))
        .unwrap_or_default()
}

/// Attorney named after a print-name or attorney label, rejecting label
/// noise and role words.
pub fn extract_attorney(text: &str, ledger: &mut CandidateLedger) -> String {
    for pattern in ATTORNEY_PATTERNS.iter() {
        let Some(c) = pattern.captures(text) else { continue };
        let name = ESQ_RE.replace_all(&c[1], "");
        if INSTRUCTION_WORD_RE.is_match(&name) {
            continue;
        }
        let cleaned = clean_person_name(&name);
        if is_label_noise(&cleaned) {
            ledger.reject(Field::Attorney, "attorney_pattern", cleaned, "label_noise");
            continue;
        }
        let low = lower(&cleaned);
        if !cleaned.is_empty() && ROLE_WORDS.iter().any(|r| low.contains(r)) {
            ledger.reject(Field::Attorney, "attorney_pattern", cleaned, "role_label");
            continue;
        }
        if validate_person_name(&cleaned) && plausible_name(&cleaned) {
            return trim_chars(&cleaned, " ,").to_string();
        }
    }
    String::new()
}

/// Run every generic strategy into the ledger at `GENERIC_SCORE`.
pub fn extract_generic_into(text: &str, ledger: &mut CandidateLedger) {
    let text = normalize_text(text);
    let attorney = extract_attorney(&text, ledger);
    let values = [
        (Field::DeceasedPropertyAddress, "generic_deceased_address", clean_address(&extract_deceased_address(&text))),
        (Field::DeceasedName, "generic_deceased_name", extract_deceased_name(&text)),
        (Field::PetitionerName, "generic_petitioner", extract_petitioner(&text)),
        (Field::PetitionerAddress, "generic_petitioner_address", clean_address(&extract_petitioner_address(&text))),
        (Field::Relationship, "generic_relationship", extract_relationship(&text)),
        (Field::PropertyValue, "generic_improved_value", extract_property_value(&text)),
        (Field::Attorney, "attorney_pattern", attorney),
        (Field::PhoneNumber, "generic_phone", extract_phone(&text)),
        (Field::EmailAddress, "generic_email", extract_email(&text)),
    ];
    for (field, source, value) in values {
        ledger.cascade(field).attempt(source, GENERIC_SCORE, || value);
    }
}

/// Extractor for segments with no recognized template.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericExtractor;

impl FieldExtractor for GenericExtractor {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn extract(
        &self,
        input: &SegmentInput<'_>,
        ledger: &mut CandidateLedger,
    ) -> Result<FieldRecord, ExtractionError> {
        extract_generic_into(input.text, ledger);
        Ok(ledger.to_record())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_config::ExtractionConfig;

    const SAMPLE: &str = "SURROGATE'S COURT\nEstate of Mary Ann Jones, Deceased\n\
        Petitioner: Robert Jones\nMailing Address: 12 Oak Street, Troy, NY 12180\n\
        Relationship: Son\nImproved real property $250,000.00\n\
        Print Name of Attorney: Jane Roe, Esq.\nTelephone (518) 555-0101\nEmail jroe@roelaw.com";

    #[test]
    fn deceased_name_from_estate_of() {
        assert_eq!(extract_deceased_name(SAMPLE), "Mary Ann Jones");
    }

    #[test]
    fn petitioner_from_label() {
        assert_eq!(extract_petitioner(SAMPLE), "Robert Jones");
    }

    #[test]
    fn petitioner_address_near_label() {
        assert_eq!(extract_petitioner_address(SAMPLE), "12 Oak Street, Troy, NY 12180");
    }

    #[test]
    fn improved_value_has_cents() {
        assert_eq!(extract_property_value(SAMPLE), "250000.00");
        assert_eq!(extract_property_value("no value"), "");
    }

    #[test]
    fn attorney_drops_esq() {
        let mut ledger = CandidateLedger::new();
        assert_eq!(extract_attorney(SAMPLE, &mut ledger), "Jane Roe");
    }

    #[test]
    fn attorney_rejects_instructions() {
        let mut ledger = CandidateLedger::new();
        assert_eq!(extract_attorney("Attorney: Must comply with rules", &mut ledger), "");
    }

    #[test]
    fn generic_extractor_fills_record() {
        let config = ExtractionConfig::default();
        let pages = vec![SAMPLE.to_string()];
        let input = SegmentInput {
            text: SAMPLE,
            pages: &pages,
            config: &config,
        };
        let mut ledger = CandidateLedger::new();
        let rec = GenericExtractor.extract(&input, &mut ledger).unwrap();
        assert_eq!(rec.get(Field::Relationship), "Son");
        assert_eq!(rec.get(Field::PhoneNumber), "(518) 555-0101");
        assert_eq!(rec.get(Field::EmailAddress), "jroe@roelaw.com");
        assert_eq!(ledger.best(Field::DeceasedName).map(|c| c.score), Some(GENERIC_SCORE));
    }
}
