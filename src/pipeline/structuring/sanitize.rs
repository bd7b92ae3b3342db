// Final guards applied to every record before it is written out.
// Strips invisible and control characters, erases form boilerplate,
// and hard-trims the contact columns to a single canonical token.

use std::sync::LazyLock;

use regex::Regex;

use super::contact::{extract_first_email, extract_first_phone, phone_near};
use super::names::strict_clean_name;
use super::text::{collapse_ws, lower, trim_chars};
use super::types::{Field, FieldRecord};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// Form captions that OCR sometimes reads into a value.
static BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)address:\s*street\s+and\s+number",
        r"(?i)street\s+and\s+number",
        r"(?i)city,\s*village\s+or\s+town",
        r"(?i)state\s+zip\s+code\s+country",
        r"(?i)zip\s+code\s+country",
        r"(?i)\band number\b",
    ]
    .iter()
    .map(|p| re(p))
    .collect()
});
static STRAY_LETTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(Road|Rd|Street|St|Avenue|Ave|Lane|Ln|Boulevard|Blvd|Drive|Dr|Court|Ct|Place|Pl)\s+[A-Za-z]\b([, ])")
});
static SPACE_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\s+,"));
static PETITIONER_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)petitioner information(.{0,400})"));
static BLOCK_NAME_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)name[:\s]+([A-Z .,'-]{3,})"));
static LETTERS_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)letters\s+(?:testamentary|of administration)\s+to[:\s]+([A-Z .,'-]{3,})")
});
static SIGNATURE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)signature of petitioner.*?print name[:\s]*([A-Z .,'-]{3,})"));

/// Values that mean "nothing here".
const PLACEHOLDER_VALUES: &[&str] = &[
    "n/a",
    "na",
    "none",
    "unknown",
    "see attached",
    "same as above",
    "tbd",
    "name",
    "address",
];

/// Collapse whitespace after turning NBSP, zero-width and control
/// characters into spaces.
pub fn sanitize_value(value: &str) -> String {
    let spaced: String = value
        .chars()
        .map(|c| match c {
            '\u{00A0}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    collapse_ws(&spaced)
}

/// Drop form captions, underscores and a stray letter after a street type.
pub fn strip_boilerplate(value: &str) -> String {
    let mut out = value.replace('_', " ");
    out = SPACE_COMMA_RE.replace_all(&out, ",").into_owned();
    out = collapse_ws(&out);
    out = trim_chars(&out, " ;,:").to_string();
    for pattern in BOILERPLATE.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    out = STRAY_LETTER_RE.replace_all(&out, "${1}${2}").into_owned();
    out = SPACE_COMMA_RE.replace_all(&out, ",").into_owned();
    trim_chars(&collapse_ws(&out), " ;,:").to_string()
}

/// Placeholder text for `field`. "Unknown" is a real Relationship answer.
pub fn is_placeholder(field: Field, value: &str) -> bool {
    let low = lower(trim_chars(value, " .:;,"));
    if field == Field::Relationship && low == "unknown" {
        return false;
    }
    PLACEHOLDER_VALUES.contains(&low.as_str())
}

/// Last-chance petitioner name: the information block, a letters-to
/// clause, then the signature block.
pub fn petitioner_from_blocks(text: &str) -> String {
    if let Some(block) = PETITIONER_BLOCK_RE.captures(text) {
        if let Some(c) = BLOCK_NAME_RE.captures(&block[1]) {
            return strict_clean_name(&c[1]);
        }
    }
    if let Some(c) = LETTERS_TO_RE.captures(text) {
        return strict_clean_name(&c[1]);
    }
    SIGNATURE_RE
        .captures(text)
        .map(|c| strict_clean_name(&c[1]))
        .unwrap_or_default()
}

/// Row-level pass run after normalization. Returns the row and any
/// validation warnings.
pub fn finalize_row(record: &FieldRecord, full_text: &str, source_name: &str) -> (FieldRecord, Vec<String>) {
    let mut warnings = Vec::new();
    let mut out = record.clone();
    out.map_values(sanitize_value);

    let raw_email = out.get(Field::EmailAddress).to_string();
    let email = extract_first_email(&raw_email);
    if !raw_email.is_empty() && raw_email != email {
        warnings.push(format!("VALIDATION_FAIL:{source_name}:Email Address:{raw_email}->{email}"));
    }
    out.set(Field::EmailAddress, email);

    let phone = extract_first_phone(out.get(Field::PhoneNumber));
    out.set(Field::PhoneNumber, phone);
    if out.is_blank(Field::PhoneNumber) && !out.is_blank(Field::Attorney) {
        let near = phone_near(full_text, out.get(Field::Attorney));
        out.set(Field::PhoneNumber, near);
    }

    if out.is_blank(Field::PetitionerName) {
        let fallback = petitioner_from_blocks(full_text);
        if fallback.is_empty() {
            warnings.push(format!("VALIDATION_FAIL:{source_name}:Petitioner Name empty"));
        } else {
            out.set(Field::PetitionerName, fallback);
        }
    }
    out.fill(Field::Relationship, "Unknown");
    (out, warnings)
}

/// Guard right before a row is written.
pub fn sanitize_row(record: &FieldRecord) -> FieldRecord {
    let mut out = record.clone();
    out.map_values(sanitize_value);
    let email = extract_first_email(out.get(Field::EmailAddress));
    out.set(Field::EmailAddress, email);
    let phone = extract_first_phone(out.get(Field::PhoneNumber));
    out.set(Field::PhoneNumber, phone);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invisible_and_control_characters_become_spaces() {
        assert_eq!(sanitize_value("Jane\u{200B}\u{00A0}Roe\t\u{0007}Esq"), "Jane Roe Esq");
    }

    #[test]
    fn boilerplate_is_removed() {
        assert_eq!(
            strip_boilerplate("Street and Number 12 Oak Road B, Troy, NY 12180"),
            "12 Oak Road, Troy, NY 12180"
        );
        assert_eq!(strip_boilerplate("__Mary_Jones__;"), "Mary Jones");
    }

    #[test]
    fn placeholders_except_unknown_relationship() {
        assert!(is_placeholder(Field::Attorney, "N/A"));
        assert!(is_placeholder(Field::PetitionerAddress, "Same as above."));
        assert!(is_placeholder(Field::PetitionerName, "Unknown"));
        assert!(!is_placeholder(Field::Relationship, "Unknown"));
        assert!(!is_placeholder(Field::Attorney, "Nancy Drew"));
    }

    #[test]
    fn petitioner_from_information_block() {
        let text = "PETITIONER INFORMATION\nName: MARY MAJOR\nAddress: 1 Main St";
        assert_eq!(petitioner_from_blocks(text), "MARY MAJOR");
        let text = "Letters of Administration to: ROBERT JONES";
        assert_eq!(petitioner_from_blocks(text), "ROBERT JONES");
        assert_eq!(petitioner_from_blocks("nothing"), "");
    }

    #[test]
    fn finalize_fills_phone_near_attorney_and_relationship() {
        let mut rec = FieldRecord::new();
        rec.set(Field::Attorney, "Jane Roe");
        rec.set(Field::PetitionerName, "Mary Major");
        rec.set(Field::EmailAddress, "Contact: JRoe@RoeLaw.com.");
        let text = "Jane Roe, Esq.\nTel: 718-555-0101";
        let (out, warnings) = finalize_row(&rec, text, "case.pdf");
        assert_eq!(out.get(Field::PhoneNumber), "718-555-0101");
        assert_eq!(out.get(Field::EmailAddress), "jroe@roelaw.com");
        assert_eq!(out.get(Field::Relationship), "Unknown");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("VALIDATION_FAIL:case.pdf:Email Address"));
    }

    #[test]
    fn finalize_warns_when_petitioner_stays_empty() {
        let (out, warnings) = finalize_row(&FieldRecord::new(), "no blocks", "x.pdf");
        assert!(out.is_blank(Field::PetitionerName));
        assert_eq!(warnings, vec!["VALIDATION_FAIL:x.pdf:Petitioner Name empty".to_string()]);
    }

    #[test]
    fn sanitize_row_trims_contacts() {
        let mut rec = FieldRecord::new();
        rec.set(Field::PhoneNumber, "(718) 555-0101 ext");
        rec.set(Field::EmailAddress, "a@b.com; c@d.com");
        let out = sanitize_row(&rec);
        assert_eq!(out.get(Field::PhoneNumber), "718-555-0101");
        assert_eq!(out.get(Field::EmailAddress), "a@b.com");
    }
}
