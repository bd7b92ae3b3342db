//! Uniform post-extraction pass.
//!
//! Runs after any extractor, regardless of form type:
//! 1. per-field cleanup and canonical re-formatting
//! 2. strict address formatting, contact trimming, name cleanup
//! 3. New York area-code repair (when enabled)
//! 4. property value enforcement (ZIP exclusion, keyword rescan, plain-number fallback)
//! 5. address completeness (petitioner rescan, decedent upgrade)
//! 6. required Relationship and the petitioner fallback
//! 7. row finalization and the write guard
//!
//! Every repair that changes a field is recorded in the candidate ledger.
//! Normalizing an already normalized record returns it unchanged.

use std::sync::LazyLock;

use regex::Regex;

use super::address::{
    clean_address_strict, find_addresses, has_state_and_street, has_state_code, looks_like_address,
    normalize_address, normalize_us_address, pick_best_address, scrub_address, upgrade_with_state_zip,
};
use super::contact::{clean_email, clean_phone, correct_ny_phone, normalize_email};
use super::generic::extract_petitioner_address;
use super::lexicon::STATE_CODE_ALT;
use super::money::{collect_zips, largest_plain_number, needs_property_value, normalize_property_value, MoneyScan};
use super::names::strict_clean_name;
use super::relationship::is_allowed;
use super::sanitize::{finalize_row, is_placeholder, petitioner_from_blocks, sanitize_row, sanitize_value, strip_boilerplate};
use super::text::contains_ci;
use super::types::{CandidateLedger, Field, FieldRecord};
use super::SegmentInput;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// Street, city and state in one run without commas.
static LOOSE_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"(?i)\b\d{{1,6}}\s+[A-Za-z0-9 .'-]+?\s+[A-Za-z .'-]+,?\s+(?:{STATE_CODE_ALT})\s+\d{{5}}(?:-\d{{4}})?"
    ))
});
static STREET_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b\d{1,6}\s+[A-Za-z0-9 .'-]+?(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Boulevard|Blvd|Court|Ct|Place|Pl|Way)\b")
});
static EMAIL_EXACT_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$"));

const ADDRESS_FIELDS: [Field; 2] = [Field::DeceasedPropertyAddress, Field::PetitionerAddress];
const NAME_FIELDS: [Field; 3] = [Field::DeceasedName, Field::PetitionerName, Field::Attorney];

/// Result of normalizing one case.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub record: FieldRecord,
    /// Empty fields after normalization, in column order.
    pub missing: Vec<Field>,
    /// Validation codes raised along the way.
    pub warnings: Vec<String>,
}

/// Full address formatting chain used for every address column.
pub fn canonical_address(raw: &str) -> String {
    scrub_address(&clean_address_strict(&normalize_us_address(&normalize_address(raw))))
}

/// Step 1: cleanup and shape checks on every field.
pub fn normalize_fields(record: &FieldRecord, floor: f64) -> FieldRecord {
    let mut out = FieldRecord::new();
    for (field, value) in record.iter() {
        let value = strip_boilerplate(&sanitize_value(value));
        if !is_placeholder(field, &value) {
            out.set(field, value);
        }
    }
    for field in ADDRESS_FIELDS {
        let addr = normalize_us_address(&normalize_address(out.get(field)));
        let addr = if looks_like_address(&addr) { addr } else { String::new() };
        out.set(field, addr);
    }
    let email = normalize_email(out.get(Field::EmailAddress), &[]);
    out.set(Field::EmailAddress, email);
    let phone = clean_phone(out.get(Field::PhoneNumber));
    out.set(Field::PhoneNumber, phone);
    let value = normalize_property_value(out.get(Field::PropertyValue), floor);
    out.set(Field::PropertyValue, value);
    out
}

/// Wider page groupings searched when an email value is broken.
fn email_scopes(pages: &[String]) -> Vec<String> {
    let mut scopes = Vec::new();
    if let Some(last) = pages.last() {
        scopes.push(last.clone());
        if pages.len() >= 2 {
            scopes.push(pages[pages.len() - 2..].join(" "));
        }
        scopes.push(pages.join(" "));
    }
    scopes
}

/// Step 2: strict formatting of addresses, contacts and names.
pub fn clean_record(record: &FieldRecord, pages: &[String]) -> FieldRecord {
    let mut out = record.clone();
    for field in ADDRESS_FIELDS {
        let addr = canonical_address(out.get(field));
        out.set(field, addr);
    }
    let email = clean_email(&normalize_email(out.get(Field::EmailAddress), &email_scopes(pages)));
    out.set(Field::EmailAddress, email);
    let phone = clean_phone(out.get(Field::PhoneNumber));
    out.set(Field::PhoneNumber, phone);
    for field in NAME_FIELDS {
        let name = strict_clean_name(out.get(field));
        out.set(field, name);
    }
    out
}

/// Step 4: keep a valid value, otherwise rescan the pages by keyword
/// window, then fall back to the largest plain number. ZIPs never count.
pub fn enforce_property_value(
    record: &mut FieldRecord,
    pages: &[String],
    scan: MoneyScan,
    ledger: &mut CandidateLedger,
) {
    let zips = collect_zips(ADDRESS_FIELDS.iter().map(|f| record.get(*f)), pages);
    if !needs_property_value(record.get(Field::PropertyValue), &zips, scan.floor) {
        return;
    }
    let rescanned = normalize_property_value(&scan.scan(pages, &zips), scan.floor);
    if !rescanned.is_empty() {
        ledger.accept(Field::PropertyValue, "fallback_rescan", rescanned.as_str(), 120);
        record.set(Field::PropertyValue, rescanned);
    }
    if needs_property_value(record.get(Field::PropertyValue), &zips, scan.floor) {
        let largest = largest_plain_number(pages, &zips, scan.floor);
        if !largest.is_empty() {
            ledger.accept(Field::PropertyValue, "largest_plain_number", largest.as_str(), 50);
        } else if !record.is_blank(Field::PropertyValue) {
            ledger.adjust(Field::PropertyValue, "value_enforcement", "", "below_floor_or_zip");
        }
        record.set(Field::PropertyValue, largest);
    }
}

/// Search the whole segment for a complete petitioner address.
pub fn rescan_petitioner_address(text: &str, pages: &[String]) -> String {
    let mut candidates = Vec::new();
    let generic = extract_petitioner_address(text);
    if !generic.is_empty() {
        candidates.push(generic);
    }
    for page in pages {
        candidates.extend(find_addresses(page));
    }
    let options: Vec<String> = candidates
        .iter()
        .map(|cand| {
            let addr = canonical_address(cand);
            if !addr.is_empty() && !has_state_code(&addr) {
                canonical_address(&upgrade_with_state_zip(&addr, pages))
            } else {
                addr
            }
        })
        .filter(|a| !a.is_empty())
        .collect();
    let best = pick_best_address(&options);
    if has_state_and_street(&best) {
        return best;
    }
    if let Some(found) = options.iter().find(|a| has_state_and_street(a)) {
        return found.clone();
    }

    let combined = pages.join(" ").replace(" New York ", " NY ");
    for m in LOOSE_ADDRESS_RE.find_iter(&combined) {
        let addr = canonical_address(m.as_str());
        if has_state_and_street(&addr) {
            return addr;
        }
    }

    let combined = pages.join(" ");
    let staten = contains_ci(&combined, "staten");
    for m in STREET_ONLY_RE.find_iter(&combined) {
        let candidate = if staten {
            format!("{}, Staten Island", m.as_str())
        } else {
            m.as_str().to_string()
        };
        let addr = canonical_address(&upgrade_with_state_zip(&candidate, pages));
        if has_state_and_street(&addr) {
            return addr;
        }
    }
    String::new()
}

/// Step 5: both address columns must carry a street number and a state.
fn enforce_addresses(record: &mut FieldRecord, input: &SegmentInput<'_>, ledger: &mut CandidateLedger) {
    if !has_state_and_street(record.get(Field::PetitionerAddress)) {
        let rescanned = rescan_petitioner_address(input.text, input.pages);
        if rescanned.is_empty() {
            if !record.is_blank(Field::PetitionerAddress) {
                ledger.adjust(Field::PetitionerAddress, "address_enforcement", "", "no_state_or_street");
            }
        } else {
            ledger.accept(Field::PetitionerAddress, "fallback_rescan", rescanned.as_str(), 105);
        }
        record.set(Field::PetitionerAddress, rescanned);
    }

    let deceased = record.get(Field::DeceasedPropertyAddress);
    if !deceased.is_empty() && !has_state_and_street(deceased) {
        let upgraded = canonical_address(&upgrade_with_state_zip(deceased, input.pages));
        if has_state_and_street(&upgraded) {
            ledger.adjust(Field::DeceasedPropertyAddress, "state_zip_upgrade", upgraded.as_str(), "missing_state");
            record.set(Field::DeceasedPropertyAddress, upgraded);
        } else {
            ledger.adjust(Field::DeceasedPropertyAddress, "address_enforcement", "", "no_state_or_street");
            record.clear(Field::DeceasedPropertyAddress);
        }
    }
}

/// Step 6: Relationship is always an allow-listed value, and a set
/// Relationship earns the petitioner one more block scan.
fn enforce_required(record: &mut FieldRecord, text: &str, ledger: &mut CandidateLedger, warnings: &mut Vec<String>) {
    if !is_allowed(record.get(Field::Relationship)) {
        if !record.is_blank(Field::Relationship) {
            ledger.adjust(Field::Relationship, "allow_list", "", "not_allowed");
        }
        record.clear(Field::Relationship);
    }
    if record.is_blank(Field::Relationship) {
        ledger.accept(Field::Relationship, "relationship_required", "Unknown", 1);
        record.set(Field::Relationship, "Unknown");
    }
    if record.is_blank(Field::PetitionerName) {
        let fallback = petitioner_from_blocks(text);
        if fallback.is_empty() {
            warnings.push("VALIDATION_FAIL:Petitioner Name empty with relationship set".to_string());
        } else {
            ledger.accept(Field::PetitionerName, "fallback_relationship_guard", fallback.as_str(), 95);
            record.set(Field::PetitionerName, fallback);
        }
    }

    let email = record.get(Field::EmailAddress);
    if !email.is_empty() && !EMAIL_EXACT_RE.is_match(email) {
        let cleaned = clean_email(email);
        warnings.push(format!("VALIDATION_FAIL:Email Address:{email}->{cleaned}"));
        record.set(Field::EmailAddress, cleaned);
    }
}

/// Run the whole normalization chain over one extracted record.
pub fn normalize_record(
    record: &FieldRecord,
    input: &SegmentInput<'_>,
    source_name: &str,
    ledger: &mut CandidateLedger,
) -> Normalized {
    let config = input.config;
    let mut warnings = Vec::new();
    let mut out = clean_record(&normalize_fields(record, config.money_floor), input.pages);

    if config.ny_phone_repair {
        if let Some((phone, reason)) = correct_ny_phone(out.get(Field::PhoneNumber), input.pages) {
            ledger.adjust(Field::PhoneNumber, "ny_area_code", phone.as_str(), reason);
            out.set(Field::PhoneNumber, phone);
        }
    }

    let scan = MoneyScan {
        floor: config.money_floor,
        window: config.money_window,
    };
    enforce_property_value(&mut out, input.pages, scan, ledger);
    enforce_addresses(&mut out, input, ledger);
    enforce_required(&mut out, input.text, ledger, &mut warnings);

    let (finalized, row_warnings) = finalize_row(&out, input.text, source_name);
    warnings.extend(row_warnings);
    let record = sanitize_row(&finalized);
    let missing = record.missing();

    tracing::debug!(
        source = source_name,
        missing = missing.len(),
        warnings = warnings.len(),
        "record normalized"
    );
    for w in &warnings {
        ledger.warn(w.as_str());
    }
    Normalized {
        record,
        missing,
        warnings,
    }
}

/// Column names of the empty fields.
pub fn missing_names(missing: &[Field]) -> Vec<String> {
    missing.iter().map(|f| f.as_str().to_string()).collect()
}
