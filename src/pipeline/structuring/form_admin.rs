//! Administration petition (A-1) extractor.
//!
//! The A-1 layout is regular: section 1 holds the petitioner information,
//! section 2 the decedent information, and the last page carries the
//! attorney signature block. Each field is a single cascade; no
//! cross-strategy ranking is needed.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::address::{assemble_address, clean_address_strict, find_addresses, normalize_state, pick_best_address};
use super::contact::{extract_email, extract_phone, format_phone};
use super::lexicon::{ROLE_BLACKLIST, ROLE_WORDS, STATE_ALT};
use super::money::{collect_zips, inflation_guard, parse_money};
use super::names::{clean_labeled_name, is_label_noise, validate_person_name};
use super::relationship::{best_match, canonical_relationship, is_allowed};
use super::text::{around, lower, nonblank_lines, section_one, slice_from};
use super::types::{CandidateLedger, CandidateStatus, Field, FieldRecord, Outcome, Scored};
use super::{ExtractionError, FieldExtractor, SegmentInput};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

const ZIP: &str = r"\d{5}(?:-\d{4})?";

static STATE_ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)({STATE_ALT})\s+({ZIP})")));
static CITY_STATE_ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)([A-Za-z .'-]+),?\s*({STATE_ALT})\s+({ZIP})")));
static INLINE_CITY_STATE_ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)([A-Za-z .'-]+)\s+({STATE_ALT})\s+({ZIP})")));
static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\d"));
static CITY_WORD_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)city|village|town"));
static STATEN_ISLAND_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)staten\s+island"));
static NY_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bny\b|new york"));
static DOMICILE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)domicile[:\s]+"));
static DOMICILE_COLON_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)^domicile\s*:"));

const STREET_HINTS: &[&str] = &[
    "road", "rd", "street", "st ", "ave", "avenue", "blvd", "ln", "lane", "court", "dr",
];
const NOT_A_CITY: &[&str] = &[
    "county",
    "state",
    "zip",
    "country",
    "name",
    "citizenship",
    "date of death",
    "place of death",
];

fn could_be_city(line: &str) -> bool {
    let low = lower(line);
    !DIGIT_RE.is_match(line) && !NOT_A_CITY.iter().any(|k| low.contains(k))
}

/// Street, city, state and ZIP from the eleven lines after `label`.
/// A Staten Island line wins over a city caption; a bare New York state and
/// ZIP imply Staten Island.
pub fn address_under_label(page: &str, label: &str) -> String {
    let lines = nonblank_lines(page);
    let label = lower(label);
    for (idx, line) in lines.iter().enumerate() {
        if !lower(line).contains(&label) {
            continue;
        }
        let section = &lines[idx + 1..(idx + 12).min(lines.len())];
        let street_at = section.iter().position(|cand| {
            let low = lower(cand);
            DIGIT_RE.is_match(cand) && (cand.contains(',') || STREET_HINTS.iter().any(|k| low.contains(k)))
        });
        let street = street_at.map(|i| section[i]).unwrap_or("");
        let after_street = street_at.map_or(0, |i| i + 1);

        let staten = section
            .iter()
            .find(|c| c.trim().eq_ignore_ascii_case("staten island"))
            .map(|_| "Staten Island".to_string());
        let mut city = section[after_street..]
            .iter()
            .chain(section.iter())
            .find(|c| could_be_city(c))
            .map(|c| c.to_string())
            .unwrap_or_default();
        if city.is_empty() || CITY_WORD_RE.is_match(&city) {
            if let Some(s) = &staten {
                city = s.clone();
            }
        }
        let (mut state, mut zip) = (String::new(), String::new());
        if let Some(c) = section.iter().find_map(|cand| STATE_ZIP_RE.captures(cand)) {
            state = c[1].to_string();
            zip = c[2].to_string();
        }
        if city.is_empty() && !zip.is_empty() && matches!(lower(&state).as_str(), "ny" | "new york") {
            city = "Staten Island".to_string();
        }
        let addr = assemble_address(street, &city, &state, &zip);
        if !addr.is_empty() {
            return addr;
        }
    }
    String::new()
}

// ═══════════════════════════════════════════
// Names
// ═══════════════════════════════════════════

static ESTATE_OF_PG1_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?is)administration proceeding.*?estate of\s+([A-Z .'-]+?)(?:\s+administration|$)")
});
static DECEDENT_INFO_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)decedent information:.*?name\s+([A-Z .'-]+)"));
static ESTATE_OF_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)estate of\s+([A-Z .'-]+)"));
static SECTION_TWO_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?s)2\..{0,500}"));
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)name[:\s]+([A-Z .'-]+)"));
static PETITIONER_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)petitioner information.*?name[:\s]+([A-Z .'-]+)"));
static PETITIONER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)petitioner[^\n]{0,120}?name[:\s]+([A-Z .'-]+)"));

fn captured_name(pattern: &Regex, text: &str) -> String {
    pattern
        .captures(text)
        .map(|c| clean_labeled_name(&c[1]))
        .unwrap_or_default()
}

/// Gate a cleaned name: 2 to 4 real name tokens and no form label.
fn person_outcome(name: String) -> Outcome {
    if name.is_empty() {
        return Outcome::Missing;
    }
    if is_label_noise(&name) || !validate_person_name(&name) {
        return Outcome::Rejected { value: name, reason: "invalid_name" };
    }
    Outcome::Found(name)
}

/// Section 1 of page 1, or the whole page when the section markers are
/// missing.
fn section_one_scope(page1: &str) -> &str {
    section_one(page1).unwrap_or(page1)
}

fn deceased_name(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) -> String {
    let page1 = input.first_page();
    let mut c = ledger.cascade(Field::DeceasedName);
    c.attempt("estate_of_pg1", 100, || {
        person_outcome(captured_name(&ESTATE_OF_PG1_RE, page1))
    });
    for (idx, page) in input.pages.iter().enumerate() {
        if c.is_settled() {
            break;
        }
        c.attempt(&format!("decedent_info_pg{}", idx + 1), 90, || {
            person_outcome(captured_name(&DECEDENT_INFO_RE, page))
        });
    }
    c.attempt("estate_of_text", 80, || {
        person_outcome(captured_name(&ESTATE_OF_RE, input.text))
    })
    .attempt("section2_name", 75, || {
        SECTION_TWO_RE.find(page1).map_or(Outcome::Missing, |m| {
            person_outcome(captured_name(&NAME_RE, m.as_str()))
        })
    });
    c.resolve()
}

fn petitioner_name(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) -> String {
    let page1 = input.first_page();
    let scope = section_one_scope(page1);
    let lines = nonblank_lines(scope);
    let mut c = ledger.cascade(Field::PetitionerName);
    c.attempt("petitioner_block_pg1", 110, || {
        let name = captured_name(&PETITIONER_BLOCK_RE, page1);
        if lower(&name).contains("citizenship") {
            return Outcome::Rejected { value: name, reason: "label_noise" };
        }
        person_outcome(name)
    })
    .attempt("petitioner_scope_pg1", 100, || {
        let name = captured_name(&PETITIONER_NAME_RE, scope);
        if name.is_empty() {
            person_outcome(captured_name(&NAME_RE, scope))
        } else {
            person_outcome(name)
        }
    })
    .attempt("petitioner_block_scan", 105, || {
        let Some(start) = lines
            .iter()
            .position(|l| lower(l).contains("petitioner information"))
        else {
            return Outcome::Missing;
        };
        let found = lines.iter().skip(start + 1).take(5).find_map(|cand| {
            let low = lower(cand);
            if low.contains("citizenship") || low.contains("name") {
                return None;
            }
            Some(clean_labeled_name(cand)).filter(|n| !n.is_empty())
        });
        person_outcome(found.unwrap_or_default())
    })
    .attempt("petitioner_line_scan", 90, || {
        let found = lines
            .iter()
            .filter(|l| lower(l).contains("name:"))
            .map(|l| clean_labeled_name(&NAME_LABEL_STRIP_RE.replace_all(l, "")))
            .find(|n| !n.is_empty());
        person_outcome(found.unwrap_or_default())
    });
    c.resolve()
}

static NAME_LABEL_STRIP_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)name[:\s]+"));

// ═══════════════════════════════════════════
// Relationship
// ═══════════════════════════════════════════

static INTEREST_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?is)interest of petitioner.*?distributee of decedent.*?relationship[^A-Za-z]{0,10}([A-Za-z]+)")
});
static LABELED_REL_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)relationship[^A-Za-z]{0,20}(spouse|husband|wife|son|daughter|child|mother|father|sister|brother|niece|nephew|grandchild|grandson|granddaughter)")
});
static SCOPE_OPTION_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        "Spouse", "Husband", "Wife", "Son", "Daughter", "Child", "Mother", "Father", "Sister", "Brother",
    ]
    .into_iter()
    .map(|opt| (opt, re(&format!(r"(?i)\b{opt}\b"))))
    .collect()
});

/// The interest line of section 1, the highest-priority kinship word
/// anywhere in section 1, then a labeled relationship on any page.
fn relationship(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) -> String {
    let scope = section_one_scope(input.first_page());
    let mut c = ledger.cascade(Field::Relationship);
    c.attempt("petitioner_interest_pg1", 100, || {
        let Some(cap) = INTEREST_RE.captures(scope) else {
            return Outcome::Missing;
        };
        let rel = canonical_relationship(&cap[1]);
        if ROLE_BLACKLIST.contains(&lower(&rel).as_str()) || !is_allowed(&rel) {
            return Outcome::Rejected { value: rel, reason: "not_allow_listed" };
        }
        Outcome::Found(rel)
    })
    .attempt("petitioner_interest_scan", 80, || {
        best_match(scope, &SCOPE_OPTION_RES).map(canonical_relationship)
    })
    .attempt("labeled_relationship", 70, || {
        input
            .pages
            .iter()
            .find_map(|page| LABELED_REL_RE.captures(page))
            .map(|cap| canonical_relationship(&cap[1]))
    })
    .attempt("fallback_default", 1, || "Unknown".to_string());
    c.resolve()
}

// ═══════════════════════════════════════════
// Addresses
// ═══════════════════════════════════════════

static MY_DOMICILE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)my domicile is[:\s]+([A-Z0-9 .,'/-]+)"));
static DOMICILE_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)domicile:\s*([^\n]+)\n([^\n]+)?\n?([^\n]+)?"));
/// State and ZIP not followed by more digits, so phone numbers are skipped.
static STATE_ZIP_STRICT_RE: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)({STATE_ALT})\s+(\d{{5}})(?:\D|$)")));
static ZIP5_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\b(\d{5})\b"));

/// Address parts accumulated while walking section lines.
#[derive(Debug, Default)]
struct AddressParts {
    street: String,
    city: String,
    state: String,
    zip: String,
}

impl AddressParts {
    fn fill_from(&mut self, caps: &regex::Captures<'_>) {
        if self.city.is_empty() {
            self.city = caps[1].trim().to_string();
        }
        if self.state.is_empty() {
            self.state = caps[2].to_string();
        }
        if self.zip.is_empty() {
            self.zip = caps[3].to_string();
        }
    }

    fn needs_state_or_zip(&self) -> bool {
        self.state.is_empty() || self.zip.is_empty()
    }

    /// Take a `street, city` domicile value apart.
    fn split_domicile(&mut self, raw: &str) {
        match raw.split_once(',') {
            Some((street, city)) => {
                self.street = street.trim().to_string();
                self.city = city.trim().to_string();
            }
            None if !raw.is_empty() => self.street = raw.to_string(),
            None => {}
        }
    }

    fn assemble(&self) -> String {
        assemble_address(&self.street, &self.city, &self.state, &self.zip)
    }
}

/// The "Domicile:" line on page 1 and the two lines under it.
fn domicile_block(page1: &str) -> Option<String> {
    let dom = DOMICILE_LINES_RE.captures(page1)?;
    let part = |i: usize| dom.get(i).map_or("", |m| m.as_str());
    let (street_line, line2, line3) = (part(1), part(2), part(3));
    let mut parts = AddressParts {
        street: street_line.to_string(),
        ..AddressParts::default()
    };
    if STATEN_ISLAND_RE.is_match(street_line) || STATEN_ISLAND_RE.is_match(line2) {
        parts.city = "Staten Island".to_string();
    }
    if let Some(c) = [line2, line3, street_line]
        .iter()
        .find_map(|ln| STATE_ZIP_STRICT_RE.captures(ln))
    {
        parts.state = normalize_state(&c[1]);
        parts.zip = c[2].to_string();
    }
    if parts.needs_state_or_zip() {
        let end = dom.get(0).map_or(0, |m| m.end());
        let window = slice_from(page1, end, 220);
        if let Some(c) = STATE_ZIP_STRICT_RE.captures(window) {
            if parts.state.is_empty() {
                parts.state = normalize_state(&c[1]);
            }
            if parts.zip.is_empty() {
                parts.zip = c[2].to_string();
            }
        }
    }
    let cleaned = clean_address_strict(&parts.assemble());
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Walk section 1 lines for the first numbered domicile line plus a
/// city/state/ZIP row.
fn petitioner_info_lines(scope: &str) -> Option<String> {
    let lines = nonblank_lines(scope);
    let mut parts = AddressParts::default();
    for (idx, line) in lines.iter().enumerate() {
        if lower(line).starts_with("domicile")
            && parts.street.is_empty()
            && DOMICILE_COLON_RE.is_match(line)
            && DIGIT_RE.is_match(line)
        {
            let raw = DOMICILE_PREFIX_RE.replace(line, "").to_string();
            if raw.trim_start().starts_with(|c: char| c.is_ascii_digit()) {
                parts.split_domicile(&raw);
                let window = lines[idx + 1..(idx + 5).min(lines.len())].join(" ");
                if let Some(c) = CITY_STATE_ZIP_RE.captures(&window) {
                    parts.fill_from(&c);
                }
            }
        }
        if parts.street.is_empty() && DIGIT_RE.is_match(line) && line.contains(',') {
            parts.street = line.to_string();
        }
        if parts.needs_state_or_zip() {
            if let Some(c) = INLINE_CITY_STATE_ZIP_RE.captures(line) {
                parts.fill_from(&c);
            }
        }
    }
    if parts.zip.is_empty() {
        if let Some(c) = ZIP5_RE.captures(scope) {
            parts.zip = c[1].to_string();
        }
    }
    if parts.city.is_empty() && STATEN_ISLAND_RE.is_match(scope) {
        parts.city = "Staten Island".to_string();
    }
    let addr = parts.assemble();
    if addr.is_empty() {
        return None;
    }
    let cleaned = clean_address_strict(&addr);
    (!cleaned.is_empty()).then_some(cleaned)
}

fn first_detected(text: &str) -> Option<String> {
    let first = find_addresses(text).into_iter().next()?;
    let cleaned = clean_address_strict(&first);
    (!cleaned.is_empty()).then_some(cleaned)
}

fn petitioner_address(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) -> String {
    let page1 = input.first_page();
    let my_domicile = input.pages.iter().enumerate().find_map(|(idx, page)| {
        let c = MY_DOMICILE_RE.captures(page)?;
        let cleaned = clean_address_strict(&assemble_address(&c[1], "", "", ""));
        (!cleaned.is_empty()).then(|| Scored::new(cleaned, format!("my_domicile_pg{}", idx + 1), 115))
    });
    let mut c = ledger.cascade(Field::PetitionerAddress);
    c.attempt_scored(|| my_domicile)
        .attempt("petitioner_domicile_block", 120, || domicile_block(page1))
        .attempt("petitioner_block_pg1", 110, || {
            clean_address_strict(&address_under_label(page1, "Petitioner Information"))
        })
        .attempt("petitioner_info_lines", 100, || petitioner_info_lines(section_one_scope(page1)))
        .attempt("petitioner_best_detected", 80, || first_detected(page1));
    c.resolve()
}

/// Decedent domicile lines from section 2 onward.
fn decedent_info_lines(scope: &str) -> Option<String> {
    let lines = nonblank_lines(scope);
    let mut parts = AddressParts::default();
    for (idx, line) in lines.iter().enumerate() {
        if lower(line).starts_with("domicile") {
            let raw = DOMICILE_PREFIX_RE.replace(line, "").to_string();
            parts.split_domicile(&raw);
            let window = lines[idx + 1..(idx + 5).min(lines.len())].join(" ");
            if let Some(c) = CITY_STATE_ZIP_RE.captures(&window) {
                parts.fill_from(&c);
            }
            if let Some(c) = STATE_ZIP_RE.captures(&window) {
                if parts.state.is_empty() {
                    parts.state = c[1].to_string();
                }
                if parts.zip.is_empty() {
                    parts.zip = c[2].to_string();
                }
            }
        }
        if parts.needs_state_or_zip() {
            if let Some(c) = INLINE_CITY_STATE_ZIP_RE.captures(line) {
                parts.fill_from(&c);
            }
        }
    }
    if parts.city.is_empty() && STATEN_ISLAND_RE.is_match(scope) {
        parts.city = "Staten Island".to_string();
    }
    if parts.state.is_empty() && NY_RE.is_match(scope) {
        parts.state = "NY".to_string();
    }
    let addr = parts.assemble();
    if addr.is_empty() {
        return None;
    }
    let cleaned = clean_address_strict(&addr);
    (!cleaned.is_empty()).then_some(cleaned)
}

fn deceased_address(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) -> String {
    let block = input.pages.iter().enumerate().find_map(|(idx, page)| {
        if !lower(page).contains("decedent information") {
            return None;
        }
        let addr = address_under_label(page, "Decedent Information");
        (!addr.is_empty()).then(|| Scored::new(addr, format!("decedent_block_pg{}", idx + 1), 105))
    });
    let first_two = input.pages.iter().take(2).cloned().collect::<Vec<_>>().join("\n");
    let scope = match first_two.find("2.") {
        Some(pos) => &first_two[pos..],
        None => first_two.as_str(),
    };
    let mut c = ledger.cascade(Field::DeceasedPropertyAddress);
    c.attempt_scored(|| block)
        .attempt("decedent_info_lines", 100, || decedent_info_lines(scope))
        .attempt("decedent_best_detected", 80, || first_detected(scope));
    c.resolve()
}

// ═══════════════════════════════════════════
// Property value
// ═══════════════════════════════════════════

static MONEY_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\$?\s*([0-9]{1,3}(?:,[0-9]{3})+(?:\.\d{2})?|[1-9]\d{3,7}(?:\.\d{2})?)")
});
static IMPROVED_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bimproved[^$\d]{0,40}\$?\s*([0-9,]+(?:\.\d{2})?)"));
static UNIMPROVED_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)unimproved[^$\d]{0,40}\$?\s*([0-9,]+(?:\.\d{2})?)"));
static PERSONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)personal\s+property[^$\d]{0,40}\$?\s*([0-9,]+(?:\.\d{2})?)"));

const BAD_KW: &[&str] = &[
    "filing fee",
    "receipt",
    "bond",
    "greater than",
    "less than",
    "prelim",
    "cert",
    "certificate",
    "surcharge",
    "fee cap",
];
const GOOD_KW: &[&str] = &[
    "gross",
    "estate",
    "total",
    "approximate",
    "property",
    "real property",
    "approximate value",
    "assets",
];

fn amount(raw: &str) -> f64 {
    parse_money(raw).unwrap_or(0.0)
}

/// A labeled amount whose digits read `3` then `55...` carries a stray
/// leading 3 from the dollar sign.
fn strip_leading_three(raw: &str) -> Option<f64> {
    let digits: String = raw.chars().filter(|c| *c != ',' && *c != '$').collect();
    let rest = digits.strip_prefix('3')?;
    if !rest.starts_with("55") {
        return None;
    }
    rest.parse::<f64>().ok()
}

/// The value chosen so far and the step that chose it.
struct ValuePick<'l> {
    ledger: &'l mut CandidateLedger,
    current: Option<Scored>,
}

impl ValuePick<'_> {
    fn value(&self) -> f64 {
        self.current.as_ref().map_or(0.0, |s| amount(&s.value))
    }

    /// Replace the pick, keeping the displaced value in the audit trail.
    fn set(&mut self, value: f64, source: &str, score: i32) {
        if let Some(prev) = self.current.take() {
            self.ledger
                .push(Field::PropertyValue, prev.source, prev.value, prev.score, CandidateStatus::Candidate, "replaced");
        }
        self.current = Some(Scored::new(format!("{value:.0}"), source, score));
    }
}

/// Page 2 amounts scored by context, then labeled real and personal
/// property lines, then guards against OCR-inflated values. Amounts equal
/// to a ZIP of the resolved addresses are ignored.
fn property_value(input: &SegmentInput<'_>, zips: &HashSet<String>, ledger: &mut CandidateLedger) -> Option<Scored> {
    let config = input.config;
    let floor = config.money_floor;
    let page2 = if input.pages.len() > 1 { input.page(1) } else { input.first_page() };

    let mut all_amounts = Vec::new();
    let mut context: Vec<(f64, i32)> = Vec::new();
    for c in MONEY_TOKEN_RE.captures_iter(page2) {
        let (Some(whole), Some(raw)) = (c.get(0), c.get(1)) else { continue };
        if zips.contains(raw.as_str()) {
            continue;
        }
        let window = lower(around(page2, whole.start(), whole.end(), 60, 60));
        if BAD_KW.iter().any(|b| window.contains(b)) {
            continue;
        }
        let amt = amount(raw.as_str());
        all_amounts.push(amt);
        if amt >= floor {
            let score = 15 * GOOD_KW.iter().filter(|k| window.contains(*k)).count() as i32;
            context.push((amt, score));
        }
    }

    let labeled: Vec<(&str, f64, String)> = [
        ("improved", &*IMPROVED_RE),
        ("unimproved", &*UNIMPROVED_RE),
        ("personal", &*PERSONAL_RE),
    ]
    .into_iter()
    .filter_map(|(tag, pattern)| {
        let raw = pattern.captures(page2)?.get(1)?.as_str().to_string();
        let val = amount(&raw);
        (val > 0.0).then_some((tag, val, raw))
    })
    .collect();

    let mut pick = ValuePick { ledger, current: None };
    let mut chosen_raw = None;
    if let Some((best, _)) = context
        .iter()
        .copied()
        .max_by(|a, b| (a.1, a.0).partial_cmp(&(b.1, b.0)).unwrap_or(Ordering::Equal))
    {
        pick.set(best, "context_scored", 98);
    }
    if pick.value() == 0.0 {
        if let Some((tag, val, raw)) = labeled
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        {
            pick.set(*val, &format!("{tag}_real_property"), 95);
            chosen_raw = Some(raw.clone());
        }
    }
    if pick.value() == 0.0 {
        if let Some(max) = all_amounts.iter().copied().filter(|a| *a >= floor).reduce(f64::max) {
            pick.set(max, "max_amount_scan", 90);
        }
    }
    if let Some(fixed) = chosen_raw.as_deref().and_then(strip_leading_three) {
        if fixed < pick.value() && fixed >= floor {
            pick.set(fixed, "leading_digit_noise", 88);
        }
    }
    let value = pick.value();
    let pool: Vec<f64> = all_amounts
        .iter()
        .copied()
        .filter(|a| *a < value)
        .chain(std::iter::once(value))
        .collect();
    if let Some(smaller) = inflation_guard(&pool, config.inflation_ratio, config.inflation_guard_min, floor) {
        pick.set(smaller, "ocr_inflation_guard", 85);
    }
    if pick.value() < floor {
        if let Some(big) = labeled.iter().map(|(_, v, _)| *v).filter(|v| *v >= floor).reduce(f64::max) {
            pick.set(big, "small_replaced_by_labeled", 88);
        }
    }
    if pick.value() == 0.0 {
        if let Some((_, personal, _)) = labeled.iter().find(|(tag, _, _)| *tag == "personal") {
            pick.set(*personal, "personal_property_only", 75);
        }
    }
    pick.current
}

// ═══════════════════════════════════════════
// Attorney and contact
// ═══════════════════════════════════════════

static PRINT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)Print Name of Attorney[:\s]*([A-Z .,'/|-]+)"));
static ESQ_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)esq\.?"));
static LOOSE_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(\(?[0-9]{3}\)?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4})"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)([A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,})"));

fn attorney_outcome(name: String, with_esq: bool) -> Outcome {
    if name.is_empty() {
        return Outcome::Missing;
    }
    if is_label_noise(&name) || ROLE_WORDS.contains(&lower(&name).as_str()) || !validate_person_name(&name) {
        return Outcome::Rejected { value: name, reason: "label_noise" };
    }
    if with_esq && !lower(&name).ends_with("esq") {
        return Outcome::Found(format!("{name}, Esq."));
    }
    Outcome::Found(name)
}

fn attorney(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) -> String {
    let last = input.last_page();
    let mut c = ledger.cascade(Field::Attorney);
    c.attempt("print_name_of_attorney", 100, || {
        let Some(cap) = PRINT_NAME_RE.captures(last) else {
            return Outcome::Missing;
        };
        let raw = &cap[1];
        let with_esq = ESQ_RE.is_match(raw);
        let name = clean_labeled_name(&ESQ_RE.replace_all(raw, "").replace('|', " "));
        attorney_outcome(name, with_esq)
    });
    for line in last.lines().filter(|l| lower(l).contains("esq")) {
        if c.is_settled() {
            break;
        }
        c.attempt("esq_line_last_page", 90, || {
            attorney_outcome(clean_labeled_name(&ESQ_RE.replace_all(line, "")), false)
        });
    }
    c.resolve()
}

fn last_page_phone(last: &str) -> Option<String> {
    let raw = LOOSE_PHONE_RE.captures(last)?;
    let digits: String = raw[1].chars().filter(char::is_ascii_digit).collect();
    (digits.len() == 10).then(|| format_phone(&digits))
}

/// Extractor for the administration petition template.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdminExtractor;

impl FieldExtractor for AdminExtractor {
    fn name(&self) -> &'static str {
        "administration"
    }

    fn extract(
        &self,
        input: &SegmentInput<'_>,
        ledger: &mut CandidateLedger,
    ) -> Result<FieldRecord, ExtractionError> {
        deceased_name(input, ledger);
        let petitioner = petitioner_name(input, ledger);
        relationship(input, ledger);
        let decedent_addr = deceased_address(input, ledger);
        let petitioner_addr = petitioner_address(input, ledger);
        let zips = collect_zips([decedent_addr.as_str(), petitioner_addr.as_str()], &[]);
        let value = property_value(input, &zips, ledger);
        ledger.cascade(Field::PropertyValue).attempt_scored(|| value);

        let has_attorney = !attorney(input, ledger).is_empty();
        let last = input.last_page();
        let mut phone = ledger.cascade(Field::PhoneNumber);
        if has_attorney {
            phone.attempt("last_page_phone", 100, || last_page_phone(last));
        }
        phone.attempt("generic_fallback", 10, || extract_phone(input.text));
        let mut email = ledger.cascade(Field::EmailAddress);
        if has_attorney {
            email.attempt("last_page_email", 100, || {
                EMAIL_RE.captures(last).map(|c| lower(&c[1]))
            });
        }
        email.attempt("generic_fallback", 10, || extract_email(input.text));

        for field in [Field::DeceasedPropertyAddress, Field::PetitionerAddress] {
            let low = lower(&ledger.resolve(field));
            if low.contains("jointly held") || low.contains("assets") {
                ledger.adjust(field, "instruction_guard", "", "instruction_text");
            }
        }
        if ledger.resolve(Field::PetitionerAddress).is_empty() && !petitioner.is_empty() {
            let best = pick_best_address(&find_addresses(input.first_page()));
            ledger.cascade(Field::PetitionerAddress).attempt("page1_best_address", 10, || best);
        }

        for field in [Field::DeceasedName, Field::PetitionerName, Field::Relationship] {
            if ledger.resolve(field).is_empty() {
                ledger.warn(format!("missing_required: {field}"));
            }
        }
        Ok(ledger.to_record())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_config::ExtractionConfig;

    fn run(texts: &[&str]) -> (FieldRecord, CandidateLedger) {
        let config = ExtractionConfig::default();
        let pages: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let text = pages.join("\n");
        let input = SegmentInput::new(&text, &pages, &config);
        let mut ledger = CandidateLedger::new();
        let rec = AdminExtractor.extract(&input, &mut ledger).unwrap();
        (rec, ledger)
    }

    const PAGE1: &str = "PETITION FOR LETTERS OF ADMINISTRATION\n\
        ADMINISTRATION PROCEEDING, ESTATE OF ROSE MARIE KELLY\n\
        1. Petitioner Information\n\
        Name: THOMAS KELLY\n\
        Domicile: 88 Bay Street\n\
        Staten Island\n\
        NY 10301\n\
        Interest of Petitioner: Distributee of decedent, relationship: Son\n\
        2. Decedent Information\n";
    const PAGE2: &str = "Decedent Information\n\
        Name ROSE MARIE KELLY\n\
        Domicile: 12 Elm Road\n\
        Staten Island\n\
        NY 10312\n\
        Improved real property $410,000.00\n";
    const PAGE3: &str = "Print Name of Attorney: MARK HALE, ESQ.\n\
        Tel (718) 555-0199\n\
        mhale@halelaw.com\n";

    #[test]
    fn section_one_supplies_petitioner_and_relationship() {
        let (rec, _) = run(&[PAGE1, PAGE2, PAGE3]);
        assert_eq!(rec.get(Field::PetitionerName), "Thomas Kelly");
        assert_eq!(rec.get(Field::Relationship), "Son");
    }

    #[test]
    fn value_ignores_address_zips() {
        let (rec, _) = run(&[PAGE1, PAGE2, PAGE3]);
        assert_eq!(rec.get(Field::PropertyValue), "410000");
    }

    #[test]
    fn attorney_keeps_esq_and_contact() {
        let (rec, _) = run(&[PAGE1, PAGE2, PAGE3]);
        assert_eq!(rec.get(Field::Attorney), "Mark Hale, Esq.");
        assert_eq!(rec.get(Field::PhoneNumber), "718-555-0199");
        assert_eq!(rec.get(Field::EmailAddress), "mhale@halelaw.com");
    }

    #[test]
    fn contact_comes_from_generic_without_attorney() {
        let (rec, ledger) = run(&[PAGE1, "Tel 212 555 0100"]);
        assert_eq!(rec.get(Field::PhoneNumber), "212 555 0100");
        assert_eq!(ledger.best(Field::PhoneNumber).unwrap().source, "generic_fallback");
    }

    #[test]
    fn relationship_never_empty() {
        let (rec, _) = run(&["nothing here"]);
        assert_eq!(rec.get(Field::Relationship), "Unknown");
    }

    #[test]
    fn five_token_petitioner_is_rejected() {
        let (rec, ledger) = run(&["Petitioner Information\nName: John Jacob Jingle Heimer Schmidt"]);
        assert_eq!(rec.get(Field::PetitionerName), "");
        assert!(ledger
            .candidates(Field::PetitionerName)
            .iter()
            .any(|c| c.status == CandidateStatus::Skip && c.reason == "invalid_name"));
    }

    #[test]
    fn decedent_name_must_look_like_a_person() {
        let (rec, _) = run(&["ESTATE OF EXECUTOR SMITH\n2. Name: ROSE KELLY"]);
        assert_eq!(rec.get(Field::DeceasedName), "Rose Kelly");
    }

    #[test]
    fn parent_in_section_one_beats_sibling() {
        let page = "Petitioner is the Mother of decedent; decedent's Brother renounced";
        let (rec, _) = run(&[page]);
        assert_eq!(rec.get(Field::Relationship), "Mother");
    }

    #[test]
    fn leading_three_is_stripped() {
        assert_eq!(strip_leading_three("3550,000"), Some(550000.0));
        assert_eq!(strip_leading_three("450,000"), None);
    }

    #[test]
    fn label_block_implies_staten_island() {
        let page = "Decedent Information\nName ROSE KELLY\n12 Elm Road\nNY 10312";
        assert_eq!(address_under_label(page, "Decedent Information"), "12 Elm Road, Staten Island, NY 10312");
    }
}
