//! Probate petition (P-1) extractor.
//!
//! Each field runs its own cascade over the fixed P-1 layout: the
//! petitioner information block and paragraph 1 on page 1, the decedent
//! block, the distributee tables on the middle pages and the attorney
//! signature block on the last page. Generic strategies close every
//! cascade, and anchored label windows fill what is still missing.

use std::sync::LazyLock;

use regex::Regex;

use super::address::{
    assemble_address, canonical_state_name, clean_address_strict, clean_text,
    find_address_near_keywords, find_addresses, pick_best_address, same_street_with_zip, strip_citizenship,
};
use super::contact::{
    clean_phone, correct_ny_phone, extract_email, extract_phone, find_emails_in_pages,
    format_phone, EMAIL_ANCHORS,
};
use super::generic::{extract_attorney, extract_deceased_name, extract_petitioner};
use super::lexicon::STATE_ALT;
use super::money::parse_money;
use super::names::{
    align_surname, clean_candidate_name, is_label_noise, plausible_name, validate_person_name,
};
use super::relationship::{
    canonical_relationship, extract_relationship, has_rel_word, has_role_term, is_allowed, relationship_in_lines,
    select_ranked, strict_relationship_scan, RankedRelationship,
};
use super::text::{
    around, best_from_candidates, block_after_label, collapse_ws, find_ci, lower, section_one,
    slice_from, split_lines, trim_chars, window_after_labels,
};
use super::types::{CandidateLedger, CandidateStatus, Field, FieldRecord, Scored};
use super::{ExtractionError, FieldExtractor, SegmentInput};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

const ZIP: &str = r"\d{5}(?:-\d{4})?";

// ═══════════════════════════════════════════
// Deceased name
// ═══════════════════════════════════════════

static TAIL_CUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\s+(?:a/k/a|aka|also known|alkia|alk/a|letters|petition|file|deceased)")
});
static WILL_OF_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?im)probate proceeding,?\s*will of[:\s_]+([^\n]+)"));
static WILL_OF_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?im)will of[:\s_]+([^\n]+)"));
static ESTATE_OF_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?im)estate of[:\s_]+([^\n]+)"));
static DECEDENT_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)the name, domicile.*?as\s+follows:(.{0,800})"));
static NAME_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)name[:\s]+([^\n]+)"));
static SECTION_TWO_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)2[^\n]{0,80}?name[:\s]+([^\n]+)"));
static DECEDENT_INFO_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)decedent information[:\s].{0,120}?name[:\s]+([^\n]+)"));
static NAME_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:letters|temporary|petition|file no|deceased)"));
static ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)(?:a/k/a|aka|also known as)\s+([A-Za-z .'-]+)"));
static ALIAS_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)letters|trusteeship|temporary|petition"));
static STRICT_DECEDENT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(?i)estate\s+of[:\s]+([A-Z][A-Za-z ,.'-]{2,})"),
        re(r"(?i)administration\s+proceeding[^\n]{0,40}estate\s+of[:\s]+([A-Z][A-Za-z ,.'-]{2,})"),
        re(r"(?i)probate\s+proceeding[^\n]{0,40}will\s+of[:\s]+([A-Z][A-Za-z ,.'-]{2,})"),
        re(r"(?is)decedent\s+information[^A-Za-z]{0,40}name[:\s]+([A-Z][A-Za-z ,.'-]{2,})"),
    ]
});

fn cut_at(text: &str, pattern: &Regex) -> String {
    match pattern.find(text) {
        Some(m) => text[..m.start()].to_string(),
        None => text.to_string(),
    }
}

fn alpha_count(value: &str) -> usize {
    value.chars().filter(char::is_ascii_alphabetic).count()
}

/// Clean and vet one decedent candidate, recording the outcome. Returns
/// whether it was accepted.
fn add_deceased(ledger: &mut CandidateLedger, raw: &str, source: &str, score: i32) -> bool {
    let cleaned = clean_candidate_name(&cut_at(raw, &NAME_TAIL_RE));
    let cleaned = trim_chars(&cleaned, " )");
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.last().is_some_and(|t| t.chars().count() <= 2) {
        tokens.pop();
    }
    let cleaned = tokens.join(" ");
    if cleaned.is_empty() {
        return false;
    }
    let reason = if alpha_count(&cleaned) < 4 {
        "too_short"
    } else if is_label_noise(&cleaned) {
        "label_noise"
    } else if !validate_person_name(&cleaned) || !plausible_name(&cleaned) {
        "invalid_name"
    } else {
        ledger.accept(Field::DeceasedName, source, cleaned, score);
        return true;
    };
    ledger.push(Field::DeceasedName, source, cleaned, score, CandidateStatus::Skip, reason);
    false
}

/// Every page-1 caption candidate competes; the highest score wins. Later
/// pages are read only when page 1 produced nothing.
fn deceased_name(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) -> String {
    let page1 = input.first_page();
    let mut found = false;
    if !page1.is_empty() {
        let captions: [(&Regex, i32, &str, bool); 4] = [
            (&*WILL_OF_HEADER_RE, 125, "will_of_header_strict", true),
            (&*WILL_OF_RE, 120, "will_of_pg1", true),
            (&*WILL_OF_RE, 118, "will_of_pg1_relaxed", false),
            (&*ESTATE_OF_RE, 115, "estate_of_pg1", true),
        ];
        for (pattern, score, source, cut) in captions {
            for c in pattern.captures_iter(page1) {
                let raw = if cut { cut_at(&c[1], &TAIL_CUT_RE) } else { c[1].to_string() };
                found |= add_deceased(ledger, &raw, source, score);
            }
        }
        if let Some(block) = DECEDENT_BLOCK_RE.captures(page1) {
            if let Some(c) = NAME_FIELD_RE.captures(&block[1]) {
                found |= add_deceased(ledger, &c[1], "decedent_block_pg1", 110);
            }
        }
    }
    if !found && input.pages.len() >= 2 {
        if let Some(c) = SECTION_TWO_NAME_RE.captures(input.page(1)) {
            found |= add_deceased(ledger, &c[1], "section_2_pg2_name", 95);
        }
    }
    if !found {
        for (idx, page) in input.pages.iter().enumerate() {
            if let Some(c) = DECEDENT_INFO_NAME_RE.captures(page) {
                add_deceased(ledger, &c[1], &format!("decedent_information_pg{}", idx + 1), 75);
                break;
            }
        }
    }

    if let Some(best) = ledger.best(Field::DeceasedName).cloned() {
        let scope = if input.pages.is_empty() {
            input.text.to_string()
        } else {
            input.pages.iter().take(2).cloned().collect::<Vec<_>>().join(" ")
        };
        if let Some(c) = ALIAS_RE.captures(&scope) {
            let alias = clean_candidate_name(&cut_at(&c[1], &ALIAS_TAIL_RE));
            if !alias.is_empty() && !alias.eq_ignore_ascii_case(&best.value) {
                ledger.push(Field::DeceasedName, "alias_detected", alias, best.score, CandidateStatus::Info, "");
            }
        }
        return best.value;
    }

    let fallback = clean_candidate_name(&extract_deceased_name(input.text));
    if fallback.is_empty() {
        return String::new();
    }
    if alpha_count(&fallback) < 4
        || is_label_noise(&fallback)
        || !validate_person_name(&fallback)
        || !plausible_name(&fallback)
    {
        ledger.push(Field::DeceasedName, "generic_fallback", fallback, 5, CandidateStatus::Skip, "invalid_name");
        return String::new();
    }
    ledger.accept(Field::DeceasedName, "generic_fallback", fallback.clone(), 10);
    fallback
}

/// Caption scan over the whole segment text.
pub fn strict_decedent_name_scan(text: &str) -> String {
    STRICT_DECEDENT_RES
        .iter()
        .filter_map(|p| p.captures(text))
        .map(|c| clean_candidate_name(&c[1]))
        .find(|name| !name.is_empty())
        .unwrap_or_default()
}

/// Best address shortly after a domicile anchor, else after "decedent".
pub fn strict_decedent_address_scan(text: &str) -> String {
    const ANCHORS: &[&str] = &[
        "domicile address",
        "domicile: street",
        "domicile:",
        "address of decedent",
    ];
    for anchor in ANCHORS {
        if let Some(pos) = find_ci(text, anchor) {
            let addrs = find_addresses(around(text, pos, pos, 50, 300));
            if !addrs.is_empty() {
                return pick_best_address(&addrs);
            }
        }
    }
    if let Some(pos) = find_ci(text, "decedent") {
        let addrs = find_addresses(around(text, pos, pos, 50, 400));
        if !addrs.is_empty() {
            return pick_best_address(&addrs);
        }
    }
    String::new()
}

// ═══════════════════════════════════════════
// Labeled blocks
// ═══════════════════════════════════════════

static NAME_SKIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:citizenship|domicile|principal office|address|mailing address|city|village|town|state|zip|country)\b")
});

/// The person name following a `label` line inside a block. Address and
/// citizenship lines are skipped.
pub fn name_after_label(block: &[String], label: &str) -> String {
    let label = lower(label);
    if let Some(idx) = block.iter().position(|l| lower(l).contains(&label)) {
        for cand in block.iter().skip(idx + 1).take(5).map(|l| l.trim()) {
            if cand.is_empty() || NAME_SKIP_RE.is_match(cand) {
                continue;
            }
            if !clean_candidate_name(cand).is_empty() {
                return cand.to_string();
            }
        }
        return block
            .iter()
            .skip(idx + 1)
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .unwrap_or("")
            .to_string();
    }
    block
        .iter()
        .find(|l| !clean_candidate_name(l).is_empty())
        .or_else(|| block.first())
        .cloned()
        .unwrap_or_default()
}

/// Lines that end a block: legacy tables, fiduciary roles, relationship
/// and citizenship rows.
const BOUNDARY_TERMS: &[&str] = &[
    "description of legacy",
    "devise",
    "other interest",
    "nature of fiduciary status",
    "beneficiary",
    "executor",
    "trustee",
    "distributee",
    "relationship",
    "citizenship",
    "interest(s) of petitioner",
];

const LABELED_STREET_WORDS: &[&str] = &[
    "road", "street", "lane", "drive", "avenue", "blvd", "court", "place", "pl", "pkwy", "way",
];
const STREET_LINE_WORDS: &[&str] = &["road", "street", "lane", "drive", "avenue", "blvd", "court", ","];

static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\d"));
static ZIP5_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\d{5}"));
static INLINE_STREET_RE: LazyLock<Regex> = LazyLock::new(|| re(r":\s*([0-9][A-Za-z0-9 .,'/-]+)"));
static CITY_AFTER_COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)city[^:\n]*:\s*([A-Za-z .'-]+)"));
static INLINE_CITY_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)city[^A-Za-z0-9]+([A-Za-z .'-]+)"));
static CITY_COMBO_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(r"(?i)([A-Za-z .'-]+),?\s+([A-Za-z]{{2,}}|[A-Za-z ]+)\s+({ZIP})"))
});
static STATE_ZIP_SAME_RE: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)state[:\s]+([A-Za-z ]+)\s+zip\s*code\s*({ZIP})")));
static STATE_ZIP_NEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)([A-Za-z .'-]+)\s+({ZIP})")));
static CITY_LABEL_WORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:city|village|town|or)\b"));
static STATE_WORD_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)state"));
static ZIP_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)zip.*"));

fn has_boundary(line: &str) -> bool {
    let low = lower(line);
    BOUNDARY_TERMS.iter().any(|t| low.contains(t))
}

/// Look up the state and ZIP that follow `city` elsewhere in the pages.
fn fill_state_zip(
    city: &str,
    state: String,
    zip: String,
    pages: &[String],
) -> Result<(String, String), regex::Error> {
    let city = city.trim();
    if (!state.is_empty() && !zip.is_empty()) || city.is_empty() || pages.is_empty() {
        return Ok((state, zip));
    }
    let pattern = Regex::new(&format!(
        r"(?i){}[^\n]{{0,40}}({STATE_ALT})[^\d]{{0,10}}({ZIP})",
        regex::escape(city)
    ))?;
    let joined = pages.join("\n");
    Ok(match pattern.captures(&joined) {
        Some(c) => (c[1].to_string(), c[2].to_string()),
        None => (state, zip),
    })
}

/// Parse street, city, state and ZIP rows out of a labeled block, stopping
/// at the first boundary row.
pub fn address_from_block(block: &[String], pages: &[String]) -> Result<Option<Scored>, regex::Error> {
    let (mut street, mut city, mut state, mut zip) = (String::new(), String::new(), String::new(), String::new());
    for (idx, line) in block.iter().enumerate() {
        let low = lower(line);
        if has_boundary(line) {
            break;
        }
        if ["domicile address", "principal office", "street and number"]
            .iter()
            .any(|l| low.contains(l))
        {
            if let Some(c) = INLINE_STREET_RE.captures(line) {
                street = c[1].trim().to_string();
            }
            for next in block.iter().skip(idx + 1).take(5) {
                if has_boundary(next) {
                    break;
                }
                let next_low = lower(next);
                if DIGIT_RE.is_match(next) && LABELED_STREET_WORDS.iter().any(|k| next_low.contains(k)) {
                    street = next.clone();
                    break;
                }
            }
        }
        if street.is_empty() && DIGIT_RE.is_match(line) && STREET_LINE_WORDS.iter().any(|k| low.contains(k)) {
            street = line.clone();
        }
        if low.contains("city") {
            if let Some(c) = CITY_AFTER_COLON_RE
                .captures(line)
                .or_else(|| INLINE_CITY_RE.captures(line))
            {
                if city.is_empty() {
                    city = c[1].trim().to_string();
                }
            }
            if city.is_empty() {
                if let Some(city_line) = block.get(idx + 1) {
                    let city_low = lower(city_line);
                    if city_low.contains("zip") || city_low.contains("state") || has_boundary(city_line) {
                        continue;
                    }
                    match CITY_COMBO_RE.captures(city_line) {
                        Some(c) => {
                            city = c[1].to_string();
                            state = c[2].to_string();
                            zip = c[3].to_string();
                        }
                        None => city = city_line.clone(),
                    }
                }
            }
        }
        if low.contains("state") && low.contains("zip") {
            if let Some(c) = STATE_ZIP_SAME_RE.captures(line) {
                if state.is_empty() {
                    state = c[1].to_string();
                }
                if zip.is_empty() {
                    zip = c[2].to_string();
                }
            }
            if state.is_empty() || zip.is_empty() {
                if let Some(next) = block.get(idx + 1).filter(|n| !has_boundary(n)) {
                    if let Some(c) = STATE_ZIP_NEXT_RE.captures(next) {
                        if state.is_empty() {
                            state = c[1].to_string();
                        }
                        if zip.is_empty() {
                            zip = c[2].to_string();
                        }
                    }
                }
            }
        }
    }
    if city.is_empty() || state.is_empty() {
        for line in block {
            let low = lower(line);
            if (low.contains("state") && low.contains("zip")) || has_boundary(line) {
                continue;
            }
            if let Some(c) = CITY_COMBO_RE.captures(line) {
                if city.is_empty() {
                    city = c[1].to_string();
                }
                if state.is_empty() {
                    state = c[2].to_string();
                }
                if zip.is_empty() {
                    zip = c[3].to_string();
                }
                break;
            }
        }
    }

    let street = strip_citizenship(&street);
    let city = strip_citizenship(&city);
    let city = trim_chars(&CITY_LABEL_WORDS_RE.replace_all(&city, ""), " ,").to_string();
    let state = strip_citizenship(&state);
    let state = STATE_WORD_RE.replace_all(&state, "");
    let state = trim_chars(&ZIP_TAIL_RE.replace_all(&state, ""), " ,").to_string();
    let (state, zip) = fill_state_zip(&city, state, zip, pages)?;
    let addr = assemble_address(&street, &city, &state, &zip);
    if addr.is_empty() || (city.is_empty() && state.is_empty() && zip.is_empty()) {
        return Ok(None);
    }
    let cleaned = clean_address_strict(&addr);
    if DIGIT_RE.is_match(&cleaned) && ZIP5_RE.is_match(&cleaned) {
        return Ok(Some(Scored::new(cleaned, "anchored_block", 120)));
    }
    if !street.is_empty() {
        if let Some(upgraded) = same_street_with_zip(&street, pages) {
            return Ok(Some(Scored::new(upgraded, "street_match_fallback", 80)));
        }
    }
    if DIGIT_RE.is_match(&cleaned) {
        return Ok(Some(Scored::new(cleaned, "anchored_block_nozip", 60)));
    }
    Ok(None)
}

// ═══════════════════════════════════════════
// Petitioner name
// ═══════════════════════════════════════════

static PETITIONERS_FOLLOW_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)petitioners?\s+are\s+as\s+follows[:\s]+(.{0,500})"));
static NAME_COLON_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)name:\s*([^\n]+)"));
static PETITIONER_WINDOW_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)petitioner.*?name:\s*([^\n]+)"));
static ROLE_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)(?:executor|distributee|beneficiary).*"));
static LETTERS_TO_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)letters\s+(?:testamentary|of administration)\s+to[:\s]+([A-Z .,'-]+)")
});
static SIGNATURE_PRINT_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)signature of petitioner.*?print name[:\s]*([A-Z .,'-]+)"));

/// Collects distinct cleaned petitioner names into the ledger.
struct PetitionerNames<'l> {
    ledger: &'l mut CandidateLedger,
    seen: Vec<String>,
}

impl PetitionerNames<'_> {
    fn add(&mut self, raw: &str, source: &str, score: i32) {
        let cleaned = clean_candidate_name(raw);
        if cleaned.is_empty() || self.seen.iter().any(|n| n.eq_ignore_ascii_case(&cleaned)) {
            return;
        }
        self.seen.push(cleaned.clone());
        self.ledger.accept(Field::PetitionerName, source, cleaned, score);
    }

    fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

fn petitioner_name(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) -> String {
    let page1 = input.first_page();
    let mut names = PetitionerNames { ledger: &mut *ledger, seen: Vec::new() };

    if !page1.is_empty() {
        let block = block_after_label(page1, "Petitioner Information", 10);
        let line = name_after_label(&block, "Name");
        if !line.is_empty() {
            names.add(&line, "petitioner_info_block", 120);
        }
        if names.is_empty() {
            if let Some(section) = PETITIONERS_FOLLOW_RE.captures(page1) {
                for c in NAME_COLON_RE.captures_iter(&section[1]) {
                    names.add(&c[1], "petitioner_section_pg1", 100);
                }
            }
            if names.is_empty() {
                if let Some(c) = PETITIONER_WINDOW_RE.captures(page1) {
                    names.add(&c[1], "petitioner_window_pg1", 80);
                }
            }
        }
        if !names.is_empty() {
            return ledger.resolve(Field::PetitionerName);
        }
    }

    if input.pages.len() >= 3 {
        let lines: Vec<&str> = input.page(2).lines().collect();
        for idx in 0..lines.len() {
            let window = lines[idx..(idx + 4).min(lines.len())].join(" ");
            let Some(addr) = find_addresses(&window).into_iter().next() else {
                continue;
            };
            let chunk = match window.find(&addr) {
                Some(pos) if pos > 0 => window[..pos].to_string(),
                _ => lines[idx].to_string(),
            };
            names.add(&ROLE_TAIL_RE.replace_all(&chunk, ""), "page3_name_address", 90);
        }
    }

    if names.is_empty() {
        names.add(&extract_petitioner(input.text), "generic_fallback", 10);
    }
    if names.is_empty() && !page1.is_empty() {
        if let Some(c) = LETTERS_TO_RE.captures(page1) {
            names.add(&c[1], "letters_to_line", 85);
        }
    }
    if names.is_empty() {
        if let Some(c) = SIGNATURE_PRINT_RE.captures(input.last_page()) {
            names.add(&c[1], "signature_print_name", 80);
        }
    }
    ledger.resolve(Field::PetitionerName)
}

// ═══════════════════════════════════════════
// Petitioner address
// ═══════════════════════════════════════════

static DOMICILE_PO_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)domicile\s+or\s+principal\s+office[:\s]+([^\n]+)"));
static PARA_CITY_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(r"(?im)^\s*([A-Z][A-Z .,'-]+)\s*({STATE_ALT})?\s*({ZIP})?\s*$"))
});
static ZIP_WORD_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\b(\d{5})(?:-\d{4})?\b"));
static MY_DOMICILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"(?i)my domicile is:\s*([A-Za-z0-9 ,.'-]+)\s+([A-Za-z .'-]+),\s*({STATE_ALT})\s+({ZIP})"
    ))
});
static DOMICILE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)domicile\s+or\s+principal\s+office[:\s].{0,300}"));
static BLOCK_CITY_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)(?:city|city,\s*village\s*or\s*town)[:\s]+([^\n]+)"));
static BLOCK_STATE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)state[:\s]+([^\n]+)"));
static BLOCK_ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)zip\s*code[:\s]+({ZIP})")));
static DOMICILE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i).*domicile[^:]*:\s*"));
static CITY_STATE_ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)([A-Za-z .'-]+)\s+({STATE_ALT})\s+({ZIP})")));
static PAREN_CITY_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\n\s*([A-Za-z .'-]+)\s*\(City"));
static PAREN_STATE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\n\s*([A-Za-z .'-]+)\s*\(State"));
static PAREN_ZIP_RE: LazyLock<Regex> = LazyLock::new(|| re(&format!(r"\n\s*({ZIP})\s*\(Zip")));

fn group(re: &Regex, text: &str) -> String {
    re.captures(text).map(|c| c[1].to_string()).unwrap_or_default()
}

/// Paragraph 1 of the petition names the petitioner's domicile.
fn paragraph_one_address(page1: &str) -> Option<Scored> {
    let scope = match section_one(page1) {
        Some(s) => s,
        None => slice_from(page1, page1.find("1.")?, 802),
    };
    let street = group(&DOMICILE_PO_RE, scope);
    let (mut city, mut state, mut zip) = (String::new(), String::new(), String::new());
    if let Some(c) = PARA_CITY_LINE_RE.captures(scope) {
        city = c[1].to_string();
        state = c.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        zip = c.get(3).map(|m| m.as_str().to_string()).unwrap_or_default();
    }
    if zip.is_empty() {
        zip = group(&ZIP_WORD_RE, scope);
    }
    let cleaned = clean_address_strict(&assemble_address(&street, &city, &state, &zip));
    DIGIT_RE
        .is_match(&cleaned)
        .then(|| Scored::new(cleaned, "paragraph1_block", 115))
}

fn my_domicile_address(last_page: &str) -> Option<String> {
    let c = MY_DOMICILE_RE.captures(last_page)?;
    let cleaned = clean_address_strict(&assemble_address(&c[1], &c[2], &c[3], &c[4]));
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Labeled domicile fields following "domicile or principal office".
fn domicile_block_address(page1: &str) -> Option<Scored> {
    let block = DOMICILE_BLOCK_RE.find(page1)?.as_str();
    let street = group(&DOMICILE_PO_RE, block);
    let city = group(&BLOCK_CITY_RE, block);
    let state = group(&BLOCK_STATE_RE, block);
    let zip = group(&BLOCK_ZIP_RE, block);
    let addr = assemble_address(&street, &city, &state, &zip);
    if !addr.is_empty() && !(city.is_empty() && state.is_empty() && zip.is_empty()) {
        return Some(Scored::new(addr, "domicile_block_pg1", 100));
    }
    let lines: Vec<&str> = block.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let street_line = DOMICILE_PREFIX_RE.replace(lines.first()?, "").to_string();
    lines.iter().skip(1).find_map(|line| {
        let c = CITY_STATE_ZIP_RE.captures(line)?;
        let addr = assemble_address(&street_line, &c[1], &c[2], &c[3]);
        (!addr.is_empty()).then(|| Scored::new(addr, "domicile_block_pg1_lines", 95))
    })
}

/// Values printed above "(City)", "(State)" and "(Zip)" captions.
fn captioned_domicile_address(page1: &str) -> Option<String> {
    let start = find_ci(page1, "domicile or principal office")?;
    let window = slice_from(page1, start, 500);
    let addr = assemble_address(
        &group(&DOMICILE_PO_RE, window),
        &group(&PAREN_CITY_RE, window),
        &group(&PAREN_STATE_RE, window),
        &group(&PAREN_ZIP_RE, window),
    );
    (!addr.is_empty()).then_some(addr)
}

fn petitioner_address(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) -> Result<String, ExtractionError> {
    let page1 = input.first_page();
    let from_block = if page1.is_empty() {
        None
    } else {
        let block = block_after_label(page1, "Petitioner Information", 12);
        if block.is_empty() {
            None
        } else {
            address_from_block(&block, input.pages)?
        }
    };
    let mut c = ledger.cascade(Field::PetitionerAddress);
    c.attempt_scored(|| from_block)
        .attempt_scored(|| paragraph_one_address(page1))
        .attempt("domicile_last_page", 115, || my_domicile_address(input.last_page()))
        .attempt_scored(|| domicile_block_address(page1))
        .attempt("domicile_window_pg1", 90, || captioned_domicile_address(page1))
        .attempt("generic_best", 20, || {
            let near = find_address_near_keywords(input.text, &["petitioner", "mailing address", "petitioner address"]);
            clean_address_strict(&clean_text(&near))
        });
    Ok(c.resolve())
}

// ═══════════════════════════════════════════
// Deceased address
// ═══════════════════════════════════════════

static DOMICILE_STREET_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)domicile[:\s]+(?:street)?\s*([^\n]+)"));
static CITY_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bcity\b[^:\n]*?[ ,:\t]+([^\n]+)"));
static STATE_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bstate\b[^:\n]*[ :\t]+([^\n]+)"));
static ZIP_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)zip[^:\n]*[:\s]+({ZIP})")));
static CITY_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)city[^A-Za-z]+"));
static STATE_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)state[:\s]+([A-Za-z ]+)"));
static ZIP_ANY_RE: LazyLock<Regex> = LazyLock::new(|| re(&format!(r"({ZIP})")));
static PLACE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:city|town|village|county)\b[^A-Za-z]*"));
static D_DOMICILE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)\(d\)\s*Domicile[:\s]+(?:Street)?\s*([^\n]+)"));
static DOMICILE_STREET_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)Domicile:\s*Street\s*([^\n]+)"));
static CITY_WORD_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bcity\b"));
static CITY_INLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)city[^A-Za-z]*([A-Za-z .'-]+?)(?:,|\s+\d{5}|$)"));
static STATE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bstate\b"));
static STATE_INLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bstate\b[^:]*[ :\t]+([A-Za-z ]+)"));
static WINDOW_COMBO_RE: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)([A-Za-z .'-]+),?\s+({STATE_ALT})\s+({ZIP})")));
static STATEN_ISLAND_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)staten\s+island"));
static NEW_YORK_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)new york"));

fn clean_place_name(value: &str) -> String {
    let value = PLACE_WORD_RE.replace_all(value, "");
    trim_chars(&collapse_ws(&value), " ,").to_string()
}

/// The "name, domicile ... as follows:" decedent block on page 1.
fn decedent_block_address(pages: &[String]) -> Option<Scored> {
    let page1 = pages.first()?;
    let block = DECEDENT_BLOCK_RE.captures(page1)?.get(1)?.as_str();
    let mut street = group(&DOMICILE_STREET_RE, block);
    let mut city = group(&CITY_VALUE_RE, block);
    let mut state = group(&STATE_VALUE_RE, block);
    let mut zip = group(&ZIP_VALUE_RE, block);
    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let low = lower(line);
        if low.starts_with("city") {
            let cand = trim_chars(&CITY_PREFIX_RE.replace_all(line, ""), " :").to_string();
            if city.is_empty() || cand.len() > city.len() {
                city = cand;
            }
        }
        if low.contains("state") {
            if let Some(c) = STATE_WORDS_RE.captures(line) {
                if state.is_empty() || c[1].len() > state.len() {
                    state = c[1].to_string();
                }
            }
        }
        if low.contains("zip") && zip.is_empty() {
            zip = group(&ZIP_ANY_RE, line);
        }
    }
    if city.is_empty() || state.is_empty() {
        if let Some(c) = CITY_STATE_ZIP_RE.captures(block) {
            if city.is_empty() {
                city = c[1].to_string();
            }
            if state.is_empty() {
                state = c[2].to_string();
            }
            if zip.is_empty() {
                zip = c[3].to_string();
            }
        }
    }
    street = strip_citizenship(&street);
    let city = clean_place_name(&strip_citizenship(&city));
    let state = canonical_state_name(&clean_place_name(&strip_citizenship(&state)));
    let cleaned = clean_address_strict(&assemble_address(&street, &city, &state, &zip));
    if cleaned.is_empty() || (city.is_empty() && state.is_empty()) {
        return None;
    }
    if ZIP5_RE.is_match(&cleaned) {
        return Some(Scored::new(cleaned, "decedent_block_pg1", 115));
    }
    if let Some(upgraded) = same_street_with_zip(&street, pages) {
        return Some(Scored::new(upgraded, "decedent_block_pg1_zip_upgrade", 116));
    }
    Some(Scored::new(cleaned, "decedent_block_pg1_nozip", 60))
}

/// The "(d) Domicile" section, page by page.
fn domicile_section_address(pages: &[String]) -> Result<Option<Scored>, regex::Error> {
    for (idx, page) in pages.iter().enumerate() {
        let block = block_after_label(page, "Domicile Address", 10);
        if !block.is_empty() {
            if let Some(found) = address_from_block(&block, pages)? {
                return Ok(Some(found));
            }
        }
        let Some(dom) = D_DOMICILE_RE
            .captures(page)
            .or_else(|| DOMICILE_STREET_LABEL_RE.captures(page))
        else {
            continue;
        };
        let (Some(whole), Some(street)) = (dom.get(0), dom.get(1)) else {
            continue;
        };
        let street_line = strip_citizenship(street.as_str());
        let window = slice_from(page, whole.end(), 400);

        let (mut city, mut state, mut zip) = (None::<String>, None::<String>, None::<String>);
        let mut state_said_york = false;
        for line in window.lines() {
            if city.is_none() && CITY_WORD_RE.is_match(line) {
                if let Some(c) = CITY_INLINE_RE.captures(line) {
                    city = Some(c[1].to_string());
                }
                if let Some(c) = ZIP_ANY_RE.captures(line) {
                    zip = Some(c[1].to_string());
                }
            }
            if state.is_none() && STATE_LINE_RE.is_match(line) {
                if let Some(c) = STATE_INLINE_RE.captures(line) {
                    state_said_york = lower(&c[1]).contains("york");
                    state = Some(c[1].to_string());
                }
            }
            if zip.is_none() {
                zip = ZIP_ANY_RE.captures(line).map(|c| c[1].to_string());
            }
        }
        let combo = WINDOW_COMBO_RE.captures(window);
        let combo_part = |i: usize| combo.as_ref().map(|c| c[i].to_string()).unwrap_or_default();

        let mut city_val = match &city {
            Some(c) => clean_place_name(&strip_citizenship(c)),
            None => combo_part(1),
        };
        let mut state_val = match &state {
            Some(_) if state_said_york => "NY".to_string(),
            Some(s) => canonical_state_name(&clean_place_name(&strip_citizenship(s))),
            None => combo_part(2),
        };
        if city_val.is_empty() {
            if let Some(z) = &zip {
                let pre_city = Regex::new(&format!(r"([A-Za-z][A-Za-z .'-]+),?\s+{}", regex::escape(z)))?;
                city_val = group(&pre_city, window);
            }
        }
        if city_val.is_empty() && (STATEN_ISLAND_RE.is_match(window) || STATEN_ISLAND_RE.is_match(page)) {
            city_val = "Staten Island".to_string();
        }
        if state_val.is_empty() && NEW_YORK_RE.is_match(window) {
            state_val = "NY".to_string();
        }
        let city_val = trim_chars(&PLACE_WORD_RE.replace_all(&city_val, ""), " ,").to_string();
        let zip_val = zip.unwrap_or_else(|| combo_part(3));
        let addr = assemble_address(&street_line, &city_val, &state_val, &zip_val);
        if addr.is_empty() {
            continue;
        }
        let cleaned = clean_address_strict(&addr);
        if !cleaned.is_empty() {
            return Ok(Some(Scored::new(cleaned, format!("domicile_section_pg{}", idx + 1), 105)));
        }
    }
    Ok(None)
}

fn deceased_address(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) -> Result<String, ExtractionError> {
    let mut c = ledger.cascade(Field::DeceasedPropertyAddress);
    c.attempt_scored(|| decedent_block_address(input.pages));
    if !c.is_settled() {
        let section = domicile_section_address(input.pages)?;
        c.attempt_scored(|| section);
    }
    c.attempt("generic_best", 20, || {
        let mut candidates = Vec::new();
        let near = find_address_near_keywords(
            input.text,
            &["domicile", "decedent", "residence", "property address", "place of death"],
        );
        if !near.is_empty() {
            candidates.push(near);
        }
        if input.pages.is_empty() {
            candidates.extend(find_addresses(input.text));
        } else {
            candidates.extend(find_addresses(&input.pages.join(" ")));
        }
        clean_address_strict(&clean_text(&pick_best_address(&candidates)))
    });
    Ok(c.resolve())
}

// ═══════════════════════════════════════════
// Relationship
// ═══════════════════════════════════════════

/// Page vocabulary of legatee and fiduciary tables, whose relationship
/// columns describe other people.
const TABLE_MARKERS: &[&str] = &[
    "description of legacy",
    "other interest",
    "nature of fiduciary status",
    "legatee",
    "beneficiary",
    "all persons and parties so interested",
    "full residuary legatee",
    "nominated executor",
    "successor executor",
];

static REL_OR_INTEREST_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)relationship|interest"));
static INTEREST_REL_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)interests?\s+of\s+petitioners?.{0,80}?\b(spouse|wife|husband|child|son|daughter|sister|brother|mother|father|niece|nephew|cousin)\b")
});
static SPOUSE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)spouse"));
static CHILD_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)child\s+or\s+children.*?(?:yes|[1-9])"));

/// Kinship words tried on a petitioner name line, most specific first.
static NAME_LINE_RELATIONS: LazyLock<Vec<(Regex, &'static str, i32)>> = LazyLock::new(|| {
    vec![
        (re(r"(?i)\b(?:spouse|husband|wife|widow|widower)\b"), "Spouse", 60),
        (re(r"(?i)\b(?:son|daughter|child)\b"), "Child", 55),
        (re(r"(?i)\bgrandchild\b"), "Grandchild", 45),
        (re(r"(?i)\bniece\b"), "Niece", 45),
        (re(r"(?i)\bnephew\b"), "Nephew", 45),
        (re(r"(?i)\bcousin\b"), "Cousin", 40),
    ]
});

fn has_table_marker(page: &str) -> bool {
    let low = lower(page);
    TABLE_MARKERS.iter().any(|m| low.contains(m))
}

fn is_role_only(line: &str) -> bool {
    has_role_term(line) && !has_rel_word(line)
}

fn trimmed_lines(page: &str) -> Vec<&str> {
    page.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

/// The petitioner block answer wins outright. Otherwise every strategy
/// contributes a ranked candidate and kinship priority decides.
fn relationship(input: &SegmentInput<'_>, petitioner: &str, ledger: &mut CandidateLedger) -> String {
    let page1 = input.first_page();
    if !page1.is_empty() {
        let block = block_after_label(page1, "Petitioner Information", 20);
        let lines: Vec<&str> = block.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
        for (idx, line) in lines.iter().enumerate() {
            if !REL_OR_INTEREST_RE.is_match(line) {
                continue;
            }
            if let Some(rel) = relationship_in_lines(&lines, idx) {
                ledger.accept(Field::Relationship, "petitioner_block_pg1", rel.clone(), 120);
                return rel;
            }
        }
        if let Some(c) = INTEREST_REL_RE.captures(&block.join(" ")) {
            let rel = canonical_relationship(&c[1]);
            ledger.accept(Field::Relationship, "petitioner_interest_pg1", rel.clone(), 115);
            return rel;
        }
    }

    let mut candidates: Vec<RankedRelationship> = Vec::new();
    let pet_tokens: Vec<String> = petitioner.split_whitespace().take(2).map(lower).collect();
    let last_name = petitioner.split_whitespace().last().map(lower).unwrap_or_default();

    for (pg_idx, page) in input.pages.iter().enumerate() {
        if pg_idx >= 1 && has_table_marker(page) {
            continue;
        }
        let lines = trimmed_lines(page);
        for (idx, line) in lines.iter().enumerate() {
            if is_role_only(line) {
                continue;
            }
            let low = lower(line);
            let names_petitioner = (!pet_tokens.is_empty() && pet_tokens.iter().all(|t| low.contains(t.as_str())))
                || (!last_name.is_empty() && low.contains(&last_name));
            if !names_petitioner {
                continue;
            }
            if let Some(rel) = relationship_in_lines(&lines, idx) {
                candidates.push(RankedRelationship::new(rel, format!("page{}_near_petitioner", pg_idx + 1), 100));
            }
        }
    }

    if candidates.is_empty() && !petitioner.is_empty() {
        let full = lower(petitioner);
        'pages: for (pg_idx, page) in input.pages.iter().enumerate() {
            let lines = trimmed_lines(page);
            for (idx, line) in lines.iter().enumerate() {
                if !lower(line).contains(&full) {
                    continue;
                }
                if let Some(rel) = relationship_in_lines(&lines, idx) {
                    candidates.push(RankedRelationship::new(rel, format!("table_petitioner_pg{}", pg_idx + 1), 70));
                    break 'pages;
                }
            }
        }
    }

    let open_pages: Vec<&str> = input
        .pages
        .iter()
        .filter(|p| !has_table_marker(p))
        .take(2)
        .map(String::as_str)
        .collect();
    if !open_pages.is_empty() {
        let rel = extract_relationship(&open_pages.join("\n"));
        if !rel.is_empty() {
            candidates.push(RankedRelationship::new(rel, "generic_fallback", 20));
        }
    }

    if !petitioner.is_empty() {
        let all_tokens: Vec<String> = petitioner.split_whitespace().map(lower).collect();
        let low_text = lower(input.text);
        let near_spouse = SPOUSE_RE.find_iter(&low_text).any(|m| {
            let window = around(&low_text, m.start(), m.end(), 80, 80);
            all_tokens.iter().all(|t| window.contains(t.as_str()))
        });
        if near_spouse {
            candidates.push(RankedRelationship::new("Spouse", "spouse_window_override", 95));
        }
    }

    if candidates.is_empty() {
        let first = petitioner.split_whitespace().next().map(lower).unwrap_or_default();
        let last = last_name.clone();
        let names_line = |low: &str| {
            !first.is_empty() && low.contains(&first) && ((!last.is_empty() && low.contains(&last)) || first.len() >= 3)
        };
        'scan: for page in input.pages {
            for line in page.lines() {
                let low = lower(line);
                if !names_line(&low) || is_role_only(line) {
                    continue;
                }
                if let Some((_, rel, score)) = NAME_LINE_RELATIONS.iter().find(|(re, _, _)| re.is_match(line)) {
                    candidates.push(RankedRelationship::new(*rel, "fallback_name_line", *score));
                    break 'scan;
                }
            }
        }
    }

    if candidates.is_empty() && !input.pages.is_empty() {
        let page2 = if input.pages.len() >= 2 { input.page(1) } else { page1 };
        let low = lower(page2);
        if CHILD_CLASS_RE.is_match(page2) || (low.contains("child or children") && !low.contains("no child")) {
            candidates.push(RankedRelationship::new("Child", "distributee_class_child", 60));
        }
    }

    let Some(winner) = select_ranked(&candidates) else {
        ledger.accept(Field::Relationship, "fallback_default", "Unknown", 5);
        return "Unknown".to_string();
    };
    for (idx, cand) in candidates.iter().enumerate() {
        let status = if idx == winner { CandidateStatus::Ok } else { CandidateStatus::Candidate };
        ledger.push(Field::Relationship, &cand.source, &cand.value, cand.score, status, "");
    }
    candidates[winner].value.clone()
}

// ═══════════════════════════════════════════
// Property value
// ═══════════════════════════════════════════

static GROUPED_MONEY_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\$?\s*([0-9]{1,3}(?:,[0-9]{3})+(?:\.\d{2})?)"));
static IMPROVED_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\bimproved\s+real\s+property[^$]*\$[\s_]*([0-9,.]+)"));
static UNIMPROVED_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)unimproved\s+real\s+property[^$]*\$[\s_]*([0-9,.]+)"));
static PERSONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)personal\s+property?[^$]*\$[\s_]*([0-9,.]+)"));
static PERSONAL_AFTER_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\$[\s_]*([0-9,.]+)\s+personal\s+property?"));

const VALUE_GOOD_KW: &[&str] = &[
    "gross",
    "estate",
    "approximate",
    "total",
    "value",
    "property",
    "real property",
    "personal property",
    "improved",
];
const VALUE_BAD_KW: &[&str] = &[
    "filing fee",
    "receipt",
    "bond",
    "cert",
    "greater than",
    "less than",
    "temporary",
    "fee",
    "surcharge",
];
const PERSONAL_BAD_KW: &[&str] = &["less than", "greater than", "filing fee", "receipt", "bond", "prelim", "cert"];

fn money(raw: &str) -> Option<f64> {
    parse_money(trim_chars(raw, ".,")).filter(|v| *v > 0.0)
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Context-scored money tokens, falling back to the labeled real and
/// personal property lines.
fn property_value(pages: &[String], floor: f64) -> Option<Scored> {
    let mut scored: Vec<(f64, i64)> = Vec::new();
    for (page_idx, page) in pages.iter().enumerate() {
        for c in GROUPED_MONEY_RE.captures_iter(page) {
            let (Some(whole), Some(raw)) = (c.get(0), c.get(1)) else { continue };
            let Some(value) = money(raw.as_str()) else { continue };
            let window = lower(around(page, whole.start(), whole.end(), 60, 60));
            if VALUE_BAD_KW.iter().any(|b| window.contains(b)) {
                continue;
            }
            let score = 15 * VALUE_GOOD_KW.iter().filter(|k| window.contains(*k)).count() as i64
                + ((value / 100_000.0) as i64).min(40)
                + (10 - page_idx as i64).max(0);
            scored.push((value, score));
        }
    }

    let (mut improved, mut unimproved, mut personal) = (0.0_f64, 0.0_f64, 0.0_f64);
    for page in pages {
        let joined = page.lines().collect::<Vec<_>>().join(" ");
        if improved == 0.0 {
            improved = IMPROVED_RE.captures(&joined).and_then(|c| money(&c[1])).unwrap_or(0.0);
        }
        if unimproved == 0.0 {
            unimproved = UNIMPROVED_RE.captures(&joined).and_then(|c| money(&c[1])).unwrap_or(0.0);
        }
        let mut found: Vec<f64> = PERSONAL_RE.captures_iter(&joined).filter_map(|c| money(&c[1])).collect();
        if found.is_empty() {
            found = PERSONAL_AFTER_RE
                .captures_iter(&joined)
                .filter(|c| {
                    c.get(0).is_some_and(|m| {
                        let ctx = lower(around(&joined, m.start(), m.end(), 40, 40));
                        !PERSONAL_BAD_KW.iter().any(|b| ctx.contains(b))
                    })
                })
                .filter_map(|c| money(&c[1]))
                .collect();
        }
        if personal == 0.0 {
            personal = found.into_iter().fold(0.0, f64::max);
        }
    }
    let labeled: Vec<(f64, &str, i32)> = [
        (personal, "personal_property", 115),
        (improved, "improved_real_property", 110),
        (unimproved, "unimproved_real_property", 100),
    ]
    .into_iter()
    .filter(|(v, _, _)| *v > 0.0)
    .collect();

    let mut chosen: Option<(f64, String, i32)> = scored
        .iter()
        .max_by(|a, b| (a.1, a.0).partial_cmp(&(b.1, b.0)).unwrap_or(std::cmp::Ordering::Equal))
        .filter(|(v, _)| *v >= floor)
        .map(|(v, s)| (*v, "context_scored".to_string(), *s as i32));
    if chosen.is_none() {
        chosen = labeled
            .iter()
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(v, src, s)| (*v, src.to_string(), *s));
    }
    let (mut value, mut source, mut score) = chosen?;
    if value < floor {
        let bigger = labeled
            .iter()
            .map(|(v, _, _)| *v)
            .chain(scored.iter().map(|(v, _)| *v))
            .filter(|v| *v >= floor)
            .fold(f64::NAN, f64::max);
        if !bigger.is_nan() {
            value = bigger;
            source = "small_replaced_by_labeled".to_string();
            score = 88;
        }
    }
    Some(Scored::new(format_amount(value), source, score))
}

// ═══════════════════════════════════════════
// Phone and attorney
// ═══════════════════════════════════════════

static LOOSE_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(\(?[0-9]{3}\)?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4})"));
static TELEPHONE_PG1_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)(?:telephone\s+number|tel(?:ephone)?)[^0-9]{0,15}(\(?[0-9]{3}\)?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4})")
});
static TEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)(?:telephone|tel)[^0-9]{0,15}(\(?[0-9]{3}\)?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4})")
});
static TEL_NO_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)(?:tel\s*no\.?|telephone)[^0-9]{0,15}(\(?[0-9]{3}\)?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4})")
});
static ATTORNEY_PRINT_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)print name of attorney[^A-Za-z]{0,30}([A-Z .,'-]{3,})"));
static FULL_EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)([A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,})"));
static WRAPPED_EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)([A-Z0-9._%+-]+@[A-Z0-9.-]+)\s*\.?\s*(com|net|org|gov|edu|law)")
});
static PARTIAL_EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)([A-Z0-9._%+-]+@[A-Z0-9.-]+)\s*\.?\s*([A-Z]{2,})"));
static SIG_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)signature of attorney[:\s]*.{0,800}"));
static SIG_PRINT_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)signature of attorney[:\s]*.*?print name[:\s]*([A-Z .,'-]+)"));
static ESQ_NAME_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)([A-Z .,'-]+?ESQ\.?)"));
static PRINT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)print name[:\s]+([A-Z .,'-]{3,})"));
static ESQ_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)esq\.?"));
static CAPITALIZED_RUN_RE: LazyLock<Regex> = LazyLock::new(|| re(r"([A-Z][A-Za-z .,'-]{3,})"));
static NOTARY_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)([A-Z][A-Za-z .,'-]{3,})\s+Notary Public"));
static SIG_NEARBY_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?is)Signature of Attorney.*?([A-Z][A-Za-z .,'-]{3,})"));

fn dash_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        format_phone(&digits)
    } else {
        raw.to_string()
    }
}

/// Telephone label on page 1, the last-page phone, then the first phone
/// anywhere.
fn primary_phone(input: &SegmentInput<'_>) -> Option<Scored> {
    if let Some(c) = TELEPHONE_PG1_RE.captures(input.first_page()) {
        return Some(Scored::new(dash_phone(&c[1]), "telephone_number_pg1", 100));
    }
    if let Some(c) = LOOSE_PHONE_RE.captures(input.last_page()) {
        return Some(Scored::new(dash_phone(&c[1]), "last_page_phone", 110));
    }
    let phone = extract_phone(input.text);
    (!phone.is_empty()).then(|| Scored::new(dash_phone(&phone), "generic_fallback", 20))
}

fn valid_attorney(name: &str) -> bool {
    !name.is_empty() && !is_label_noise(name) && validate_person_name(name)
}

fn attorney_from(raw: &str) -> String {
    clean_candidate_name(&ESQ_RE.replace_all(raw, ""))
}

fn block_email(text: &str) -> Option<String> {
    let email = match FULL_EMAIL_RE.captures(text) {
        Some(c) => c[1].to_string(),
        None => {
            let c = WRAPPED_EMAIL_RE.captures(text)?;
            format!("{}.{}", c[1].trim_end_matches('.'), &c[2])
        }
    };
    Some(lower(trim_chars(&email, " .")))
}

/// Attorney name with the phone and email of the signature block.
#[derive(Debug, Default)]
struct AttorneyInfo {
    name: Option<Scored>,
    phone: Option<Scored>,
    email: Option<Scored>,
}

fn attorney_info(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) -> AttorneyInfo {
    const ANCHORS: &[&str] = &[
        "signature of attorney",
        "print name of attorney",
        "firm name",
        "telephone",
        "email (optional)",
    ];
    let mut info = AttorneyInfo::default();

    for (idx, page) in input.pages.iter().enumerate() {
        let low = lower(page);
        if !ANCHORS.iter().any(|a| low.contains(a)) {
            continue;
        }
        let source = format!("attorney_block_pg{}", idx + 1);
        if let Some(c) = ATTORNEY_PRINT_RE.captures(page) {
            let cand = attorney_from(&c[1]);
            ledger.push(Field::Attorney, &source, &cand, 110, CandidateStatus::Candidate, "");
            if valid_attorney(&cand) {
                info.name = Some(Scored::new(cand, &source, 120));
            }
        }
        if info.phone.is_none() {
            if let Some(c) = TEL_RE.captures(page).or_else(|| LOOSE_PHONE_RE.captures(page)) {
                let phone = dash_phone(&c[1]);
                ledger.push(Field::PhoneNumber, &source, &phone, 120, CandidateStatus::Candidate, "");
                info.phone = Some(Scored::new(phone, &source, 120));
            }
        }
        if info.email.is_none() {
            if let Some(email) = block_email(page) {
                ledger.push(Field::EmailAddress, &source, &email, 120, CandidateStatus::Candidate, "");
                info.email = Some(Scored::new(email, &source, 120));
            }
        }
    }

    let last = input.last_page();
    if !last.is_empty() {
        let source = format!("attorney_block_pg{}", input.pages.len());
        let block = SIG_BLOCK_RE.find(last).map_or(last, |m| m.as_str());
        let raw = SIG_PRINT_RE
            .captures(block)
            .or_else(|| ESQ_NAME_RE.captures(block))
            .or_else(|| PRINT_NAME_RE.captures(block))
            .map(|c| c[1].to_string());
        if let Some(raw) = raw {
            let cand = attorney_from(&raw);
            if valid_attorney(&cand) {
                info.name = Some(Scored::new(cand, &source, 120));
            } else if !cand.is_empty() {
                ledger.reject(Field::Attorney, &source, cand, "label_noise");
            }
        }
        if let Some(c) = TEL_NO_RE.captures(block).or_else(|| LOOSE_PHONE_RE.captures(block)) {
            info.phone = Some(Scored::new(dash_phone(&c[1]), &source, 120));
        }
        let collapsed = collapse_ws(last);
        if let Some(c) = FULL_EMAIL_RE.captures(&collapsed) {
            if info.email.is_none() {
                let email = lower(c[1].trim_end_matches('.')).replace("gma.il", "gmail.com");
                info.email = Some(Scored::new(email, &source, 120));
            }
        } else if info.email.is_none() {
            if let Some(c) = PARTIAL_EMAIL_RE.captures(&collapsed) {
                info.email = Some(Scored::new(lower(&format!("{}.{}", &c[1], &c[2])), &source, 120));
            }
        }
    }

    if info.name.is_none() {
        let generic = extract_attorney(input.text, ledger);
        if generic.is_empty() {
            ledger.reject(Field::Attorney, "generic_fallback", "", "no_valid_attorney");
        } else {
            info.name = Some(Scored::new(generic, "generic_fallback", 30));
        }
    }
    if info.name.is_none() && !last.is_empty() {
        info.name = infer_attorney(last, info.email.as_ref().map(|e| e.value.as_str()));
    }

    if let Some(name) = &info.name {
        let joined = input.pages.join(" ");
        let near = find_ci(&joined, &name.value)
            .and_then(|pos| LOOSE_PHONE_RE.captures(slice_from(&joined, pos, 400)))
            .or_else(|| LOOSE_PHONE_RE.captures(&joined))
            .map(|c| clean_phone(&c[1]))
            .filter(|p| !p.is_empty());
        if let Some(phone) = near {
            info.phone = Some(Scored::new(phone, "attorney_name_window", 120));
        }
        if info.email.is_none() {
            let email = find_emails_in_pages(input.pages, EMAIL_ANCHORS, input.config.email_window);
            if !email.is_empty() {
                info.email = Some(Scored::new(email, "email_pages_scan", 90));
            }
        }
    }
    info
}

/// Attorney name guessed from text near the email, a notary line, or the
/// attorney signature line.
fn infer_attorney(last_page: &str, email: Option<&str>) -> Option<Scored> {
    let accept = |raw: &str| {
        let name = clean_candidate_name(raw);
        (validate_person_name(&name) && !is_label_noise(&name)).then_some(name)
    };
    if let Some(email) = email {
        let window = match find_ci(last_page, email) {
            Some(pos) => around(last_page, pos, pos, 120, 120),
            None => last_page,
        };
        if let Some(name) = CAPITALIZED_RUN_RE.captures(window).and_then(|c| accept(&c[1])) {
            return Some(Scored::new(name, "inferred_from_email_window", 40));
        }
    }
    if let Some(name) = NOTARY_RE.captures(last_page).and_then(|c| accept(&c[1])) {
        return Some(Scored::new(name, "notary_block_inferred", 32));
    }
    SIG_NEARBY_RE
        .captures(last_page)
        .and_then(|c| accept(&c[1]))
        .map(|name| Scored::new(name, "signature_nearby", 35))
}

// ═══════════════════════════════════════════
// Extractor
// ═══════════════════════════════════════════

/// Fill fields the cascades left empty from generic label windows.
fn anchor_fallbacks(input: &SegmentInput<'_>, ledger: &mut CandidateLedger) {
    let lines = split_lines(input.text);
    let first_lines = |labels: &[&str], max: usize| -> Vec<String> {
        window_after_labels(&lines, labels, max, false)
            .iter()
            .map(|w| w.lines().next().unwrap_or("").to_string())
            .filter(|l| !l.is_empty())
            .collect()
    };

    if !ledger.has_accepted(Field::DeceasedName) {
        for cand in first_lines(&["decedent", "deceased", "deceased information"], 2) {
            let cleaned = clean_candidate_name(&cand);
            if is_label_noise(&cleaned) {
                ledger.reject(Field::DeceasedName, "fallback_anchor", cleaned, "label_noise");
                continue;
            }
            if validate_person_name(&cleaned) && plausible_name(&cleaned) {
                ledger.accept(Field::DeceasedName, "fallback_anchor", cleaned, 15);
                break;
            }
        }
    }
    if !ledger.has_accepted(Field::PetitionerName) {
        let cands = first_lines(&["petitioner", r"petitioner\(s\)", "co-petitioner", "petitioner information"], 2);
        let alt = best_from_candidates(&cands, clean_candidate_name, plausible_name);
        ledger.cascade(Field::PetitionerName).attempt("fallback_anchor", 15, || alt);
    }
    let address_fallback = |labels: &[&str], keywords: &[&str]| {
        let mut cands: Vec<String> = window_after_labels(&lines, labels, 4, false)
            .iter()
            .flat_map(|w| find_addresses(w))
            .collect();
        let near = find_address_near_keywords(input.text, keywords);
        if !near.is_empty() {
            cands.push(near);
        }
        clean_text(&pick_best_address(&cands))
    };
    if !ledger.has_accepted(Field::PetitionerAddress) {
        let best = address_fallback(
            &["petitioner address", "mailing address", "residence address", "address of petitioner"],
            &["petitioner", "mailing address", "petitioner address"],
        );
        ledger.cascade(Field::PetitionerAddress).attempt("fallback_anchor", 15, || best);
    }
    if !ledger.has_accepted(Field::DeceasedPropertyAddress) {
        let best = address_fallback(
            &["domicile address", "domicile", "residence", "address of decedent", "property address"],
            &["domicile", "residence", "property address", "decedent"],
        );
        ledger.cascade(Field::DeceasedPropertyAddress).attempt("fallback_anchor", 15, || best);
    }
    if ledger.has_accepted(Field::Attorney) {
        ledger.cascade(Field::PhoneNumber).attempt("fallback_generic", 10, || extract_phone(input.text));
        ledger.cascade(Field::EmailAddress).attempt("fallback_generic", 5, || extract_email(input.text));
    }
}

/// Extractor for the probate petition template.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProbateExtractor;

impl FieldExtractor for ProbateExtractor {
    fn name(&self) -> &'static str {
        "probate"
    }

    fn extract(
        &self,
        input: &SegmentInput<'_>,
        ledger: &mut CandidateLedger,
    ) -> Result<FieldRecord, ExtractionError> {
        let attorney = attorney_info(input, ledger);

        let mut decedent = deceased_name(input, ledger);
        if decedent.is_empty() {
            decedent = strict_decedent_name_scan(input.text);
            let value = decedent.clone();
            ledger.cascade(Field::DeceasedName).attempt("strict_scan", 30, || value);
        }

        let mut petitioner = petitioner_name(input, ledger);
        if let Some(aligned) = align_surname(&petitioner, &decedent, input.config.surname_similarity) {
            ledger.adjust(Field::PetitionerName, "surname_alignment", aligned.clone(), "near_match_to_decedent");
            petitioner = aligned;
        }

        petitioner_address(input, ledger)?;
        if deceased_address(input, ledger)?.is_empty() {
            let strict = clean_address_strict(&strict_decedent_address_scan(input.text));
            ledger.cascade(Field::DeceasedPropertyAddress).attempt("strict_scan", 30, || strict);
        }

        let rel = relationship(input, &petitioner, ledger);
        if !is_allowed(&rel) {
            let strict = strict_relationship_scan(input.text, &petitioner);
            let replacement = if strict.is_empty() { "Unknown".to_string() } else { strict };
            ledger.adjust(Field::Relationship, "strict_scan", replacement, "not_allow_listed");
        }

        if let Some(value) = property_value(input.pages, input.config.money_floor) {
            ledger.accept(Field::PropertyValue, value.source, value.value, value.score);
        }

        let has_attorney = attorney.name.is_some();
        if let Some(name) = attorney.name {
            ledger.accept(Field::Attorney, name.source, name.value, name.score);
        }
        ledger
            .cascade(Field::PhoneNumber)
            .attempt_scored(|| attorney.phone)
            .attempt_scored(|| primary_phone(input));
        ledger
            .cascade(Field::EmailAddress)
            .attempt_scored(|| attorney.email)
            .attempt("generic_email", 20, || lower(&extract_email(input.text)))
            .attempt("email_pages_scan", 90, || {
                find_emails_in_pages(input.pages, EMAIL_ANCHORS, input.config.email_window)
            });

        if has_attorney && input.config.ny_phone_repair {
            let phone = ledger.resolve(Field::PhoneNumber);
            if let Some((fixed, reason)) = correct_ny_phone(&phone, input.pages) {
                ledger.adjust(Field::PhoneNumber, "ny_area_code", fixed, reason);
            }
        }

        anchor_fallbacks(input, ledger);
        let record = ledger.to_record();
        tracing::debug!(missing = record.missing().len(), "probate extraction done");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_config::ExtractionConfig;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    fn run(pages: &[String]) -> (FieldRecord, CandidateLedger) {
        let config = ExtractionConfig::default();
        let text = pages.join("\n");
        let input = SegmentInput::new(&text, pages, &config);
        let mut ledger = CandidateLedger::new();
        let rec = ProbateExtractor.extract(&input, &mut ledger).unwrap();
        (rec, ledger)
    }

    const PAGE1: &str = "SURROGATE'S COURT OF THE STATE OF NEW YORK\n\
        PROBATE PROCEEDING, WILL OF WALTER SCOTT a/k/a WALT SCOTT\n\
        Petitioner Information\n\
        Name (First, Middle, Last)\n\
        ANNA SCOT\n\
        Domicile or Principal Office: 45 Maple Avenue\n\
        City, Village or Town: Staten Island\n\
        State NY Zip Code 10314\n\
        Interest(s) of Petitioner: Distributee of decedent (state relationship): Spouse\n";
    const PAGE2: &str = "2. The name, domicile and date of death of the decedent are as follows:\n\
        Name: Walter Scott\n\
        Domicile: Street 45 Maple Avenue\n\
        City Staten Island\n\
        State New York\n\
        Zip Code 10314\n\
        Improved real property in New York State $350,000.00\n";
    const PAGE3: &str = "Signature of Attorney\n\
        Print Name of Attorney: JANE ROE, ESQ.\n\
        Firm Name: Roe Law PLLC\n\
        Telephone (718) 555-0101\n\
        Email (optional): jroe@roelaw.com\n";

    #[test]
    fn will_of_caption_cuts_alias() {
        let (rec, ledger) = run(&pages(&[PAGE1, PAGE2, PAGE3]));
        assert_eq!(rec.get(Field::DeceasedName), "Walter Scott");
        let alias = ledger
            .candidates(Field::DeceasedName)
            .iter()
            .find(|c| c.source == "alias_detected");
        assert!(alias.is_some());
    }

    #[test]
    fn decedent_information_stops_at_first_page_that_has_it() {
        let (rec, ledger) = run(&pages(&[
            "Cover sheet",
            "Decedent Information\nName: Rose Kelly",
            "Decedent Information\nName: Ada Byron",
        ]));
        assert_eq!(rec.get(Field::DeceasedName), "Rose Kelly");
        let sources: Vec<&str> = ledger
            .candidates(Field::DeceasedName)
            .iter()
            .map(|c| c.source.as_str())
            .collect();
        assert!(sources.contains(&"decedent_information_pg2"));
        assert!(!sources.contains(&"decedent_information_pg3"));
    }

    #[test]
    fn petitioner_block_name_and_surname_alignment() {
        let (rec, ledger) = run(&pages(&[PAGE1, PAGE2, PAGE3]));
        assert_eq!(rec.get(Field::PetitionerName), "Anna Scott");
        assert_eq!(ledger.best(Field::PetitionerName).unwrap().source, "petitioner_info_block");
    }

    #[test]
    fn interest_line_gives_spouse() {
        let (rec, ledger) = run(&pages(&[PAGE1, PAGE2, PAGE3]));
        assert_eq!(rec.get(Field::Relationship), "Spouse");
        assert_eq!(ledger.best(Field::Relationship).unwrap().score, 120);
    }

    #[test]
    fn attorney_block_supplies_contact() {
        let (rec, _) = run(&pages(&[PAGE1, PAGE2, PAGE3]));
        assert_eq!(rec.get(Field::Attorney), "Jane Roe");
        assert_eq!(rec.get(Field::PhoneNumber), "718-555-0101");
        assert_eq!(rec.get(Field::EmailAddress), "jroe@roelaw.com");
    }

    #[test]
    fn improved_real_property_value() {
        let (rec, _) = run(&pages(&[PAGE1, PAGE2, PAGE3]));
        assert_eq!(rec.get(Field::PropertyValue), "350000");
    }

    #[test]
    fn name_after_label_skips_address_rows() {
        let block: Vec<String> = ["Name", "Domicile: 12 Oak Street", "Mary Major", "Troy"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(name_after_label(&block, "Name"), "Mary Major");
    }

    #[test]
    fn block_address_stops_at_boundary() {
        let block: Vec<String> = [
            "Domicile Address: 1311 Ventura Drive",
            "City, Village or Town: Lakewood",
            "State: New Jersey Zip Code 08701",
            "Description of legacy: 99 Other Road, Troy, NY 12180",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let found = address_from_block(&block, &[]).unwrap().unwrap();
        assert_eq!(found.source, "anchored_block");
        assert!(found.value.starts_with("1311 Ventura Drive"));
        assert!(found.value.ends_with("08701"));
    }

    #[test]
    fn relationship_defaults_to_unknown() {
        let (rec, ledger) = run(&pages(&["nothing useful here at all"]));
        assert_eq!(rec.get(Field::Relationship), "Unknown");
        assert_eq!(ledger.best(Field::Relationship).unwrap().source, "fallback_default");
    }

    #[test]
    fn strict_scans() {
        assert_eq!(strict_decedent_name_scan("ESTATE OF: John Smith"), "John Smith");
        assert_eq!(
            strict_decedent_address_scan("Domicile: 16 Ada Drive, Staten Island, NY 10314"),
            "16 Ada Drive, Staten Island, NY 10314"
        );
    }
}
