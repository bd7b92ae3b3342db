//! Street address discovery, OCR repair and canonical formatting.
//!
//! A complete address reads `<number> <street>, <city>, <ST> <zip>`.
//! `clean_address` is the lenient formatter used on every raw match;
//! `clean_address_strict` additionally cuts role contamination and tries
//! to reattach a state/ZIP that the cut removed.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::lexicon::{
    state_code, BANNED_ADDRESS_TERMS, NAME_ROLE_TOKENS, STATE_ALT, STATE_CODE_ALT, STATE_MAP,
    STREET_ALT, STREET_TOKENS,
};
use super::text::{around, clean_value, collapse_ws, lower, title_case, trim_chars};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static DOUBLE_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| re(r",\s*,"));
static LEADING_NUMBER_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| re(r"^(\d+),\s*"));

/// OCR repairs applied case-insensitively, in order.
static OCR_REPAIRS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\bN\s+ISLAND\b", "Staten Island"),
        (r"\bSTATEN,\s*ISLAND\b", "Staten Island"),
        (r"\bSTATEN\s+IS\.?\b", "Staten Island"),
        (r"\bSTATENISLAND\b", "Staten Island"),
        (r"\bSC\s+Staten\s+Island\b", "Staten Island"),
        (r"\bSTATEN\s+ISLAND,\s*STATEN\s+ISLAND\b", "Staten Island"),
        (r"\bBouleva\s*rd\b", "Boulevard"),
        (r"\bWe\s+st\b", "West"),
        (r"\bS\.?I\.?\b", "Staten Island"),
        (r"\bStaten\s+Island\s+Staten\s+Island\b", "Staten Island"),
        (r"\bB\s*road\s+Street\b", "Broad Street"),
        (r"\bStaten\s*,\s*NY\b", "Staten Island, NY"),
        (r"\bStaten\s+NY\b", "Staten Island, NY"),
        (r"Island\.,", "Island,"),
        (r"\bNew[, ]+YORK\b", "New York"),
        (r"\bNew,\s*York\b", "New York"),
    ]
    .into_iter()
    .map(|(p, good)| (re(&format!("(?i){p}")), good))
    .collect()
});

static STATEN_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bStaten\b"));
static STATEN_ISLAND_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bStaten\s+Island\b"));
static NY_WORD_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\b(?:NY|New York)\b"));
static REPEATED_ISLAND_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)Staten Island(?:\s+Island)+"));
static ISLAND_ISLAND_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)Island\s+Island+"));
static UNIT_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(apt|apartment|unit|ste|suite)\b\.?\s*([0-9A-Za-z]+)\s+([A-Za-z])")
});
static STREET_CITY_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"(?i)^(\d[^,]+?(?:{STREET_ALT}))\s+([A-Za-z .'-]+),\s*([A-Z]{{2}})\s+(\d{{5}}(?:-\d{{4}})?)"
    ))
});
static SUFFIXED_NO_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"(?i)(\d{{1,6}}\s+[A-Za-z0-9 .'-]+?\b(?:{STREET_ALT}))\.?\s+([A-Za-z .'-]+?)\s+({STATE_ALT})\s+(\d{{5}})"
    ))
});
static NO_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"(\d{{1,6}}\s+[A-Za-z0-9 .'-]+?)\s+([A-Za-z .'-]+)\s+({STATE_ALT})\s+(\d{{5}})"
    ))
});
static COMMA_BEFORE_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"(\d{{1,6}}\s+[A-Za-z0-9 .'-]+?)\s+([A-Za-z .'-]+),\s+({STATE_ALT})\s+(\d{{5}})"
    ))
});
static TWO_LETTERS_RE: LazyLock<Regex> = LazyLock::new(|| re(r"^[A-Za-z]{2}$"));
static ZIP_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| re(r"^\d{5}(?:-\d{4})?$"));
static COMMA_STREET_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r",\s+(Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Place|Pl|Boulevard|Blvd|Terrace|Ter|Court|Ct|Way)\b")
});

/// Canonical two-letter code for a state name, or the input uppercased.
pub fn normalize_state(state: &str) -> String {
    state_code(state)
        .map(str::to_string)
        .unwrap_or_else(|| state.to_uppercase())
}

/// Preference score between competing address matches.
pub fn score_address(addr: &str) -> i32 {
    static FOUR_DIGIT_LEAD_RE: LazyLock<Regex> = LazyLock::new(|| re(r"^\d{4}\s"));
    static ZIP_10314_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\b10314\b"));
    let low = lower(addr);
    let mut score = 0;
    if FOUR_DIGIT_LEAD_RE.is_match(addr) {
        score -= 2;
    }
    if low.contains("hospital") {
        score -= 5;
    }
    if low.contains("place of death") {
        score -= 3;
    }
    if low.contains("broadway") {
        score -= 2;
    }
    if low.contains("new york") {
        score += 2;
    }
    if low.contains("staten island") {
        score += 1;
    }
    if ZIP_10314_RE.is_match(&low) {
        score += 2;
    }
    score
}

/// Lenient formatter: OCR repairs, comma insertion between street, city and
/// state, state names to codes.
pub fn clean_address(addr: &str) -> String {
    let addr = collapse_ws(addr);
    let addr = trim_chars(&addr, " ,");
    let addr = DOUBLE_COMMA_RE.replace_all(addr, ", ");
    let mut addr = LEADING_NUMBER_COMMA_RE.replace(&addr, "${1} ").to_string();

    for (pattern, good) in OCR_REPAIRS.iter() {
        addr = pattern.replace_all(&addr, *good).to_string();
    }
    if STATEN_RE.is_match(&addr) && !STATEN_ISLAND_RE.is_match(&addr) && NY_WORD_RE.is_match(&addr)
    {
        addr = STATEN_RE.replace_all(&addr, "Staten Island").to_string();
    }
    addr = REPEATED_ISLAND_RE.replace_all(&addr, "Staten Island").to_string();
    addr = ISLAND_ISLAND_RE.replace_all(&addr, "Island").to_string();
    addr = UNIT_COMMA_RE.replace_all(&addr, "${1} ${2}, ${3}").to_string();
    addr = STREET_CITY_STATE_RE
        .replace(&addr, "${1}, ${2}, ${3} ${4}")
        .to_string();

    if !addr.contains(',') {
        for pattern in [&*SUFFIXED_NO_COMMA_RE, &*NO_COMMA_RE, &*COMMA_BEFORE_STATE_RE] {
            if let Some(caps) = pattern.captures(&addr) {
                return format!(
                    "{}, {}, {} {}",
                    caps[1].trim(),
                    caps[2].trim(),
                    normalize_state(&caps[3]),
                    &caps[4]
                );
            }
        }
    }

    let parts: Vec<&str> = addr.split(',').collect();
    if parts.len() >= 2 {
        let state_zip: Vec<&str> = parts[parts.len() - 1].split_whitespace().collect();
        let n = state_zip.len();
        let ends_in_zip = state_zip.last().is_some_and(|z| ZIP_TOKEN_RE.is_match(z));
        if !ends_in_zip {
            // nothing to reshape
        } else if n >= 3 && TWO_LETTERS_RE.is_match(state_zip[n - 2]) {
            let state = normalize_state(state_zip[n - 2]);
            let zip = state_zip[n - 1];
            let city_extra = state_zip[..n - 2].join(" ");
            let mut base: Vec<String> = parts[..parts.len() - 1]
                .iter()
                .map(|p| p.trim().to_string())
                .collect();
            if !city_extra.is_empty() {
                if base.len() == 1 {
                    base.push(city_extra);
                } else if let Some(last) = base.last_mut() {
                    *last = format!("{last} {city_extra}").trim().to_string();
                }
            }
            base.push(format!("{state} {zip}"));
            addr = base.join(", ");
        } else if n >= 2 {
            let state = normalize_state(&state_zip[..n - 1].join(" "));
            let zip = state_zip[n - 1];
            let mut out: Vec<String> = parts[..parts.len() - 1]
                .iter()
                .map(|p| p.trim().to_string())
                .collect();
            out.push(format!("{state} {zip}"));
            addr = out.join(", ");
        }
    }
    let addr = COMMA_STREET_TYPE_RE.replace_all(&addr, " ${1}");
    LEADING_NUMBER_COMMA_RE.replace(&addr, "${1} ").to_string()
}

/// Street number (or PO box), street-type token, state and ZIP all present.
pub fn has_required_components(addr: &str) -> bool {
    static PO_BOX_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bpo\s*box\b"));
    static STATE_WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| re(&format!(r"(?i)\b(?:{STATE_ALT})\b")));
    static ZIP_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\d{5}(?:-\d{4})?"));
    if addr.is_empty() {
        return false;
    }
    let po_box = PO_BOX_RE.is_match(addr);
    if !(addr.starts_with(|c: char| c.is_ascii_digit()) || po_box) {
        return false;
    }
    let low = lower(addr);
    let has_street = low
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|tok| STREET_TOKENS.contains(&tok));
    if !has_street && !po_box {
        return false;
    }
    STATE_WORD_RE.is_match(addr) && ZIP_RE.is_match(addr)
}

static BANNED_TERM_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alt = BANNED_ADDRESS_TERMS
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    re(&format!(r"(?i)\b(?:{alt})\b"))
});
static BANNED_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alt = BANNED_ADDRESS_TERMS
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    re(&format!(r"(?i)\b(?:{alt})\b.{{0,40}}"))
});

/// Cut `addr` at its earliest role/fiduciary term. Returns whether a cut
/// happened.
pub fn truncate_at_role_term(addr: &str) -> (String, bool) {
    match BANNED_TERM_RE.find(addr) {
        Some(m) => (trim_chars(&addr[..m.start()], " ,").to_string(), true),
        None => (addr.to_string(), false),
    }
}

/// Split `21st` style ordinals apart from other digit/letter fusions.
fn split_digit_letter(caps: &Captures<'_>) -> String {
    let letters = &caps[2];
    if matches!(lower(letters).as_str(), "st" | "nd" | "rd" | "th") {
        format!("{}{}", &caps[1], letters)
    } else {
        format!("{} {}", &caps[1], letters)
    }
}

/// Strict formatter: OCR un-fusing, role-term truncation, then repair passes
/// that rebuild a complete address from the raw text when the cut removed
/// the city or state. Falls back to the lenient format when nothing
/// complete can be rebuilt.
pub fn clean_address_strict(raw: &str) -> String {
    static LEADING_S_RE: LazyLock<Regex> = LazyLock::new(|| re(r"^S(\d)"));
    static DIGIT_LETTER_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(\d)([A-Za-z]+)"));
    static LETTER_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| re(r"([A-Za-z])(\d)"));
    static FUSED_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
        re(r"(?i)\b([A-Za-z]{3,})(avenue|street|road|drive|lane|court|place|boulevard)\b")
    });
    static STREET_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| {
        re(&format!(r"(?i)^(\d[^,]+?(?:{STREET_ALT}|Pkwy|Parkway))\s+(.*)$"))
    });
    static CITY_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| {
        re(r"^(\d[^,]+?)\s+([A-Za-z .'-]+),\s*([A-Z]{2})\s+(\d{5}(?:-\d{4})?)")
    });
    static CITY_STATE_ZIP_RE: LazyLock<Regex> = LazyLock::new(|| {
        re(&format!(
            r"(?i)([A-Za-z .'-]+),\s*({STATE_ALT})\s+(\d{{5}}(?:-\d{{4}})?)"
        ))
    });

    if raw.trim().is_empty() {
        return String::new();
    }
    let addr = collapse_ws(&raw.replace('\n', " "));
    let addr = trim_chars(&addr, " ,");
    let addr = LEADING_S_RE.replace(addr, "5${1}");
    let addr = DIGIT_LETTER_RE.replace_all(&addr, split_digit_letter);
    let addr = LETTER_DIGIT_RE.replace_all(&addr, "${1} ${2}");
    let addr = FUSED_SUFFIX_RE.replace_all(&addr, "${1} ${2}");
    let (addr, cut) = truncate_at_role_term(&addr);
    if cut {
        tracing::debug!("address truncated at role term");
    }
    let mut addr = clean_address(&addr);
    if !addr.contains(',') {
        if let Some(caps) = STREET_COMMA_RE.captures(&addr) {
            addr = format!("{}, {}", &caps[1], &caps[2]);
        }
    }
    addr = LEADING_NUMBER_COMMA_RE.replace(&addr, "${1} ").to_string();
    addr = CITY_COMMA_RE
        .replace(&addr, "${1}, ${2}, ${3} ${4}")
        .to_string();

    if has_required_components(&addr) && addr.len() >= 8 {
        return LEADING_NUMBER_COMMA_RE.replace(&addr, "${1} ").to_string();
    }

    // Repair 1: reattach the last city/state/ZIP found in the raw text.
    if addr.starts_with(|c: char| c.is_ascii_digit()) {
        let matches: Vec<Captures<'_>> = CITY_STATE_ZIP_RE.captures_iter(raw).collect();
        for caps in matches.iter().rev() {
            let city_raw = caps[1].trim();
            let mut city = BANNED_TERM_RE
                .split(city_raw)
                .next()
                .map(|s| trim_chars(s, " ,").to_string())
                .unwrap_or_default();
            if city.is_empty() {
                city = caps[1]
                    .split_whitespace()
                    .filter(|w| w.chars().all(char::is_alphabetic))
                    .last()
                    .unwrap_or("")
                    .to_string();
            }
            if city.is_empty() {
                continue;
            }
            let candidate = clean_address(&format!("{addr}, {city}, {} {}", &caps[2], &caps[3]));
            if has_required_components(&candidate) {
                return candidate;
            }
        }
    }

    // Repair 2: salvage another complete address from the raw text.
    for candidate in find_addresses(raw) {
        let (cut, _) = truncate_at_role_term(&candidate);
        let cleaned = clean_address(&cut);
        if has_required_components(&cleaned) && cleaned.len() >= 8 {
            return cleaned;
        }
    }

    // Repair 3: drop role phrases and their trailing words, then salvage.
    let scrubbed = BANNED_SPAN_RE.replace_all(raw, " ");
    for candidate in find_addresses(&scrubbed) {
        let cleaned = clean_address(&candidate);
        if has_required_components(&cleaned) && cleaned.len() >= 8 {
            return cleaned;
        }
    }

    tracing::debug!("address failed validation; keeping lenient form");
    if addr.chars().any(|c| c.is_ascii_digit()) {
        clean_address(&addr)
    } else {
        String::new()
    }
}

/// Every address-shaped span in `text`, formatted and deduplicated.
pub fn find_addresses(text: &str) -> Vec<String> {
    static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\([^)]+\)"));
    static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        vec![
            re(r"\d{1,6}[^\n,]{0,60}?,\s*[A-Za-z .'-]+,\s*[A-Z]{2}\s*\d{5}(?:-\d{4})?"),
            re(&format!(
                r"\d{{1,6}}\s+[A-Za-z0-9 .'-]+?\s+(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Place|Pl|Boulevard|Blvd|Terrace|Ter|Court|Ct|Way)[A-Za-z0-9 .'-]*?,?\s+[A-Za-z .'-]+,?\s+(?:{STATE_ALT})\s+\d{{5}}(?:-\d{{4}})?"
            )),
            re(&format!(
                r"\d{{1,6}}\s+[A-Za-z0-9 .'-]+?,\s*[A-Za-z .'-]+(?:\s+[A-Za-z .'-]+)?\s+(?:{STATE_ALT})\s+\d{{5}}(?:-\d{{4}})?"
            )),
        ]
    });
    let search = PAREN_RE.replace_all(text, " ");
    let mut out: Vec<String> = Vec::new();
    for pattern in PATTERNS.iter() {
        for m in pattern.find_iter(&search) {
            let cleaned = clean_address(m.as_str());
            if !out.contains(&cleaned) {
                out.push(cleaned);
            }
        }
    }
    out
}

/// First address near the first keyword that occurs, preferring one that
/// is not a hospital.
pub fn find_address_near_keywords(text: &str, keywords: &[&str]) -> String {
    let low = lower(text);
    for kw in keywords {
        let Some(start) = low.find(&lower(kw)) else {
            continue;
        };
        let addresses = find_addresses(around(text, start, start, 150, 300));
        if let Some(addr) = addresses.iter().find(|a| !lower(a).contains("hospital")) {
            return addr.clone();
        }
        if let Some(first) = addresses.into_iter().next() {
            return first;
        }
    }
    String::new()
}

/// Highest-scoring distinct candidate; the first wins ties.
pub fn pick_best_address(candidates: &[String]) -> String {
    let mut seen = HashSet::new();
    let mut best: Option<(&str, i32)> = None;
    for addr in candidates {
        if addr.is_empty() || !seen.insert(addr.as_str()) {
            continue;
        }
        let score = score_address(addr);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((addr.as_str(), score));
        }
    }
    best.map(|(a, _)| a.to_string()).unwrap_or_default()
}

// ═══════════════════════════════════════════
// Assembly from labeled parts
// ═══════════════════════════════════════════

/// State text to a display form: fused names are split, two-letter codes
/// uppercased, anything else title-cased.
pub fn canonical_state_name(value: &str) -> String {
    static NON_ALPHA_RE: LazyLock<Regex> = LazyLock::new(|| re(r"[^A-Za-z ]"));
    let value_clean = clean_value(value);
    let cleaned = NON_ALPHA_RE.replace_all(&value_clean, " ");
    let cleaned = collapse_ws(&cleaned);
    if cleaned.is_empty() {
        return String::new();
    }
    let fused = lower(&cleaned.replace(' ', ""));
    if let Some((full, _)) = STATE_MAP.iter().find(|(full, _)| full.replace(' ', "") == fused) {
        return title_case(full);
    }
    if cleaned.len() == 2 {
        return cleaned.to_uppercase();
    }
    title_case(&cleaned)
}

/// Remove citizenship phrases that share a line with city or state.
pub fn strip_citizenship(value: &str) -> String {
    static CITIZENSHIP_RE: LazyLock<Regex> =
        LazyLock::new(|| re(r"(?i)\b(?:united\s+states|usa)\b"));
    trim_chars(&CITIZENSHIP_RE.replace_all(value, ""), " ,").to_string()
}

fn title_place(value: &str) -> String {
    value
        .split_whitespace()
        .map(|part| {
            if part.len() == 2 && part.chars().all(|c| c.is_ascii_uppercase()) {
                part.to_string()
            } else {
                title_case(part)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Join labeled street, city, state and ZIP into one address line.
pub fn assemble_address(street: &str, city: &str, state: &str, zip: &str) -> String {
    static LEADING_JUNK_RE: LazyLock<Regex> = LazyLock::new(|| re(r"^[^A-Za-z0-9]+"));
    static LEADING_NON_ALPHA_RE: LazyLock<Regex> = LazyLock::new(|| re(r"^[^A-Za-z]+"));
    static STREET_TYPE_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| {
        re(r"(?i),\s+(Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Boulevard|Blvd|Court|Ct|Place|Pl|Way|Pkwy|Parkway)\b")
    });
    static COUNTY_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bcounty\b.*"));
    static STATE_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\bstate\b.*"));
    static TRAILING_ZIP_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\s*\d{5}(?:-\d{4})?$"));

    let street = clean_value(&street.replace('\n', " "));
    let street = LEADING_JUNK_RE.replace(&street, "");
    let street = STREET_TYPE_COMMA_RE.replace_all(&street, " ${1}");

    let city = strip_citizenship(&clean_value(&city.replace('\n', " ")));
    let city = COUNTY_TAIL_RE.replace(&city, "");
    let city = STATE_TAIL_RE.replace(trim_chars(&city, " ,"), "");
    let city = TRAILING_ZIP_RE.replace(trim_chars(&city, " ,"), "");
    let city = LEADING_NON_ALPHA_RE.replace(&city, "");
    let mut city_parts: Vec<&str> = city.split_whitespace().collect();
    if city_parts.first().is_some_and(|p| p.chars().count() == 1) {
        city_parts.remove(0);
    }
    let city = title_place(&city_parts.join(" "));
    let state = title_place(&clean_value(&state.replace('\n', " ")));
    let zip = zip.trim();

    let city_state = [city.as_str(), state.as_str()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    let mut out = [&*street, city_state.as_str()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if !out.is_empty() && !zip.is_empty() {
        out = format!("{out} {zip}");
    }
    clean_value(&out)
}

// ═══════════════════════════════════════════
// Canonicalization used by the normalizer
// ═══════════════════════════════════════════

/// Repair UTF-8 mojibake and collapse whitespace. Dashes are kept.
pub fn clean_text(value: &str) -> String {
    const MOJIBAKE: &[(&str, &str)] = &[
        ("â€”", "-"),
        ("â€“", "-"),
        ("â€˜", "'"),
        ("â€™", "'"),
        ("â€œ", "\""),
        ("â€\u{fffd}", "\""),
        ("Â", ""),
    ];
    let mut s = value.to_string();
    for (bad, good) in MOJIBAKE {
        s = s.replace(bad, good);
    }
    let s = s.replace(['\u{2014}', '\u{2013}'], "-");
    collapse_ws(&s)
}

/// Address-only tidy: dashes become comma separators, "State:" labels and
/// Richmond county captions are dropped, a state fused onto the city gets
/// its comma back.
pub fn normalize_address(value: &str) -> String {
    static DASH_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\s*-\s+|\s+-\s*"));
    static STATE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)state:\s*"));
    static RICHMOND_RE: LazyLock<Regex> =
        LazyLock::new(|| re(r"(?i),?\s*\b(?:richmond\s+county|county\s+of\s+richmond)\b:?"));
    static FUSED_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
        re(&format!(r"([a-z])({STATE_CODE_ALT}|New York|New Jersey)\b"))
    });
    static SPACE_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\s+,"));
    if value.trim().is_empty() {
        return String::new();
    }
    let s = clean_text(value);
    let s = DASH_RE.replace_all(&s, ", ");
    let s = STATE_LABEL_RE.replace_all(&s, "");
    let s = RICHMOND_RE.replace_all(&s, "");
    let s = FUSED_STATE_RE.replace_all(&s, "${1}, ${2}");
    let s = SPACE_COMMA_RE.replace_all(&s, ",");
    let s = DOUBLE_COMMA_RE.replace_all(&s, ",");
    let s = collapse_ws(&s);
    let s = SPACE_COMMA_RE.replace_all(&s, ",");
    trim_chars(&s, " ,;:").to_string()
}

/// Full state names to codes, duplicate ZIPs dropped, `City, ST ZIP` shape.
pub fn normalize_us_address(value: &str) -> String {
    static STATE_NAME_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
        STATE_MAP
            .iter()
            .map(|(full, code)| (re(&format!(r"(?i)\b{full}\b")), *code))
            .collect()
    });
    static ZIP5_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\b(\d{5})(?:-\d{4})?\b"));
    static ZIP_BEFORE_STATE_RE: LazyLock<Regex> =
        LazyLock::new(|| re(r"([A-Za-z .'-]+)\s+(\d{5}),\s*([A-Za-z]{2})"));
    static CITY_STATE_ZIP_RE: LazyLock<Regex> =
        LazyLock::new(|| re(r"([A-Za-z .'-]+),?\s+([A-Za-z]{2})\s+(\d{5})"));
    static SPACE_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\s+,"));
    if value.trim().is_empty() {
        return String::new();
    }
    let mut s = collapse_ws(&clean_text(value));
    for (pattern, code) in STATE_NAME_RES.iter() {
        s = pattern.replace_all(&s, *code).to_string();
    }

    let zips: Vec<String> = ZIP5_RE
        .captures_iter(&s)
        .filter(|c| c.get(0).is_some_and(|m| m.start() > 10))
        .map(|c| c[1].to_string())
        .collect();
    if let Some(first) = zips.first() {
        for z in zips.iter().skip(1).filter(|z| *z == first) {
            if let Some(idx) = s.rfind(z.as_str()) {
                s = format!("{} {}", s[..idx].trim_end_matches([' ', ',']), &s[idx + z.len()..])
                    .trim()
                    .to_string();
            }
        }
    }

    let s = ZIP_BEFORE_STATE_RE.replace_all(&s, "${1}, ${3} ${2}");
    let s = CITY_STATE_ZIP_RE.replace_all(&s, "${1}, ${2} ${3}");
    let s = s.replace(" ,", ",");
    let s = DOUBLE_COMMA_RE.replace_all(&s, ",");
    let s = SPACE_COMMA_RE.replace_all(&s, ",");
    trim_chars(&collapse_ws(&s), " ,").to_string()
}

/// Last-pass scrub: duplicated place tokens, split street words, stray role
/// words.
pub fn scrub_address(value: &str) -> String {
    static FIXES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
        vec![
            (re(r"(?i)\bSS\s+Staten\s+Island\b"), "Staten Island"),
            (re(r"(?i)\bStaten\s+Island\s+Staten\s+Island\b"), "Staten Island"),
            (re(r"(?i)\bNew,\s*YORK\b"), "New York"),
            (re(r"(?i)\bBouleva\s*rd\b"), "Boulevard"),
            (re(r"(?i)\bWe\s+st\b"), "West"),
            (re(r"(?i)\bISLAND\s+ISLAND\b"), "Island"),
        ]
    });
    static ROLE_RE: LazyLock<Regex> =
        LazyLock::new(|| re(&format!(r"(?i)\b(?:{})\b", NAME_ROLE_TOKENS.join("|"))));
    if value.is_empty() {
        return String::new();
    }
    let mut out = value.to_string();
    for (pattern, good) in FIXES.iter() {
        out = pattern.replace_all(&out, *good).to_string();
    }
    let out = ROLE_RE.replace_all(&out, "");
    let out = collapse_ws(&out).replace(" ,", ",");
    trim_chars(&out, " ,;").to_string()
}

static STATE_CODE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)\b(?:{STATE_CODE_ALT})\b")));

/// Leading street number and a two-letter state code.
pub fn has_state_and_street(addr: &str) -> bool {
    static STREET_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| re(r"^\s*\d{1,6}\b"));
    STREET_NUMBER_RE.is_match(addr) && STATE_CODE_WORD_RE.is_match(addr)
}

pub fn has_state_code(addr: &str) -> bool {
    STATE_CODE_WORD_RE.is_match(addr)
}

/// Anything with a ZIP or a numbered street.
pub fn looks_like_address(value: &str) -> bool {
    static ZIP_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\d{5}(?:-\d{4})?"));
    static STREET_RE: LazyLock<Regex> = LazyLock::new(|| {
        re(r"(?i)\d{1,6}[^,\n]{0,60}(?:Street|St|Avenue|Ave|Road|Rd|Lane|Ln|Drive|Dr|Boulevard|Blvd|Court|Ct|Place|Pl|Way|Terrace|Ter|Parkway|Pkwy)")
    });
    !value.is_empty() && (ZIP_RE.is_match(value) || STREET_RE.is_match(value))
}

/// First two words of a street, the part OCR rarely garbles.
pub fn street_prefix(street: &str) -> String {
    street
        .split_whitespace()
        .map(|t| trim_chars(t, ",;"))
        .filter(|t| !t.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A complete address elsewhere in the pages that shares the street prefix.
pub fn same_street_with_zip(street: &str, pages: &[String]) -> Option<String> {
    static ZIP5_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\d{5}"));
    let prefix = lower(&street_prefix(street));
    if prefix.is_empty() {
        return None;
    }
    find_addresses(&pages.join(" "))
        .into_iter()
        .filter(|cand| lower(cand).contains(&prefix))
        .map(|cand| clean_address_strict(&cand))
        .find(|cand| ZIP5_RE.is_match(cand))
}

/// Complete a street-only address with the `ST ZIP` that follows the same
/// street elsewhere in the pages. Empty when no occurrence of the street
/// carries a state and ZIP.
pub fn upgrade_with_state_zip(addr: &str, pages: &[String]) -> String {
    static HAS_STATE_ZIP_RE: LazyLock<Regex> =
        LazyLock::new(|| re(&format!(r"(?i)\b(?:{STATE_CODE_ALT})\s+\d{{5}}")));
    static STATE_ZIP_RE: LazyLock<Regex> =
        LazyLock::new(|| re(&format!(r"\b({STATE_CODE_ALT})\s+(\d{{5}}(?:-\d{{4}})?)")));
    static CITY_RE: LazyLock<Regex> = LazyLock::new(|| re(r"^[A-Za-z][A-Za-z .']{2,24}$"));
    static STREET_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
        re(r"(?i)^(\d[^,]{0,80}?(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Boulevard|Blvd|Court|Ct|Place|Pl|Way))\s+(.*)$")
    });
    /// Longest stretch between the street prefix and its state code.
    const MAX_GAP: usize = 80;

    if addr.is_empty() {
        return String::new();
    }
    if HAS_STATE_ZIP_RE.is_match(addr) {
        return addr.to_string();
    }
    if let Some(full) = same_street_with_zip(addr, pages).filter(|a| has_state_code(a)) {
        return full;
    }
    let prefix = street_prefix(addr);
    if prefix.is_empty() {
        return String::new();
    }
    let pattern = prefix
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let Ok(prefix_re) = Regex::new(&format!(r"(?i)\b{pattern}\b")) else {
        return String::new();
    };

    let combined = pages.join(" ");
    for caps in STATE_ZIP_RE.captures_iter(&combined) {
        let Some(state_at) = caps.get(0).map(|m| m.start()) else { continue };
        let before = &combined[..state_at];
        let Some(street) = prefix_re.find_iter(before).last() else { continue };
        let gap = &before[street.end()..];
        // Another numbered street in between means the ZIP belongs to it.
        if gap.len() > MAX_GAP || gap.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }
        let gap = trim_chars(gap, " ,");
        let city = gap
            .rfind([',', '\n'])
            .map(|i| trim_chars(&gap[i + 1..], " ,").to_string())
            .filter(|c| CITY_RE.is_match(c))
            .unwrap_or_default();

        let mut base = LEADING_NUMBER_COMMA_RE.replace(addr, "${1} ").to_string();
        if !base.contains(',') {
            base = STREET_SPLIT_RE.replace(&base, "${1}, ${2}").to_string();
        }
        let upgraded = if city.is_empty() || base.contains(',') {
            format!("{base}, {} {}", &caps[1], &caps[2])
        } else {
            format!("{base}, {city}, {} {}", &caps[1], &caps[2])
        };
        return trim_chars(&collapse_ws(&upgraded), " ,").to_string();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ventura_role_contamination_is_cut_and_city_reattached() {
        let raw = "1311 Ventura Drive, beneficiary of residuary estate Ole . Y Lakewood, New Jersey 08701";
        assert_eq!(clean_address_strict(raw), "1311 Ventura Drive, Lakewood, NJ 08701");
    }

    #[test]
    fn clean_address_converts_state_name() {
        assert_eq!(
            clean_address("16 Ada Drive, Staten Island, New York 10314"),
            "16 Ada Drive, Staten Island, NY 10314"
        );
    }

    #[test]
    fn clean_address_repairs_staten_island_variants() {
        assert_eq!(
            clean_address("16 Ada Drive, STATENISLAND, NY 10314"),
            "16 Ada Drive, Staten Island, NY 10314"
        );
        assert_eq!(
            clean_address("16 Ada Drive, Staten, NY 10314"),
            "16 Ada Drive, Staten Island, NY 10314"
        );
    }

    #[test]
    fn clean_address_inserts_commas_without_any() {
        assert_eq!(
            clean_address("16 Ada Drive Staten Island NY 10314"),
            "16 Ada Drive, Staten Island, NY 10314"
        );
    }

    #[test]
    fn clean_address_keeps_whole_city_before_state() {
        assert_eq!(
            clean_address("16 Ada Drive, Staten Island NY 10314"),
            "16 Ada Drive, Staten Island, NY 10314"
        );
    }

    #[test]
    fn required_components() {
        assert!(has_required_components("16 Ada Drive, Staten Island, NY 10314"));
        assert!(!has_required_components("16 Ada Drive"));
        assert!(!has_required_components("Ada Drive, Staten Island, NY 10314"));
    }

    #[test]
    fn truncation_is_word_bounded() {
        let (addr, cut) = truncate_at_role_term("12 Robinson Street, Troy, NY 12180");
        assert!(!cut);
        assert_eq!(addr, "12 Robinson Street, Troy, NY 12180");
        let (addr, cut) = truncate_at_role_term("12 Oak Lane, Spouse of decedent");
        assert!(cut);
        assert_eq!(addr, "12 Oak Lane");
    }

    #[test]
    fn strict_clean_unfuses_digits_but_keeps_ordinals() {
        assert_eq!(
            clean_address_strict("2 21st Street, Brooklyn, NY11201"),
            "2 21st Street, Brooklyn, NY 11201"
        );
    }

    #[test]
    fn strict_clean_without_digits_is_empty() {
        assert_eq!(clean_address_strict("Executor named in will"), "");
    }

    #[test]
    fn find_addresses_skips_parenthesized_text() {
        let text = "Domicile (street and number) 45 Oak Lane, Troy, NY 12180 more";
        assert_eq!(find_addresses(text)[0], "45 Oak Lane, Troy, NY 12180");
    }

    #[test]
    fn pick_best_prefers_staten_island() {
        let cands = vec![
            "1 Hospital Road, Albany, NY 12208".to_string(),
            "16 Ada Drive, Staten Island, NY 10314".to_string(),
        ];
        assert_eq!(pick_best_address(&cands), "16 Ada Drive, Staten Island, NY 10314");
    }

    #[test]
    fn near_keywords_avoids_hospital() {
        let text = "Place of death: 1 Hospital Road, Albany, NY 12208. Domicile: 9 Elm Street, Troy, NY 12180";
        assert_eq!(
            find_address_near_keywords(text, &["domicile"]),
            "9 Elm Street, Troy, NY 12180"
        );
    }

    #[test]
    fn canonical_state_name_unfuses() {
        assert_eq!(canonical_state_name("NEWYORK"), "New York");
        assert_eq!(canonical_state_name("nj"), "NJ");
    }

    #[test]
    fn assemble_from_parts() {
        assert_eq!(
            assemble_address("16 Ada Drive", "Staten Island", "New York", "10314"),
            "16 Ada Drive, Staten Island, New York 10314"
        );
        assert_eq!(
            assemble_address("9 Elm Street", "TROY County of Rensselaer", "NY", ""),
            "9 Elm Street, Troy, NY"
        );
    }

    #[test]
    fn normalize_address_keeps_richmond_avenue() {
        assert_eq!(
            normalize_address("100 Richmond Avenue, Staten Island, Richmond County, NY 10302"),
            "100 Richmond Avenue, Staten Island, NY 10302"
        );
        assert_eq!(normalize_address("5 Hill Road, TroyNY 12180"), "5 Hill Road, Troy, NY 12180");
    }

    #[test]
    fn normalize_us_address_reorders_zip_and_state() {
        assert_eq!(
            normalize_us_address("16 Ada Drive, Staten Island 10314, NY"),
            "16 Ada Drive, Staten Island, NY 10314"
        );
        assert_eq!(
            normalize_us_address("1311 Ventura Drive, Lakewood, New Jersey 08701"),
            "1311 Ventura Drive, Lakewood, NJ 08701"
        );
    }

    #[test]
    fn scrub_removes_roles_and_duplicates() {
        assert_eq!(
            scrub_address("16 Ada Drive, Staten Island Staten Island, NY 10314 Executor"),
            "16 Ada Drive, Staten Island, NY 10314"
        );
        assert_eq!(scrub_address("4 Lowe Street, Troy, NY 12180"), "4 Lowe Street, Troy, NY 12180");
    }

    #[test]
    fn state_and_street_check() {
        assert!(has_state_and_street("16 Ada Drive, Staten Island, NY 10314"));
        assert!(!has_state_and_street("Ada Drive, NY"));
        assert!(!has_state_and_street("16 Ada Drive"));
    }

    #[test]
    fn upgrade_takes_state_zip_from_the_same_street() {
        let pages = vec!["Residence: 16 Ada Crescent\nTroy, NY 12180 with family".to_string()];
        assert_eq!(
            upgrade_with_state_zip("16 Ada Crescent", &pages),
            "16 Ada Crescent, Troy, NY 12180"
        );
        let pages = vec!["Residence: 16 Ada Drive\nNY 10314".to_string()];
        assert_eq!(upgrade_with_state_zip("16 Ada Drive", &pages), "16 Ada Drive, NY 10314");
        assert_eq!(
            upgrade_with_state_zip("16 Ada Drive, Troy, NY 12180", &pages),
            "16 Ada Drive, Troy, NY 12180"
        );
    }

    #[test]
    fn upgrade_ignores_state_zip_of_another_street() {
        let pages = vec![
            "Domicile: 45 Maple Avenue\nAttorney office: 100 Court Street, Brooklyn NY 11201".to_string(),
        ];
        assert_eq!(upgrade_with_state_zip("45 Maple Avenue", &pages), "");
        let pages = vec!["Mailing: Staten Island NY 10314 with family".to_string()];
        assert_eq!(upgrade_with_state_zip("16 Ada Drive", &pages), "");
    }

    #[test]
    fn street_prefix_is_two_words() {
        assert_eq!(street_prefix("45 Maple, Avenue"), "45 Maple");
        assert_eq!(street_prefix(""), "");
    }
}
