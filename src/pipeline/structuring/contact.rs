//! Phone and email discovery, validation and OCR repair.

use std::sync::LazyLock;

use regex::Regex;

use super::lexicon::NY_AREA_CODES;
use super::text::{around, collapse_ws, lower, trim_chars};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static LOOSE_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(\(?[0-9]{3}\)?[\s.-]?[0-9]{3}[\s.-]?[0-9]{4})"));
static LOOSE_EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"));
/// Optional country code, then three digit groups separated by anything.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(\+?1)?[^0-9]*([0-9]{3})[^0-9]*([0-9]{3})[^0-9]*([0-9]{4})"));
static NON_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| re(r"[^0-9]"));

static FULL_EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)([A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,})"));
static WRAPPED_EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)([A-Z0-9._%+-]+@[A-Z0-9.-]+)\s*\.?\s*(com|net|org|gov|edu|law)")
});
static GMAIL_NO_TLD_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)([A-Z0-9._%+-]+@gmail)\b\.?"));
static TLD_END_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\.[a-z]{2,}$"));

static NY_WORD_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\bny\b"));
static NY_ZIP_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\b1[0-9]{4}\b"));

static AT_SPACING_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\s*@\s*"));
static SPACE_DOT_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\s+\."));
static EMAIL_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}"));

/// Common OCR misreadings of popular mail domains.
const EMAIL_FIXES: &[(&str, &str)] = &[
    ("gma.il", "gmail.com"),
    ("gmai1.com", "gmail.com"),
    ("gmali.com", "gmail.com"),
    ("outlok.com", "outlook.com"),
    ("hotmai.com", "hotmail.com"),
    ("gm ail.com", "gmail.com"),
    ("@gma1l.com", "@gmail.com"),
];

/// Anchors that put an email inside the attorney signature block.
pub const EMAIL_ANCHORS: &[&str] = &[
    "signature of attorney",
    "email (optional)",
    "print name of attorney",
    "firm name",
    "telephone",
];

const EMAIL_SCOPE_KEYWORDS: &[&str] = &["email", "e-mail", "attorney", "esq", "firm", "law"];

/// `XXX-XXX-XXXX` from exactly ten ASCII digits; empty for anything else.
pub fn format_phone(digits: &str) -> String {
    if digits.len() != 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return String::new();
    }
    format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..])
}

/// ASCII digits only. OCR can emit other Unicode decimal digits.
fn digits_of(value: &str) -> String {
    NON_DIGIT_RE.replace_all(value, "").into_owned()
}

/// First loosely phone-shaped token, as written.
pub fn extract_phone(text: &str) -> String {
    LOOSE_PHONE_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

/// First loosely email-shaped token, as written.
pub fn extract_email(text: &str) -> String {
    LOOSE_EMAIL_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Canonical phone: a leading country code 1 is dropped, anything other
/// than ten remaining digits is rejected.
pub fn clean_phone(value: &str) -> String {
    let mut digits = digits_of(value);
    if digits.len() == 11 && digits.starts_with('1') {
        digits.remove(0);
    }
    if digits.len() != 10 {
        return String::new();
    }
    format_phone(&digits)
}

/// First strictly shaped email in `value`, lowercased.
pub fn clean_email(value: &str) -> String {
    FULL_EMAIL_RE
        .captures(value)
        .map(|c| lower(&c[1]))
        .unwrap_or_default()
}

// ═══════════════════════════════════════════
// New York area-code repair
// ═══════════════════════════════════════════

/// The segment reads as a New York filing.
pub fn has_ny_context(pages: &[String]) -> bool {
    let combined = lower(&pages.join("\n"));
    (combined.contains("surrogate") && combined.contains("state of new york"))
        || ["county of richmond", "county of nassau", "county of kings"]
            .iter()
            .any(|c| combined.contains(c))
        || NY_WORD_RE.is_match(&combined)
        || NY_ZIP_RE.is_match(&combined)
}

/// Remap an area code OCR misread outside New York. Returns the repaired
/// number and the reason, or `None` when nothing changes.
pub fn correct_ny_phone(phone: &str, pages: &[String]) -> Option<(String, &'static str)> {
    let digits = digits_of(phone);
    if digits.len() != 10 || !has_ny_context(pages) {
        return None;
    }
    let (area, rest) = digits.split_at(3);
    let reason = if area == "816" {
        "816_to_516_ny_context"
    } else if !NY_AREA_CODES.contains(&area) {
        "ny_preferred_area"
    } else {
        return None;
    };
    Some((format_phone(&format!("516{rest}")), reason))
}

// ═══════════════════════════════════════════
// Email scanning
// ═══════════════════════════════════════════

/// Best email across pages, scored by anchor phrases in a window around
/// each match. Wrapped addresses (`user@firm .com`) and a gmail address
/// missing its TLD are rejoined.
pub fn find_emails_in_pages(pages: &[String], anchors: &[&str], window: usize) -> String {
    let mut best: (String, i32) = (String::new(), -1);
    for page in pages {
        let collapsed = collapse_ws(&page.replace('\r', "\n"));
        let mut matches: Vec<(usize, usize, String)> = Vec::new();
        for m in FULL_EMAIL_RE.find_iter(&collapsed) {
            matches.push((m.start(), m.end(), m.as_str().to_string()));
        }
        for c in WRAPPED_EMAIL_RE.captures_iter(&collapsed) {
            let Some(m) = c.get(0) else { continue };
            let email = format!("{}.{}", c[1].trim_end_matches('.'), &c[2]);
            matches.push((m.start(), m.end(), email));
        }
        for m in GMAIL_NO_TLD_RE.find_iter(&collapsed) {
            matches.push((m.start(), m.end(), m.as_str().to_string()));
        }
        for (start, end, raw) in matches {
            let mut email = lower(raw.trim_end_matches([' ', '.']));
            if !TLD_END_RE.is_match(&email) && email.ends_with("@gmail") {
                email.push_str(".com");
            }
            let context = lower(around(&collapsed, start, end, window, window));
            let mut score = 10;
            score += 40 * anchors.iter().filter(|a| context.contains(&lower(a))).count() as i32;
            if context.contains("attorney") {
                score += 20;
            }
            if context.contains("email") {
                score += 10;
            }
            if score > best.1 {
                best = (email, score);
            }
        }
    }
    best.0
}

fn email_candidates(text: &str) -> Vec<String> {
    EMAIL_SHAPE_RE
        .find_iter(text)
        .map(|m| lower(m.as_str().trim_end_matches('.')))
        .collect()
}

/// Repair an extracted email. If the value holds no valid address, the
/// `scopes` (wider page groupings) are searched and the longest address,
/// with a bonus near email/attorney vocabulary, wins.
pub fn normalize_email(value: &str, scopes: &[String]) -> String {
    if value.is_empty() {
        return String::new();
    }
    let mut cleaned = lower(trim_chars(value, " ,.;"));
    for (bad, good) in EMAIL_FIXES {
        cleaned = cleaned.replace(bad, good);
    }
    let cleaned = AT_SPACING_RE.replace_all(&cleaned, "@");
    let cleaned = SPACE_DOT_RE.replace_all(&cleaned, ".");

    let candidates = email_candidates(&cleaned);
    if candidates.is_empty() && !scopes.is_empty() {
        let scope_text = scopes.join(" ");
        let scope_lower = lower(&scope_text);
        let mut best: Option<(String, usize)> = None;
        for cand in email_candidates(&scope_text) {
            let mut score = cand.len();
            if let Some(pos) = scope_lower.find(&cand) {
                let context = around(&scope_lower, pos, pos + cand.len(), 40, 40);
                if EMAIL_SCOPE_KEYWORDS.iter().any(|k| context.contains(k)) {
                    score += 5;
                }
            }
            if best.as_ref().map_or(true, |(_, s)| score > *s) {
                best = Some((cand, score));
            }
        }
        if let Some((email, _)) = best {
            return email;
        }
    }
    candidates
        .into_iter()
        .reduce(|a, b| if b.len() > a.len() { b } else { a })
        .unwrap_or_default()
}

// ═══════════════════════════════════════════
// Final-row helpers
// ═══════════════════════════════════════════

/// First plausible email, lowercased, stripped of trailing punctuation.
pub fn extract_first_email(text: &str) -> String {
    EMAIL_RE
        .find_iter(text)
        .map(|m| lower(trim_chars(m.as_str(), ".,;:)]}")))
        .find(|c| !c.contains(' ') && c.len() <= 80)
        .unwrap_or_default()
}

/// Phone closest to a phone/tel keyword, dashed. Letter O reads as zero.
pub fn extract_first_phone(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let norm = text.replace(['O', 'o'], "0");
    let norm_lower = lower(&norm);
    let keyword_positions: Vec<usize> = ["phone", "tel", "telephone"]
        .iter()
        .flat_map(|kw| norm_lower.match_indices(kw).map(|(i, _)| i))
        .collect();
    PHONE_RE
        .captures_iter(&norm)
        .filter_map(|c| {
            let start = c.get(0)?.start();
            let dist = keyword_positions
                .iter()
                .map(|kp| start.abs_diff(*kp))
                .min()
                .unwrap_or(start);
            Some((dist, start, format!("{}-{}-{}", &c[2], &c[3], &c[4])))
        })
        .min_by_key(|(dist, start, _)| (*dist, *start))
        .map(|(_, _, phone)| phone)
        .unwrap_or_default()
}

/// Phone number closest to where `attorney` is named in `text`.
pub fn phone_near(text: &str, attorney: &str) -> String {
    if attorney.is_empty() {
        return String::new();
    }
    let name_pos = lower(text).find(&lower(attorney));
    PHONE_RE
        .find_iter(text)
        .filter_map(|m| {
            let phone = extract_first_phone(m.as_str());
            if phone.is_empty() {
                return None;
            }
            let dist = name_pos.map_or(m.start(), |p| m.start().abs_diff(p));
            Some((dist, phone))
        })
        .min_by_key(|(dist, _)| *dist)
        .map(|(_, phone)| phone)
        .unwrap_or_default()
}
