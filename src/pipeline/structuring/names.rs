//! Person-name cleaning, validation and surname alignment.

use std::sync::LazyLock;

use regex::Regex;

use super::lexicon::{
    is_stopword, BANNED_LABEL_PHRASES, NAME_ROLE_TOKENS, REL_TOKENS, ROLE_WORDS,
};
use super::text::{clean_value, collapse_ws, lower, title_case, trim_chars};

static AKA_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:a/k/a|aka)\b").expect("valid regex"));
static BRACKETED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*?\)|\[.*?\]").expect("valid regex"));
static NON_NAME_CHAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z'-]").expect("valid regex"));
static NON_NAME_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z.'-]").expect("valid regex"));
static NON_LETTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z]").expect("valid regex"));
static UNITED_STATES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bunited\s+states\b").expect("valid regex"));
static ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:also\s+known\s+as|a\s*/?\s*k\s*/?\s*a|aka|alka|alkia)\b")
        .expect("valid regex")
});
static BRACKET_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[()\[\]]").expect("valid regex"));
static NAME_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z .'-]").expect("valid regex"));
static TRAILING_INITIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]$").expect("valid regex"));

/// Cut at the first alias marker and drop bracketed text.
pub fn strip_aka(name: &str) -> String {
    let head = AKA_SPLIT_RE.split(name).next().unwrap_or("");
    let head = BRACKETED_RE.replace_all(head, "");
    trim_chars(&collapse_ws(&head), " ,;").to_string()
}

/// Keep letters, apostrophes and hyphens per token, drop stopwords,
/// title-case what remains.
pub fn clean_person_name(raw: &str) -> String {
    let stripped = strip_aka(raw);
    let tokens: Vec<String> = stripped
        .split_whitespace()
        .map(|part| NON_NAME_CHAR_RE.replace_all(part, "").to_string())
        .filter(|t| !t.is_empty() && !is_stopword(t))
        .map(|t| title_case(&t))
        .collect();
    trim_chars(&tokens.join(" "), " ,;").to_string()
}

/// Checkbox captions and form labels that OCR reads as values.
pub fn is_label_noise(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let low = lower(text.trim());
    if BANNED_LABEL_PHRASES.iter().any(|p| low.contains(p)) {
        return true;
    }
    let fused = NON_LETTER_RE.replace_all(&low, "");
    if fused == "otherspecify" || fused == "otherspecifi" {
        return true;
    }
    let has_letters = text.chars().any(char::is_alphabetic);
    has_letters && !text.chars().any(char::is_lowercase) && ROLE_WORDS.contains(&low.as_str())
}

/// A real person's name: 2 to 4 tokens of letters, periods, apostrophes or
/// hyphens, none of them a role or label word.
pub fn validate_person_name(name: &str) -> bool {
    if name.is_empty() || is_label_noise(name) {
        return false;
    }
    if name.chars().filter(|c| c.is_ascii_alphabetic()).count() < 2 {
        return false;
    }
    let tokens: Vec<&str> = name.split_whitespace().collect();
    if !(2..=4).contains(&tokens.len()) {
        return false;
    }
    tokens.iter().all(|t| {
        let low = lower(t);
        !NON_NAME_TOKEN_RE.is_match(t)
            && !ROLE_WORDS.contains(&low.as_str())
            && !BANNED_LABEL_PHRASES.contains(&low.as_str())
    })
}

/// Shape check: 2 to 4 tokens, mostly capitalized, no stopwords.
pub fn plausible_name(name: &str) -> bool {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    if !(2..=4).contains(&tokens.len()) {
        return false;
    }
    let upper = tokens
        .iter()
        .filter(|t| t.chars().next().is_some_and(char::is_uppercase))
        .count();
    if (upper as f64) / (tokens.len() as f64) < 0.7 {
        return false;
    }
    !tokens.iter().any(|t| is_stopword(trim_chars(t, " ,;")))
}

fn bare(token: &str) -> String {
    lower(trim_chars(token, " .,';-"))
}

/// Strict cleaner for names pulled from probate petitions: alias cut,
/// suffixes and kinship words dropped, middle initial restored, shape
/// checked. Returns empty when the result is not a plausible name.
pub fn clean_candidate_name(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let raw = raw.replace('_', " ");
    let raw = UNITED_STATES_RE.replace_all(&raw, " ");
    let raw = trim_chars(&raw, " )(");
    let cut = match ALIAS_RE.find(raw) {
        Some(m) => &raw[..m.start()],
        None => raw,
    };
    let cut = BRACKET_CHARS_RE.replace_all(cut, " ");
    let cut = NAME_CHARS_RE.replace_all(&cut, " ");
    let mut tokens: Vec<&str> = cut
        .split_whitespace()
        .filter(|t| {
            let b = bare(t);
            b != "jr" && b != "sr" && !(b.contains("other") && b.contains("specify"))
        })
        .collect();
    while tokens
        .last()
        .is_some_and(|t| REL_TOKENS.contains(&bare(t).as_str()) || bare(t) == "parent" || bare(t) == "cousin")
    {
        tokens.pop();
    }
    if tokens.len() < 2 {
        return String::new();
    }
    let cleaned = clean_person_name(&tokens.join(" "));
    let mut parts: Vec<String> = cleaned.split_whitespace().map(str::to_string).collect();
    if parts.len() == 3 && parts[1].chars().count() == 1 {
        parts[1].push('.');
    }
    let cleaned = parts.join(" ");
    if !plausible_name(&cleaned) {
        return String::new();
    }
    trim_chars(&cleaned, " )(").to_string()
}

/// Lenient cleaner for names read from labeled blocks: alias cut, title
/// case, at least two parts.
pub fn clean_labeled_name(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let raw = raw.replace('_', " ");
    let raw = UNITED_STATES_RE.replace_all(&raw, " ");
    let cut = match ALIAS_RE.find(&raw) {
        Some(m) => &raw[..m.start()],
        None => &raw[..],
    };
    let cut = BRACKET_CHARS_RE.replace_all(cut, " ");
    let cut = NAME_CHARS_RE.replace_all(&cut, " ");
    let parts: Vec<&str> = cut.split_whitespace().collect();
    if parts.len() < 2 {
        return String::new();
    }
    let joined = parts
        .iter()
        .filter(|p| !matches!(lower(p).as_str(), "jr" | "sr"))
        .map(|p| title_case(p))
        .collect::<Vec<_>>()
        .join(" ");
    clean_value(&joined)
}

/// Final pass for name columns: drop a dangling single initial and any
/// fiduciary role tokens.
pub fn strict_clean_name(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let value = TRAILING_INITIAL_RE.replace(value, "");
    let tokens: Vec<&str> = value
        .split_whitespace()
        .filter(|t| !NAME_ROLE_TOKENS.contains(&lower(t).as_str()))
        .collect();
    trim_chars(&tokens.join(" "), " ,;").to_string()
}

// ═══════════════════════════════════════════
// Surname alignment
// ═══════════════════════════════════════════

/// Ratcliff/Obershelp similarity: twice the matched characters over the
/// combined length, matching recursively around the longest common block.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, size) = longest_common_block(a, b);
    if size == 0 {
        return 0;
    }
    size + matched_chars(&a[..i], &b[..j]) + matched_chars(&a[i + size..], &b[j + size..])
}

/// Longest common substring; the earliest in `a`, then in `b`, on ties.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        let mut cur = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                cur[j + 1] = prev[j] + 1;
                let len = cur[j + 1];
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        prev = cur;
    }
    best
}

/// Snap the petitioner's surname onto the decedent's spelling when the two
/// differ only by an OCR slip.
pub fn align_surname(petitioner: &str, decedent: &str, threshold: f64) -> Option<String> {
    let mut pet: Vec<&str> = petitioner.split_whitespace().collect();
    let dec: Vec<&str> = decedent.split_whitespace().collect();
    if pet.len() < 2 || dec.len() < 2 {
        return None;
    }
    let pet_last = trim_chars(pet[pet.len() - 1], " ,)(");
    let dec_last = trim_chars(dec[dec.len() - 1], " ,)(");
    if pet_last.eq_ignore_ascii_case(dec_last) {
        return None;
    }
    if similarity(&lower(pet_last), &lower(dec_last)) >= threshold {
        let last = pet.len() - 1;
        pet[last] = dec_last;
        return Some(pet.join(" "));
    }
    None
}
