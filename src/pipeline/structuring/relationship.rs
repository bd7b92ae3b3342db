//! Relationship-to-decedent vocabulary, line scanning and priority ranking.

use std::sync::LazyLock;

use regex::Regex;

use super::lexicon::{REL_TOKENS, ROLE_BLACKLIST};
use super::text::{around, lower, title_case};

/// Values a final record may carry in the Relationship column.
pub const ALLOWED_RELATIONSHIPS: &[&str] = &[
    "Spouse",
    "Son",
    "Daughter",
    "Child",
    "Sister",
    "Brother",
    "Mother",
    "Father",
    "Grandchild",
    "Grandson",
    "Granddaughter",
    "Niece",
    "Nephew",
    "Cousin",
    "Unknown",
    "Other",
];

/// Resolution order when several relationships are found, best first.
const PRIORITY: &[&str] = &[
    "spouse",
    "wife",
    "husband",
    "domestic partner",
    "child",
    "son",
    "daughter",
    "parent",
    "mother",
    "father",
    "sibling",
    "sister",
    "brother",
    "grandchild",
    "grandson",
    "granddaughter",
    "niece",
    "nephew",
    "cousin",
    "other",
    "unknown",
];

/// Options accepted by the generic scan.
const GENERIC_OPTIONS: &[&str] = &[
    "spouse",
    "husband",
    "wife",
    "son",
    "daughter",
    "brother",
    "sister",
    "mother",
    "father",
    "grandson",
    "granddaughter",
    "niece",
    "nephew",
    "cousin",
    "child",
];

static REL_WORD_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    REL_TOKENS
        .iter()
        .map(|t| (*t, Regex::new(&format!(r"(?i)\b{t}\b")).expect("valid regex")))
        .collect()
});
static GENERIC_OPTION_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    GENERIC_OPTIONS
        .iter()
        .map(|t| (*t, Regex::new(&format!(r"(?i)\b{t}\b")).expect("valid regex")))
        .collect()
});
static ANY_REL_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", REL_TOKENS.join("|"))).expect("valid regex")
});
static LABELED_REL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)relationship[^\n]{{0,40}}?\b({})\b",
        GENERIC_OPTIONS.join("|")
    ))
    .expect("valid regex")
});
static STRICT_REL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)relationship[^A-Za-z]{{0,20}}({})", REL_TOKENS.join("|")))
        .expect("valid regex")
});

/// Allow-listed spelling of a kinship word. Wife and husband become Spouse.
pub fn canonical_relationship(word: &str) -> String {
    match lower(word.trim()).as_str() {
        "wife" | "husband" | "spouse" | "widow" | "widower" => "Spouse".to_string(),
        other => title_case(other),
    }
}

pub fn is_allowed(rel: &str) -> bool {
    ALLOWED_RELATIONSHIPS.contains(&rel)
}

/// Position in the resolution order; lower wins. Unlisted values rank last.
pub fn priority_rank(rel: &str) -> usize {
    let low = lower(rel);
    PRIORITY.iter().position(|p| *p == low).unwrap_or(PRIORITY.len())
}

pub fn has_role_term(line: &str) -> bool {
    let low = lower(line);
    ROLE_BLACKLIST.iter().any(|r| low.contains(r))
}

pub fn has_rel_word(line: &str) -> bool {
    ANY_REL_WORD_RE.is_match(line)
}

/// Highest-priority word among those whose pattern matches `text`.
pub fn best_match<'a>(text: &str, options: &'a [(&'static str, Regex)]) -> Option<&'a str> {
    options
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(word, _)| *word)
        .min_by_key(|word| priority_rank(word))
}

/// Best kinship word on line `idx` or the line after it. A line naming a
/// fiduciary role without any kinship word is skipped.
pub fn relationship_in_lines(lines: &[&str], idx: usize) -> Option<String> {
    for line in lines.iter().skip(idx).take(2) {
        if has_role_term(line) && !has_rel_word(line) {
            continue;
        }
        if let Some(word) = best_match(line, &REL_WORD_RES) {
            return Some(canonical_relationship(word));
        }
    }
    None
}

/// Domain-agnostic scan: a kinship word shortly after a "relationship"
/// label, else the highest-priority kinship option anywhere.
pub fn extract_relationship(text: &str) -> String {
    if let Some(c) = LABELED_REL_RE.captures(text) {
        return canonical_relationship(&c[1]);
    }
    best_match(text, &GENERIC_OPTION_RES)
        .map(canonical_relationship)
        .unwrap_or_default()
}

/// Labeled relationship whose surrounding window names every petitioner
/// token and no fiduciary role.
pub fn strict_relationship_scan(text: &str, petitioner: &str) -> String {
    let tokens: Vec<String> = petitioner.split_whitespace().map(lower).collect();
    for m in STRICT_REL_RE.captures_iter(text) {
        let (Some(whole), Some(word)) = (m.get(0), m.get(1)) else { continue };
        let window = lower(around(text, whole.start(), whole.end(), 80, 80));
        if ROLE_BLACKLIST.iter().any(|r| window.contains(r)) {
            continue;
        }
        if !tokens.is_empty() && !tokens.iter().all(|t| window.contains(t.as_str())) {
            continue;
        }
        return canonical_relationship(word.as_str());
    }
    String::new()
}

/// A relationship found by one strategy, before priority resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRelationship {
    pub value: String,
    pub source: String,
    pub score: i32,
}

impl RankedRelationship {
    pub fn new(value: impl Into<String>, source: impl Into<String>, score: i32) -> Self {
        Self {
            value: value.into(),
            source: source.into(),
            score,
        }
    }
}

/// Index of the winner: best priority rank, then highest score, then
/// earliest found.
pub fn select_ranked(candidates: &[RankedRelationship]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by_key(|(idx, c)| (priority_rank(&c.value), -c.score, *idx))
        .map(|(idx, _)| idx)
}
