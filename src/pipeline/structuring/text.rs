//! Low-level text helpers: whitespace normalization, label windows and
//! char-boundary-safe slicing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static HSPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static MULTI_NEWLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static SPACE_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+,").expect("valid regex"));

/// Canonical segment text: CR becomes LF, runs of spaces/tabs collapse,
/// blank lines disappear, ends are trimmed.
pub fn normalize_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = HSPACE_RE.replace_all(&text, " ");
    let text = MULTI_NEWLINE_RE.replace_all(&text, "\n");
    text.trim().to_string()
}

/// Trimmed lines, blanks included.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(|l| l.trim().to_string()).collect()
}

/// Trimmed non-empty lines.
pub fn nonblank_lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

/// Collapse every whitespace run to one space and trim.
pub fn collapse_ws(text: &str) -> String {
    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Trim any of `chars` from both ends.
pub fn trim_chars<'a>(text: &'a str, chars: &str) -> &'a str {
    text.trim_matches(|c: char| chars.contains(c))
}

/// Generic value tidy-up: underscores become spaces, stray spaces before
/// commas go, whitespace collapses, edge punctuation is trimmed.
pub fn clean_value(text: &str) -> String {
    let text = text.replace('_', " ");
    let text = SPACE_COMMA_RE.replace_all(&text, ",");
    let text = collapse_ws(&text);
    trim_chars(&text, " :;,").to_string()
}

/// Title-case every alphabetic run: first letter upper, the rest lower.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// ASCII-lowercased copy. Byte offsets are preserved, so positions found in
/// the copy index the original.
pub fn lower(text: &str) -> String {
    text.to_ascii_lowercase()
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    lower(haystack).contains(&lower(needle))
}

/// Byte offset of the first case-insensitive occurrence of `needle`.
pub fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    lower(haystack).find(&lower(needle))
}

/// Largest char boundary at or below `idx`.
pub fn floor_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Smallest char boundary at or above `idx`.
pub fn ceil_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Slice `[start - before, end + after)` clamped to the text and to char
/// boundaries.
pub fn around(text: &str, start: usize, end: usize, before: usize, after: usize) -> &str {
    let lo = floor_boundary(text, start.saturating_sub(before));
    let hi = ceil_boundary(text, end.saturating_add(after));
    &text[lo..hi.max(lo)]
}

/// Slice `[from, from + len)` clamped to char boundaries.
pub fn slice_from(text: &str, from: usize, len: usize) -> &str {
    let lo = floor_boundary(text, from);
    let hi = ceil_boundary(text, from.saturating_add(len));
    &text[lo..hi]
}

/// For every line matching one of `labels` (case-insensitive regexes),
/// the next `max_lines` non-empty lines joined by newlines. With
/// `include_current` the window starts on the label line itself.
pub fn window_after_labels(
    lines: &[String],
    labels: &[&str],
    max_lines: usize,
    include_current: bool,
) -> Vec<String> {
    let patterns: Vec<Regex> = labels
        .iter()
        .filter_map(|p| Regex::new(&format!("(?i){p}")).ok())
        .collect();
    let mut out = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        for re in &patterns {
            if !re.is_match(line) {
                continue;
            }
            let start = if include_current { idx } else { idx + 1 };
            let end = (start + max_lines).min(lines.len());
            if start >= end {
                continue;
            }
            let snippet = lines[start..end]
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if !snippet.is_empty() {
                out.push(snippet);
            }
        }
    }
    out
}

/// First non-empty trimmed line.
pub fn first_line(snippet: &str) -> &str {
    snippet.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

/// First cleaned candidate that passes `validator`. Duplicate cleaned values
/// are tried once.
pub fn best_from_candidates<C, V>(candidates: &[String], cleaner: C, validator: V) -> String
where
    C: Fn(&str) -> String,
    V: Fn(&str) -> bool,
{
    let mut seen = HashSet::new();
    for cand in candidates {
        let value = cleaner(cand);
        if value.is_empty() || !seen.insert(value.clone()) {
            continue;
        }
        if validator(&value) {
            return value;
        }
    }
    String::new()
}

/// Up to `max_lines` non-empty lines following the first line containing
/// `label`.
pub fn block_after_label(text: &str, label: &str, max_lines: usize) -> Vec<String> {
    let lines = split_lines(text);
    let needle = lower(label);
    for (idx, line) in lines.iter().enumerate() {
        if lower(line).contains(&needle) {
            return lines
                .iter()
                .skip(idx + 1)
                .take(max_lines)
                .filter(|l| !l.is_empty())
                .cloned()
                .collect();
        }
    }
    Vec::new()
}

/// Text of numbered section `1.` up to `2.`, if both markers exist.
pub fn section_one(page: &str) -> Option<&str> {
    let start = page.find("1.")?;
    let rest = &page[start..];
    let end = rest[2..].find("2.")? + 2;
    Some(&rest[..end])
}

/// `\b`-bounded case-insensitive search for any of `words`.
pub fn contains_word(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| word_regex(w).is_some_and(|re| re.is_match(text)))
}

/// Case-insensitive whole-word regex for a literal.
pub fn word_regex(word: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_blank_lines_and_tabs() {
        let raw = "  Estate of\r\n\r\n\tJohn   Smith \n\n\n";
        assert_eq!(normalize_text(raw), "Estate of\n John Smith");
    }

    #[test]
    fn clean_value_tidies_punctuation() {
        assert_eq!(clean_value("__John  Smith , Esq. ;"), "John Smith, Esq.");
    }

    #[test]
    fn title_case_handles_apostrophes_and_hyphens() {
        assert_eq!(title_case("mary o'brien-SMITH"), "Mary O'Brien-Smith");
    }

    #[test]
    fn around_respects_char_boundaries() {
        let text = "café 123 résumé";
        let idx = text.find("123").unwrap();
        let win = around(text, idx, idx + 3, 2, 2);
        assert!(win.contains("123"));
    }

    #[test]
    fn window_after_labels_skips_label_line() {
        let lines = split_lines("Relationship to decedent\nSpouse\nMore\n");
        let windows = window_after_labels(&lines, &[r"relationship to decedent"], 2, false);
        assert_eq!(windows, vec!["Spouse\nMore".to_string()]);
        let current = window_after_labels(&lines, &[r"relationship"], 1, true);
        assert_eq!(current[0], "Relationship to decedent");
    }

    #[test]
    fn best_from_candidates_dedupes_and_validates() {
        let cands = vec!["  x ".to_string(), "x".to_string(), "John Smith".to_string()];
        let best = best_from_candidates(&cands, |s| s.trim().to_string(), |s| s.contains(' '));
        assert_eq!(best, "John Smith");
    }

    #[test]
    fn block_after_label_drops_blank_lines() {
        let text = "Petitioner Information:\n\nName: Ann Lee\nCity: Troy\n";
        assert_eq!(
            block_after_label(text, "petitioner information", 3),
            vec!["Name: Ann Lee".to_string(), "City: Troy".to_string()]
        );
    }

    #[test]
    fn section_one_requires_both_markers() {
        assert_eq!(section_one("1. Name: Jo Doe 2. Other"), Some("1. Name: Jo Doe "));
        assert_eq!(section_one("1. only"), None);
    }

    #[test]
    fn contains_word_is_bounded() {
        assert!(contains_word("the Son of", &["son"]));
        assert!(!contains_word("Robinson Street", &["son"]));
    }
}
