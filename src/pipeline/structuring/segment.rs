//! Splits a document's pages into per-case ranges.
//!
//! Scanned batches sometimes contain back-to-back petitions of different
//! kinds. A new case starts wherever the caption type changes.

use std::ops::Range;

use super::text::lower;

/// Caption type found on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMarker {
    Administration,
    Probate,
}

/// Marker for a single page, if its caption names a proceeding type.
pub fn page_marker(page: &str) -> Option<CaseMarker> {
    let low = lower(page);
    let has = |phrases: &[&str]| phrases.iter().any(|p| low.contains(p));
    if has(&[
        "administration proceeding",
        "form a-1",
        "petition for letters of administration",
    ]) {
        Some(CaseMarker::Administration)
    } else if has(&["probate proceeding", "form p-1"]) {
        Some(CaseMarker::Probate)
    } else {
        None
    }
}

/// Contiguous, non-overlapping page ranges covering every page. The first
/// range always starts at page 0. An empty document yields one empty range.
pub fn split_cases(pages: &[String]) -> Vec<Range<usize>> {
    let mut starts = vec![0];
    let mut last: Option<CaseMarker> = None;
    for (idx, page) in pages.iter().enumerate() {
        let Some(marker) = page_marker(page) else {
            continue;
        };
        if last != Some(marker) {
            if idx != 0 {
                starts.push(idx);
            }
            last = Some(marker);
        }
    }
    let ranges: Vec<Range<usize>> = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| start..starts.get(i + 1).copied().unwrap_or(pages.len()))
        .filter(|r| !r.is_empty())
        .collect();
    if ranges.is_empty() {
        vec![0..pages.len()]
    } else {
        ranges
    }
}
