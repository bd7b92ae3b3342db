//! Money-token parsing and the keyword-window property value scan.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::text::{around, lower};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// A money token: grouped thousands with optional cents, or a plain 4 to 8
/// digit amount.
pub static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"\$?\s*([0-9]{1,3}(?:,[0-9]{3})+(?:\.\d{2})?|[1-9]\d{3,7}(?:\.\d{2})?)")
});
static MONEY_STRIP_RE: LazyLock<Regex> = LazyLock::new(|| re(r"[,$\s]"));
static ZIP_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\b(\d{5})(?:-\d{4})?\b"));
static PLAIN_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\b[1-9]\d{3,7}\b"));

/// Window terms that make a nearby amount a property value.
pub const GOOD_VALUE_KW: &[&str] = &[
    "gross",
    "estate",
    "approximate",
    "approx",
    "total",
    "value",
    "property",
    "real property",
    "personal property",
    "assets",
    "improved",
];

/// Window terms that mark an amount as a fee, bond or receipt.
pub const BAD_VALUE_KW: &[&str] = &[
    "filing fee",
    "receipt",
    "bond",
    "temporary",
    "fee cap",
    "surcharge",
    "cert",
    "certificate",
    "certs",
    "prelim",
];

/// Numeric value of a money string, ignoring `$`, commas and spaces.
pub fn parse_money(value: &str) -> Option<f64> {
    let stripped = MONEY_STRIP_RE.replace_all(value, "");
    if stripped.is_empty() {
        return None;
    }
    stripped.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whole-dollar string for an amount at or above `floor`, otherwise empty.
pub fn normalize_property_value(value: &str, floor: f64) -> String {
    match parse_money(value) {
        Some(v) if v > 0.0 && v >= floor => format!("{}", v.trunc() as u64),
        _ => String::new(),
    }
}

/// Every five-digit ZIP in the addresses and the page text.
pub fn collect_zips<'a>(addresses: impl IntoIterator<Item = &'a str>, pages: &[String]) -> HashSet<String> {
    let mut zips = HashSet::new();
    for addr in addresses {
        if let Some(c) = ZIP_RE.captures(addr) {
            zips.insert(c[1].to_string());
        }
    }
    for c in ZIP_RE.captures_iter(&pages.join(" ")) {
        zips.insert(c[1].to_string());
    }
    zips
}

/// The value is missing, unparsable, under the floor or really a ZIP.
pub fn needs_property_value(value: &str, zips: &HashSet<String>, floor: f64) -> bool {
    match value.parse::<f64>() {
        Ok(v) => v < floor || zips.contains(value),
        Err(_) => true,
    }
}

/// Keyword-window scan for the most plausible property value.
#[derive(Debug, Clone, Copy)]
pub struct MoneyScan {
    pub floor: f64,
    /// Characters inspected on each side of a money token.
    pub window: usize,
}

impl MoneyScan {
    fn valid(&self, value: f64, raw: &str, window: &str, exclude: &HashSet<String>) -> bool {
        value >= self.floor
            && !exclude.contains(&raw.replace(',', ""))
            && !BAD_VALUE_KW.iter().any(|bad| window.contains(bad))
    }

    /// Best property value across the pages.
    ///
    /// Pass 1 only accepts amounts with a qualifying keyword in their window,
    /// scored by magnitude, keyword density and how early the page is. Pass 2
    /// runs over the joined pages without the keyword requirement. Ties go
    /// to the larger amount.
    pub fn scan(&self, pages: &[String], exclude: &HashSet<String>) -> String {
        let mut best_val = 0.0_f64;
        let mut best_score = -1_i64;
        for (page_idx, page) in pages.iter().enumerate() {
            for c in MONEY_RE.captures_iter(page) {
                let (Some(whole), Some(raw)) = (c.get(0), c.get(1)) else { continue };
                let Some(value) = parse_money(raw.as_str()) else { continue };
                let window = lower(around(page, whole.start(), whole.end(), self.window, self.window));
                if !self.valid(value, raw.as_str(), &window, exclude) {
                    continue;
                }
                let hits = GOOD_VALUE_KW.iter().filter(|kw| window.contains(*kw)).count() as i64;
                if hits == 0 {
                    continue;
                }
                let score = ((value / 100_000.0) as i64).min(40)
                    + hits * 18
                    + 10_i64.saturating_sub(page_idx as i64).max(0);
                if score > best_score || (score == best_score && value > best_val) {
                    best_score = score;
                    best_val = value;
                }
            }
        }
        if best_val == 0.0 {
            let combined = pages.join(" ");
            for c in MONEY_RE.captures_iter(&combined) {
                let (Some(whole), Some(raw)) = (c.get(0), c.get(1)) else { continue };
                let Some(value) = parse_money(raw.as_str()) else { continue };
                let window = lower(around(&combined, whole.start(), whole.end(), self.window, self.window));
                if !self.valid(value, raw.as_str(), &window, exclude) {
                    continue;
                }
                let score = ((value / 200_000.0) as i64).min(30);
                if score > best_score || (score == best_score && value > best_val) {
                    best_score = score;
                    best_val = value;
                }
            }
        }
        if best_val >= self.floor {
            format!("{}", best_val.trunc() as u64)
        } else {
            String::new()
        }
    }
}

/// Largest plain 4 to 8 digit number that is not a ZIP and meets the floor.
pub fn largest_plain_number(pages: &[String], zips: &HashSet<String>, floor: f64) -> String {
    let combined = pages.join(" ");
    PLAIN_NUMBER_RE
        .find_iter(&combined)
        .map(|m| m.as_str())
        .filter(|n| !zips.contains(*n))
        .filter_map(|n| n.parse::<u64>().ok())
        .filter(|n| *n as f64 >= floor)
        .max()
        .map(|n| n.to_string())
        .unwrap_or_default()
}

/// An amount far larger than the next plausible amount is usually a
/// misread leading digit. Returns the largest smaller amount, at or above
/// `min_top` scale, when the top exceeds it by `ratio`.
pub fn inflation_guard(amounts: &[f64], ratio: f64, min_top: f64, floor: f64) -> Option<f64> {
    let top = amounts.iter().copied().fold(f64::NAN, f64::max);
    if top.is_nan() || top < min_top {
        return None;
    }
    amounts
        .iter()
        .copied()
        .filter(|v| *v >= floor && *v < top && top / *v >= ratio)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}
