//! Tunable thresholds for the extraction pipeline.
//!
//! Every value here was tuned against real petitions rather than derived.
//! They are kept in one place so a deployment can override them from JSON,
//! and the defaults are pinned by tests so behavior changes are deliberate.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Thresholds shared by extractors, the normalizer and the text source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum difflib-style similarity for snapping the petitioner's surname
    /// onto the decedent's.
    pub surname_similarity: f64,
    /// A money value at least this many times larger than another plausible
    /// amount is treated as carrying a spurious leading digit.
    pub inflation_ratio: f64,
    /// The inflation guard only considers values at or above this amount.
    pub inflation_guard_min: f64,
    /// Property values below this floor are discarded.
    pub money_floor: f64,
    /// Characters on each side of a match inspected for context keywords.
    pub money_window: usize,
    /// Characters on each side of an email inspected for attorney anchors.
    pub email_window: usize,
    /// Remap misread area codes when the document is clearly from New York.
    pub ny_phone_repair: bool,
    /// Below this normalized text length the whole document is OCR'd.
    pub min_text_length: usize,
    /// Pages with fewer normalized characters than this are OCR'd individually.
    pub min_page_chars: usize,
    /// Render resolution handed to the OCR engine.
    pub ocr_dpi: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            surname_similarity: 0.8,
            inflation_ratio: 3.0,
            inflation_guard_min: 100_000.0,
            money_floor: 1000.0,
            money_window: 80,
            email_window: 120,
            ny_phone_repair: true,
            min_text_length: 80,
            min_page_chars: 10,
            ocr_dpi: 300,
        }
    }
}

impl ExtractionConfig {
    /// Parse a config from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_pinned() {
        let cfg = ExtractionConfig::default();
        assert_eq!(cfg.surname_similarity, 0.8);
        assert_eq!(cfg.inflation_ratio, 3.0);
        assert_eq!(cfg.inflation_guard_min, 100_000.0);
        assert_eq!(cfg.money_floor, 1000.0);
        assert_eq!(cfg.money_window, 80);
        assert_eq!(cfg.email_window, 120);
        assert!(cfg.ny_phone_repair);
        assert_eq!(cfg.min_text_length, 80);
        assert_eq!(cfg.min_page_chars, 10);
        assert_eq!(cfg.ocr_dpi, 300);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = ExtractionConfig::from_json(r#"{"money_floor": 500.0}"#).unwrap();
        assert_eq!(cfg.money_floor, 500.0);
        assert_eq!(cfg.surname_similarity, 0.8);
    }

    #[test]
    fn serializes_round_trip_shape() {
        let json = serde_json::to_value(ExtractionConfig::default()).unwrap();
        assert_eq!(json["ocr_dpi"], 300);
        assert_eq!(json["ny_phone_repair"], true);
    }
}
