//! Per-case results, run-log entries and batch statistics.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::source::{ExtractionInfo, ExtractionMethod};
use crate::pipeline::structuring::{DetectionResult, FieldRecord};

// ═══════════════════════════════════════════
// Case Result
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Ok,
    NeedsReview,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NeedsReview => "NEEDS_REVIEW",
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final output for one case segment of one document.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    /// 1-based position of the segment within its document.
    pub case_id: usize,
    pub fields: FieldRecord,
    /// Field values in column order.
    pub row: Vec<String>,
    /// Column names of empty fields.
    pub missing: Vec<String>,
    pub warnings: Vec<String>,
    pub status: CaseStatus,
    pub detection: DetectionResult,
    /// Hint label when a caption hint existed, else the detected type.
    pub form_type: String,
    pub method: ExtractionMethod,
    pub extraction_info: ExtractionInfo,
    /// Winning candidate source per column name.
    pub field_sources: BTreeMap<String, String>,
    /// Number of pages in the segment.
    pub pages_used: usize,
}

// ═══════════════════════════════════════════
// Run Log
// ═══════════════════════════════════════════

/// One line of the JSON run log. Failed files get an entry with `error`
/// set and case_id 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub file: String,
    pub case_id: usize,
    pub extraction_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_info: Option<ExtractionInfo>,
    pub form_type: String,
    pub confidence_score: f64,
    pub matched_markers: Vec<String>,
    pub missing_fields: Vec<String>,
    pub warnings: Vec<String>,
    pub status: String,
    pub error: String,
    pub pages_used: usize,
    pub field_sources: BTreeMap<String, String>,
}

impl RunLogEntry {
    pub fn from_case(file: &str, case: &CaseResult) -> Self {
        Self {
            file: file.to_string(),
            case_id: case.case_id,
            extraction_method: case.method.as_str().to_string(),
            extraction_info: Some(case.extraction_info.clone()),
            form_type: case.detection.form_type.as_str().to_string(),
            confidence_score: case.detection.confidence_score(),
            matched_markers: case.detection.matched_markers.clone(),
            missing_fields: case.missing.clone(),
            warnings: case.warnings.clone(),
            status: case.status.as_str().to_string(),
            error: String::new(),
            pages_used: case.pages_used,
            field_sources: case.field_sources.clone(),
        }
    }

    pub fn failed(file: &str, error: &str) -> Self {
        Self {
            file: file.to_string(),
            case_id: 1,
            error: error.to_string(),
            ..Self::default()
        }
    }
}

// ═══════════════════════════════════════════
// Stats & Summary
// ═══════════════════════════════════════════

/// Counters reported to the progress callback after every file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub processed: usize,
    /// Cases written, counted per segment.
    pub success: usize,
    pub failed: usize,
    /// Cases whose text needed OCR on at least one page.
    pub ocr: usize,
    pub cancelled: bool,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub stats: BatchStats,
    pub log_entries: Vec<RunLogEntry>,
    /// Spreadsheet init failure, or "" when the sheet worked or was unused.
    pub sheet_error: String,
    pub out_csv: PathBuf,
    pub log_path: PathBuf,
}

impl BatchSummary {
    pub fn describe(&self) -> String {
        format!(
            "Done. Processed {} of {} files (success {}, failed {}, OCR {}).",
            self.stats.processed, self.stats.total, self.stats.success, self.stats.failed, self.stats.ocr
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(CaseStatus::NeedsReview.as_str(), "NEEDS_REVIEW");
        assert_eq!(serde_json::to_string(&CaseStatus::Ok).unwrap(), "\"OK\"");
    }

    #[test]
    fn failed_entry_shape() {
        let entry = RunLogEntry::failed("bad.pdf", "corrupt xref");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["case_id"], 1);
        assert_eq!(json["error"], "corrupt xref");
        assert_eq!(json["pages_used"], 0);
        assert!(json.get("extraction_info").is_none());
    }

    #[test]
    fn summary_description() {
        let summary = BatchSummary {
            run_id: Uuid::new_v4(),
            stats: BatchStats {
                total: 3,
                processed: 3,
                success: 2,
                failed: 1,
                ocr: 1,
                cancelled: false,
            },
            log_entries: Vec::new(),
            sheet_error: String::new(),
            out_csv: PathBuf::from("out.csv"),
            log_path: PathBuf::from("run_log.json"),
        };
        assert_eq!(
            summary.describe(),
            "Done. Processed 3 of 3 files (success 2, failed 1, OCR 1)."
        );
    }
}
