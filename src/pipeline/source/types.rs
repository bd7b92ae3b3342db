use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::SourceError;
use crate::pipeline_config::ExtractionConfig;

/// How the page texts of a document were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionMethod {
    /// Every page came from the embedded text layer.
    TextLayer,
    /// Some pages were OCR'd because their text layer was nearly empty.
    Mixed,
    /// The whole document was OCR'd.
    OcrFallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextLayer => "TEXT_LAYER",
            Self::Mixed => "MIXED",
            Self::OcrFallback => "OCR_FALLBACK",
        }
    }

    /// At least one page went through OCR.
    pub fn used_ocr(&self) -> bool {
        !matches!(self, Self::TextLayer)
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of one extraction, returned with the text instead of being
/// kept in shared state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionInfo {
    /// File name without directories.
    pub file: String,
    pub extraction_mode: ExtractionMethod,
    pub render_dpi: u32,
    pub renderer: String,
    pub pages: usize,
    /// Whitespace-normalized length of the text layer.
    pub text_len: usize,
}

/// Text of one input file. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    /// Page texts joined with newlines.
    pub full_text: String,
    pub method: ExtractionMethod,
    pub page_texts: Vec<String>,
    pub source_id: String,
    pub info: ExtractionInfo,
}

impl ExtractedDocument {
    /// Build a document from page texts, filling in provenance.
    pub fn from_pages(
        source_id: impl Into<String>,
        page_texts: Vec<String>,
        method: ExtractionMethod,
        info: ExtractionInfo,
    ) -> Self {
        Self {
            full_text: page_texts.join("\n"),
            method,
            page_texts,
            source_id: source_id.into(),
            info,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_texts.len()
    }
}

/// Thresholds for a single extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Below this normalized length the whole document is OCR'd.
    pub min_text_length: usize,
    /// Pages shorter than this are OCR'd individually.
    pub min_page_chars: usize,
    pub ocr_dpi: u32,
    /// Keep a short text layer instead of OCR'ing everything.
    pub prefer_text_layer: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self::from(&ExtractionConfig::default())
    }
}

impl From<&ExtractionConfig> for SourceOptions {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            min_text_length: config.min_text_length,
            min_page_chars: config.min_page_chars,
            ocr_dpi: config.ocr_dpi,
            prefer_text_layer: false,
        }
    }
}

/// Cooperative cancellation flag shared between the caller and a running
/// batch. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(SourceError::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), SourceError> {
        if self.is_cancelled() {
            Err(SourceError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Embedded text layer of a document, one string per page.
pub trait PageTextLayer: Send + Sync {
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, SourceError>;

    /// Label recorded in `ExtractionInfo::renderer`.
    fn renderer(&self) -> &str;
}

/// Renders one page at `dpi` and returns its recognized text.
pub trait PageOcr: Send + Sync {
    fn ocr_page(&self, path: &Path, page_index: usize, dpi: u32) -> Result<String, SourceError>;
}

/// Produces the text of one input file.
pub trait TextSource: Send + Sync {
    fn extract(
        &self,
        path: &Path,
        options: &SourceOptions,
        cancel: &CancelToken,
    ) -> Result<ExtractedDocument, SourceError>;
}

/// Whitespace-collapsed character count.
pub fn normalized_len(text: &str) -> usize {
    text.split_whitespace()
        .map(|w| w.chars().count())
        .sum::<usize>()
        + text.split_whitespace().count().saturating_sub(1)
}
