use std::path::Path;

use super::types::{PageOcr, PageTextLayer};
use super::SourceError;

/// Page separator in plain-text inputs.
pub const PAGE_BREAK: char = '\x0c';

/// Reads `.txt` files as a text layer, one page per form-feed section.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextLayer;

impl PlainTextLayer {
    pub fn split_pages(content: &str) -> Vec<String> {
        content.split(PAGE_BREAK).map(str::to_string).collect()
    }
}

impl PageTextLayer for PlainTextLayer {
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }
        let is_txt = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
        if !is_txt {
            return Err(SourceError::UnsupportedFormat(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Self::split_pages(&content))
    }

    fn renderer(&self) -> &str {
        "plain-text"
    }
}

/// OCR stand-in for deployments without an engine: every request fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOcr;

impl PageOcr for NoOcr {
    fn ocr_page(&self, _path: &Path, page_index: usize, _dpi: u32) -> Result<String, SourceError> {
        Err(SourceError::Ocr {
            page: page_index + 1,
            reason: "no OCR engine configured".into(),
        })
    }
}
