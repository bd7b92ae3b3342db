//! Text source: turns an input file into ordered page texts.
//!
//! The embedded text layer is used when it carries enough text. Pages with
//! almost no text are sent to OCR individually, and a document whose whole
//! text layer is too short is OCR'd from scratch. The OCR engine itself
//! sits behind `PageOcr`.

pub mod types;
pub mod orchestrator;
pub mod plain_text;
pub mod memory;

pub use types::*;
pub use orchestrator::*;
pub use plain_text::*;
pub use memory::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page rendering failed: {0}")]
    Render(String),

    #[error("OCR failed on page {page}: {reason}")]
    Ocr { page: usize, reason: String },

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("Source file not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traits_are_object_safe() {
        fn _layer(_: &dyn PageTextLayer) {}
        fn _ocr(_: &dyn PageOcr) {}
        fn _source(_: &dyn TextSource) {}
    }

    #[test]
    fn error_messages() {
        let e = SourceError::Ocr {
            page: 3,
            reason: "engine missing".into(),
        };
        assert_eq!(e.to_string(), "OCR failed on page 3: engine missing");
        assert_eq!(SourceError::Cancelled.to_string(), "Extraction cancelled");
    }
}
