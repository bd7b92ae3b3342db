pub mod types;
pub mod text;
pub mod lexicon;
pub mod names;
pub mod address;
pub mod contact;
pub mod money;
pub mod relationship;
pub mod classify;
pub mod segment;
pub mod generic;
pub mod form_probate;
pub mod form_admin;
pub mod form_labeled;
pub mod dispatch;
pub mod normalize;
pub mod sanitize;

pub use types::*;
pub use classify::*;
pub use segment::*;
pub use dispatch::*;
pub use normalize::*;
pub use sanitize::*;

use thiserror::Error;

use crate::pipeline_config::ExtractionConfig;

/// Everything an extractor may read for one case segment.
#[derive(Debug, Clone, Copy)]
pub struct SegmentInput<'a> {
    /// Segment pages joined with newlines.
    pub text: &'a str,
    pub pages: &'a [String],
    pub config: &'a ExtractionConfig,
}

impl<'a> SegmentInput<'a> {
    pub fn new(text: &'a str, pages: &'a [String], config: &'a ExtractionConfig) -> Self {
        Self { text, pages, config }
    }

    pub fn first_page(&self) -> &'a str {
        self.pages.first().map(String::as_str).unwrap_or("")
    }

    pub fn page(&self, idx: usize) -> &'a str {
        self.pages.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn last_page(&self) -> &'a str {
        self.pages.last().map(String::as_str).unwrap_or("")
    }
}

/// One strategy cascade per form type. Implementations record every
/// attempted value in the ledger and return the resolved record.
pub trait FieldExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(
        &self,
        input: &SegmentInput<'_>,
        ledger: &mut CandidateLedger,
    ) -> Result<FieldRecord, ExtractionError>;
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Extractor failure: {0}")]
    Internal(String),

    #[error("Extraction cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traits_are_object_safe() {
        fn _assert(_: &dyn FieldExtractor) {}
    }

    #[test]
    fn segment_input_page_accessors() {
        let config = ExtractionConfig::default();
        let pages = vec!["one".to_string(), "two".to_string()];
        let input = SegmentInput::new("one\ntwo", &pages, &config);
        assert_eq!(input.first_page(), "one");
        assert_eq!(input.last_page(), "two");
        assert_eq!(input.page(5), "");
    }
}
