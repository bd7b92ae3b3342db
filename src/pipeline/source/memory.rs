use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::types::{
    normalized_len, CancelToken, ExtractedDocument, ExtractionInfo, ExtractionMethod, SourceOptions,
    TextSource,
};
use super::SourceError;

/// In-memory text source keyed by file name. Files without an entry fail
/// with `NotFound`; entries registered with `fail` fail with a render error.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    documents: HashMap<String, (Vec<String>, ExtractionMethod)>,
    failures: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(mut self, name: &str, pages: &[&str]) -> Self {
        self.insert(name, pages.iter().map(|p| p.to_string()).collect(), ExtractionMethod::TextLayer);
        self
    }

    pub fn with_method(mut self, name: &str, pages: &[&str], method: ExtractionMethod) -> Self {
        self.insert(name, pages.iter().map(|p| p.to_string()).collect(), method);
        self
    }

    pub fn fail(mut self, name: &str, reason: &str) -> Self {
        self.failures.insert(name.to_string(), reason.to_string());
        self
    }

    pub fn insert(&mut self, name: &str, pages: Vec<String>, method: ExtractionMethod) {
        self.documents.insert(name.to_string(), (pages, method));
    }

    fn key(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl TextSource for MemorySource {
    fn extract(
        &self,
        path: &Path,
        options: &SourceOptions,
        cancel: &CancelToken,
    ) -> Result<ExtractedDocument, SourceError> {
        cancel.check()?;
        let name = Self::key(path);
        if let Some(reason) = self.failures.get(&name) {
            return Err(SourceError::Render(reason.clone()));
        }
        let (pages, method) = self
            .documents
            .get(&name)
            .ok_or_else(|| SourceError::NotFound(PathBuf::from(path)))?;
        let info = ExtractionInfo {
            file: name.clone(),
            extraction_mode: *method,
            render_dpi: options.ocr_dpi,
            renderer: "memory".into(),
            pages: pages.len(),
            text_len: normalized_len(&pages.join(" ")),
        };
        Ok(ExtractedDocument::from_pages(name, pages.clone(), *method, info))
    }
}
