use std::path::Path;

use super::types::{
    normalized_len, CancelToken, ExtractedDocument, ExtractionInfo, ExtractionMethod, PageOcr,
    PageTextLayer, SourceOptions, TextSource,
};
use super::SourceError;

/// Text layer first, OCR where the layer is too thin.
/// Both collaborators are injected, so tests run without an OCR engine.
pub struct LayeredTextSource<L: PageTextLayer, O: PageOcr> {
    layer: L,
    ocr: O,
}

impl<L: PageTextLayer, O: PageOcr> LayeredTextSource<L, O> {
    pub fn new(layer: L, ocr: O) -> Self {
        Self { layer, ocr }
    }

    fn ocr_page(
        &self,
        path: &Path,
        page_index: usize,
        dpi: u32,
        cancel: &CancelToken,
    ) -> Result<String, SourceError> {
        cancel.check()?;
        tracing::debug!(page = page_index + 1, dpi, "OCR page");
        self.ocr.ocr_page(path, page_index, dpi)
    }
}

impl<L: PageTextLayer, O: PageOcr> TextSource for LayeredTextSource<L, O> {
    fn extract(
        &self,
        path: &Path,
        options: &SourceOptions,
        cancel: &CancelToken,
    ) -> Result<ExtractedDocument, SourceError> {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let layer_pages = self.layer.page_texts(path)?;
        let text_len = normalized_len(&layer_pages.join(" "));
        let full_ocr = text_len < options.min_text_length && !options.prefer_text_layer;

        let mut texts = Vec::with_capacity(layer_pages.len());
        let method = if full_ocr {
            for idx in 0..layer_pages.len() {
                texts.push(self.ocr_page(path, idx, options.ocr_dpi, cancel)?);
            }
            ExtractionMethod::OcrFallback
        } else {
            let mut used_ocr = false;
            for (idx, page) in layer_pages.into_iter().enumerate() {
                cancel.check()?;
                if normalized_len(&page) < options.min_page_chars {
                    texts.push(self.ocr_page(path, idx, options.ocr_dpi, cancel)?);
                    used_ocr = true;
                } else {
                    texts.push(page);
                }
            }
            if used_ocr {
                ExtractionMethod::Mixed
            } else {
                ExtractionMethod::TextLayer
            }
        };

        tracing::info!(
            file = %file,
            method = method.as_str(),
            pages = texts.len(),
            text_len,
            "Text extraction complete"
        );

        let info = ExtractionInfo {
            file: file.clone(),
            extraction_mode: method,
            render_dpi: options.ocr_dpi,
            renderer: self.layer.renderer().to_string(),
            pages: texts.len(),
            text_len,
        };
        Ok(ExtractedDocument::from_pages(file, texts, method, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct FixedLayer(Vec<String>);

    impl PageTextLayer for FixedLayer {
        fn page_texts(&self, _path: &Path) -> Result<Vec<String>, SourceError> {
            Ok(self.0.clone())
        }

        fn renderer(&self) -> &str {
            "fixed"
        }
    }

    /// Records which pages were OCR'd; can cancel after the first call.
    struct RecordingOcr {
        calls: Mutex<Vec<usize>>,
        cancel_after_first: Option<CancelToken>,
    }

    impl RecordingOcr {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                cancel_after_first: None,
            }
        }

        fn calls(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PageOcr for RecordingOcr {
        fn ocr_page(&self, _path: &Path, page_index: usize, _dpi: u32) -> Result<String, SourceError> {
            self.calls.lock().unwrap().push(page_index);
            if let Some(token) = &self.cancel_after_first {
                token.cancel();
            }
            Ok(format!("ocr text for page {}", page_index + 1))
        }
    }

    fn long_page(tag: &str) -> String {
        format!("{tag} Surrogate's Court of the State of New York, petition for letters of administration")
    }

    fn path() -> PathBuf {
        PathBuf::from("/in/case.pdf")
    }

    #[test]
    fn full_text_layer_needs_no_ocr() {
        let source = LayeredTextSource::new(FixedLayer(vec![long_page("a"), long_page("b")]), RecordingOcr::new());
        let doc = source.extract(&path(), &SourceOptions::default(), &CancelToken::new()).unwrap();
        assert_eq!(doc.method, ExtractionMethod::TextLayer);
        assert_eq!(doc.info.file, "case.pdf");
        assert_eq!(doc.info.renderer, "fixed");
        assert!(source.ocr.calls().is_empty());
    }

    #[test]
    fn thin_pages_are_ocrd_individually() {
        let layer = FixedLayer(vec![long_page("a"), "  x ".into(), long_page("c")]);
        let source = LayeredTextSource::new(layer, RecordingOcr::new());
        let doc = source.extract(&path(), &SourceOptions::default(), &CancelToken::new()).unwrap();
        assert_eq!(doc.method, ExtractionMethod::Mixed);
        assert_eq!(doc.page_texts[1], "ocr text for page 2");
        assert_eq!(source.ocr.calls(), vec![1]);
    }

    #[test]
    fn short_document_is_fully_ocrd() {
        let source = LayeredTextSource::new(FixedLayer(vec!["scan".into(), String::new()]), RecordingOcr::new());
        let doc = source.extract(&path(), &SourceOptions::default(), &CancelToken::new()).unwrap();
        assert_eq!(doc.method, ExtractionMethod::OcrFallback);
        assert_eq!(source.ocr.calls(), vec![0, 1]);
        assert_eq!(doc.info.text_len, 4);
    }

    #[test]
    fn preferring_the_text_layer_skips_full_ocr() {
        let options = SourceOptions {
            prefer_text_layer: true,
            ..SourceOptions::default()
        };
        let source = LayeredTextSource::new(FixedLayer(vec!["short but present".into()]), RecordingOcr::new());
        let doc = source.extract(&path(), &options, &CancelToken::new()).unwrap();
        assert_eq!(doc.method, ExtractionMethod::TextLayer);
    }

    #[test]
    fn cancellation_stops_before_next_ocr() {
        let token = CancelToken::new();
        let ocr = RecordingOcr {
            calls: Mutex::new(Vec::new()),
            cancel_after_first: Some(token.clone()),
        };
        let source = LayeredTextSource::new(FixedLayer(vec![String::new(), String::new(), String::new()]), ocr);
        let err = source.extract(&path(), &SourceOptions::default(), &token).unwrap_err();
        assert!(matches!(err, SourceError::Cancelled));
        assert_eq!(source.ocr.calls(), vec![0]);
    }
}
