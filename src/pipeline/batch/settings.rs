use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::BatchError;
use crate::config::{DEFAULT_LOG_PATH, DEFAULT_OUTPUT_CSV};
use crate::pipeline::source::SourceOptions;
use crate::pipeline_config::ExtractionConfig;

/// Driver settings. Missing JSON keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub source_dir: PathBuf,
    pub output_csv: PathBuf,
    pub log_path: PathBuf,
    /// Descend into subdirectories when collecting inputs.
    pub recursive: bool,
    /// Add extraction_mode, text_len and pdf_name columns to the CSV.
    pub debug_columns: bool,
    pub min_text_length: usize,
    pub ocr_dpi: u32,
    pub prefer_text_layer: bool,
    /// Input extensions, lowercase, without the dot.
    pub extensions: Vec<String>,
    pub extraction: ExtractionConfig,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            output_csv: PathBuf::from(DEFAULT_OUTPUT_CSV),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            recursive: false,
            debug_columns: false,
            min_text_length: 200,
            ocr_dpi: 300,
            prefer_text_layer: false,
            extensions: vec!["pdf".into(), "txt".into()],
            extraction: ExtractionConfig::default(),
        }
    }
}

impl BatchSettings {
    pub fn from_json_file(path: &Path) -> Result<Self, BatchError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply `MIN_TEXT_LEN`, `PREFER_TEXT_LAYER` and `DEBUG_EXTRACT` from
    /// the process environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Same as `apply_env` with an injectable lookup.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("MIN_TEXT_LEN") {
            match raw.trim().parse() {
                Ok(n) => self.min_text_length = n,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid MIN_TEXT_LEN"),
            }
        }
        if let Some(raw) = lookup("PREFER_TEXT_LAYER") {
            self.prefer_text_layer = raw.trim() == "1";
        }
        if let Some(raw) = lookup("DEBUG_EXTRACT") {
            self.debug_columns = raw.trim() == "1";
        }
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            min_text_length: self.min_text_length,
            ocr_dpi: self.ocr_dpi,
            prefer_text_layer: self.prefer_text_layer,
            ..SourceOptions::from(&self.extraction)
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|x| *x == e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let s = BatchSettings::default();
        assert_eq!(s.min_text_length, 200);
        assert_eq!(s.ocr_dpi, 300);
        assert_eq!(s.output_csv, PathBuf::from("output.csv"));
        assert_eq!(s.log_path, PathBuf::from("run_log.json"));
        assert!(!s.recursive);
    }

    #[test]
    fn json_file_with_partial_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"source_dir": "/data/in", "recursive": true, "extraction": {"money_floor": 5000}}"#,
        )
        .unwrap();
        let s = BatchSettings::from_json_file(&path).unwrap();
        assert_eq!(s.source_dir, PathBuf::from("/data/in"));
        assert!(s.recursive);
        assert_eq!(s.extraction.money_floor, 5000.0);
        assert_eq!(s.extraction.surname_similarity, 0.8);
        assert_eq!(s.ocr_dpi, 300);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(BatchSettings::from_json_file(&path), Err(BatchError::Json(_))));
    }

    #[test]
    fn environment_overrides() {
        let vars: HashMap<&str, &str> =
            [("MIN_TEXT_LEN", "120"), ("PREFER_TEXT_LAYER", "1"), ("DEBUG_EXTRACT", "1")].into();
        let mut s = BatchSettings::default();
        s.apply_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(s.min_text_length, 120);
        assert!(s.prefer_text_layer);
        assert!(s.debug_columns);
        assert!(s.source_options().prefer_text_layer);
    }

    #[test]
    fn invalid_min_text_len_is_ignored() {
        let mut s = BatchSettings::default();
        s.apply_vars(|k| (k == "MIN_TEXT_LEN").then(|| "lots".to_string()));
        assert_eq!(s.min_text_length, 200);
    }

    #[test]
    fn extension_filter() {
        let s = BatchSettings::default();
        assert!(s.accepts(Path::new("a/B.PDF")));
        assert!(s.accepts(Path::new("notes.txt")));
        assert!(!s.accepts(Path::new("image.png")));
        assert!(!s.accepts(Path::new("README")));
    }
}
