//! Driver-level errors. Per-file failures never surface here; they are
//! logged and counted by the runner. These cover setup and final output.

use std::path::PathBuf;

use thiserror::Error;

use super::sheet::SheetError;
use crate::pipeline::source::SourceError;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No input files found in {0}")]
    NoInputs(PathBuf),

    #[error("Spreadsheet error: {0}")]
    Sheet(#[from] SheetError),

    #[error("Text source error: {0}")]
    Source(#[from] SourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_inputs_names_the_directory() {
        let err = BatchError::NoInputs(PathBuf::from("/data/petitions"));
        assert_eq!(err.to_string(), "No input files found in /data/petitions");
    }

    #[test]
    fn source_errors_convert() {
        let err: BatchError = SourceError::Cancelled.into();
        assert!(matches!(err, BatchError::Source(SourceError::Cancelled)));
    }
}
