//! BatchRunner: drives every input file through the pipeline.
//!
//! Files run strictly one after another so the bleed guard sees cases in
//! arrival order. A failing file is logged and counted; only cancellation
//! stops the run early. The CSV and the JSON run log are written in every
//! case, including cancelled runs and runs where every file failed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::assembler::RecordAssembler;
use super::csv_sink::{resolve_output_path, write_csv};
use super::error::BatchError;
use super::settings::BatchSettings;
use super::sheet::SpreadsheetSink;
use super::types::{BatchStats, BatchSummary, CaseResult, RunLogEntry};
use crate::config::OUTPUT_COLUMNS;
use crate::pipeline::processor::process_document;
use crate::pipeline::source::{CancelToken, SourceError, TextSource};
use crate::pipeline::structuring::panic_message;

/// Called with the running counters after every file.
pub type ProgressFn = Box<dyn FnMut(&BatchStats) + Send>;

pub struct BatchRunner {
    source: Box<dyn TextSource>,
    sheet: Option<Box<dyn SpreadsheetSink>>,
    settings: BatchSettings,
    cancel: CancelToken,
    progress: Option<ProgressFn>,
}

impl BatchRunner {
    pub fn new(source: Box<dyn TextSource>, settings: BatchSettings) -> Self {
        Self {
            source,
            sheet: None,
            settings,
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    /// Also append every row to `sheet`.
    pub fn with_sheet(mut self, sheet: Box<dyn SpreadsheetSink>) -> Self {
        self.sheet = Some(sheet);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn on_progress(mut self, progress: impl FnMut(&BatchStats) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Handle for cancelling a run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    fn report(&mut self, stats: &BatchStats) {
        if let Some(progress) = self.progress.as_mut() {
            progress(stats);
        }
    }

    /// Prepare the sheet header row. A failure disables the sheet for this
    /// run and is returned as the summary's `sheet_error`.
    fn init_sheet(&mut self) -> String {
        let Some(sheet) = self.sheet.as_mut() else {
            return String::new();
        };
        match sheet.ensure_headers(&OUTPUT_COLUMNS) {
            Ok(status) => {
                tracing::info!(status = ?status, "spreadsheet ready");
                String::new()
            }
            Err(e) => {
                let message = format!("Failed to init sheet: {e}");
                tracing::warn!(error = %e, "spreadsheet init failed, continuing with CSV only");
                self.sheet = None;
                message
            }
        }
    }

    fn append_to_sheet(&mut self, file: &str, case: &CaseResult) {
        let Some(sheet) = self.sheet.as_mut() else {
            return;
        };
        if let Err(e) = sheet.append_row(&case.row) {
            tracing::warn!(
                file = %file,
                case_id = case.case_id,
                error = %e,
                "failed to append row to spreadsheet"
            );
        }
    }

    pub fn run(&mut self) -> Result<BatchSummary, BatchError> {
        let run_id = Uuid::new_v4();
        let inputs = collect_inputs(&self.settings)?;
        if inputs.is_empty() {
            return Err(BatchError::NoInputs(self.settings.source_dir.clone()));
        }
        tracing::info!(%run_id, files = inputs.len(), dir = %self.settings.source_dir.display(), "batch started");

        let sheet_error = self.init_sheet();
        let options = self.settings.source_options();
        let debug_columns = self.settings.debug_columns;
        let out_csv = resolve_output_path(&self.settings.output_csv);
        let log_path = self.settings.log_path.clone();

        let mut stats = BatchStats {
            total: inputs.len(),
            ..BatchStats::default()
        };
        let mut assembler = RecordAssembler::new();
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut log_entries: Vec<RunLogEntry> = Vec::new();
        self.report(&stats);

        for path in &inputs {
            if self.cancel.is_cancelled() {
                stats.cancelled = true;
                tracing::info!("cancellation requested, stopping further processing");
                break;
            }
            let file = file_name(path);

            // A panic anywhere in one file stays with that file.
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                let doc = self.source.extract(path, &options, &self.cancel)?;
                Ok::<_, SourceError>(process_document(&doc, &mut assembler, &self.settings.extraction))
            }));

            match outcome {
                Ok(Ok(cases)) => {
                    for case in cases {
                        let mut row = case.row.clone();
                        if debug_columns {
                            row.push(case.extraction_info.extraction_mode.as_str().to_string());
                            row.push(case.extraction_info.text_len.to_string());
                            row.push(file.clone());
                        }
                        rows.push(row);
                        stats.success += 1;
                        if case.method.used_ocr() {
                            stats.ocr += 1;
                        }
                        self.append_to_sheet(&file, &case);
                        log_entries.push(RunLogEntry::from_case(&file, &case));
                    }
                }
                Ok(Err(SourceError::Cancelled)) => {
                    stats.cancelled = true;
                    tracing::info!(file = %file, "cancelled during extraction, stopping");
                    break;
                }
                Ok(Err(e)) => {
                    stats.failed += 1;
                    tracing::error!(file = %file, error = %e, "file failed");
                    log_entries.push(RunLogEntry::failed(&file, &e.to_string()));
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    stats.failed += 1;
                    tracing::error!(file = %file, reason = %reason, "file processing panicked");
                    log_entries.push(RunLogEntry::failed(&file, &format!("processing panicked: {reason}")));
                }
            }
            stats.processed += 1;
            self.report(&stats);
        }

        write_csv(&out_csv, &rows, debug_columns)?;
        write_run_log(&log_path, &log_entries)?;

        let summary = BatchSummary {
            run_id,
            stats,
            log_entries,
            sheet_error,
            out_csv,
            log_path,
        };
        tracing::info!(%run_id, cancelled = summary.stats.cancelled, "{}", summary.describe());
        Ok(summary)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Input files under the source directory, sorted by path.
pub fn collect_inputs(settings: &BatchSettings) -> Result<Vec<PathBuf>, BatchError> {
    let dir = &settings.source_dir;
    if !dir.is_dir() {
        return Err(BatchError::NoInputs(dir.clone()));
    }
    let mut files = Vec::new();
    let mut pending = vec![dir.clone()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                if settings.recursive {
                    pending.push(path);
                }
            } else if settings.accepts(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Pretty-printed JSON array of run-log entries.
pub fn write_run_log(path: &Path, entries: &[RunLogEntry]) -> Result<(), BatchError> {
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::batch::sheet::MemorySheet;
    use crate::pipeline::source::{ExtractedDocument, MemorySource, SourceOptions};
    use std::sync::{Arc, Mutex};

    /// Panics on one file, serves the rest from memory.
    struct PanicsOn {
        inner: MemorySource,
        file: &'static str,
    }

    impl TextSource for PanicsOn {
        fn extract(
            &self,
            path: &Path,
            options: &SourceOptions,
            cancel: &CancelToken,
        ) -> Result<ExtractedDocument, SourceError> {
            if file_name(path) == self.file {
                panic!("page tree corrupted");
            }
            self.inner.extract(path, options, cancel)
        }
    }

    const PROBATE: &str = "SURROGATE'S COURT OF THE STATE OF NEW YORK\n\
        Probate Proceeding, Will of Walter Scott\n\
        Form P-1";

    fn settings_in(dir: &Path) -> BatchSettings {
        BatchSettings {
            source_dir: dir.to_path_buf(),
            output_csv: dir.join("result.csv"),
            log_path: dir.join("run_log.json"),
            ..BatchSettings::default()
        }
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = BatchRunner::new(Box::new(MemorySource::new()), settings_in(dir.path()));
        assert!(matches!(runner.run(), Err(BatchError::NoInputs(_))));
    }

    #[test]
    fn inputs_are_sorted_and_optionally_recursive() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.pdf");
        touch(dir.path(), "a.pdf");
        touch(dir.path(), "skip.png");
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested"), "c.txt");

        let mut settings = settings_in(dir.path());
        let names: Vec<String> = collect_inputs(&settings).unwrap().iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);

        settings.recursive = true;
        let found = collect_inputs(&settings).unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn failed_file_is_logged_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.pdf");
        touch(dir.path(), "b.pdf");
        let source = MemorySource::new()
            .fail("a.pdf", "corrupt xref")
            .with_pages("b.pdf", &[PROBATE]);
        let mut runner = BatchRunner::new(Box::new(source), settings_in(dir.path()));
        let summary = runner.run().unwrap();

        assert_eq!(summary.stats.total, 2);
        assert_eq!(summary.stats.processed, 2);
        assert_eq!(summary.stats.failed, 1);
        assert_eq!(summary.stats.success, 1);
        assert_eq!(summary.log_entries[0].case_id, 1);
        assert!(summary.log_entries[0].error.contains("corrupt xref"));
        assert_eq!(summary.log_entries[1].form_type, "FORM_A");

        let csv = std::fs::read_to_string(&summary.out_csv).unwrap();
        assert_eq!(csv.lines().count(), 2);
        let log: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&summary.log_path).unwrap()).unwrap();
        assert_eq!(log.as_array().unwrap().len(), 2);
    }

    #[test]
    fn cancelled_run_still_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.pdf");
        let mut runner = BatchRunner::new(
            Box::new(MemorySource::new().with_pages("a.pdf", &[PROBATE])),
            settings_in(dir.path()),
        );
        runner.cancel_token().cancel();
        let summary = runner.run().unwrap();
        assert!(summary.stats.cancelled);
        assert_eq!(summary.stats.processed, 0);
        assert!(summary.out_csv.exists());
        assert!(summary.log_path.exists());
    }

    #[test]
    fn progress_reports_after_every_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.pdf");
        touch(dir.path(), "b.pdf");
        let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
        let sink = seen.clone();
        let mut runner = BatchRunner::new(Box::new(MemorySource::new()), settings_in(dir.path()))
            .on_progress(move |stats| sink.lock().unwrap().push(stats.processed));
        runner.run().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn rows_reach_the_sheet_and_debug_columns_the_csv() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.pdf");
        let sheet = MemorySheet::new();
        let mut settings = settings_in(dir.path());
        settings.debug_columns = true;
        let mut runner = BatchRunner::new(
            Box::new(MemorySource::new().with_pages("a.pdf", &[PROBATE])),
            settings,
        )
        .with_sheet(Box::new(sheet.clone()));
        let summary = runner.run().unwrap();

        assert_eq!(summary.sheet_error, "");
        let rows = sheet.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "Deceased Property Address");
        assert_eq!(rows[1].len(), 9);

        let csv = std::fs::read_to_string(&summary.out_csv).unwrap();
        let data = csv.lines().nth(1).unwrap();
        assert!(data.contains(",TEXT_LAYER,"));
        assert!(data.ends_with(",a.pdf"));
    }

    #[test]
    fn sheet_append_failures_do_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.pdf");
        let mut runner = BatchRunner::new(
            Box::new(MemorySource::new().with_pages("a.pdf", &[PROBATE])),
            settings_in(dir.path()),
        )
        .with_sheet(Box::new(MemorySheet::new().rejecting_appends()));
        let summary = runner.run().unwrap();
        assert_eq!(summary.stats.success, 1);
        assert_eq!(summary.stats.failed, 0);
    }

    #[test]
    fn panicking_file_is_counted_as_failed_and_outputs_are_written() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.pdf");
        touch(dir.path(), "b.pdf");
        let source = PanicsOn {
            inner: MemorySource::new().with_pages("b.pdf", &[PROBATE]),
            file: "a.pdf",
        };
        let mut runner = BatchRunner::new(Box::new(source), settings_in(dir.path()));
        let summary = runner.run().unwrap();

        assert_eq!(summary.stats.processed, 2);
        assert_eq!(summary.stats.failed, 1);
        assert_eq!(summary.stats.success, 1);
        assert_eq!(summary.log_entries[0].file, "a.pdf");
        assert!(summary.log_entries[0].error.contains("page tree corrupted"));
        assert_eq!(std::fs::read_to_string(&summary.out_csv).unwrap().lines().count(), 2);
        assert!(summary.log_path.exists());
    }
}
