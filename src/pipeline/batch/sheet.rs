//! Spreadsheet sink: header row healing and next-blank-row appends.
//!
//! The remote transport is external. `MemorySheet` keeps the grid in memory
//! and applies the same header and append rules a remote sheet gets.

use std::sync::{Arc, LazyLock, Mutex};

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Columns to the right of the header block checked for stray headers.
const STRAY_COLUMNS: usize = 17;

static SHEET_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([a-zA-Z0-9\-_]+)").expect("valid regex"));

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Sheet unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected at row {row}: {reason}")]
    WriteRejected { row: usize, reason: String },

    #[error("Sheet lock poisoned")]
    LockPoisoned,
}

/// What `ensure_headers` did to row 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStatus {
    Created,
    Repaired,
    Validated,
}

impl HeaderStatus {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Created => "Header row created.",
            Self::Repaired => "Header row repaired to required schema.",
            Self::Validated => "Headers validated: OK",
        }
    }
}

/// Append-only row sink with a self-healing header row.
pub trait SpreadsheetSink: Send {
    fn ensure_headers(&mut self, headers: &[&str]) -> Result<HeaderStatus, SheetError>;

    /// Write one row at the next blank row of column A. Returns the 1-based
    /// row number written.
    fn append_row(&mut self, row: &[String]) -> Result<usize, SheetError>;
}

/// Sheet id from a full spreadsheet URL, or "" when there is none.
pub fn sheet_link_to_id(url: &str) -> String {
    SHEET_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// 1-based column index to its letter name (1 → A, 27 → AA).
pub fn column_letter(mut n: usize) -> String {
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Compare an existing header row against the required one.
pub fn header_status(row1: &[String], headers: &[&str]) -> HeaderStatus {
    let width = headers.len();
    if !row1.iter().take(width).any(|c| !c.trim().is_empty()) {
        return HeaderStatus::Created;
    }
    let matches = (0..width).all(|i| {
        let existing = row1.get(i).map(|c| c.trim().to_lowercase()).unwrap_or_default();
        existing == headers[i].to_lowercase()
    });
    if matches {
        HeaderStatus::Validated
    } else {
        HeaderStatus::Repaired
    }
}

/// Cells right of the header block that repeat a required header name.
pub fn has_stray_headers(extra: &[String], headers: &[&str]) -> bool {
    extra.iter().any(|cell| {
        let cell = cell.trim().to_lowercase();
        !cell.is_empty() && headers.iter().any(|h| h.trim().to_lowercase() == cell)
    })
}

/// First blank row of column A at or after row 2.
pub fn next_empty_row(column_a: &[String]) -> usize {
    if column_a.is_empty() {
        return 2;
    }
    column_a
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, v)| v.trim().is_empty())
        .map(|(idx, _)| idx + 1)
        .unwrap_or(column_a.len() + 1)
}

/// Pad with blanks or truncate to `width` cells.
pub fn fit_row(row: &[String], width: usize) -> Vec<String> {
    let mut out: Vec<String> = row.iter().take(width).cloned().collect();
    out.resize(width, String::new());
    out
}

/// In-memory sheet. Clones share the same grid, so a caller can keep a
/// handle while the runner owns the boxed sink.
#[derive(Debug, Clone)]
pub struct MemorySheet {
    grid: Arc<Mutex<Vec<Vec<String>>>>,
    width: usize,
    reject_appends: bool,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            grid: Arc::new(Mutex::new(rows)),
            width: crate::config::OUTPUT_COLUMNS.len(),
            reject_appends: false,
        }
    }

    /// Every append fails; header handling still works.
    pub fn rejecting_appends(mut self) -> Self {
        self.reject_appends = true;
        self
    }

    /// Snapshot of the grid.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.grid.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn write_cells(grid: &mut Vec<Vec<String>>, row: usize, start_col: usize, values: &[String]) {
        if grid.len() < row {
            grid.resize(row, Vec::new());
        }
        let cells = &mut grid[row - 1];
        if cells.len() < start_col + values.len() {
            cells.resize(start_col + values.len(), String::new());
        }
        for (i, v) in values.iter().enumerate() {
            cells[start_col + i] = v.clone();
        }
    }
}

impl Default for MemorySheet {
    fn default() -> Self {
        Self::new()
    }
}

impl SpreadsheetSink for MemorySheet {
    fn ensure_headers(&mut self, headers: &[&str]) -> Result<HeaderStatus, SheetError> {
        let mut grid = self.grid.lock().map_err(|_| SheetError::LockPoisoned)?;
        let row1 = grid.first().cloned().unwrap_or_default();

        let width = headers.len();
        let extra: Vec<String> = row1.iter().skip(width).take(STRAY_COLUMNS).cloned().collect();
        if has_stray_headers(&extra, headers) {
            let blanks = vec![String::new(); extra.len()];
            Self::write_cells(&mut grid, 1, width, &blanks);
        }

        let status = header_status(&row1, headers);
        if status != HeaderStatus::Validated {
            let values: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
            Self::write_cells(&mut grid, 1, 0, &values);
        }
        tracing::info!(range = %format!("A1:{}1", column_letter(width)), "{}", status.message());
        Ok(status)
    }

    fn append_row(&mut self, row: &[String]) -> Result<usize, SheetError> {
        let mut grid = self.grid.lock().map_err(|_| SheetError::LockPoisoned)?;
        let column_a: Vec<String> = grid
            .iter()
            .map(|r| r.first().cloned().unwrap_or_default())
            .collect();
        let next = next_empty_row(&column_a);
        if self.reject_appends {
            return Err(SheetError::WriteRejected {
                row: next,
                reason: "sheet is read-only".into(),
            });
        }
        let values = fit_row(row, self.width);
        Self::write_cells(&mut grid, next, 0, &values);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OUTPUT_COLUMNS;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn link_to_id() {
        assert_eq!(
            sheet_link_to_id("https://docs.google.com/spreadsheets/d/1AbC-d_9/edit#gid=0"),
            "1AbC-d_9"
        );
        assert_eq!(sheet_link_to_id("https://example.com/nothing"), "");
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(9), "I");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
    }

    #[test]
    fn blank_sheet_gets_headers() {
        let mut sheet = MemorySheet::new();
        assert_eq!(sheet.ensure_headers(&OUTPUT_COLUMNS).unwrap(), HeaderStatus::Created);
        assert_eq!(sheet.rows()[0], strings(&OUTPUT_COLUMNS));
    }

    #[test]
    fn matching_headers_validate_case_insensitively() {
        let row1: Vec<String> = OUTPUT_COLUMNS.iter().map(|h| format!(" {} ", h.to_uppercase())).collect();
        let mut sheet = MemorySheet::with_rows(vec![row1.clone()]);
        assert_eq!(sheet.ensure_headers(&OUTPUT_COLUMNS).unwrap(), HeaderStatus::Validated);
        assert_eq!(sheet.rows()[0], row1);
    }

    #[test]
    fn mismatched_headers_are_repaired() {
        let mut sheet = MemorySheet::with_rows(vec![strings(&["Name", "Address"])]);
        assert_eq!(sheet.ensure_headers(&OUTPUT_COLUMNS).unwrap(), HeaderStatus::Repaired);
        assert_eq!(sheet.rows()[0], strings(&OUTPUT_COLUMNS));
    }

    #[test]
    fn stray_headers_right_of_block_are_cleared() {
        let mut row1 = strings(&OUTPUT_COLUMNS);
        row1.push("Deceased Name".into());
        row1.push("notes".into());
        let mut sheet = MemorySheet::with_rows(vec![row1]);
        assert_eq!(sheet.ensure_headers(&OUTPUT_COLUMNS).unwrap(), HeaderStatus::Validated);
        let first = &sheet.rows()[0];
        assert_eq!(first[9], "");
        assert_eq!(first[10], "");
    }

    #[test]
    fn appends_fill_the_first_blank_row() {
        let mut sheet = MemorySheet::with_rows(vec![
            strings(&OUTPUT_COLUMNS),
            strings(&["1 Main St"]),
            strings(&[""]),
            strings(&["9 Elm St"]),
        ]);
        let written = sheet.append_row(&strings(&["12 Oak Street", "Walter Scott"])).unwrap();
        assert_eq!(written, 3);
        let rows = sheet.rows();
        assert_eq!(rows[2].len(), 9);
        assert_eq!(rows[2][1], "Walter Scott");
        assert_eq!(sheet.append_row(&strings(&["x"])).unwrap(), 5);
    }

    #[test]
    fn long_rows_are_truncated() {
        let mut sheet = MemorySheet::new();
        sheet.ensure_headers(&OUTPUT_COLUMNS).unwrap();
        let long: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        assert_eq!(sheet.append_row(&long).unwrap(), 2);
        assert_eq!(sheet.rows()[1].len(), 9);
    }

    #[test]
    fn empty_sheet_appends_at_row_two() {
        assert_eq!(next_empty_row(&[]), 2);
        assert_eq!(next_empty_row(&strings(&["header"])), 2);
    }

    #[test]
    fn rejecting_sheet_reports_row() {
        let mut sheet = MemorySheet::new().rejecting_appends();
        let err = sheet.append_row(&strings(&["a"])).unwrap_err();
        assert!(matches!(err, SheetError::WriteRejected { row: 2, .. }));
    }

    #[test]
    fn clones_share_the_grid() {
        let sheet = MemorySheet::new();
        let mut boxed: Box<dyn SpreadsheetSink> = Box::new(sheet.clone());
        boxed.ensure_headers(&OUTPUT_COLUMNS).unwrap();
        assert_eq!(sheet.rows().len(), 1);
    }
}
