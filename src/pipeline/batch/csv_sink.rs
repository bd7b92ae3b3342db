use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use super::error::BatchError;
use crate::config::{DEBUG_COLUMNS, DEFAULT_OUTPUT_CSV, OUTPUT_COLUMNS};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Output path with the month, year and clock time spliced in, e.g.
/// `output_mar_2025_2-05pm.csv`.
pub fn timestamped_path(path: &Path, now: NaiveDateTime) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let month = now.format("%b").to_string().to_lowercase();
    let year = now.format("%Y");
    let time = now.format("%I-%M%p").to_string().to_lowercase();
    let time = time.trim_start_matches('0');
    path.with_file_name(format!("{stem}_{month}_{year}_{time}{ext}"))
}

/// Final CSV path: a file named exactly `output.csv` gets a timestamp.
pub fn resolve_output_path(path: &Path) -> PathBuf {
    let is_default = path
        .file_name()
        .is_some_and(|n| n == DEFAULT_OUTPUT_CSV);
    if is_default {
        timestamped_path(path, Local::now().naive_local())
    } else {
        path.to_path_buf()
    }
}

pub fn header_row(debug_columns: bool) -> Vec<&'static str> {
    let mut header: Vec<&'static str> = OUTPUT_COLUMNS.to_vec();
    if debug_columns {
        header.extend(DEBUG_COLUMNS);
    }
    header
}

/// Write a BOM-prefixed UTF-8 CSV with `\n` line endings. The header is
/// always written, even with no rows.
pub fn write_csv(path: &Path, rows: &[Vec<String>], debug_columns: bool) -> Result<(), BatchError> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(UTF8_BOM)?;
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(file);
    writer.write_record(header_row(debug_columns))?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn timestamp_format() {
        let p = timestamped_path(Path::new("out/output.csv"), at(14, 5));
        assert_eq!(p, PathBuf::from("out/output_mar_2025_2-05pm.csv"));
        let p = timestamped_path(Path::new("output.csv"), at(10, 30));
        assert_eq!(p, PathBuf::from("output_mar_2025_10-30am.csv"));
    }

    #[test]
    fn only_default_name_is_timestamped() {
        assert_eq!(resolve_output_path(Path::new("custom.csv")), PathBuf::from("custom.csv"));
        let resolved = resolve_output_path(Path::new("dir/output.csv"));
        let name = resolved.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("output_"));
        assert!(name.ends_with(".csv"));
        assert_ne!(name, "output.csv");
    }

    #[test]
    fn writes_bom_and_header_without_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_csv(&path, &[], false).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("Deceased Property Address,Deceased Name,"));
        assert!(text.ends_with("Email Address\n"));
    }

    #[test]
    fn debug_columns_and_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let mut row: Vec<String> = vec![String::new(); 9];
        row[0] = "12 Oak Street, Troy, NY 12180".into();
        row.extend(["TEXT_LAYER".to_string(), "512".into(), "a.pdf".into()]);
        write_csv(&path, &[row], true).unwrap();
        let text = String::from_utf8(std::fs::read(&path).unwrap()[3..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("Email Address,extraction_mode,text_len,pdf_name"));
        assert!(lines[1].starts_with("\"12 Oak Street, Troy, NY 12180\","));
        assert!(lines[1].ends_with(",TEXT_LAYER,512,a.pdf"));
    }
}
