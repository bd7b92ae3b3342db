//! Batch runs over plain-text petitions on disk.

use std::path::Path;

use estate_intake_lib::pipeline::batch::{BatchRunner, BatchSettings, MemorySheet};
use estate_intake_lib::pipeline::source::{LayeredTextSource, NoOcr, PlainTextLayer};

const PETITION: &str = "SURROGATE'S COURT OF THE STATE OF NEW YORK\n\
    PROBATE PROCEEDING, WILL OF WALTER SCOTT\n\
    Petitioner Information\n\
    Name (First, Middle, Last)\n\
    ANNA SCOTT\n\
    Interest(s) of Petitioner: Distributee of decedent (state relationship): Spouse\n\
    \x0c\
    Improved real property in New York State $350,000.00\n\
    Print Name of Attorney: JANE ROE, ESQ.\n\
    Telephone (718) 555-0101\n";

fn settings(dir: &Path) -> BatchSettings {
    BatchSettings {
        source_dir: dir.to_path_buf(),
        output_csv: dir.join("petitions.csv"),
        log_path: dir.join("run_log.json"),
        ..BatchSettings::default()
    }
}

fn runner(dir: &Path) -> BatchRunner {
    BatchRunner::new(
        Box::new(LayeredTextSource::new(PlainTextLayer, NoOcr)),
        settings(dir),
    )
}

#[test]
fn text_petitions_become_csv_rows_and_log_entries() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("01_scott.txt"), PETITION).unwrap();
    std::fs::write(dir.path().join("02_blank.txt"), "scan").unwrap();

    let sheet = MemorySheet::new();
    let mut runner = runner(dir.path()).with_sheet(Box::new(sheet.clone()));
    let summary = runner.run().unwrap();

    assert_eq!(summary.stats.total, 2);
    assert_eq!(summary.stats.processed, 2);
    assert_eq!(summary.stats.success, 1);
    // The short file needs OCR and no engine is configured.
    assert_eq!(summary.stats.failed, 1);
    assert!(!summary.stats.cancelled);

    let csv = std::fs::read(&summary.out_csv).unwrap();
    assert!(csv.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(csv[3..].to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("Walter Scott"));
    assert!(lines[1].contains("350000"));

    let log: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary.log_path).unwrap()).unwrap();
    let entries = log.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["file"], "01_scott.txt");
    assert_eq!(entries[0]["extraction_method"], "TEXT_LAYER");
    assert_eq!(entries[0]["form_type"], "FORM_A");
    assert_eq!(entries[0]["extraction_info"]["renderer"], "plain-text");
    assert_eq!(entries[1]["file"], "02_blank.txt");
    assert_eq!(entries[1]["case_id"], 1);
    assert!(entries[1]["error"].as_str().unwrap().contains("OCR failed"));

    let rows = sheet.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][1], "Walter Scott");
}

#[test]
fn every_failed_file_still_leaves_a_header_only_csv() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "x").unwrap();
    std::fs::write(dir.path().join("b.txt"), "y").unwrap();

    let summary = runner(dir.path()).run().unwrap();
    assert_eq!(summary.stats.failed, 2);
    assert_eq!(summary.stats.success, 0);

    let text = std::fs::read_to_string(&summary.out_csv).unwrap();
    assert_eq!(text.lines().count(), 1);
}

#[test]
fn prefer_text_layer_keeps_short_documents() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("short.txt"), "Estate of Walter Scott").unwrap();

    let mut settings = settings(dir.path());
    settings.apply_vars(|key| (key == "PREFER_TEXT_LAYER").then(|| "1".to_string()));
    let mut runner = BatchRunner::new(Box::new(LayeredTextSource::new(PlainTextLayer, NoOcr)), settings);
    let summary = runner.run().unwrap();
    assert_eq!(summary.stats.success, 1);
    assert_eq!(summary.stats.ocr, 0);
}
