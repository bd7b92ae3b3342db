//! Batch driver.
//!
//! Collects input files, runs each through the text source and the
//! per-document pipeline, and persists the rows:
//! ```text
//! files → TextSource → process_document → RecordAssembler → CSV / sheet / run log
//! ```
//! The assembler lives for exactly one run, so the bleed guard never sees
//! names from a previous batch.

pub mod error;
pub mod types;
pub mod assembler;
pub mod settings;
pub mod csv_sink;
pub mod sheet;
pub mod runner;

pub use error::BatchError;
pub use types::*;
pub use assembler::{Assembled, RecordAssembler, ADMIN_REQUIRED};
pub use settings::BatchSettings;
pub use csv_sink::{resolve_output_path, timestamped_path, write_csv};
pub use sheet::{sheet_link_to_id, HeaderStatus, MemorySheet, SheetError, SpreadsheetSink};
pub use runner::{collect_inputs, write_run_log, BatchRunner, ProgressFn};
