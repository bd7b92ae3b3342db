/// Application-level constants
pub const APP_NAME: &str = "Estate Intake";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default CSV output name. A run writing to exactly this name gets a timestamped file instead.
pub const DEFAULT_OUTPUT_CSV: &str = "output.csv";

/// Default JSON run-log path.
pub const DEFAULT_LOG_PATH: &str = "run_log.json";

/// Canonical output columns, in fixed order.
pub const OUTPUT_COLUMNS: [&str; 9] = [
    "Deceased Property Address",
    "Deceased Name",
    "Petitioner Name",
    "Petitioner Address",
    "Relationship",
    "Property Value",
    "Attorney",
    "Phone Number",
    "Email Address",
];

/// Extra CSV columns appended in debug mode.
pub const DEBUG_COLUMNS: [&str; 3] = ["extraction_mode", "text_len", "pdf_name"];

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "estate_intake_lib=debug,info"
    } else {
        "estate_intake_lib=info,warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_estate_intake() {
        assert_eq!(APP_NAME, "Estate Intake");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn nine_output_columns_in_fixed_order() {
        assert_eq!(OUTPUT_COLUMNS.len(), 9);
        assert_eq!(OUTPUT_COLUMNS[0], "Deceased Property Address");
        assert_eq!(OUTPUT_COLUMNS[8], "Email Address");
    }

    #[test]
    fn log_filter_targets_crate() {
        assert!(default_log_filter().starts_with("estate_intake_lib="));
    }
}
