pub mod config;
pub mod pipeline;
pub mod pipeline_config; // Tunable extraction thresholds

use tracing_subscriber::EnvFilter;

pub use pipeline::batch::{BatchRunner, BatchSettings, BatchSummary, CaseResult, RecordAssembler};
pub use pipeline::processor::process_document;
pub use pipeline::source::{ExtractedDocument, TextSource};
pub use pipeline::structuring::{Field, FieldRecord, FormType};
pub use pipeline_config::ExtractionConfig;

/// Install the global tracing subscriber. `RUST_LOG` wins over the default
/// filter. Calling this more than once is harmless.
pub fn init_tracing() {
    let initialized = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if initialized {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
