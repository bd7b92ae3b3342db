pub mod structuring;
pub mod source;
pub mod batch;
pub mod processor;
