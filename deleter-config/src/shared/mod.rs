//! Shared configuration types for the deletion pipeline.

mod batch;
mod pipeline;

use thiserror::Error;

pub use batch::BatchConfig;
pub use pipeline::PipelineConfig;

/// Validation failures for configuration values.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field holds a value outside its allowed range.
    #[error("invalid value for field '{field}': {constraint}")]
    InvalidFieldValue {
        /// Dotted path of the offending field.
        field: String,
        /// Human-readable constraint the value violated.
        constraint: String,
    },
}
