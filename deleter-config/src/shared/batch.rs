use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Batch accumulation configuration for the deletion pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Maximum number of deletion requests in a batch.
    #[serde(default = "default_batch_max_size")]
    pub max_size: usize,
    /// Maximum time, in milliseconds, to wait for a batch to fill before
    /// flushing it.
    #[serde(default = "default_batch_max_fill_ms")]
    pub max_fill_ms: u64,
}

impl BatchConfig {
    /// Default maximum batch size.
    pub const DEFAULT_MAX_SIZE: usize = 128;

    /// Default maximum fill time in milliseconds.
    pub const DEFAULT_MAX_FILL_MS: u64 = 5_000;

    /// Validates batch configuration settings.
    ///
    /// Both the batch size and the fill time must be non-zero: a zero-sized
    /// batch can never flush and a zero fill time would spin the flush timer.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_size == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "batch.max_size".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if self.max_fill_ms == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "batch.max_fill_ms".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: default_batch_max_size(),
            max_fill_ms: default_batch_max_fill_ms(),
        }
    }
}

fn default_batch_max_size() -> usize {
    BatchConfig::DEFAULT_MAX_SIZE
}

fn default_batch_max_fill_ms() -> u64 {
    BatchConfig::DEFAULT_MAX_FILL_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_max_size_is_rejected() {
        let config = BatchConfig {
            max_size: 0,
            max_fill_ms: 100,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_fill_is_rejected() {
        let config = BatchConfig {
            max_size: 10,
            max_fill_ms: 0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(BatchConfig::default().validate().is_ok());
    }
}
