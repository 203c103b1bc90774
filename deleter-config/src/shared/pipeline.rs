use serde::{Deserialize, Serialize};

use crate::shared::{BatchConfig, ValidationError};

/// Configuration for the deletion pipeline.
///
/// Contains all settings required to run the pipeline: batching parameters
/// and the worker fan-out width. All values are fixed for the lifetime of a
/// pipeline; changing them requires building a new pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Number of concurrent delete workers pulling batches from the batcher.
    #[serde(default = "default_max_workers")]
    pub max_workers: u16,
    /// Batch accumulation configuration.
    #[serde(default)]
    pub batch: BatchConfig,
}

impl PipelineConfig {
    /// Default number of delete workers.
    pub const DEFAULT_MAX_WORKERS: u16 = 4;

    /// Validates pipeline configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_workers == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "max_workers".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        self.batch.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            batch: BatchConfig::default(),
        }
    }
}

fn default_max_workers() -> u16 {
    PipelineConfig::DEFAULT_MAX_WORKERS
}
