//! Core data types moved through the deletion pipeline.

use std::fmt;

use crate::error::DeleterError;

/// Identifier of a pipeline instance, used for log correlation.
pub type PipelineId = u64;

/// Identifier of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The compact identifier mapped to an original URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortCode(pub String);

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShortCode {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ShortCode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A single ownership link to remove.
///
/// Produced by the HTTP layer on behalf of an authenticated user and
/// consumed exactly once by the batcher. Deleting the link detaches the
/// short code from the user; it does not necessarily remove the underlying
/// URL record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeletionRequest {
    /// Owner of the short code.
    pub user_id: UserId,
    /// Short code whose ownership link should be removed.
    pub short_code: ShortCode,
}

impl DeletionRequest {
    /// Creates a new deletion request for the given ownership link.
    pub fn new(user_id: UserId, short_code: impl Into<ShortCode>) -> Self {
        Self {
            user_id,
            short_code: short_code.into(),
        }
    }
}

/// An ordered group of deletion requests submitted to the store in one call.
///
/// A batch is owned by the batcher until hand-off and by exactly one worker
/// afterwards; batches are never split or merged after creation.
pub type Batch = Vec<DeletionRequest>;

/// Outcome of one store call for one batch.
#[derive(Debug, Clone)]
pub struct DeletionResult {
    /// Number of ownership links the store reported as removed.
    ///
    /// Zero when the call failed; no partial-batch success is modeled.
    pub affected: u64,
    /// Store failure for the batch, if any. The batch is considered
    /// finished either way and is never retried by the pipeline.
    pub error: Option<DeleterError>,
}

impl DeletionResult {
    /// Creates a successful result with the store's affected-row count.
    pub fn ok(affected: u64) -> Self {
        Self {
            affected,
            error: None,
        }
    }

    /// Creates a failed result carrying the store error.
    pub fn failed(error: DeleterError) -> Self {
        Self {
            affected: 0,
            error: Some(error),
        }
    }

    /// Returns whether the store call for this batch succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
