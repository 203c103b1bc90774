use std::future::Future;

use crate::error::DeleterResult;
use crate::types::DeletionRequest;

/// Trait for durable stores that can remove ownership links in bulk.
///
/// [`DeletionStore`] implementations perform the actual bulk delete for a
/// batch of (user, short code) pairs and report how many links were removed.
/// The pipeline issues these calls from several workers at once, so
/// implementations must tolerate concurrent callers, and it treats every
/// call as synchronous and potentially slow, tolerating arbitrary latency.
///
/// A failed call fails the whole batch: no partial-batch success is modeled
/// and the pipeline never retries. Implementations that want retry behavior
/// must handle it internally.
pub trait DeletionStore {
    /// Returns the name of the store, used in worker log spans.
    fn name() -> &'static str;

    /// Removes the given ownership links and returns how many were actually
    /// removed.
    ///
    /// Links that do not exist are skipped, not errors, matching the
    /// affected-rows semantics of a bulk SQL delete.
    fn delete_ownership(
        &self,
        batch: &[DeletionRequest],
    ) -> impl Future<Output = DeleterResult<u64>> + Send;
}
