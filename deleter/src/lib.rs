//! Asynchronous deletion pipeline for a URL-shortening service.
//!
//! Users mark short codes they own as deleted; the HTTP layer answers
//! "accepted" immediately and hands the already-authorized (user, short code)
//! pairs to this pipeline, which accumulates them into bounded batches,
//! deletes them from the backing store across a fixed pool of workers, and
//! funnels the per-worker results into a single logging stream.
//!
//! Shutdown is a one-shot broadcast shared by every stage: batches already in
//! a worker's hands run to completion, while requests, batches, or results
//! caught mid-hand-off may be dropped. This is a deliberate best-effort
//! contract, documented on [`pipeline::DeletionPipeline::shutdown`].

pub mod concurrency;
pub mod error;
mod macros;
pub mod pipeline;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
mod workers;
