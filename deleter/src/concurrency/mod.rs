//! Concurrency utilities coordinating the deletion pipeline stages.
//!
//! The pipeline is a chain of independent tasks (batcher, delete workers,
//! result forwarders, consumer) that never share mutable state; all
//! cross-stage communication happens over bounded channels. Two primitives
//! support this:
//!
//! - the [`shutdown`] module implements the one-shot broadcast every
//!   blocking hand-off races against, so no stage can hang waiting on a
//!   partner that has already exited;
//! - the [`stream`] module implements the size-or-deadline batching of
//!   incoming deletion requests as a single-threaded stream adapter,
//!   avoiding double-flush races between the two triggers.

pub mod shutdown;
pub mod stream;
