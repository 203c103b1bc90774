//! Pipeline stages: request batching, delete worker fan-out, and result
//! fan-in.

pub(crate) mod batcher;
pub(crate) mod collector;
pub(crate) mod deleter;
