//! Test utilities for exercising the pipeline.
//!
//! Compiled only for tests or with the `test-utils` feature enabled.

pub mod store;
