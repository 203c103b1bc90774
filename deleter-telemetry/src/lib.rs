//! Telemetry setup for the deletion pipeline.

pub mod tracing;
