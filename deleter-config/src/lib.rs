//! Configuration types and loading for the deletion pipeline.
//!
//! The [`shared`] module holds the configuration structs consumed by the
//! pipeline itself, while [`load_config`] implements layered loading from a
//! `configuration/` directory with environment variable overrides.

mod load;
pub mod shared;

pub use load::{LoadError, load_config};
