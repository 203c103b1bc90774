//! Deletion store trait and built-in implementations.

pub mod base;
pub mod memory;

pub use base::DeletionStore;
