//! dictum-core: shared types, errors, and configuration.
//!
//! This crate is the foundational dependency for all other dictum crates,
//! providing the unified error type, application configuration, and the
//! media-domain types that move through every job.

pub mod config;
pub mod error;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use config::Config;
pub use error::{Error, LoadFailure, Result};
pub use media::*;
