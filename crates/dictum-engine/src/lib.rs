//! dictum-engine: codec engine session and virtual-file management.
//!
//! The transcoding engine itself is an external collaborator consumed
//! through the [`CodecEngine`] trait: load once, write named buffers into a
//! virtual filesystem, execute codec command lines, read results back, and
//! delete what is no longer needed. [`EngineSession`] owns the lifecycle and
//! log capture for one engine instance; [`Scratch`] tracks the virtual files
//! a single job creates so they can be swept on every exit path.
//!
//! [`LocalEngine`] is the production implementation: it stages buffers in a
//! private temporary directory and drives the `ffmpeg` CLI.

mod engine;
mod local;
mod scratch;
mod session;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use engine::{CodecEngine, EngineSource, LogHandler};
pub use local::LocalEngine;
pub use scratch::Scratch;
pub use session::EngineSession;
