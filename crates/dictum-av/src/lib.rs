//! dictum-av: the audio jobs.
//!
//! Each job stages its inputs as virtual files on an [`EngineSession`],
//! drives the engine through one or more invocations, collects the outputs,
//! and sweeps everything it created regardless of success or failure. Jobs
//! never run concurrently against one session; the session serializes engine
//! operations underneath them either way.
//!
//! [`EngineSession`]: dictum_engine::EngineSession

pub mod command;
pub mod concat;
pub mod metadata;
pub mod native;
pub mod segment;
pub mod transcode;

pub use command::EncodeCommand;
pub use concat::{concatenate, Strategy};
pub use metadata::{extract_metadata, AudioMetadata};
pub use segment::split;
pub use transcode::compress;
