//! The consumed engine contract.

use async_trait::async_trait;
use bytes::Bytes;
use dictum_core::Result;

/// Consumer of the engine's textual log stream.
///
/// Log line ordering is engine-determined; treat lines as unordered
/// evidence, not a guaranteed sequence.
pub type LogHandler = Box<dyn Fn(&str) + Send + Sync>;

/// Where an engine implementation was loaded from, for diagnostics.
#[derive(Debug, Clone)]
pub struct EngineSource {
    /// Engine name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved location (path, or "PATH" before resolution).
    pub location: String,
}

impl std::fmt::Display for EngineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.location)
    }
}

/// Contract of the sandboxed transcoding engine.
///
/// Names address a flat virtual filesystem owned by the engine instance;
/// directories are explicit and a `/`-joined name addresses a file inside
/// one. The engine is not safe for concurrent invocation: callers must not
/// issue a second operation before the previous one settles.
#[async_trait]
pub trait CodecEngine: Send + Sync {
    /// Initialize the engine. Must succeed before any other operation.
    ///
    /// Idempotent once loaded; a failed load may be retried.
    async fn load(&self) -> Result<()>;

    /// Write a buffer into the named virtual file.
    async fn write_file(&self, name: &str, data: Bytes) -> Result<()>;

    /// Execute one codec command line.
    async fn exec(&self, args: &[String]) -> Result<()>;

    /// Read the named virtual file.
    async fn read_file(&self, name: &str) -> Result<Bytes>;

    /// Delete the named virtual file.
    async fn delete_file(&self, name: &str) -> Result<()>;

    /// Create the named virtual directory.
    async fn create_dir(&self, name: &str) -> Result<()>;

    /// Delete the named virtual directory and its contents.
    async fn delete_dir(&self, name: &str) -> Result<()>;

    /// Register a consumer of the engine's log stream.
    fn on_log(&self, handler: LogHandler);

    /// Describe where this engine was loaded from.
    fn source(&self) -> EngineSource;
}
