//! Unified error type for the dictum application.
//!
//! All crates funnel their failures into [`Error`]. Job-level variants wrap
//! the underlying engine or probe message so a single human-readable string
//! reaches the caller.

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Why the codec engine could not be loaded.
///
/// This sub-signal only drives remediation messaging; retry behavior is the
/// same in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    /// The engine executable was not found at the configured location.
    MissingResources,
    /// The engine executable exists but could not be run.
    AccessRestricted,
}

impl LoadFailure {
    /// Remediation hint shown to the user alongside the error message.
    pub fn hint(&self) -> &'static str {
        match self {
            LoadFailure::MissingResources => {
                "install ffmpeg (https://ffmpeg.org/download.html) or point engine.ffmpeg_path at an existing binary"
            }
            LoadFailure::AccessRestricted => {
                "the ffmpeg binary exists but could not be executed; check file permissions and sandbox restrictions"
            }
        }
    }
}

/// Errors that can occur across the dictum pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine session could not be loaded (or is not loaded yet).
    #[error("engine unavailable: {message}")]
    EngineUnavailable {
        /// Whether the failure looks like missing resources or a security
        /// restriction.
        cause: LoadFailure,
        /// Human-readable description of the load failure.
        message: String,
    },

    /// The requested output format is outside the supported set.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A transcode job failed.
    #[error("Compression failed: {message}")]
    Compression { message: String },

    /// A concatenation job failed.
    #[error("Concatenation failed: {message}")]
    Concatenation { message: String },

    /// A segmentation job failed.
    #[error("Splitting failed: {message}")]
    Splitting { message: String },

    /// Metadata extraction failed before any best-effort fallback applied.
    #[error("Metadata extraction failed: {message}")]
    Metadata { message: String },

    /// Segmentation cannot proceed without a known duration.
    #[error("could not determine audio duration")]
    DurationUnknown,

    /// The segmentation loop completed without producing any output.
    #[error("no segments were created")]
    NoSegmentsCreated,

    /// A raw engine operation (write/exec/read/delete) failed.
    #[error("engine error: {message}")]
    Engine { message: String },

    /// A remote API call failed.
    #[error("API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Api {
        /// HTTP status, when the request reached the server.
        status: Option<u16>,
        /// Error description, preferring the API's own message.
        message: String,
    },

    /// Request data failed validation before any work started.
    #[error("validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::EngineUnavailable`].
    pub fn engine_unavailable(cause: LoadFailure, message: impl Into<String>) -> Self {
        Error::EngineUnavailable {
            cause,
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Engine`].
    pub fn engine(message: impl Into<String>) -> Self {
        Error::Engine {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Compression`].
    pub fn compression(message: impl std::fmt::Display) -> Self {
        Error::Compression {
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Concatenation`].
    pub fn concatenation(message: impl std::fmt::Display) -> Self {
        Error::Concatenation {
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Splitting`].
    pub fn splitting(message: impl std::fmt::Display) -> Self {
        Error::Splitting {
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Metadata`].
    pub fn metadata(message: impl std::fmt::Display) -> Self {
        Error::Metadata {
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Api`].
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            message: message.into(),
        }
    }

    /// The remediation hint for load failures, if this is one.
    pub fn load_hint(&self) -> Option<&'static str> {
        match self {
            Error::EngineUnavailable { cause, .. } => Some(cause.hint()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_unavailable_display() {
        let err = Error::engine_unavailable(LoadFailure::MissingResources, "ffmpeg not found");
        assert_eq!(err.to_string(), "engine unavailable: ffmpeg not found");
        assert!(err.load_hint().unwrap().contains("ffmpeg.org"));
    }

    #[test]
    fn access_restricted_hint() {
        let err = Error::engine_unavailable(LoadFailure::AccessRestricted, "permission denied");
        assert!(err.load_hint().unwrap().contains("permissions"));
    }

    #[test]
    fn unsupported_format_display() {
        let err = Error::UnsupportedFormat("flac".into());
        assert_eq!(err.to_string(), "unsupported format: flac");
    }

    #[test]
    fn compression_wraps_message() {
        let err = Error::compression("exec exited with status 1");
        assert_eq!(
            err.to_string(),
            "Compression failed: exec exited with status 1"
        );
    }

    #[test]
    fn concatenation_wraps_message() {
        let err = Error::concatenation("Failed to process file a.m4a: boom");
        assert_eq!(
            err.to_string(),
            "Concatenation failed: Failed to process file a.m4a: boom"
        );
    }

    #[test]
    fn api_display_with_status() {
        let err = Error::api(Some(401), "invalid key");
        assert_eq!(err.to_string(), "API error (401): invalid key");
    }

    #[test]
    fn api_display_without_status() {
        let err = Error::api(None, "connection refused");
        assert_eq!(err.to_string(), "API error: connection refused");
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn non_load_errors_have_no_hint() {
        assert!(Error::DurationUnknown.load_hint().is_none());
    }
}
