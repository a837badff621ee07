//! Media-domain types: the output format enumeration and the assets that
//! move through jobs.
//!
//! [`AudioFormat`] is a closed enum; the codec, container MIME type, and
//! bitrate applicability are exhaustive match tables so a new format cannot
//! be added without deciding all three.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::BITRATE_OPTIONS;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// AudioFormat
// ---------------------------------------------------------------------------

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    M4a,
    Opus,
    Wav,
}

impl AudioFormat {
    /// All supported formats, in presentation order.
    pub const ALL: [AudioFormat; 4] = [
        AudioFormat::Mp3,
        AudioFormat::M4a,
        AudioFormat::Opus,
        AudioFormat::Wav,
    ];

    /// The ffmpeg encoder selected for this format.
    pub fn codec_name(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::M4a => "aac",
            AudioFormat::Opus => "libopus",
            AudioFormat::Wav => "pcm_s16le",
        }
    }

    /// MIME type of the produced container.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Opus => "audio/opus",
            AudioFormat::Wav => "audio/wav",
        }
    }

    /// File extension for output names.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
        }
    }

    /// Whether a `-b:a` flag applies. PCM output has no bitrate.
    pub fn uses_bitrate(&self) -> bool {
        !matches!(self, AudioFormat::Wav)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    /// Parse a user-supplied format name. `aac` is accepted as an alias for
    /// the m4a container it is delivered in.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "m4a" | "aac" => Ok(AudioFormat::M4a),
            "opus" => Ok(AudioFormat::Opus),
            "wav" => Ok(AudioFormat::Wav),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Guess a MIME type from a file extension, for staging CLI inputs.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" | "aac" => "audio/mp4",
        "opus" => "audio/opus",
        "ogg" | "oga" => "audio/ogg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// An input recording moving through a job.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    /// Raw file contents.
    pub bytes: Bytes,
    /// Declared MIME type (from the upload or guessed from the extension).
    pub mime_type: String,
    /// Original file name, used for output naming and error context.
    pub file_name: String,
    /// Duration in seconds, when already probed.
    pub duration: Option<f64>,
}

impl MediaAsset {
    pub fn new(
        bytes: impl Into<Bytes>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            file_name: file_name.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// File name up to the first dot, used as the stem for derived names.
    pub fn stem(&self) -> &str {
        self.file_name.split('.').next().unwrap_or("audio")
    }

    /// Extension of the original file name, defaulting to `bin`.
    pub fn extension(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext,
            _ => "bin",
        }
    }
}

/// One produced output file.
#[derive(Debug, Clone)]
pub struct ProcessedAudio {
    pub bytes: Bytes,
    pub mime_type: String,
    pub file_name: String,
}

/// One segment produced by a split, with its window in the source recording.
#[derive(Debug, Clone)]
pub struct Segment {
    /// 1-based position in the output sequence.
    pub index: usize,
    /// Window start in seconds from the beginning of the source.
    pub start: f64,
    /// Window end in seconds.
    pub end: f64,
    /// Window length in seconds.
    pub duration: f64,
    /// The encoded segment audio.
    pub audio: ProcessedAudio,
}

// ---------------------------------------------------------------------------
// Job parameters
// ---------------------------------------------------------------------------

/// Encoding parameters shared by all jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub format: AudioFormat,
    pub bitrate: String,
    pub sample_rate: u32,
    pub channels: u8,
}

impl EncodeSettings {
    /// Settings with the application defaults for the given format.
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            bitrate: "128k".into(),
            sample_rate: 44_100,
            channels: 2,
        }
    }

    /// Check the parameters against the supported ranges.
    ///
    /// The bitrate is only checked for formats that use one.
    pub fn validate(&self) -> Result<()> {
        if self.format.uses_bitrate() && !BITRATE_OPTIONS.contains(&self.bitrate.as_str()) {
            return Err(Error::Validation(format!(
                "bitrate {:?} is not one of {}",
                self.bitrate,
                BITRATE_OPTIONS.join(", ")
            )));
        }
        if self.channels != 1 && self.channels != 2 {
            return Err(Error::Validation(format!(
                "channel count must be 1 or 2, got {}",
                self.channels
            )));
        }
        if self.sample_rate == 0 {
            return Err(Error::Validation("sample rate must be positive".into()));
        }
        Ok(())
    }
}

/// Windowing parameters for a split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentSpec {
    /// Target length of each segment, in seconds.
    pub chunk_duration: f64,
    /// Overlap carried into the next segment, in seconds.
    pub overlap: f64,
}

impl SegmentSpec {
    pub fn new(chunk_duration: f64, overlap: f64) -> Self {
        Self {
            chunk_duration,
            overlap,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_duration <= 0.0 {
            return Err(Error::Validation("chunk duration must be positive".into()));
        }
        if self.overlap < 0.0 || self.overlap >= self.chunk_duration {
            return Err(Error::Validation(
                "overlap must be non-negative and shorter than the chunk duration".into(),
            ));
        }
        Ok(())
    }
}
