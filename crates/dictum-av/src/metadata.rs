//! Best-effort metadata extraction from the engine's log stream.
//!
//! The engine has no structured probe output; running `-i <file> -f null -`
//! makes it print an input dump whose shape varies by container. Parsing is
//! therefore tolerant: several pattern variants are tried and anything that
//! cannot be established becomes the literal string `"Unknown"` so display
//! code never deals with absent fields.

use std::time::Duration;

use regex::{Captures, Regex};
use serde::Serialize;

use dictum_core::config::AudioConfig;
use dictum_core::{Error, MediaAsset, Result};
use dictum_engine::{EngineSession, Scratch};

use crate::native;

/// Extracted stream properties. `duration` is in seconds, `0.0` when
/// unknown; the string fields carry an `"Unknown"` sentinel instead of
/// being optional.
#[derive(Debug, Clone, Serialize)]
pub struct AudioMetadata {
    pub duration: f64,
    pub bitrate: String,
    pub codec: String,
    pub sample_rate: String,
    pub channels: String,
}

/// Probe `asset` for duration, bitrate, codec, sample rate, and channels.
///
/// The in-process duration probe runs first (bounded by the configured
/// timeout); the engine pass fills in the rest from its log. An engine
/// failure degrades to whatever could still be established; only a failure
/// to stage the input at all is an error.
pub async fn extract_metadata(
    session: &EngineSession,
    asset: &MediaAsset,
    audio: &AudioConfig,
) -> Result<AudioMetadata> {
    let timeout = Duration::from_secs(audio.probe_timeout_secs);
    let native_duration = native::probe_duration(asset, timeout).await;

    let mut scratch = Scratch::new("metadata");
    let input = scratch.file(&format!("probe.{}", asset.extension()));

    if let Err(e) = session.write_file(&input, asset.bytes.clone()).await {
        scratch.sweep(session).await;
        return Err(Error::metadata(e));
    }

    // The log buffer is shared session state; start from a clean slate so
    // a previous job's lines cannot leak into this parse.
    session.clear_logs();

    let exec_result = session
        .exec(&[
            "-i".into(),
            input.clone(),
            "-f".into(),
            "null".into(),
            "-".into(),
        ])
        .await;

    let log = session.recent_logs().join("\n");
    scratch.sweep(session).await;

    if let Err(e) = exec_result {
        tracing::warn!(file = %asset.file_name, "metadata pass failed: {e}");
    }

    let parsed = parse_log(&log);

    // A positive in-process duration wins; the engine-parsed value is the
    // fallback.
    let duration = native_duration
        .filter(|d| *d > 0.0)
        .or(parsed.duration)
        .unwrap_or(0.0);

    let mut codec = parsed.codec.unwrap_or_else(|| "Unknown".into());
    if codec == "Unknown" && asset.file_name.to_ascii_lowercase().ends_with(".m4a") {
        codec = "AAC (most likely)".into();
    }

    Ok(AudioMetadata {
        duration,
        bitrate: parsed.bitrate.unwrap_or_else(|| "Unknown".into()),
        codec,
        sample_rate: parsed.sample_rate.unwrap_or_else(|| "Unknown".into()),
        channels: parsed.channels.unwrap_or_else(|| "Unknown".into()),
    })
}

#[derive(Debug, Default)]
struct ParsedLog {
    duration: Option<f64>,
    bitrate: Option<String>,
    codec: Option<String>,
    sample_rate: Option<String>,
    channels: Option<String>,
}

fn capture<'t>(pattern: &str, text: &'t str) -> Option<Captures<'t>> {
    Regex::new(pattern).ok()?.captures(text)
}

/// Parse an engine log dump with tolerant pattern variants.
fn parse_log(log: &str) -> ParsedLog {
    let mut parsed = ParsedLog::default();

    if let Some(caps) = capture(r"Duration:\s*(\d+):(\d+):(\d+(?:\.\d+)?)", log) {
        let hours: f64 = caps[1].parse().unwrap_or(0.0);
        let minutes: f64 = caps[2].parse().unwrap_or(0.0);
        let seconds: f64 = caps[3].parse().unwrap_or(0.0);
        parsed.duration = Some(hours * 3600.0 + minutes * 60.0 + seconds);
    }

    if let Some(caps) = capture(r"(?i)bitrate[:\s]+(\d+)\s*kb/s", log) {
        parsed.bitrate = Some(format!("{} kb/s", &caps[1]));
    }

    // Stream-line variants: the MP4 dump qualifies the stream with a codec
    // tag and language; the generic form goes straight into the fields.
    let stream_patterns = [
        r"Stream #0:\d+(?:\([^)]*\))?: Audio: ([^,]+),\s*(\d+)\s*Hz,\s*([^,]+)",
        r"Audio: ([^,]+),\s*(\d+)\s*Hz(?:,\s*([^,]+))?",
    ];
    for pattern in stream_patterns {
        if let Some(caps) = capture(pattern, log) {
            parsed.codec = Some(caps[1].trim().to_string());
            parsed.sample_rate = Some(format!("{} Hz", &caps[2]));
            parsed.channels = caps
                .get(3)
                .map(|m| normalize_channels(m.as_str().trim()));
            break;
        }
    }

    parsed
}

fn normalize_channels(raw: &str) -> String {
    match raw {
        "mono" | "1" => "1 (Mono)".to_string(),
        "stereo" | "2" => "2 (Stereo)".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MP3_LOG: &str = "\
Input #0, mp3, from 'probe.mp3':
  Duration: 00:03:25.54, start: 0.025057, bitrate: 128 kb/s
  Stream #0:0: Audio: mp3, 44100 Hz, stereo, fltp, 128 kb/s";

    const MP4_LOG: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'probe.m4a':
  Duration: 01:02:03.50, start: 0.000000, bitrate: 129 kb/s
  Stream #0:0(und): Audio: aac (LC) (mp4a / 0x6134706D), 48000 Hz, mono, fltp, 128 kb/s";

    #[test]
    fn parses_generic_mp3_dump() {
        let parsed = parse_log(MP3_LOG);
        assert!((parsed.duration.unwrap() - 205.54).abs() < 1e-9);
        assert_eq!(parsed.bitrate.as_deref(), Some("128 kb/s"));
        assert_eq!(parsed.codec.as_deref(), Some("mp3"));
        assert_eq!(parsed.sample_rate.as_deref(), Some("44100 Hz"));
        assert_eq!(parsed.channels.as_deref(), Some("2 (Stereo)"));
    }

    #[test]
    fn parses_mp4_specific_dump() {
        let parsed = parse_log(MP4_LOG);
        let expected = 3723.5;
        assert!((parsed.duration.unwrap() - expected).abs() < 1e-9);
        assert_eq!(parsed.codec.as_deref(), Some("aac (LC) (mp4a / 0x6134706D)"));
        assert_eq!(parsed.sample_rate.as_deref(), Some("48000 Hz"));
        assert_eq!(parsed.channels.as_deref(), Some("1 (Mono)"));
    }

    #[test]
    fn empty_log_parses_to_nothing() {
        let parsed = parse_log("");
        assert!(parsed.duration.is_none());
        assert!(parsed.codec.is_none());
    }

    #[test]
    fn channel_words_are_normalized() {
        assert_eq!(normalize_channels("mono"), "1 (Mono)");
        assert_eq!(normalize_channels("stereo"), "2 (Stereo)");
        assert_eq!(normalize_channels("5.1"), "5.1");
    }
}
