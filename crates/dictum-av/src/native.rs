//! In-process duration probing, independent of the engine.
//!
//! Segmentation needs a total duration before it will touch the engine, and
//! the metadata probe prefers a duration the engine cannot skew. Decoding
//! headers in-process via symphonia fills that role; the probe runs on the
//! blocking pool under a timeout and reports unknown rather than failing.

use std::time::Duration;

use dictum_core::MediaAsset;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Total duration of `asset` in seconds, or `None` when it cannot be
/// determined within `timeout`.
///
/// A timeout abandons the probing task; it finishes on the blocking pool
/// and its result is discarded.
pub async fn probe_duration(asset: &MediaAsset, timeout: Duration) -> Option<f64> {
    let data = asset.bytes.to_vec();
    let extension = asset.extension().to_string();

    let task = tokio::task::spawn_blocking(move || decode_duration(data, &extension));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(duration)) => duration,
        Ok(Err(join_err)) => {
            tracing::warn!("duration probe panicked: {join_err}");
            None
        }
        Err(_) => {
            tracing::warn!("duration probe timed out after {timeout:?}");
            None
        }
    }
}

fn decode_duration(data: Vec<u8>, extension: &str) -> Option<f64> {
    let source = MediaSourceStream::new(Box::new(std::io::Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    if extension != "bin" {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let track = probed.format.default_track()?;
    let params = &track.codec_params;
    let time_base = params.time_base?;
    let frames = params.n_frames?;

    let time = time_base.calc_time(frames);
    let seconds = time.seconds as f64 + time.frac;
    (seconds > 0.0).then_some(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal PCM WAV: 16-bit mono at `rate` Hz lasting `seconds`.
    fn wav_bytes(rate: u32, seconds: u32) -> Vec<u8> {
        let samples = rate * seconds;
        let data_len = samples * 2;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&(rate * 2).to_le_bytes()); // byte rate
        out.extend_from_slice(&2u16.to_le_bytes()); // block align
        out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(44 + data_len as usize, 0);
        out
    }

    #[tokio::test]
    async fn wav_duration_is_probed() {
        let asset = MediaAsset::new(wav_bytes(8000, 2), "audio/wav", "tone.wav");
        let duration = probe_duration(&asset, Duration::from_secs(5)).await;
        let duration = duration.expect("wav header should probe");
        assert!((duration - 2.0).abs() < 0.1, "got {duration}");
    }

    #[tokio::test]
    async fn garbage_probes_to_none() {
        let asset = MediaAsset::new(vec![0u8; 256], "audio/mpeg", "noise.mp3");
        assert_eq!(probe_duration(&asset, Duration::from_secs(5)).await, None);
    }

    #[tokio::test]
    async fn recorded_duration_is_not_consulted_here() {
        // probe_duration always decodes; callers merge the recorded value.
        let asset =
            MediaAsset::new(vec![0u8; 16], "audio/wav", "tiny.wav").with_duration(42.0);
        assert_eq!(probe_duration(&asset, Duration::from_secs(5)).await, None);
    }
}
