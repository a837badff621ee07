//! The segmentation job: split one recording into overlapping chunks.

use std::time::Duration;

use dictum_core::config::AudioConfig;
use dictum_core::{AudioFormat, Error, MediaAsset, ProcessedAudio, Result, Segment, SegmentSpec};
use dictum_engine::{EngineSession, Scratch};

use crate::command::EncodeCommand;
use crate::native;

/// Fixed bitrate for segment output; chunks feed a transcription API where
/// fidelity beyond this is wasted upload size.
const SEGMENT_BITRATE: &str = "128k";

/// Split `asset` into consecutive segments of at most `spec.chunk_duration`
/// seconds, each overlapping the previous by `spec.overlap` seconds.
///
/// The total duration comes from the in-process probe (or a duration already
/// recorded on the asset); if it cannot be determined the job fails with
/// [`Error::DurationUnknown`] before any engine work. Trailing slivers
/// shorter than the configured floor are dropped. The job is all-or-nothing:
/// a failed extraction aborts it, unlike concatenation there is no
/// per-input recovery to attempt.
pub async fn split(
    session: &EngineSession,
    asset: &MediaAsset,
    spec: &SegmentSpec,
    format: AudioFormat,
    audio: &AudioConfig,
) -> Result<Vec<Segment>> {
    spec.validate()?;

    let total = match asset.duration {
        Some(d) if d > 0.0 => d,
        _ => {
            let timeout = Duration::from_secs(audio.probe_timeout_secs);
            native::probe_duration(asset, timeout)
                .await
                .unwrap_or(0.0)
        }
    };
    if total <= 0.0 {
        return Err(Error::DurationUnknown);
    }

    tracing::info!(
        file = %asset.file_name,
        total_secs = total,
        chunk_secs = spec.chunk_duration,
        overlap_secs = spec.overlap,
        "splitting audio"
    );

    let mut scratch = Scratch::new("split");
    let result = run(session, asset, spec, format, audio, total, &mut scratch).await;
    scratch.sweep(session).await;
    result
}

async fn run(
    session: &EngineSession,
    asset: &MediaAsset,
    spec: &SegmentSpec,
    format: AudioFormat,
    audio: &AudioConfig,
    total: f64,
    scratch: &mut Scratch,
) -> Result<Vec<Segment>> {
    let input = scratch.file(&format!("input.{}", asset.extension()));
    session
        .write_file(&input, asset.bytes.clone())
        .await
        .map_err(Error::splitting)?;

    let mut segments: Vec<Segment> = Vec::new();
    let mut position = 0.0f64;

    while position < total && segments.len() < audio.max_segments {
        let duration = spec.chunk_duration.min(total - position);
        if duration < audio.min_segment_secs {
            break;
        }

        let index = segments.len() + 1;
        let output = scratch.file(&format!("part_{index}.{}", format.extension()));

        let args = EncodeCommand::bare(&input, &output, format)
            .window(position, duration)
            .bitrate(SEGMENT_BITRATE)
            .build();
        session.exec(&args).await.map_err(Error::splitting)?;
        let bytes = session.read_file(&output).await.map_err(Error::splitting)?;

        // Drop each chunk as soon as it is read so at most one segment
        // lives in the virtual filesystem at a time.
        session.discard_file(&output).await;
        scratch.release(&output);

        let end = position + duration;
        segments.push(Segment {
            index,
            start: position,
            end,
            duration,
            audio: ProcessedAudio {
                bytes,
                mime_type: format.mime_type().to_string(),
                file_name: format!(
                    "{}_part{index}_{}-{}.{}",
                    asset.stem(),
                    format_timestamp(position),
                    format_timestamp(end),
                    format.extension()
                ),
            },
        });

        position += duration - spec.overlap;
    }

    if segments.is_empty() {
        return Err(Error::NoSegmentsCreated);
    }

    Ok(segments)
}

/// Render seconds as `HH.MM.SS` for file names.
fn format_timestamp(seconds: f64) -> String {
    let whole = seconds.floor() as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;
    format!("{hours:02}.{minutes:02}.{secs:02}")
}
