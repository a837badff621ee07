//! The concatenation job: merge ordered inputs into one output.
//!
//! Two strategies exist because the concat demuxer desynchronizes on some
//! MP4-family inputs. [`Strategy::UniformPcm`] converts every input to
//! uncompressed PCM and concatenates through the demuxer; it is lossless up
//! to the final encode and is the default. [`Strategy::LossyFilter`]
//! re-encodes every input to a fixed-bitrate MP3 and concatenates through a
//! filter graph, trading one extra generation of quality loss for
//! robustness.

use bytes::Bytes;
use dictum_core::{AudioFormat, EncodeSettings, Error, MediaAsset, ProcessedAudio, Result};
use dictum_engine::{EngineSession, Scratch};

use crate::command::EncodeCommand;

/// Bitrate for the lossy intermediates of [`Strategy::LossyFilter`].
const INTERMEDIATE_BITRATE: &str = "128k";

/// How a concatenation merges its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Lossless PCM intermediates joined through the concat demuxer.
    UniformPcm,
    /// Lossy MP3 intermediates joined through a `concat` filter graph.
    LossyFilter,
}

impl Strategy {
    /// Pick a strategy for the given inputs.
    ///
    /// This is a heuristic, not a content probe: any input whose MIME type
    /// or extension puts it in the MP4/AAC family is treated as fragile and
    /// routed through the filter graph. Callers with better knowledge can
    /// pass an explicit strategy instead.
    pub fn select(assets: &[MediaAsset]) -> Self {
        if assets.iter().any(is_fragile) {
            Strategy::LossyFilter
        } else {
            Strategy::UniformPcm
        }
    }
}

fn is_fragile(asset: &MediaAsset) -> bool {
    let mime = asset.mime_type.to_ascii_lowercase();
    if mime.contains("mp4") || mime.contains("aac") {
        return true;
    }
    matches!(
        asset.extension().to_ascii_lowercase().as_str(),
        "m4a" | "mp4" | "aac"
    )
}

/// Concatenate `assets` in order into a single output.
///
/// Output order matches input order and all source metadata is stripped.
/// A failing input aborts the whole job; everything staged so far is swept
/// on the way out.
pub async fn concatenate(
    session: &EngineSession,
    assets: &[MediaAsset],
    settings: &EncodeSettings,
    strategy: Option<Strategy>,
) -> Result<ProcessedAudio> {
    settings.validate()?;
    if assets.is_empty() {
        return Err(Error::Validation(
            "no files provided for concatenation".into(),
        ));
    }

    let strategy = strategy.unwrap_or_else(|| Strategy::select(assets));
    tracing::info!(
        inputs = assets.len(),
        ?strategy,
        format = %settings.format,
        "concatenating audio"
    );

    let mut scratch = Scratch::new("concat");
    let result = match strategy {
        Strategy::UniformPcm => uniform_pcm(session, assets, settings, &mut scratch).await,
        Strategy::LossyFilter => lossy_filter(session, assets, settings, &mut scratch).await,
    };
    scratch.sweep(session).await;
    result
}

/// Stage one input and convert it to an intermediate, wrapping any failure
/// with the offending file's name.
async fn stage_intermediate(
    session: &EngineSession,
    asset: &MediaAsset,
    scratch: &mut Scratch,
    staged: &str,
    args: Vec<String>,
) -> Result<()> {
    let staged_result = async {
        session.write_file(staged, asset.bytes.clone()).await?;
        session.exec(&args).await
    }
    .await;

    // The staged original is not needed once the intermediate exists (or
    // the attempt failed); drop it early to bound virtual-filesystem usage.
    session.discard_file(staged).await;
    scratch.release(staged);

    staged_result.map_err(|e| {
        Error::concatenation(format!("Failed to process file {}: {e}", asset.file_name))
    })
}

async fn uniform_pcm(
    session: &EngineSession,
    assets: &[MediaAsset],
    settings: &EncodeSettings,
    scratch: &mut Scratch,
) -> Result<ProcessedAudio> {
    let dir = scratch.dir("tmp");
    session.create_dir(&dir).await.map_err(Error::concatenation)?;

    let pcm = EncodeSettings {
        format: AudioFormat::Wav,
        bitrate: settings.bitrate.clone(),
        sample_rate: settings.sample_rate,
        channels: settings.channels,
    };

    let mut list = String::new();
    for (i, asset) in assets.iter().enumerate() {
        let staged = scratch.file(&format!("input_{i}.{}", asset.extension()));
        let intermediate = scratch.file_in(&dir, &format!("part_{i}.wav"));

        let args = EncodeCommand::new(&staged, &intermediate, &pcm)
            .container("wav")
            .build();
        stage_intermediate(session, asset, scratch, &staged, args).await?;

        list.push_str(&format!("file '{intermediate}'\n"));
    }

    let list_file = scratch.file_in(&dir, "concat_list.txt");
    session
        .write_file(&list_file, Bytes::from(list))
        .await
        .map_err(Error::concatenation)?;

    let output = scratch.file(&format!("output.{}", settings.format.extension()));

    let mut args: Vec<String> = vec![
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_file,
        "-ar".into(),
        settings.sample_rate.to_string(),
        "-ac".into(),
        settings.channels.to_string(),
        "-c:a".into(),
        settings.format.codec_name().into(),
    ];
    if settings.format.uses_bitrate() {
        args.push("-b:a".into());
        args.push(settings.bitrate.clone());
    }
    for field in ["title", "artist", "album", "comment", "year"] {
        args.push("-metadata".into());
        args.push(format!("{field}="));
    }
    args.push("-map_metadata".into());
    args.push("-1".into());
    args.push("-flags".into());
    args.push("+bitexact".into());
    args.push(output.clone());

    session.exec(&args).await.map_err(Error::concatenation)?;

    finish(session, assets, settings, &output).await
}

async fn lossy_filter(
    session: &EngineSession,
    assets: &[MediaAsset],
    settings: &EncodeSettings,
    scratch: &mut Scratch,
) -> Result<ProcessedAudio> {
    let mp3 = EncodeSettings {
        format: AudioFormat::Mp3,
        bitrate: INTERMEDIATE_BITRATE.into(),
        sample_rate: settings.sample_rate,
        channels: settings.channels,
    };

    let mut intermediates = Vec::with_capacity(assets.len());
    for (i, asset) in assets.iter().enumerate() {
        let staged = scratch.file(&format!("input_{i}.{}", asset.extension()));
        let intermediate = scratch.file(&format!("part_{i}.mp3"));

        let args = EncodeCommand::new(&staged, &intermediate, &mp3)
            .strip_metadata()
            .build();
        stage_intermediate(session, asset, scratch, &staged, args).await?;

        intermediates.push(intermediate);
    }

    let output = scratch.file(&format!("output.{}", settings.format.extension()));

    if let [only] = intermediates.as_slice() {
        // Nothing to join; a plain re-encode to the final format suffices.
        let args = EncodeCommand::new(only, &output, settings)
            .strip_metadata()
            .build();
        session.exec(&args).await.map_err(Error::concatenation)?;
        return finish(session, assets, settings, &output).await;
    }

    let mut args: Vec<String> = Vec::new();
    let mut filter = String::new();
    for (i, intermediate) in intermediates.iter().enumerate() {
        args.push("-i".into());
        args.push(intermediate.clone());
        filter.push_str(&format!("[{i}:0]"));
    }
    filter.push_str(&format!("concat=n={}:v=0:a=1[out]", intermediates.len()));

    args.push("-filter_complex".into());
    args.push(filter);
    args.push("-map".into());
    args.push("[out]".into());
    args.push("-ar".into());
    args.push(settings.sample_rate.to_string());
    args.push("-ac".into());
    args.push(settings.channels.to_string());
    args.push("-c:a".into());
    args.push(settings.format.codec_name().into());
    if settings.format.uses_bitrate() {
        args.push("-b:a".into());
        args.push(settings.bitrate.clone());
    }
    args.push("-map_metadata".into());
    args.push("-1".into());
    args.push(output.clone());

    session.exec(&args).await.map_err(Error::concatenation)?;

    finish(session, assets, settings, &output).await
}

async fn finish(
    session: &EngineSession,
    assets: &[MediaAsset],
    settings: &EncodeSettings,
    output: &str,
) -> Result<ProcessedAudio> {
    let bytes = session
        .read_file(output)
        .await
        .map_err(|e| Error::concatenation(format!("Failed to read concatenated file: {e}")))?;

    let stem = assets
        .first()
        .map(|a| a.stem().to_string())
        .unwrap_or_else(|| "audio".into());

    Ok(ProcessedAudio {
        bytes,
        mime_type: settings.format.mime_type().to_string(),
        file_name: format!("concatenated_{stem}.{}", settings.format.extension()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str, mime: &str) -> MediaAsset {
        MediaAsset::new(vec![1u8; 16], mime, name)
    }

    #[test]
    fn well_behaved_inputs_use_the_demuxer_path() {
        let assets = vec![asset("a.mp3", "audio/mpeg"), asset("b.wav", "audio/wav")];
        assert_eq!(Strategy::select(&assets), Strategy::UniformPcm);
    }

    #[test]
    fn any_mp4_family_input_switches_strategy() {
        let assets = vec![asset("a.mp3", "audio/mpeg"), asset("b.m4a", "audio/mp4")];
        assert_eq!(Strategy::select(&assets), Strategy::LossyFilter);

        // Extension alone is enough when the MIME type is generic.
        let assets = vec![asset("c.m4a", "application/octet-stream")];
        assert_eq!(Strategy::select(&assets), Strategy::LossyFilter);
    }
}
