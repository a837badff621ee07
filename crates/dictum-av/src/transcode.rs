//! The transcode job: one input, one output.

use dictum_core::{EncodeSettings, Error, MediaAsset, ProcessedAudio, Result};
use dictum_engine::{EngineSession, Scratch};

use crate::command::EncodeCommand;

/// Compress one asset to the format and quality in `settings`.
///
/// The input is staged under a job-unique name, converted in a single engine
/// invocation, and read back; both virtual files are swept before this
/// returns, on success and on failure.
pub async fn compress(
    session: &EngineSession,
    asset: &MediaAsset,
    settings: &EncodeSettings,
) -> Result<ProcessedAudio> {
    settings.validate()?;

    let mut scratch = Scratch::new("compress");
    let input = scratch.file(&format!("input.{}", asset.extension()));
    let output = scratch.file(&format!("output.{}", settings.format.extension()));

    tracing::info!(
        file = %asset.file_name,
        format = %settings.format,
        bitrate = %settings.bitrate,
        "compressing audio"
    );

    let result = run(session, asset, settings, &input, &output).await;
    scratch.sweep(session).await;
    result
}

async fn run(
    session: &EngineSession,
    asset: &MediaAsset,
    settings: &EncodeSettings,
    input: &str,
    output: &str,
) -> Result<ProcessedAudio> {
    session
        .write_file(input, asset.bytes.clone())
        .await
        .map_err(Error::compression)?;

    let args = EncodeCommand::new(input, output, settings).build();
    session.exec(&args).await.map_err(Error::compression)?;

    let bytes = session.read_file(output).await.map_err(Error::compression)?;

    Ok(ProcessedAudio {
        bytes,
        mime_type: settings.format.mime_type().to_string(),
        file_name: format!(
            "compressed_{}.{}",
            asset.stem(),
            settings.format.extension()
        ),
    })
}
