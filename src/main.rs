mod cli;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands, ConcatStrategy};
use dictum_api::{DocumentClient, TranscriptionClient};
use dictum_av::concat::Strategy;
use dictum_core::{
    mime_for_extension, AudioFormat, Config, EncodeSettings, MediaAsset, ProcessedAudio,
    SegmentSpec,
};
use dictum_engine::{CodecEngine, EngineSession, LocalEngine};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "dictum=trace,dictum_av=trace,dictum_engine=trace,dictum_api=debug".to_string()
        } else {
            "dictum=info,dictum_av=info,dictum_engine=info,dictum_api=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config = Config::load_or_default(cli.config.as_deref());
    tracing::debug!("configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Compress {
            input,
            format,
            bitrate,
            sample_rate,
            channels,
            output,
        } => rt.block_on(compress_file(
            &config,
            &input,
            &format,
            bitrate,
            sample_rate,
            channels,
            output,
        )),
        Commands::Concat {
            inputs,
            format,
            bitrate,
            strategy,
            output,
        } => rt.block_on(concat_files(&config, &inputs, &format, bitrate, strategy, output)),
        Commands::Split {
            input,
            chunk_minutes,
            overlap_secs,
            format,
            out_dir,
        } => rt.block_on(split_file(
            &config,
            &input,
            chunk_minutes,
            overlap_secs,
            &format,
            out_dir,
        )),
        Commands::Probe { file, json } => rt.block_on(probe_file(&config, &file, json)),
        Commands::Transcribe {
            file,
            language,
            output,
        } => rt.block_on(transcribe_file(&config, &file, language, output)),
        Commands::ProcessDocument {
            transcription,
            instruction,
            template,
            output,
        } => rt.block_on(process_document(
            &config,
            &transcription,
            &instruction,
            template.as_deref(),
            output,
        )),
        Commands::GenerateTemplate {
            instruction,
            template,
            output,
        } => rt.block_on(generate_template(&config, &instruction, &template, output)),
        Commands::CheckTools => check_tools(&config),
        Commands::Validate { path } => {
            let path = path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("dictum {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Load an input file as a media asset, guessing the MIME type from its
/// extension.
fn load_asset(path: &Path) -> Result<MediaAsset> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "input".to_string());
    let mime = path
        .extension()
        .map(|e| mime_for_extension(&e.to_string_lossy()))
        .unwrap_or("application/octet-stream");
    Ok(MediaAsset::new(bytes, mime, file_name))
}

/// Create and load an engine session, surfacing the remediation hint when
/// the engine cannot be obtained.
async fn ready_session(config: &Config) -> Result<EngineSession> {
    let engine = LocalEngine::new(config.engine.clone())?;
    let session = EngineSession::new(Arc::new(engine) as Arc<dyn CodecEngine>);
    if let Err(e) = session.load().await {
        if let Some(hint) = e.load_hint() {
            eprintln!("hint: {hint}");
        }
        return Err(e.into());
    }
    Ok(session)
}

fn settings_from(format: &str, bitrate: String, sample_rate: u32, channels: u8) -> Result<EncodeSettings> {
    let format = AudioFormat::from_str(format)?;
    Ok(EncodeSettings {
        format,
        bitrate,
        sample_rate,
        channels,
    })
}

/// Write a produced file either to the explicit output path or next to
/// `anchor` under its produced name.
fn write_output(produced: &ProcessedAudio, anchor: &Path, output: Option<PathBuf>) -> Result<PathBuf> {
    let path = output.unwrap_or_else(|| {
        anchor
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&produced.file_name)
    });
    std::fs::write(&path, &produced.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn write_text(text: &str, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

async fn compress_file(
    config: &Config,
    input: &Path,
    format: &str,
    bitrate: String,
    sample_rate: u32,
    channels: u8,
    output: Option<PathBuf>,
) -> Result<()> {
    let settings = settings_from(format, bitrate, sample_rate, channels)?;
    let asset = load_asset(input)?;
    let session = ready_session(config).await?;

    let produced = dictum_av::compress(&session, &asset, &settings).await?;
    let ratio = asset.bytes.len() as f64 / produced.bytes.len().max(1) as f64;
    let path = write_output(&produced, input, output)?;
    println!(
        "Wrote {} ({} -> {} bytes, {ratio:.2}:1)",
        path.display(),
        asset.bytes.len(),
        produced.bytes.len()
    );
    Ok(())
}

async fn concat_files(
    config: &Config,
    inputs: &[PathBuf],
    format: &str,
    bitrate: String,
    strategy: ConcatStrategy,
    output: Option<PathBuf>,
) -> Result<()> {
    let settings = settings_from(
        format,
        bitrate,
        config.audio.sample_rate,
        config.audio.channels,
    )?;
    let assets: Vec<MediaAsset> = inputs
        .iter()
        .map(|p| load_asset(p))
        .collect::<Result<_>>()?;

    let strategy = match strategy {
        ConcatStrategy::Auto => None,
        ConcatStrategy::Pcm => Some(Strategy::UniformPcm),
        ConcatStrategy::Filter => Some(Strategy::LossyFilter),
    };

    let session = ready_session(config).await?;
    let produced = dictum_av::concatenate(&session, &assets, &settings, strategy).await?;
    let path = write_output(&produced, &inputs[0], output)?;
    println!("Wrote {} ({} inputs)", path.display(), inputs.len());
    Ok(())
}

async fn split_file(
    config: &Config,
    input: &Path,
    chunk_minutes: f64,
    overlap_secs: f64,
    format: &str,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let format = AudioFormat::from_str(format)?;
    let spec = SegmentSpec::new(chunk_minutes * 60.0, overlap_secs);
    let asset = load_asset(input)?;
    let session = ready_session(config).await?;

    let segments = dictum_av::split(&session, &asset, &spec, format, &config.audio).await?;

    let dir = out_dir.unwrap_or_else(|| {
        input
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    });
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    for segment in &segments {
        let path = dir.join(&segment.audio.file_name);
        std::fs::write(&path, &segment.audio.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!(
            "[{}] {} ({:.0}s - {:.0}s)",
            segment.index,
            path.display(),
            segment.start,
            segment.end
        );
    }
    println!("Wrote {} segments", segments.len());
    Ok(())
}

async fn probe_file(config: &Config, file: &Path, json: bool) -> Result<()> {
    let asset = load_asset(file)?;
    let session = ready_session(config).await?;
    let meta = dictum_av::extract_metadata(&session, &asset, &config.audio).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    } else {
        println!("File:        {}", asset.file_name);
        println!("Duration:    {:.2}s", meta.duration);
        println!("Bitrate:     {}", meta.bitrate);
        println!("Codec:       {}", meta.codec);
        println!("Sample rate: {}", meta.sample_rate);
        println!("Channels:    {}", meta.channels);
    }
    Ok(())
}

async fn transcribe_file(
    config: &Config,
    file: &Path,
    language: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let asset = load_asset(file)?;
    let mut client = TranscriptionClient::new(&config.api);
    if let Some(language) = language {
        client = client.with_language(language);
    }
    let text = client.transcribe(&asset).await?;
    write_text(&text, output)
}

async fn process_document(
    config: &Config,
    transcription: &Path,
    instruction: &Path,
    template: Option<&Path>,
    output: Option<PathBuf>,
) -> Result<()> {
    let transcription = read_text_file(transcription)?;
    let instruction = read_text_file(instruction)?;
    let template = template.map(read_text_file).transpose()?;

    let client = DocumentClient::new(&config.api, &config.prompts);
    let document = client
        .process_document(&transcription, &instruction, template.as_deref())
        .await?;
    write_text(&document, output)
}

async fn generate_template(
    config: &Config,
    instruction: &Path,
    template: &Path,
    output: Option<PathBuf>,
) -> Result<()> {
    let instruction = read_text_file(instruction)?;
    let template = read_text_file(template)?;

    let client = DocumentClient::new(&config.api, &config.prompts);
    let generated = client.generate_template(&instruction, &template).await?;
    write_text(&generated, output)
}

fn read_text_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn check_tools(config: &Config) -> Result<()> {
    let location = config
        .engine
        .ffmpeg_path
        .clone()
        .map(Ok)
        .unwrap_or_else(|| which::which("ffmpeg"));

    match location {
        Ok(path) if path.exists() => {
            let version = std::process::Command::new(&path)
                .arg("-version")
                .output()
                .ok()
                .filter(|o| o.status.success())
                .and_then(|o| {
                    String::from_utf8_lossy(&o.stdout)
                        .lines()
                        .next()
                        .map(str::to_string)
                });
            match version {
                Some(version) => println!("ffmpeg: {} ({version})", path.display()),
                None => println!("ffmpeg: {} (present, but -version failed)", path.display()),
            }
        }
        Ok(path) => println!("ffmpeg: MISSING (configured path {} not found)", path.display()),
        Err(_) => println!("ffmpeg: MISSING (not on PATH; set engine.ffmpeg_path)"),
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(path);
    let warnings = config.validate();
    if warnings.is_empty() {
        println!("Configuration OK");
    } else {
        for warning in &warnings {
            println!("warning: {warning}");
        }
        println!("{} warning(s)", warnings.len());
    }
    Ok(())
}
