use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dictum")]
#[command(author, version, about = "Audio pipeline toolkit for dictation workflows")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Concatenation strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConcatStrategy {
    /// Decide from the inputs (MP4-family inputs use the filter graph)
    Auto,
    /// Lossless PCM intermediates through the concat demuxer
    Pcm,
    /// Lossy intermediates through a concat filter graph
    Filter,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compress one audio file to a target format and bitrate
    Compress {
        /// Input audio file
        #[arg(required = true)]
        input: PathBuf,

        /// Output format: mp3, m4a (aac), opus, or wav
        #[arg(short, long, default_value = "mp3")]
        format: String,

        /// Bitrate (ignored for wav)
        #[arg(short, long, default_value = "128k")]
        bitrate: String,

        /// Output sample rate in Hz
        #[arg(long, default_value = "44100")]
        sample_rate: u32,

        /// Output channel count (1 or 2)
        #[arg(long, default_value = "2")]
        channels: u8,

        /// Where to write the output (defaults next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Concatenate audio files in the given order
    Concat {
        /// Input files, merged in this order
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output format: mp3, m4a (aac), opus, or wav
        #[arg(short, long, default_value = "mp3")]
        format: String,

        /// Bitrate (ignored for wav)
        #[arg(short, long, default_value = "128k")]
        bitrate: String,

        /// Strategy for joining the inputs
        #[arg(long, value_enum, default_value = "auto")]
        strategy: ConcatStrategy,

        /// Where to write the output (defaults next to the first input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Split one recording into overlapping chunks
    Split {
        /// Input audio file
        #[arg(required = true)]
        input: PathBuf,

        /// Chunk length in minutes
        #[arg(long, default_value = "10")]
        chunk_minutes: f64,

        /// Overlap between consecutive chunks, in seconds
        #[arg(long, default_value = "3")]
        overlap_secs: f64,

        /// Output format for the chunks
        #[arg(short, long, default_value = "mp3")]
        format: String,

        /// Directory for the chunk files (defaults to the input's directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Probe an audio file and display its metadata
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Transcribe an audio file through the speech-to-text API
    Transcribe {
        /// Audio file to transcribe
        #[arg(required = true)]
        file: PathBuf,

        /// Language code (overrides the configured default)
        #[arg(short, long)]
        language: Option<String>,

        /// Write the transcript here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Turn a dictation transcript into a report document
    ProcessDocument {
        /// Transcript text file
        #[arg(required = true)]
        transcription: PathBuf,

        /// Letter of Instruction text file
        #[arg(required = true)]
        instruction: PathBuf,

        /// Optional template text file
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a fill-in template from a Letter of Instruction
    GenerateTemplate {
        /// Letter of Instruction text file
        #[arg(required = true)]
        instruction: PathBuf,

        /// Blank template text file
        #[arg(required = true)]
        template: PathBuf,

        /// Write the template here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the codec engine is available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        path: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
