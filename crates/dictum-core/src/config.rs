//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the engine, audio defaults, remote APIs, and system
//! prompts. Every section defaults sensibly so a completely empty `{}` file
//! is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Bitrates offered for lossy output formats.
pub const BITRATE_OPTIONS: &[&str] = &["32k", "64k", "96k", "128k", "192k", "256k", "320k"];

/// Default system prompt for template generation.
const TEMPLATE_GENERATION_PROMPT: &str = r#"You are a medicolegal template generation assistant.
You will be provided with a Letter of Instruction and a Blank Template.
Your task is to create a comprehensive template document that an expert can easily fill in, based on the Letter of Instruction.
Information you should pull from the Letter of Instruction:
* Instructing Solicitor's name, position, firm, address, phone number, email address. If the solicitor's name is not provided, or the requester is not a solicitor, use firm's name, or the name of the evident contact person at the firm in the appropriate places.
* The Court of Jurisdiction and the requesting firm's reference number/code (if applicable)
* The date of the Letter of Instruction
* The examinee's full name, date of birth, and occupation (if mentioned)
* The date of the assessment on which the report is based
* A list of materials provided by the instructing solicitor (if applicable), presented exactly as given in the Letter of Instruction, verbatim.
* All specific questions put to the expert, which must be transcribed verbatim. They must be entered into the template in full, and in order, labelled appropriately, with nested subquestions presented exactly as they appear in the Letter of Instruction.
Additional instructions:
* Don't fill in anything in the template between Material Facts and Opinion from the Letter of Instruction.
* If there are more questions than the template contemplates, simply repeat the pattern as necessary to include all specific questions from the Letter of Instruction.
* Specific questions should be in bold, and you must leave a gap with a generic prompt to the expert to give their answer between each question.
* Any dates should be formatted as DD Month YYYY (e.g., 15 March 2024)
* Use British English spelling (e.g., "organisation" not "organization")
* Return your text in markdown format"#;

/// Default system prompt for dictation-to-document processing.
const DOCUMENT_PROCESSING_PROMPT: &str = r#"You are a medicolegal document processing assistant.
You will be provided with a timestamped transcription of a dictation of a medicolegal report, a Letter of Instruction, and possibly a template.
Your task is to process the transcription in light of the Letter of Instruction as accurately as possible. It is critically important that you preserve the expert's words as written in the transcription.
If a template is provided, use it as a reference for the document structure only.

Additional instructions:
* Think of yourself as a typist, and consider what a human typist with good judgement would do if they had the dictation from which the transcript is derived in their ear
* Where the expert gives direction, such as "stop" or "paragraph" or "in quotes" do your best to carry out what you think the expert meant for the typist to do with that information
* If something looks like a heading, format it as a heading.
* Return your text in markdown format. Headings in the template should be in heading format.
* Specific questions from the Letter of Instruction should be transplanted VERBATIM into the report, wherever the expert signposts that he is answering them. They should be in bold, between the heading "Question X" and the expert's answer.
* In the absence of specific direction from the expert, correct obvious spelling and punctuation errors, especially where they likely come from the transcription.
* Preserve the expert's content verbatim as much as possible, deferring to the Letter of Instruction for spellings of names.
* If you believe something truly is nonsensical, or if you are pretty sure a word has been mistranscribed, make a note of it with [[[triple square brackets]]] and also include the timestamp so someone can go back and check
* Dates should be in the format DD Month YYYY, never abbreviating the month or year.
* If the template does not provide room for all information an expert gives in a particular field, just repeat the pattern as necessary.
* Always err on the side of preserving the transcript verbatim vs altering it where you are unsure.
* Create a brief header to the document with the following information (if known): Requesting solicitor, solicitor's address, relevant Court jurisdiction, date of report request, examinee's full name, examinee's date of birth, examinee's occupation.
* Do not use full stops after titles such as Mister (e.g. Mr. becomes simply Mr) and change spellings from American English to British English where applicable. Wherever the expert refers to the subject of the report by their given name, change it to their title and surname."#;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub audio: AudioConfig,
    pub api: ApiConfig,
    pub prompts: PromptsConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// This is intentionally string-based so the caller can read the file
    /// however it sees fit (async, embedded, etc.).
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.api.api_key.is_empty() {
            warnings.push("api.api_key is empty; transcription and document commands will fail".into());
        }
        if self.api.base_url.is_empty() {
            warnings.push("api.base_url is empty".into());
        }

        if !BITRATE_OPTIONS.contains(&self.audio.default_bitrate.as_str()) {
            warnings.push(format!(
                "audio.default_bitrate {:?} is not one of the supported options",
                self.audio.default_bitrate
            ));
        }
        if self.audio.channels != 1 && self.audio.channels != 2 {
            warnings.push(format!(
                "audio.channels must be 1 or 2, got {}",
                self.audio.channels
            ));
        }
        if self.audio.max_segments == 0 {
            warnings.push("audio.max_segments is 0; splitting will never produce output".into());
        }

        if self.engine.exec_timeout_secs == 0 {
            warnings.push("engine.exec_timeout_secs is 0; every invocation will time out".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Codec engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit path to the ffmpeg executable. When unset, `PATH` is searched.
    pub ffmpeg_path: Option<PathBuf>,
    /// Maximum wall-clock time for a single engine invocation, in seconds.
    pub exec_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            exec_timeout_secs: 600,
        }
    }
}

/// Audio processing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Bitrate applied when the caller does not choose one.
    pub default_bitrate: String,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count (1 or 2).
    pub channels: u8,
    /// Segments shorter than this are dropped rather than emitted.
    pub min_segment_secs: f64,
    /// Hard cap on segments produced by a single split.
    pub max_segments: usize,
    /// How long to wait for the native duration probe before giving up.
    pub probe_timeout_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            default_bitrate: "128k".into(),
            sample_rate: 44_100,
            channels: 2,
            min_segment_secs: 5.0,
            max_segments: 100,
            probe_timeout_secs: 5,
        }
    }
}

/// Remote API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL for both the transcription and chat endpoints.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Speech-to-text model name.
    pub transcription_model: String,
    /// Transcription language code.
    pub language: String,
    /// Sampling temperature for transcription and document generation.
    pub temperature: f32,
    /// Transcription response format (`srt` or `json`).
    pub response_format: String,
    /// Chat model used for document processing and template generation.
    pub chat_model: String,
    /// Completion token cap for document generation.
    pub max_tokens: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            transcription_model: "whisper-1".into(),
            language: "en".into(),
            temperature: 0.0,
            response_format: "srt".into(),
            chat_model: "gpt-4o-mini".into(),
            max_tokens: 16_000,
        }
    }
}

/// System prompts for the text-generation API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Prompt for generating a fill-in template from a Letter of Instruction.
    pub template_generation: String,
    /// Prompt for turning a dictation transcript into a report document.
    pub document_processing: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            template_generation: TEMPLATE_GENERATION_PROMPT.into(),
            document_processing: DOCUMENT_PROCESSING_PROMPT.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_valid() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.audio.default_bitrate, "128k");
        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.api.transcription_model, "whisper-1");
        assert_eq!(config.engine.exec_timeout_secs, 600);
    }

    #[test]
    fn partial_section_overrides() {
        let config = Config::from_json(r#"{"audio": {"channels": 1}}"#).unwrap();
        assert_eq!(config.audio.channels, 1);
        // Untouched fields keep their defaults.
        assert_eq!(config.audio.sample_rate, 44_100);
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(Config::from_json("not json").is_err());
    }

    #[test]
    fn load_missing_file_falls_back() {
        let config = Config::load_or_default(Some(Path::new("/nonexistent/dictum.json")));
        assert_eq!(config.audio.default_bitrate, "128k");
    }

    #[test]
    fn validate_flags_empty_api_key() {
        let config = Config::default();
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("api.api_key")));
    }

    #[test]
    fn validate_flags_bad_channels() {
        let mut config = Config::default();
        config.audio.channels = 6;
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("channels")));
    }

    #[test]
    fn validate_flags_unknown_bitrate() {
        let mut config = Config::default();
        config.audio.default_bitrate = "999k".into();
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("default_bitrate")));
    }

    #[test]
    fn prompts_have_defaults() {
        let config = Config::default();
        assert!(config.prompts.template_generation.contains("Letter of Instruction"));
        assert!(config.prompts.document_processing.contains("transcription"));
    }
}
