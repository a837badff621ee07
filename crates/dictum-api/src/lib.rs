//! dictum-api: clients for the remote speech-to-text and text-generation
//! APIs, consumed as plain multipart/JSON HTTP contracts.

pub mod document;
pub mod srt;
pub mod transcribe;

pub use document::DocumentClient;
pub use srt::extract_text;
pub use transcribe::TranscriptionClient;
