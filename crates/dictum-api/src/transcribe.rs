//! Speech-to-text client.

use std::time::Duration;

use reqwest::multipart;
use serde::Deserialize;

use dictum_core::config::ApiConfig;
use dictum_core::{Error, MediaAsset, Result};

use crate::srt;

/// Connection timeout; uploads themselves are not bounded here, large
/// recordings legitimately take minutes.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for the audio transcription endpoint.
pub struct TranscriptionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    language: String,
    temperature: f32,
    response_format: String,
}

impl TranscriptionClient {
    pub fn new(config: &ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {e}");
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.transcription_model.clone(),
            language: config.language.clone(),
            temperature: config.temperature,
            response_format: config.response_format.clone(),
        }
    }

    /// Override the configured language for this client.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Transcribe one recording and return plain text.
    ///
    /// A JSON response yields its `text` field; any other content type is
    /// treated as SRT and reduced to plain text.
    pub async fn transcribe(&self, asset: &MediaAsset) -> Result<String> {
        let url = format!("{}/audio/transcriptions", self.base_url);

        let file_part = multipart::Part::bytes(asset.bytes.to_vec())
            .file_name(asset.file_name.clone())
            .mime_str(&asset.mime_type)
            .map_err(|e| Error::api(None, format!("invalid mime type: {e}")))?;

        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("temperature", self.temperature.to_string())
            .text("response_format", self.response_format.clone())
            .part("file", file_part);

        tracing::debug!(
            model = %self.model,
            language = %self.language,
            file = %asset.file_name,
            "sending audio for transcription"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::api(None, format!("transcription request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .map(|e| e.message)
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        "failed to transcribe audio".into()
                    } else {
                        body
                    }
                });
            return Err(Error::api(Some(status.as_u16()), message));
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);

        let text = if is_json {
            response
                .json::<TranscriptionResponse>()
                .await
                .map_err(|e| Error::api(None, format!("malformed transcription response: {e}")))?
                .text
        } else {
            let body = response
                .text()
                .await
                .map_err(|e| Error::api(None, format!("failed to read response body: {e}")))?;
            srt::extract_text(&body)
        };

        tracing::info!(chars = text.len(), "transcription completed");
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            api_key: "test-key".into(),
            ..ApiConfig::default()
        }
    }

    fn asset() -> MediaAsset {
        MediaAsset::new(vec![1u8; 32], "audio/mpeg", "note.mp3")
    }

    #[tokio::test]
    async fn srt_response_is_reduced_to_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string("1\n00:00:00,000 --> 00:00:02,000\nhello\n\n2\n00:00:02,000 --> 00:00:04,000\nworld\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = TranscriptionClient::new(&config(&server.uri()));
        let text = client.transcribe(&asset()).await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn json_response_uses_the_text_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "dictated content"
            })))
            .mount(&server)
            .await;

        let client = TranscriptionClient::new(&config(&server.uri()));
        let text = client.transcribe(&asset()).await.unwrap();
        assert_eq!(text, "dictated content");
    }

    #[tokio::test]
    async fn api_error_carries_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Incorrect API key provided" }
            })))
            .mount(&server)
            .await;

        let client = TranscriptionClient::new(&config(&server.uri()));
        let err = client.transcribe(&asset()).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("401"), "got: {msg}");
        assert!(msg.contains("Incorrect API key"), "got: {msg}");
    }

    #[tokio::test]
    async fn language_override_applies() {
        let client = TranscriptionClient::new(&config("http://localhost:1")).with_language("fr");
        assert_eq!(client.language, "fr");
    }
}
