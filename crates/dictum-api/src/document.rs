//! Text-generation client for document processing and template generation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use dictum_core::config::{ApiConfig, PromptsConfig};
use dictum_core::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Appended to every system prompt; the editor downstream consumes raw
/// markdown and fenced responses break it.
const MARKDOWN_SUFFIX: &str = "\n\nALWAYS format your response in proper Markdown WITHOUT USING CODE FENCES. DO NOT wrap your response in markdown blocks. Just return the raw markdown directly.";

const USER_SUFFIX: &str = "\n\nIMPORTANT: Your response MUST be formatted in Markdown. DO NOT use code fences. Return the markdown content directly.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for the chat-completions endpoint, specialized to the two
/// document workflows.
pub struct DocumentClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    prompts: PromptsConfig,
}

impl DocumentClient {
    pub fn new(config: &ApiConfig, prompts: &PromptsConfig) -> Self {
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
            model: config.chat_model.clone(),
            max_tokens: config.max_tokens,
            prompts: prompts.clone(),
        }
    }

    /// Turn a dictation transcript into a structured report, guided by the
    /// Letter of Instruction and an optional template.
    pub async fn process_document(
        &self,
        transcription: &str,
        instruction: &str,
        template: Option<&str>,
    ) -> Result<String> {
        let mut user = format!(
            "TRANSCRIPTION:\n{transcription}\n\nLETTER OF INSTRUCTION:\n{instruction}\n\n"
        );
        if let Some(template) = template {
            user.push_str(&format!("TEMPLATE:\n{template}"));
        }
        user.push_str(USER_SUFFIX);

        self.complete(&self.prompts.document_processing, user).await
    }

    /// Build a fill-in template from a Letter of Instruction and a blank
    /// template document.
    pub async fn generate_template(
        &self,
        instruction: &str,
        blank_template: &str,
    ) -> Result<String> {
        let user = format!(
            "LETTER OF INSTRUCTION:\n{instruction}\n\nBLANK TEMPLATE:\n{blank_template}{USER_SUFFIX}"
        );

        self.complete(&self.prompts.template_generation, user).await
    }

    async fn complete(&self, system_prompt: &str, user: String) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: format!("{system_prompt}{MARKDOWN_SUFFIX}"),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: 0.0,
            response_format: ResponseFormat { kind: "text" },
        };

        tracing::debug!(model = %self.model, "requesting document generation");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::api(None, format!("document request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .map(|e| e.message)
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        "failed to process document".into()
                    } else {
                        body
                    }
                });
            return Err(Error::api(Some(status.as_u16()), message));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::api(None, format!("malformed chat response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::api(None, "chat response contained no choices"))?;

        Ok(strip_code_fences(&content))
    }
}

/// Remove a leading ```` ```markdown ```` fence and a trailing ```` ``` ````
/// fence, which models emit despite instructions not to.
pub fn strip_code_fences(text: &str) -> String {
    let mut cleaned = text.trim();

    for opening in ["```markdown", "```Markdown", "```"] {
        if let Some(rest) = cleaned.strip_prefix(opening) {
            cleaned = rest.trim_start();
            break;
        }
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.trim_end();
    }

    cleaned.to_string()
}
