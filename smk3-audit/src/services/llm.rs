//! Model client for clause analysis
//!
//! `AuditModel` is the seam between the analysis handler and the provider.
//! The production implementation speaks the OpenAI-compatible chat
//! completions protocol, which the Gemini API also exposes.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use smk3_common::config::LlmConfig;
use thiserror::Error;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("smk3-audit/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Model returned an empty reply")]
    EmptyReply,
}

/// Evidence content handed to the model
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    /// Decoded text file, inlined into the prompt
    Text { filename: String, content: String },
    /// Image sent as a data URL
    Image {
        filename: String,
        mime_type: String,
        data: Vec<u8>,
    },
    /// Anything else is referenced by name only
    Reference { filename: String, mime_type: String },
}

/// One analysis call: instructions, question and evidence
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub system_prompt: String,
    pub user_text: String,
    pub attachments: Vec<Attachment>,
}

#[async_trait]
pub trait AuditModel: Send + Sync {
    /// Return the model's free-text reply
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Chat completions client (`POST {base_url}/chat/completions`)
pub struct OpenAiCompatibleModel {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleModel {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// User message content parts: question, inlined text files, then images
fn user_content(request: &AnalysisRequest) -> Vec<Value> {
    let mut text = request.user_text.clone();
    let mut images = Vec::new();

    for attachment in &request.attachments {
        match attachment {
            Attachment::Text { filename, content } => {
                text.push_str(&format!("\n\n=== Dokumen: {} ===\n{}", filename, content));
            }
            Attachment::Image {
                filename,
                mime_type,
                data,
            } => {
                text.push_str(&format!("\n\n[Lampiran gambar: {}]", filename));
                images.push(json!({
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", mime_type, STANDARD.encode(data)),
                    },
                }));
            }
            Attachment::Reference {
                filename,
                mime_type,
            } => {
                text.push_str(&format!(
                    "\n\n[Lampiran: {} ({}), isi tidak dapat dibaca langsung]",
                    filename, mime_type
                ));
            }
        }
    }

    let mut parts = vec![json!({ "type": "text", "text": text })];
    parts.extend(images);
    parts
}

fn extract_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

#[async_trait]
impl AuditModel for OpenAiCompatibleModel {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": user_content(request) },
            ],
        });

        debug!(
            model = %self.model,
            attachments = request.attachments.len(),
            "Sending analysis request"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(status.as_u16(), truncate(&body, 320)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let reply = body
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .map(extract_text)
            .unwrap_or_default();

        if reply.trim().is_empty() {
            return Err(LlmError::EmptyReply);
        }

        info!(model = %self.model, reply_chars = reply.chars().count(), "Analysis reply received");
        Ok(reply)
    }
}
