//! Provider-agnostic completion types and the `LlmProvider` trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::safety::SafetySetting;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Output modality the model may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Image,
}

/// A completion request with optional generation settings.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Overrides the provider's default model for this call.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the backend for a specific MIME type (e.g. `application/json`).
    pub response_mime_type: Option<String>,
    /// Empty means the backend default (text only).
    pub response_modalities: Vec<Modality>,
    pub safety_settings: Vec<SafetySetting>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_response_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.response_mime_type = Some(mime.into());
        self
    }

    pub fn with_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.response_modalities = modalities;
        self
    }

    pub fn with_safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = settings;
        self
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    /// Output (or the prompt itself) was blocked by a content filter.
    Safety,
    Other(String),
}

impl FinishReason {
    pub fn is_safety_block(&self) -> bool {
        matches!(self, Self::Safety)
    }
}

/// Inline binary content returned by the model, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    pub mime_type: String,
    pub data: String,
}

impl MediaPart {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// A completion response.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Concatenated text parts.
    pub content: String,
    pub media: Vec<MediaPart>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: FinishReason,
    pub response_id: Option<String>,
}

impl CompletionResponse {
    /// Text-only response, mostly for tests and stubs.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            media: Vec::new(),
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Stop,
            response_id: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.media.is_empty()
    }
}

/// A generative backend.
///
/// Implementations perform exactly one network call per `complete` and never
/// retry on their own.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Default model identifier.
    fn model_name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::SafetyPolicy;

    #[test]
    fn builder_sets_generation_options() {
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")])
            .with_model("gemini-test")
            .with_temperature(0.4)
            .with_max_tokens(128)
            .with_response_mime_type("application/json")
            .with_modalities(vec![Modality::Text, Modality::Image])
            .with_safety_settings(SafetyPolicy::suggestions().settings().to_vec());

        assert_eq!(request.model.as_deref(), Some("gemini-test"));
        assert_eq!(request.temperature, Some(0.4));
        assert_eq!(request.max_tokens, Some(128));
        assert_eq!(request.response_mime_type.as_deref(), Some("application/json"));
        assert_eq!(request.response_modalities.len(), 2);
        assert_eq!(request.safety_settings.len(), 4);
    }

    #[test]
    fn media_part_data_uri() {
        let part = MediaPart {
            mime_type: "image/png".into(),
            data: "aGVsbG8=".into(),
        };
        assert_eq!(part.to_data_uri(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn modality_serializes_uppercase() {
        let json = serde_json::to_value(vec![Modality::Text, Modality::Image]).unwrap();
        assert_eq!(json, serde_json::json!(["TEXT", "IMAGE"]));
    }

    #[test]
    fn empty_response_detection() {
        assert!(CompletionResponse::text("   ").is_empty());
        assert!(!CompletionResponse::text("hello").is_empty());
    }
}
