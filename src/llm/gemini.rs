//! Gemini REST backend.
//!
//! Talks to `models/{model}:generateContent` directly with reqwest. Safety
//! settings, response modalities and JSON mode map onto the request's
//! `safetySettings` and `generationConfig`; inline image parts come back as
//! [`MediaPart`]s.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LlmError;
use crate::safety::SafetySetting;

use super::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, MediaPart,
    Modality, Role,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";

/// `LlmProvider` backed by the Gemini HTTP API.
pub struct GeminiProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the provider at a different endpoint (proxies, local stubs).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let body = build_request_body(&request);

        debug!(
            model = %model,
            safety_rules = body.safety_settings.len(),
            "Sending Gemini generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint(&model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|err| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Gemini API request failed: {err}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text, retry_after));
        }

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|err| LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: format!("Failed to parse Gemini response: {err}"),
                })?;

        Ok(into_completion(parsed))
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    response_modalities: Vec<Modality>,
}

impl GenerationConfig {
    fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.max_output_tokens.is_none()
            && self.response_mime_type.is_none()
            && self.response_modalities.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
    response_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartResponse {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

// ── Mapping ─────────────────────────────────────────────────────────────

fn build_request_body(request: &CompletionRequest) -> GenerateContentRequest {
    let system_text: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let system_instruction = (!system_text.is_empty()).then(|| Content {
        role: None,
        parts: vec![TextPart {
            text: system_text.join("\n\n"),
        }],
    });

    let contents = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(to_content)
        .collect();

    let generation_config = GenerationConfig {
        temperature: request.temperature,
        max_output_tokens: request.max_tokens,
        response_mime_type: request.response_mime_type.clone(),
        response_modalities: request.response_modalities.clone(),
    };

    GenerateContentRequest {
        contents,
        system_instruction,
        generation_config: (!generation_config.is_empty()).then_some(generation_config),
        safety_settings: request.safety_settings.clone(),
    }
}

fn to_content(message: &ChatMessage) -> Content {
    let role = match message.role {
        Role::Assistant => "model",
        _ => "user",
    };
    Content {
        role: Some(role),
        parts: vec![TextPart {
            text: message.content.clone(),
        }],
    }
}

fn into_completion(response: GenerateContentResponse) -> CompletionResponse {
    let blocked = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
        .is_some();

    let candidate = response.candidates.into_iter().next();
    let finish_reason = if blocked {
        FinishReason::Safety
    } else {
        candidate
            .as_ref()
            .and_then(|c| c.finish_reason.as_deref())
            .map(map_finish_reason)
            .unwrap_or(FinishReason::Stop)
    };

    let mut content = String::new();
    let mut media = Vec::new();
    for part in candidate
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default()
    {
        if let Some(text) = part.text {
            content.push_str(&text);
        }
        if let Some(inline) = part.inline_data {
            media.push(MediaPart {
                mime_type: inline.mime_type,
                data: inline.data,
            });
        }
    }

    let usage = response.usage_metadata;
    CompletionResponse {
        content,
        media,
        input_tokens: usage.as_ref().and_then(|u| u.prompt_token_count).unwrap_or(0),
        output_tokens: usage
            .as_ref()
            .and_then(|u| u.candidates_token_count)
            .unwrap_or(0),
        finish_reason,
        response_id: response.response_id,
    }
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII" | "IMAGE_SAFETY" => {
            FinishReason::Safety
        }
        other => FinishReason::Other(other.to_string()),
    }
}

fn map_http_error(status: StatusCode, body: &str, retry_after: Option<Duration>) -> LlmError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthFailed {
            provider: PROVIDER.to_string(),
        },
        _ => LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("HTTP {}: {}", status.as_u16(), message),
        },
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::SafetyPolicy;

    #[test]
    fn request_body_splits_system_and_user_messages() {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
        ]);
        let body = serde_json::to_value(build_request_body(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        // Nothing configured → both sections omitted
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("safetySettings").is_none());
    }

    #[test]
    fn request_body_carries_generation_config_and_safety() {
        let request = CompletionRequest::new(vec![ChatMessage::user("draw")])
            .with_temperature(0.2)
            .with_max_tokens(64)
            .with_response_mime_type("application/json")
            .with_modalities(vec![Modality::Text, Modality::Image])
            .with_safety_settings(SafetyPolicy::suggestions().settings().to_vec());
        let body = serde_json::to_value(build_request_body(&request)).unwrap();

        let config = &body["generationConfig"];
        assert_eq!(config["maxOutputTokens"], 64);
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseModalities"], serde_json::json!(["TEXT", "IMAGE"]));
        assert!((config["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);

        let safety = body["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert_eq!(safety[1]["category"], "HARM_CATEGORY_DANGEROUS_CONTENT");
        assert_eq!(safety[1]["threshold"], "BLOCK_NONE");
    }

    #[test]
    fn assistant_messages_use_model_role() {
        let request = CompletionRequest::new(vec![
            ChatMessage::user("q"),
            ChatMessage::assistant("a"),
        ]);
        let body = serde_json::to_value(build_request_body(&request)).unwrap();
        assert_eq!(body["contents"][1]["role"], "model");
    }

    #[test]
    fn response_text_and_media_are_collected() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here is "},
                    {"text": "your image"},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 34},
            "responseId": "resp-1"
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let completion = into_completion(parsed);

        assert_eq!(completion.content, "Here is your image");
        assert_eq!(completion.media.len(), 1);
        assert_eq!(completion.media[0].mime_type, "image/png");
        assert_eq!(completion.input_tokens, 12);
        assert_eq!(completion.output_tokens, 34);
        assert_eq!(completion.finish_reason, FinishReason::Stop);
        assert_eq!(completion.response_id.as_deref(), Some("resp-1"));
    }

    #[test]
    fn prompt_block_maps_to_safety() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let completion = into_completion(parsed);
        assert!(completion.finish_reason.is_safety_block());
        assert!(completion.is_empty());
    }

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(map_finish_reason("MAX_TOKENS"), FinishReason::Length);
        assert_eq!(map_finish_reason("IMAGE_SAFETY"), FinishReason::Safety);
        assert_eq!(
            map_finish_reason("RECITATION"),
            FinishReason::Other("RECITATION".into())
        );
    }

    #[test]
    fn http_errors_are_classified() {
        let body = r#"{"error": {"code": 503, "message": "overloaded", "status": "UNAVAILABLE"}}"#;
        match map_http_error(StatusCode::SERVICE_UNAVAILABLE, body, None) {
            LlmError::RequestFailed { reason, .. } => {
                assert!(reason.contains("503"));
                assert!(reason.contains("UNAVAILABLE: overloaded"));
            }
            other => panic!("Expected RequestFailed, got {:?}", other),
        }

        let limited = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            "slow down",
            Some(Duration::from_secs(3)),
        );
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(3)));

        assert!(matches!(
            map_http_error(StatusCode::FORBIDDEN, "", None),
            LlmError::AuthFailed { .. }
        ));
    }

    #[test]
    fn retry_after_parses_seconds_only() {
        let value = HeaderValue::from_static("12");
        assert_eq!(parse_retry_after(Some(&value)), Some(Duration::from_secs(12)));
        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = GeminiProvider::new(SecretString::from("k"), "gemini-2.0-flash")
            .with_base_url("http://127.0.0.1:9999/v1beta/");
        assert_eq!(
            provider.endpoint("gemini-2.0-flash"),
            "http://127.0.0.1:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
