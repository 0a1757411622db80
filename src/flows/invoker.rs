//! One structured call to the generative backend.
//!
//! The invoker owns the request shape and the mapping of every failure mode
//! onto [`FlowError`]. It never retries.

use std::sync::Arc;

use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, error, warn};

use crate::error::{FlowError, LlmError};
use crate::llm::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Modality};
use crate::safety::SafetyPolicy;
use crate::schema::{
    EmailDraft, GeneratedImage, GeneratedPrompt, SuggestionList, Validate, json_schema_for,
};

/// Per-flow generation settings.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    /// Overrides the provider's default model.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Empty means text only.
    pub response_modalities: Vec<Modality>,
    pub safety: SafetyPolicy,
}

/// A flow output that can be decoded from a completion.
pub trait StructuredOutput: Sized + Send {
    /// Name used in error messages.
    const SCHEMA: &'static str;

    /// MIME type to request from the backend.
    const RESPONSE_MIME_TYPE: Option<&'static str> = Some("application/json");

    /// Guidance sent alongside the instruction, if any.
    fn format_instructions() -> Option<String>;

    fn from_completion(flow: &str, response: CompletionResponse) -> Result<Self, FlowError>;
}

/// JSON schema guidance for `T`.
fn json_instructions<T: schemars::JsonSchema>() -> String {
    format!(
        "Respond with a single JSON value and nothing else. It must conform to this JSON schema:\n{}",
        json_schema_for::<T>()
    )
}

impl StructuredOutput for GeneratedPrompt {
    const SCHEMA: &'static str = "GeneratedPrompt";

    fn format_instructions() -> Option<String> {
        Some(json_instructions::<Self>())
    }

    fn from_completion(_flow: &str, response: CompletionResponse) -> Result<Self, FlowError> {
        parse_json_output(Self::SCHEMA, &response.content)
    }
}

impl StructuredOutput for SuggestionList {
    const SCHEMA: &'static str = "SuggestionList";

    fn format_instructions() -> Option<String> {
        Some(json_instructions::<Self>())
    }

    fn from_completion(_flow: &str, response: CompletionResponse) -> Result<Self, FlowError> {
        let list: SuggestionList = decode_json(Self::SCHEMA, &response.content)?;
        let list = list.normalized();
        list.validate()?;
        Ok(list)
    }
}

impl StructuredOutput for GeneratedImage {
    const SCHEMA: &'static str = "GeneratedImage";
    const RESPONSE_MIME_TYPE: Option<&'static str> = None;

    fn format_instructions() -> Option<String> {
        None
    }

    fn from_completion(flow: &str, response: CompletionResponse) -> Result<Self, FlowError> {
        let media = response
            .media
            .first()
            .ok_or_else(|| FlowError::incomplete(flow, "backend returned no image"))?;
        if media.data.trim().is_empty() {
            return Err(FlowError::incomplete(flow, "backend returned an empty image"));
        }
        let image = GeneratedImage {
            image_url: media.to_data_uri(),
        };
        image.validate()?;
        Ok(image)
    }
}

impl StructuredOutput for EmailDraft {
    const SCHEMA: &'static str = "EmailDraft";

    fn format_instructions() -> Option<String> {
        Some(json_instructions::<Self>())
    }

    fn from_completion(_flow: &str, response: CompletionResponse) -> Result<Self, FlowError> {
        parse_json_output(Self::SCHEMA, &response.content)
    }
}

/// Sends rendered instructions to the backend and decodes the reply.
#[derive(Clone)]
pub struct ModelInvoker {
    llm: Arc<dyn LlmProvider>,
}

impl ModelInvoker {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Exactly one backend call.
    pub async fn invoke<O: StructuredOutput>(
        &self,
        flow: &str,
        instruction: String,
        config: &GenerationConfig,
    ) -> Result<O, FlowError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(format) = O::format_instructions() {
            messages.push(ChatMessage::system(format));
        }
        messages.push(ChatMessage::user(instruction));

        let mut request = CompletionRequest::new(messages)
            .with_modalities(config.response_modalities.clone())
            .with_safety_settings(config.safety.settings().to_vec());
        if let Some(ref model) = config.model {
            request = request.with_model(model);
        }
        if let Some(temperature) = config.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(mime) = O::RESPONSE_MIME_TYPE {
            request = request.with_response_mime_type(mime);
        }

        let response = self.llm.complete(request).await.map_err(|e| {
            if let LlmError::AuthFailed { .. } = e {
                error!(flow, error = %e, "Backend rejected the API key");
            } else {
                warn!(flow, transient = e.is_transient(), error = %e, "Backend call failed");
            }
            FlowError::from(e)
        })?;

        debug!(
            flow,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            finish_reason = ?response.finish_reason,
            media_parts = response.media.len(),
            "Backend responded"
        );

        if response.finish_reason.is_safety_block() && response.is_empty() {
            warn!(flow, "Response blocked by safety filters");
            return Err(FlowError::incomplete(flow, "response blocked by safety filters"));
        }

        O::from_completion(flow, response).inspect_err(|e| {
            warn!(flow, schema = O::SCHEMA, error = %e, "Could not decode backend output");
        })
    }
}

/// Deserialize and validate the JSON value embedded in `text`.
pub fn parse_json_output<T>(schema: &str, text: &str) -> Result<T, FlowError>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = decode_json(schema, text)?;
    parsed.validate()?;
    Ok(parsed)
}

/// Deserialize the first JSON value in `text` that fits `T`.
///
/// Candidates are tried in order: the whole text, a fenced block, then the
/// first complete value starting at each `{` or `[`.
fn decode_json<T: DeserializeOwned>(schema: &str, text: &str) -> Result<T, FlowError> {
    let mut first_error = None;
    for candidate in json_candidates(text) {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    let reason = first_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no JSON value in model output".to_string());
    Err(FlowError::schema(schema, reason))
}

fn json_candidates(text: &str) -> impl Iterator<Item = &str> {
    let trimmed = text.trim();
    let embedded = trimmed.match_indices(['{', '[']).filter_map(move |(start, _)| {
        let rest = &trimmed[start..];
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<IgnoredAny>();
        match stream.next() {
            Some(Ok(_)) => Some(&rest[..stream.byte_offset()]),
            _ => None,
        }
    });
    std::iter::once(trimmed)
        .chain(fenced_block(trimmed))
        .chain(embedded)
}

/// Contents of the first markdown fence, with or without a `json` tag.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let end = after.find("```")?;
    Some(after[..end].trim())
}

/// Pull a JSON object or array out of model text that may be wrapped in a
/// markdown fence or surrounded by prose. Falls back to the trimmed text.
pub fn extract_json(text: &str) -> String {
    json_candidates(text)
        .find(|candidate| serde_json::from_str::<IgnoredAny>(candidate).is_ok())
        .unwrap_or_else(|| text.trim())
        .to_string()
}
