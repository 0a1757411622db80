//! The six generation flows and the pipeline that runs them.
//!
//! Every flow follows the same path: validate input, render instruction,
//! one backend call, decode and validate output. A flow either returns a
//! fully valid output or a single [`FlowError`].

pub mod email;
pub mod image;
pub mod invoker;
pub mod prompts;
pub mod suggestions;

pub use email::EmailInquiryFlow;
pub use image::ImageFlow;
pub use invoker::{GenerationConfig, ModelInvoker, StructuredOutput};
pub use prompts::{AmenitiesPromptFlow, LocationPromptFlow, StylePromptFlow};
pub use suggestions::SuggestionsFlow;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::FlowError;
use crate::llm::LlmProvider;
use crate::prompts::PromptRenderer;
use crate::safety::SafetyPolicy;
use crate::schema::{
    AmenitiesPromptInput, EmailDraft, EmailInquiryInput, GeneratedImage, GeneratedPrompt,
    ImageInput, LocationPromptInput, StylePromptInput, SuggestionList, SuggestionsInput, Validate,
};

/// Default model for the image flow.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// A single named generation step.
pub trait Flow: Send + Sync {
    type Input: Serialize + Validate + Send + Sync;
    type Output: StructuredOutput;

    /// Template name, also used in logs and errors.
    const NAME: &'static str;

    fn generation_config(&self) -> GenerationConfig;
}

/// Knobs that differ between deployments.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub image_model: String,
    pub suggestion_safety: SafetyPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            suggestion_safety: SafetyPolicy::suggestions(),
        }
    }
}

/// Runs flows against one backend. Holds no mutable state; share it as
/// `Arc<Pipeline>`.
pub struct Pipeline {
    invoker: ModelInvoker,
    renderer: PromptRenderer,
    suggestions: SuggestionsFlow,
    image: ImageFlow,
}

impl Pipeline {
    pub fn new(llm: Arc<dyn LlmProvider>, options: PipelineOptions) -> Result<Self, FlowError> {
        Ok(Self {
            invoker: ModelInvoker::new(llm),
            renderer: PromptRenderer::new()?,
            suggestions: SuggestionsFlow::new(options.suggestion_safety),
            image: ImageFlow::new(options.image_model),
        })
    }

    pub fn model_name(&self) -> &str {
        self.invoker.model_name()
    }

    /// Validate, render, invoke. Input problems are reported before any
    /// backend call is made.
    pub async fn run<F: Flow>(&self, flow: &F, input: &F::Input) -> Result<F::Output, FlowError> {
        let started = Instant::now();
        info!(flow = F::NAME, "Flow started");

        let result = self.run_inner(flow, input).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(flow = F::NAME, elapsed_ms, "Flow finished"),
            Err(e) => warn!(flow = F::NAME, elapsed_ms, kind = e.kind(), error = %e, "Flow failed"),
        }
        result
    }

    async fn run_inner<F: Flow>(&self, flow: &F, input: &F::Input) -> Result<F::Output, FlowError> {
        input.validate()?;
        let instruction = self.renderer.render(F::NAME, input)?;
        self.invoker
            .invoke::<F::Output>(F::NAME, instruction, &flow.generation_config())
            .await
    }

    pub async fn location_prompt(
        &self,
        input: LocationPromptInput,
    ) -> Result<GeneratedPrompt, FlowError> {
        self.run(&LocationPromptFlow, &input).await
    }

    pub async fn amenities_prompt(
        &self,
        input: AmenitiesPromptInput,
    ) -> Result<GeneratedPrompt, FlowError> {
        self.run(&AmenitiesPromptFlow, &input).await
    }

    pub async fn style_prompt(&self, input: StylePromptInput) -> Result<GeneratedPrompt, FlowError> {
        self.run(&StylePromptFlow, &input).await
    }

    /// Zero to five suggestions. An empty list is a valid answer.
    pub async fn accommodation_suggestions(
        &self,
        input: SuggestionsInput,
    ) -> Result<SuggestionList, FlowError> {
        let list = self.run(&self.suggestions, &input).await?;
        info!(count = list.len(), "Suggestions generated");
        Ok(list)
    }

    pub async fn accommodation_image(&self, input: ImageInput) -> Result<GeneratedImage, FlowError> {
        self.run(&self.image, &input).await
    }

    pub async fn email_inquiry(&self, input: EmailInquiryInput) -> Result<EmailDraft, FlowError> {
        self.run(&EmailInquiryFlow, &input).await
    }
}
