//! LLM integration for DublinPad.
//!
//! The rest of the crate talks to the backend only through the
//! [`LlmProvider`] trait. [`GeminiProvider`] is the production
//! implementation.

pub mod gemini;
pub mod provider;

pub use gemini::GeminiProvider;
pub use provider::*;

use std::sync::Arc;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    /// Default text model.
    pub model: String,
    /// Overrides the public Gemini endpoint.
    pub base_url: Option<String>,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    let mut provider = GeminiProvider::new(config.api_key.clone(), &config.model);
    if let Some(ref base_url) = config.base_url {
        provider = provider.with_base_url(base_url);
    }
    tracing::info!("Using Gemini (model: {})", config.model);
    Arc::new(provider)
}
