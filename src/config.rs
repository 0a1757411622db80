//! Service configuration, read from the environment.

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::flows::{DEFAULT_IMAGE_MODEL, PipelineOptions};
use crate::llm::LlmConfig;
use crate::safety::{HarmCategory, SafetyPolicy};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_PORT: u16 = 9002;

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub image_model: String,
    pub port: u16,
    pub suggestion_safety: SafetyPolicy,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;
        let model = get("DUBLINPAD_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let image_model =
            get("DUBLINPAD_IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());
        let base_url = get("DUBLINPAD_GEMINI_BASE_URL");

        let port = match get("DUBLINPAD_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "DUBLINPAD_PORT".to_string(),
                message: format!("'{raw}': {e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let mut suggestion_safety = SafetyPolicy::suggestions();
        for category in HarmCategory::ALL {
            let key = format!("DUBLINPAD_SAFETY_{}", category.env_key());
            if let Some(raw) = get(&key) {
                let threshold = raw
                    .parse()
                    .map_err(|message| ConfigError::InvalidValue { key, message })?;
                suggestion_safety = suggestion_safety.with_threshold(category, threshold);
            }
        }

        Ok(Self {
            llm: LlmConfig {
                api_key: SecretString::from(api_key),
                model,
                base_url,
            },
            image_model,
            port,
            suggestion_safety,
        })
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            image_model: self.image_model.clone(),
            suggestion_safety: self.suggestion_safety.clone(),
        }
    }
}
