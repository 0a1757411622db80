//! Error types for DublinPad.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Provider-suggested delay before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Rate limits and transport failures may clear on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RequestFailed { .. } | Self::RateLimited { .. })
    }

    fn provider(&self) -> &str {
        match self {
            Self::RequestFailed { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::InvalidResponse { provider, .. }
            | Self::AuthFailed { provider } => provider,
            Self::Json(_) => "unknown",
        }
    }
}

/// Failure of a single flow invocation.
///
/// Every façade returns either a fully conformant output or exactly one of
/// these. Degraded-but-valid results (an empty suggestion list) are not
/// errors.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Input or output does not conform to its declared shape.
    #[error("Schema violation in {schema}: {reason}")]
    SchemaViolation { schema: String, reason: String },

    /// A template placeholder could not be resolved.
    #[error("Template {template} could not be rendered: {reason}")]
    TemplateBinding { template: String, reason: String },

    /// Transport or backend failure. `transient` failures are safe for the
    /// caller to retry; a rejected key or an unreadable reply is not.
    #[error("Backend {provider} unavailable: {message}")]
    BackendUnavailable {
        provider: String,
        message: String,
        retry_after: Option<Duration>,
        transient: bool,
    },

    /// The backend answered but left out required content.
    #[error("Generation incomplete for {flow}: {reason}")]
    GenerationIncomplete { flow: String, reason: String },
}

impl FlowError {
    pub fn schema(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            schema: schema.into(),
            reason: reason.into(),
        }
    }

    pub fn template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TemplateBinding {
            template: template.into(),
            reason: reason.into(),
        }
    }

    pub fn incomplete(flow: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GenerationIncomplete {
            flow: flow.into(),
            reason: reason.into(),
        }
    }

    /// Stable snake_case label, used in logs and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SchemaViolation { .. } => "schema_violation",
            Self::TemplateBinding { .. } => "template_binding_error",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::GenerationIncomplete { .. } => "generation_incomplete",
        }
    }

    /// Only transient backend failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable {
                transient: true,
                ..
            }
        )
    }

    /// Delay requested by the backend, when it sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::BackendUnavailable { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<LlmError> for FlowError {
    fn from(err: LlmError) -> Self {
        Self::BackendUnavailable {
            provider: err.provider().to_string(),
            retry_after: err.retry_after(),
            transient: err.is_transient(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_backend_failures_are_retryable() {
        let backend = FlowError::BackendUnavailable {
            provider: "gemini".into(),
            message: "503".into(),
            retry_after: None,
            transient: true,
        };
        assert!(backend.is_retryable());
        assert!(!FlowError::schema("x", "y").is_retryable());
        assert!(!FlowError::template("x", "y").is_retryable());
        assert!(!FlowError::incomplete("x", "y").is_retryable());
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(FlowError::schema("a", "b").kind(), "schema_violation");
        assert_eq!(FlowError::template("a", "b").kind(), "template_binding_error");
        assert_eq!(FlowError::incomplete("a", "b").kind(), "generation_incomplete");
    }

    #[test]
    fn rate_limit_carries_retry_after_into_flow_error() {
        let err: FlowError = LlmError::RateLimited {
            provider: "gemini".into(),
            retry_after: Some(Duration::from_secs(7)),
        }
        .into();
        assert_eq!(err.kind(), "backend_unavailable");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        match err {
            FlowError::BackendUnavailable { provider, .. } => assert_eq!(provider, "gemini"),
            other => panic!("Expected BackendUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn rejected_key_is_not_retryable() {
        let err: FlowError = LlmError::AuthFailed {
            provider: "gemini".into(),
        }
        .into();
        assert_eq!(err.kind(), "backend_unavailable");
        assert!(!err.is_retryable());

        let garbled: FlowError = LlmError::InvalidResponse {
            provider: "gemini".into(),
            reason: "expected value at line 1".into(),
        }
        .into();
        assert!(!garbled.is_retryable());

        let limited: FlowError = LlmError::RateLimited {
            provider: "gemini".into(),
            retry_after: None,
        }
        .into();
        assert!(limited.is_retryable());
    }

    #[test]
    fn request_failure_keeps_diagnostic_message() {
        let err: FlowError = LlmError::RequestFailed {
            provider: "gemini".into(),
            reason: "connection reset".into(),
        }
        .into();
        assert!(err.to_string().contains("connection reset"));
        assert!(err.retry_after().is_none());
    }
}
