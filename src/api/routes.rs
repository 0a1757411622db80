//! REST endpoints, one per flow.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use tower_http::cors::CorsLayer;

use crate::error::FlowError;
use crate::flows::Pipeline;
use crate::schema::{
    AmenitiesPromptInput, EmailDraft, EmailInquiryInput, GeneratedImage, GeneratedPrompt,
    ImageInput, LocationPromptInput, StylePromptInput, SuggestionList, SuggestionsInput, Validate,
    parse_input,
};

/// Shared state for the flow routes.
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<Pipeline>,
}

/// A flow failure rendered as `{error, message, retryable}`.
#[derive(Debug)]
pub struct ApiError(pub FlowError);

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            FlowError::SchemaViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FlowError::TemplateBinding { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            FlowError::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            FlowError::GenerationIncomplete { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
            "retryable": self.0.is_retryable(),
        }));
        let mut response = (self.status(), body).into_response();
        if let Some(after) = self.0.retry_after()
            && let Ok(value) = HeaderValue::from_str(&after.as_secs().max(1).to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

/// Parse a raw request body. Malformed JSON is a schema violation like any
/// other shape error, so every bad body gets the same 422.
fn parse_body<T>(schema: &str, body: &Bytes) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| FlowError::schema(schema, format!("request body is not JSON: {e}")))?;
    Ok(parse_input(schema, value)?)
}

/// GET /health
async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.pipeline.model_name(),
    }))
}

/// POST /api/flows/location-prompt
async fn location_prompt(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<GeneratedPrompt>, ApiError> {
    let input: LocationPromptInput = parse_body("LocationPromptInput", &body)?;
    Ok(Json(state.pipeline.location_prompt(input).await?))
}

/// POST /api/flows/amenities-prompt
async fn amenities_prompt(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<GeneratedPrompt>, ApiError> {
    let input: AmenitiesPromptInput = parse_body("AmenitiesPromptInput", &body)?;
    Ok(Json(state.pipeline.amenities_prompt(input).await?))
}

/// POST /api/flows/style-prompt
async fn style_prompt(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<GeneratedPrompt>, ApiError> {
    let input: StylePromptInput = parse_body("StylePromptInput", &body)?;
    Ok(Json(state.pipeline.style_prompt(input).await?))
}

/// POST /api/flows/accommodation-suggestions
///
/// An empty array is a successful answer.
async fn accommodation_suggestions(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<SuggestionList>, ApiError> {
    let input: SuggestionsInput = parse_body("SuggestionsInput", &body)?;
    Ok(Json(state.pipeline.accommodation_suggestions(input).await?))
}

/// POST /api/flows/accommodation-image
async fn accommodation_image(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<GeneratedImage>, ApiError> {
    let input: ImageInput = parse_body("ImageInput", &body)?;
    Ok(Json(state.pipeline.accommodation_image(input).await?))
}

/// POST /api/flows/email-inquiry
async fn email_inquiry(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<EmailDraft>, ApiError> {
    let input: EmailInquiryInput = parse_body("EmailInquiryInput", &body)?;
    Ok(Json(state.pipeline.email_inquiry(input).await?))
}

/// Build the flow routes.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/flows/location-prompt", post(location_prompt))
        .route("/api/flows/amenities-prompt", post(amenities_prompt))
        .route("/api/flows/style-prompt", post(style_prompt))
        .route(
            "/api/flows/accommodation-suggestions",
            post(accommodation_suggestions),
        )
        .route("/api/flows/accommodation-image", post(accommodation_image))
        .route("/api/flows/email-inquiry", post(email_inquiry))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (FlowError::schema("a", "b"), StatusCode::UNPROCESSABLE_ENTITY),
            (FlowError::template("a", "b"), StatusCode::INTERNAL_SERVER_ERROR),
            (FlowError::incomplete("a", "b"), StatusCode::BAD_GATEWAY),
            (
                FlowError::BackendUnavailable {
                    provider: "gemini".into(),
                    message: "down".into(),
                    retry_after: None,
                    transient: true,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn rate_limit_sets_retry_after_header() {
        let response = ApiError(FlowError::BackendUnavailable {
            provider: "gemini".into(),
            message: "429".into(),
            retry_after: Some(Duration::from_secs(12)),
            transient: true,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "12");
    }

    struct FixedLlm;

    #[async_trait::async_trait]
    impl crate::llm::LlmProvider for FixedLlm {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: crate::llm::CompletionRequest,
        ) -> Result<crate::llm::CompletionResponse, crate::error::LlmError> {
            Ok(crate::llm::CompletionResponse::text(
                r#"{"prompt": "Near campus or the city centre?"}"#,
            ))
        }
    }

    fn router() -> Router {
        let pipeline = Pipeline::new(Arc::new(FixedLlm), Default::default()).unwrap();
        api_routes(ApiState {
            pipeline: Arc::new(pipeline),
        })
    }

    #[tokio::test]
    async fn location_prompt_route_returns_prompt() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let body = serde_json::json!({
            "userPrimaryType": "Student",
            "userSpecificType": "Undergraduate",
            "movingInDate": "2025-09-01",
            "adults": 1,
            "children": 0,
            "minBudget": 600,
            "maxBudget": 900,
            "budgetUnit": "per_month"
        });
        let response = router()
            .oneshot(
                Request::post("/api/flows/location-prompt")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["prompt"], "Near campus or the city centre?");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let response = router()
            .oneshot(Request::get("/api/flows/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn garbage_body_is_schema_violation() {
        let err = parse_body::<ImageInput>("ImageInput", &Bytes::from_static(b"not json"))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
