use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use promptgate_common::GatewayError;
use serde_json::json;

/// HTTP-facing wrapper around [`GatewayError`].
///
/// Internal failure detail is never written to the response body.
#[derive(Debug)]
pub struct ApiError {
    pub error: GatewayError,
    retry_after: Option<Duration>,
}

impl ApiError {
    pub fn rate_limited(client: &str, retry_after: Duration) -> Self {
        Self {
            error: GatewayError::RateLimited(client.to_string()),
            retry_after: Some(retry_after),
        }
    }

    pub fn status(&self) -> StatusCode {
        match &self.error {
            GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::UnsafePrompt { .. } => StatusCode::BAD_REQUEST,
            GatewayError::PromptTooLong { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match &self.error {
            GatewayError::RateLimited(_) => "Rate limit exceeded. Please try again later.".to_string(),
            GatewayError::UnsafePrompt { .. } => "Potentially unsafe prompt detected".to_string(),
            GatewayError::PromptTooLong { limit, .. } => {
                format!("Prompt exceeds the maximum length of {limit} characters")
            }
            GatewayError::InvalidRequest(msg) => msg.clone(),
            _ => "Error generating response".to_string(),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

// Body extraction failures answer with the same JSON shape as every other error.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::InvalidRequest(rejection.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(json!({ "detail": self.detail() }))).into_response();

        if let Some(retry_after) = self.retry_after {
            // Whole seconds, rounded up, never zero.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }

        response
    }
}
