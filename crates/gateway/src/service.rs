use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use promptgate_admin::{AuditAction, AuditLogEntry, SharedState};
use promptgate_common::{GatewayError, GenerationConfig};
use promptgate_rate_limit::Decision;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::backend::{Backend, GenerationRequest};
use crate::error::ApiError;

/// Everything a request handler needs.
#[derive(Clone)]
pub struct Gateway {
    state: SharedState,
    backend: Arc<dyn Backend>,
    model: String,
    defaults: GenerationConfig,
}

/// Identity the admission controller keyed the request on.
#[derive(Debug, Clone)]
pub struct ClientId(pub String);

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
    #[serde(default)]
    pub system_context: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub response: String,
    pub metadata: ResponseMetadata,
    pub safe_prompt: bool,
}

#[derive(Debug, Serialize)]
pub struct ResponseMetadata {
    pub tokens_used: usize,
    pub prompt_tokens: usize,
    pub timestamp: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Gateway {
    pub fn new(state: SharedState, backend: Arc<dyn Backend>) -> Self {
        let model = state.config.backend.model.clone();
        let defaults = state.config.generation.clone();

        Self {
            state,
            backend,
            model,
            defaults,
        }
    }

    fn audit(&self, client: &str, error: &GatewayError, status: u16) {
        let entry = match error {
            GatewayError::RateLimited(_) => AuditLogEntry::new(client, AuditAction::RateLimited, status),
            GatewayError::UnsafePrompt { category, pattern } => {
                AuditLogEntry::new(client, AuditAction::UnsafePrompt, status).with_rule(*category, pattern)
            }
            GatewayError::PromptTooLong { .. } => {
                AuditLogEntry::new(client, AuditAction::PromptTooLong, status)
            }
            GatewayError::Backend(_) => AuditLogEntry::new(client, AuditAction::BackendError, status),
            _ => return,
        };
        self.state.record_audit(entry);
    }
}

/// Build the public router: `POST /generate` behind the admission controller
/// and an unthrottled `GET /health`.
pub fn build_router(gateway: Gateway) -> Router {
    let generate_route =
        post(generate).route_layer(middleware::from_fn_with_state(gateway.clone(), admission));

    Router::new()
        .route("/generate", generate_route)
        .route("/health", get(health))
        .with_state(gateway)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Admission middleware: keys the request on the peer IP, asks the rate
/// limiter, and records request metrics for everything that passes through.
async fn admission(
    State(gateway): State<Gateway>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let metrics = &gateway.state.metrics;
    metrics.requests_total.inc();

    let client = peer.ip().to_string();

    let decision = gateway
        .state
        .rate_limiter
        .as_ref()
        .map(|limiter| limiter.check(&client))
        .unwrap_or(Decision::Allowed);

    let response = match decision {
        Decision::Allowed => {
            request.extensions_mut().insert(ClientId(client));
            next.run(request).await
        }
        Decision::Rejected { retry_after } => {
            warn!(client = %client, retry_after_ms = retry_after.as_millis() as u64, "rate limit exceeded");
            metrics.rate_limited_total.inc();
            let err = ApiError::rate_limited(&client, retry_after);
            gateway.audit(&client, &err.error, err.status().as_u16());
            err.into_response()
        }
    };

    metrics
        .request_duration
        .with_label_values(&[response.status().as_str()])
        .observe(started.elapsed().as_secs_f64());

    response
}

async fn generate(
    State(gateway): State<Gateway>,
    Extension(ClientId(client)): Extension<ClientId>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<PromptResponse>, ApiError> {
    let Json(request) = payload.inspect_err(|e| {
        debug!(client = %client, error = %e, "malformed generation request");
    })?;

    let temperature = request.temperature.unwrap_or(gateway.defaults.default_temperature);
    let max_tokens = request.max_tokens.unwrap_or(gateway.defaults.default_max_tokens);

    if !(0.0..=2.0).contains(&temperature) {
        return Err(GatewayError::InvalidRequest(format!(
            "temperature must be within [0.0, 2.0], got {temperature}"
        ))
        .into());
    }
    if max_tokens == 0 {
        return Err(GatewayError::InvalidRequest("max_tokens must be at least 1".to_string()).into());
    }

    let screened = match gateway
        .state
        .screener
        .screen(&request.prompt, request.system_context.as_deref())
    {
        Ok(screened) => screened,
        Err(e) => {
            let err = ApiError::from(e);
            if let GatewayError::UnsafePrompt { category, .. } = &err.error {
                gateway
                    .state
                    .metrics
                    .prompts_rejected
                    .with_label_values(&[category.as_str()])
                    .inc();
            }
            debug!(client = %client, error = %err.error, "prompt rejected by screening");
            gateway.audit(&client, &err.error, err.status().as_u16());
            return Err(err);
        }
    };

    let generation = GenerationRequest {
        model: gateway.model.clone(),
        prompt: screened.instruction,
        temperature,
        max_tokens,
    };

    let text = match gateway.backend.generate(&generation).await {
        Ok(text) => text,
        Err(e) => {
            error!(client = %client, error = %e, "error generating response");
            gateway.state.metrics.backend_errors.inc();
            let err = ApiError::from(GatewayError::Backend(e.to_string()));
            gateway.audit(&client, &err.error, err.status().as_u16());
            return Err(err);
        }
    };

    let metadata = ResponseMetadata {
        tokens_used: text.split_whitespace().count(),
        prompt_tokens: screened.sanitized.split_whitespace().count(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        model: generation.model,
        temperature,
        max_tokens,
    };

    Ok(Json(PromptResponse {
        response: text,
        metadata,
        safe_prompt: true,
    }))
}
