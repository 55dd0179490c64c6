pub mod routes;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use state::{AppState, AuditAction, AuditLogEntry, GatewayMetrics, SharedState};

/// Build the Axum router with all admin API routes and middleware.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/metrics", get(routes::metrics::get_metrics))
        .route("/api/config", get(routes::config::get_config))
        // Screening rule management
        .route(
            "/api/rules",
            get(routes::rules::list_rules).post(routes::rules::add_rule),
        )
        .route("/api/rules/test", post(routes::rules::test_rule))
        .route("/api/rules/{id}", delete(routes::rules::delete_rule))
        .route("/api/logs", get(routes::logs::get_logs))
        .route("/api/stats", get(routes::stats::get_stats))
        .with_state(state)
        .layer(cors)
}

/// Serve the admin API on `listen_addr` until `shutdown` resolves.
pub async fn run_admin_server<F>(
    state: SharedState,
    listen_addr: &str,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "admin API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Convenience function to create a SharedState from an AppConfig.
pub fn new_shared_state(config: promptgate_common::AppConfig) -> anyhow::Result<SharedState> {
    Ok(Arc::new(AppState::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use promptgate_common::{AppConfig, RuleCategory};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        let config =
            AppConfig::from_yaml("backend:\n  url: http://127.0.0.1:5000/generate\n").unwrap();
        new_shared_state(config).unwrap()
    }

    async fn call(state: &SharedState, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let state = test_state();
        let (status, body) = call(&state, Method::GET, "/api/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn lists_builtin_rules() {
        let state = test_state();
        let (status, body) = call(&state, Method::GET, "/api/rules", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 12);
        assert_eq!(body["rules"][0]["pattern"], "ignore previous instructions");
        assert_eq!(body["rules"][0]["category"], "injection-override");
    }

    #[tokio::test]
    async fn add_test_and_delete_rule() {
        let state = test_state();

        let (status, body) = call(
            &state,
            Method::POST,
            "/api/rules",
            Some(json!({"pattern": "Jailbreak", "category": "injection-override"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 12);

        let (_, verdict) = call(
            &state,
            Method::POST,
            "/api/rules/test",
            Some(json!({"text": "a JAILBREAK attempt"})),
        )
        .await;
        assert_eq!(verdict["safe"], false);
        assert_eq!(verdict["pattern"], "jailbreak");

        let (status, _) = call(&state, Method::DELETE, "/api/rules/12", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&state, Method::DELETE, "/api/rules/12", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_rule_pattern_is_rejected() {
        let state = test_state();
        let (status, body) = call(
            &state,
            Method::POST,
            "/api/rules",
            Some(json!({"pattern": " ", "category": "sql-injection"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn rule_test_returns_sanitized_text() {
        let state = test_state();
        let (_, body) = call(
            &state,
            Method::POST,
            "/api/rules/test",
            Some(json!({"text": "<b>What</b> is (AI)?"})),
        )
        .await;

        assert_eq!(body["safe"], true);
        assert_eq!(body["sanitized"], "What is \\(AI\\)?");
    }

    #[tokio::test]
    async fn logs_filter_and_page() {
        let state = test_state();
        state.record_audit(AuditLogEntry::new("10.0.0.1", AuditAction::RateLimited, 429));
        state.record_audit(
            AuditLogEntry::new("10.0.0.2", AuditAction::UnsafePrompt, 400)
                .with_rule(RuleCategory::SqlInjection, ";"),
        );
        state.record_audit(AuditLogEntry::new("10.0.0.1", AuditAction::BackendError, 500));

        let (_, body) = call(&state, Method::GET, "/api/logs?client=10.0.0.1", None).await;
        assert_eq!(body["total"], 2);
        // Newest first.
        assert_eq!(body["entries"][0]["action"], "backend_error");

        let (_, body) = call(&state, Method::GET, "/api/logs?category=sql-injection", None).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["entries"][0]["client"], "10.0.0.2");

        let (_, body) = call(&state, Method::GET, "/api/logs?limit=1&offset=1", None).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["entries"].as_array().unwrap().len(), 1);
        assert_eq!(body["entries"][0]["action"], "unsafe_prompt");
    }

    #[tokio::test]
    async fn stats_and_metrics_reflect_counters() {
        let state = test_state();
        state.metrics.requests_total.inc_by(4);
        state.metrics.rate_limited_total.inc();
        state
            .metrics
            .prompts_rejected
            .with_label_values(&["template-injection"])
            .inc();

        let (_, stats) = call(&state, Method::GET, "/api/stats", None).await;
        assert_eq!(stats["total_requests"], 4);
        assert_eq!(stats["rate_limited_requests"], 1);
        assert_eq!(stats["rejected_prompts"], 1);

        let response = build_router(state.clone())
            .oneshot(Request::get("/api/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(text.to_vec()).unwrap();
        assert!(text.contains("promptgate_requests_total 4"));
    }

    #[tokio::test]
    async fn config_is_exposed() {
        let state = test_state();
        let (status, body) = call(&state, Method::GET, "/api/config", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rate_limit"]["max_requests"], 60);
        assert_eq!(body["screening"]["rules"].as_array().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn config_reflects_rule_edits() {
        let state = test_state();

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/rules",
            Some(json!({"pattern": "sudo", "category": "command-execution"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = call(&state, Method::GET, "/api/config", None).await;
        let rules = body["screening"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 13);
        assert_eq!(rules[12]["pattern"], "sudo");

        call(&state, Method::DELETE, "/api/rules/0", None).await;
        let (_, body) = call(&state, Method::GET, "/api/config", None).await;
        assert_eq!(body["screening"]["rules"].as_array().unwrap().len(), 12);
        assert_eq!(body["screening"]["rules"][0]["pattern"], "disregard safety");
    }
}
