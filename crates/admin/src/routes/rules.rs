use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use promptgate_common::RuleConfig;
use promptgate_screening::{sanitize, Verdict};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /api/rules
///
/// Returns the active screening rules in evaluation order.
pub async fn list_rules(State(state): State<SharedState>) -> Json<Value> {
    let rules = state.screener.rules();

    Json(json!({
        "count": rules.len(),
        "rules": rules.rules().iter().enumerate().map(|(i, r)| {
            json!({ "id": i, "pattern": r.pattern(), "category": r.category() })
        }).collect::<Vec<Value>>()
    }))
}

/// POST /api/rules
///
/// Appends a screening rule. It is evaluated after every existing rule.
pub async fn add_rule(
    State(state): State<SharedState>,
    Json(body): Json<RuleConfig>,
) -> impl IntoResponse {
    match state.screener.add_rule(&body) {
        Ok(id) => (
            StatusCode::CREATED,
            Json(json!({
                "status": "created",
                "id": id,
                "pattern": body.pattern.to_lowercase(),
                "category": body.category
            })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "message": e.to_string()
            })),
        ),
    }
}

/// DELETE /api/rules/{id}
///
/// Removes a rule by its index. Later rules shift down by one.
pub async fn delete_rule(
    State(state): State<SharedState>,
    Path(id): Path<usize>,
) -> impl IntoResponse {
    match state.screener.remove_rule(id) {
        Some(removed) => (
            StatusCode::OK,
            Json(json!({
                "status": "deleted",
                "id": id,
                "pattern": removed.pattern(),
                "category": removed.category()
            })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "status": "error",
                "message": format!("rule with id {} not found", id)
            })),
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct TestRuleRequest {
    pub text: String,
}

/// POST /api/rules/test
///
/// Classifies a piece of text against the active rules without forwarding
/// anything. Safe text is returned in its sanitized form.
pub async fn test_rule(
    State(state): State<SharedState>,
    Json(body): Json<TestRuleRequest>,
) -> Json<Value> {
    match state.screener.classify(&body.text) {
        Verdict::Safe => Json(json!({
            "safe": true,
            "sanitized": sanitize(&body.text)
        })),
        Verdict::Unsafe { category, pattern } => Json(json!({
            "safe": false,
            "category": category,
            "pattern": pattern
        })),
    }
}
