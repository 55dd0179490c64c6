use axum::extract::State;
use axum::Json;
use promptgate_common::RuleConfig;
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /api/config
///
/// Returns the startup configuration with `screening.rules` replaced by the
/// rule set currently in force.
pub async fn get_config(State(state): State<SharedState>) -> Json<Value> {
    let mut config = state.config.clone();
    config.screening.rules = state
        .screener
        .rules()
        .rules()
        .iter()
        .map(|rule| RuleConfig {
            pattern: rule.pattern().to_string(),
            category: rule.category(),
        })
        .collect();

    Json(serde_json::to_value(&config).unwrap_or(json!({"error": "serialization failed"})))
}
