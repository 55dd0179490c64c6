use axum::extract::{Query, State};
use axum::Json;
use promptgate_common::RuleCategory;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::SharedState;

/// Query parameters for the audit log endpoint.
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    /// Maximum number of entries to return (default: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    /// Only entries for this client identity.
    pub client: Option<String>,
    /// Only entries for this screening rule category.
    pub category: Option<RuleCategory>,
}

fn default_limit() -> usize {
    100
}

/// GET /api/logs
///
/// Newest-first page of the audit ring buffer, optionally filtered.
pub async fn get_logs(
    State(state): State<SharedState>,
    Query(params): Query<LogQuery>,
) -> Json<Value> {
    let logs = state.audit_log.read().unwrap_or_else(|e| e.into_inner());

    let filtered: Vec<_> = logs
        .iter()
        .rev()
        .filter(|entry| params.client.as_ref().map_or(true, |c| &entry.client == c))
        .filter(|entry| params.category.map_or(true, |c| entry.category == Some(c)))
        .collect();

    let total = filtered.len();
    let page: Vec<_> = filtered
        .into_iter()
        .skip(params.offset)
        .take(params.limit)
        .cloned()
        .collect();

    Json(json!({
        "total": total,
        "offset": params.offset,
        "limit": params.limit,
        "entries": page
    }))
}
