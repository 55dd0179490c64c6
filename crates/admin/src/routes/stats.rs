use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /api/stats
///
/// Returns aggregated traffic statistics derived from the Prometheus counters,
/// the number of tracked clients and the server's uptime.
pub async fn get_stats(State(state): State<SharedState>) -> Json<Value> {
    let uptime_secs = state.start_time.elapsed().as_secs();
    let total_requests = state.metrics.requests_total.get();
    let rate_limited_requests = state.metrics.rate_limited_total.get();
    let rejected_prompts = state.metrics.prompts_rejected_total();
    let backend_errors = state.metrics.backend_errors.get();
    let tracked_clients = state
        .rate_limiter
        .as_ref()
        .map(|limiter| limiter.tracked_clients())
        .unwrap_or(0);

    let requests_per_second = if uptime_secs > 0 {
        total_requests as f64 / uptime_secs as f64
    } else {
        0.0
    };

    Json(json!({
        "total_requests": total_requests,
        "rate_limited_requests": rate_limited_requests,
        "rejected_prompts": rejected_prompts,
        "backend_errors": backend_errors,
        "tracked_clients": tracked_clients,
        "uptime_secs": uptime_secs,
        "requests_per_second": requests_per_second
    }))
}
