use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use promptgate_common::{AppConfig, RuleCategory};
use promptgate_rate_limit::RateLimiter;
use promptgate_screening::Screener;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use serde::{Deserialize, Serialize};

/// Number of audit entries kept before the oldest are dropped.
pub const AUDIT_LOG_CAPACITY: usize = 1000;

/// Shared state type alias used across all route handlers.
pub type SharedState = Arc<AppState>;

/// Central application state: configuration, the admission controller, the
/// prompt screener, metrics and the audit log.
pub struct AppState {
    /// Configuration as loaded at startup. Rule edits go to `screener`.
    pub config: AppConfig,
    pub rate_limiter: Option<RateLimiter>,
    pub screener: Arc<Screener>,
    pub metrics: GatewayMetrics,
    pub audit_log: RwLock<VecDeque<AuditLogEntry>>,
    pub start_time: std::time::Instant,
}

/// Prometheus metrics collected by the gateway.
pub struct GatewayMetrics {
    pub registry: Registry,
    pub requests_total: IntCounter,
    pub rate_limited_total: IntCounter,
    pub prompts_rejected: IntCounterVec,
    pub backend_errors: IntCounter,
    pub request_duration: HistogramVec,
}

/// Why a request showed up in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RateLimited,
    UnsafePrompt,
    PromptTooLong,
    BackendError,
}

/// A single audit log entry for a blocked or failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub timestamp: String,
    pub client: String,
    pub action: AuditAction,
    pub category: Option<RuleCategory>,
    pub pattern: Option<String>,
    pub status: u16,
}

impl AuditLogEntry {
    pub fn new(client: &str, action: AuditAction, status: u16) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            client: client.to_string(),
            action,
            category: None,
            pattern: None,
            status,
        }
    }

    pub fn with_rule(mut self, category: RuleCategory, pattern: &str) -> Self {
        self.category = Some(category);
        self.pattern = Some(pattern.to_string());
        self
    }
}

impl GatewayMetrics {
    /// Create the gateway metrics, registered against a fresh registry.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounter::with_opts(Opts::new(
            "promptgate_requests_total",
            "Total number of generation requests received",
        ))?;

        let rate_limited_total = IntCounter::with_opts(Opts::new(
            "promptgate_rate_limited_total",
            "Total number of requests rejected by the admission controller",
        ))?;

        let prompts_rejected = IntCounterVec::new(
            Opts::new(
                "promptgate_prompts_rejected_total",
                "Prompts rejected by screening, by rule category",
            ),
            &["category"],
        )?;

        let backend_errors = IntCounter::with_opts(Opts::new(
            "promptgate_backend_errors_total",
            "Total number of failed backend generation calls",
        ))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "promptgate_request_duration_seconds",
                "Generation request duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["status"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(rate_limited_total.clone()))?;
        registry.register(Box::new(prompts_rejected.clone()))?;
        registry.register(Box::new(backend_errors.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            rate_limited_total,
            prompts_rejected,
            backend_errors,
            request_duration,
        })
    }

    /// Sum of rejected prompts across all categories.
    pub fn prompts_rejected_total(&self) -> u64 {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == "promptgate_prompts_rejected_total")
            .flat_map(|family| family.get_metric())
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum()
    }
}

impl AppState {
    /// Build the state for the given configuration.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let screener = Screener::from_config(&config.screening)?;
        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| RateLimiter::from_config(&config.rate_limit));

        Ok(Self {
            config,
            rate_limiter,
            screener: Arc::new(screener),
            metrics: GatewayMetrics::new()?,
            audit_log: RwLock::new(VecDeque::with_capacity(AUDIT_LOG_CAPACITY)),
            start_time: std::time::Instant::now(),
        })
    }

    /// Append an entry, dropping the oldest once the log is full.
    pub fn record_audit(&self, entry: AuditLogEntry) {
        let mut log = self.audit_log.write().unwrap_or_else(|e| e.into_inner());
        if log.len() >= AUDIT_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(entry);
    }
}
