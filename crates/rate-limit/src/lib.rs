//! Per-client admission control for the prompt gateway.
//!
//! The limiter keeps a sliding window log per client identity: the instants of
//! the requests it admitted during the trailing window. A request is admitted
//! while fewer than `max_requests` of those instants are younger than the
//! window. Rejection is a regular [`Decision`], not an error.
//!
//! State lives in a [`DashMap`](dashmap::DashMap) keyed by client identity and
//! is bounded by an idle sweep plus a hard client capacity.

pub mod sliding_window;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use promptgate_common::RateLimitConfig;

pub use sliding_window::{Decision, SlidingWindowLimiter};

/// Shared handle to the admission controller.
///
/// Cheaply cloneable (backed by `Arc`) and safe to share across tasks and
/// threads; all clones see the same per-client windows.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<SlidingWindowLimiter>,
    cleanup_interval: Duration,
}

impl RateLimiter {
    /// Create an unbounded limiter admitting `max_requests` per `window`.
    pub fn new(max_requests: u64, window: Duration) -> Self {
        tracing::info!(
            max_requests,
            window_ms = window.as_millis() as u64,
            "creating sliding window rate limiter"
        );
        Self {
            inner: Arc::new(SlidingWindowLimiter::new(max_requests, window)),
            cleanup_interval: Duration::from_secs(60),
        }
    }

    /// Create a limiter from the `rate_limit` configuration section.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        tracing::info!(
            max_requests = config.max_requests,
            window_secs = config.window_secs,
            max_clients = config.max_clients,
            "creating sliding window rate limiter"
        );
        let limiter = SlidingWindowLimiter::new(config.max_requests, config.window())
            .with_capacity(config.max_clients, config.idle_timeout());
        Self {
            inner: Arc::new(limiter),
            cleanup_interval: config.cleanup_interval(),
        }
    }

    /// Check whether a request from `client_id` is admitted right now.
    ///
    /// The clock is read once per call.
    pub fn check(&self, client_id: &str) -> Decision {
        self.inner.check(client_id)
    }

    /// Check whether a request from `client_id` arriving at `now` is admitted.
    pub fn check_at(&self, client_id: &str, now: Instant) -> Decision {
        self.inner.check_at(client_id, now)
    }

    /// Number of client identities currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.inner.tracked_clients()
    }

    /// Spawn a background thread that periodically sweeps idle clients.
    ///
    /// The thread holds an `Arc` to the limiter and runs for the lifetime of
    /// the process.
    pub fn start_cleanup_task(&self) -> io::Result<()> {
        let inner = Arc::clone(&self.inner);
        let interval = self.cleanup_interval;

        std::thread::Builder::new()
            .name("rate-limit-cleanup".into())
            .spawn(move || loop {
                std::thread::sleep(interval);
                inner.cleanup();
                tracing::trace!("rate limiter cleanup tick completed");
            })?;

        Ok(())
    }
}
