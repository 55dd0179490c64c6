use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request was admitted and recorded in the client's window.
    Allowed,
    /// The client's budget for the current window is exhausted. `retry_after`
    /// is the time until the oldest recorded request leaves the window.
    Rejected { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Recent admitted requests for a single client, oldest first.
#[derive(Debug, Default)]
struct ClientWindow {
    timestamps: VecDeque<Instant>,
}

impl ClientWindow {
    /// Drop every timestamp with `now - t >= window`.
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn last_active(&self) -> Option<Instant> {
        self.timestamps.back().copied()
    }
}

/// A concurrent sliding window log rate limiter.
///
/// Each key keeps the instants of its admitted requests. A request is admitted
/// when fewer than `limit` of them fall inside the trailing `window`, so a
/// burst straddling a window boundary is throttled the same as any other burst.
///
/// The prune-count-append sequence for a key runs under the DashMap shard
/// lock held by its entry guard, which makes every check atomic per key while
/// keys on other shards proceed in parallel.
pub struct SlidingWindowLimiter {
    windows: DashMap<String, ClientWindow>,
    window: Duration,
    limit: usize,
    max_clients: usize,
    idle_timeout: Duration,
}

impl SlidingWindowLimiter {
    /// Create a new sliding window limiter.
    ///
    /// * `limit`  - maximum admitted requests per window (must be positive)
    /// * `window` - window duration (must be positive)
    ///
    /// The limiter starts unbounded; see [`with_capacity`](Self::with_capacity).
    pub fn new(limit: u64, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            limit: limit as usize,
            max_clients: usize::MAX,
            idle_timeout: window.saturating_mul(2),
        }
    }

    /// Bound the number of tracked clients and set how long a client may stay
    /// idle before the sweep removes it.
    pub fn with_capacity(mut self, max_clients: usize, idle_timeout: Duration) -> Self {
        self.max_clients = max_clients.max(1);
        self.idle_timeout = idle_timeout.max(self.window);
        self
    }

    /// Check whether a request from `key` arriving at `now` is admitted.
    ///
    /// Stale timestamps are pruned whether or not the request is admitted; a
    /// rejected request is never recorded.
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        if !self.windows.contains_key(key) && self.windows.len() >= self.max_clients {
            if let Err(retry_after) = self.make_room(now) {
                tracing::debug!(client = %key, "client table full, new client rejected");
                return Decision::Rejected { retry_after };
            }
        }

        let mut entry = self.windows.entry(key.to_string()).or_default();
        let state = entry.value_mut();

        state.prune(now, self.window);

        if state.timestamps.len() >= self.limit {
            let retry_after = state
                .timestamps
                .front()
                .map(|&oldest| self.window.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or(self.window);
            return Decision::Rejected { retry_after };
        }

        state.timestamps.push_back(now);
        Decision::Allowed
    }

    /// Check against the current monotonic time.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Number of client identities currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Remove clients whose most recent admitted request is older than the
    /// idle timeout.
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    pub fn cleanup_at(&self, now: Instant) {
        let idle_timeout = self.idle_timeout;

        self.windows.retain(|_key, state| match state.last_active() {
            Some(last) => now.saturating_duration_since(last) < idle_timeout,
            None => false,
        });

        tracing::debug!(
            remaining = self.windows.len(),
            "sliding window cleanup complete"
        );
    }

    /// Free a slot for a new client: sweep idle clients first, then evict the
    /// least recently active client with nothing left in its window.
    ///
    /// Every tracked log still counts against its owner's budget while any of
    /// it is in the window, so when no client is evictable the new identity is
    /// turned away. The error carries the time until the first log empties.
    fn make_room(&self, now: Instant) -> Result<(), Duration> {
        self.cleanup_at(now);
        if self.windows.len() < self.max_clients {
            return Ok(());
        }

        let window = self.window;
        let mut victim: Option<(String, Option<Instant>)> = None;
        let mut soonest = window;

        // Collect before removing; removing while iterating would deadlock on the shard lock.
        for entry in self.windows.iter() {
            let last = entry.value().last_active();
            let age = last.map_or(window, |last| now.saturating_duration_since(last));
            if age < window {
                soonest = soonest.min(window - age);
                continue;
            }
            if victim.as_ref().map_or(true, |(_, oldest)| last < *oldest) {
                victim = Some((entry.key().clone(), last));
            }
        }

        match victim {
            Some((key, _)) => {
                self.windows.remove(&key);
                tracing::debug!(evicted = %key, "client evicted at capacity");
                Ok(())
            }
            None => Err(soonest),
        }
    }
}
