//! Per-client sliding-window rate limiting.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

/// Bucket used when the caller cannot tell who the client is.
pub const UNKNOWN_CLIENT: &str = "unknown";

// Source of "now" for the limiter, as time since the unix epoch
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// `retry_after` is the time until the oldest retained request leaves the window.
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

// Arrival times for one client, oldest first
#[derive(Debug, Default)]
struct ClientWindow {
    timestamps: VecDeque<Duration>,
}

impl ClientWindow {
    // drop everything that is a full window old or older
    fn prune(&mut self, now: Duration, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_sub(oldest) >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn live_count(&self, now: Duration, window: Duration) -> usize {
        self.timestamps
            .iter()
            .filter(|&&ts| now.saturating_sub(ts) < window)
            .count()
    }

    fn oldest_live(&self, now: Duration, window: Duration) -> Option<Duration> {
        self.timestamps
            .iter()
            .copied()
            .find(|&ts| now.saturating_sub(ts) < window)
    }
}

/// Sliding-window limiter keyed by client identifier.
///
/// Each client may have at most `limit` admitted requests inside any trailing
/// interval of length `window`. Windows are pruned lazily when their client
/// is next seen; idle clients are never evicted.
///
/// The read-prune-check-append sequence for a client runs under that
/// client's map entry lock, so concurrent calls for the same client are
/// serialised and cannot over-admit.
pub struct SlidingWindowLimiter {
    windows: DashMap<String, ClientWindow>,
    limit: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether `client_id` may proceed at `now`, recording the request if so.
    pub fn check_and_record(&self, client_id: &str, now: Duration) -> Admission {
        let client_id = normalize_client(client_id);

        // a client with no recorded requests is only inserted on admission
        let Some(mut entry) = self.windows.get_mut(client_id) else {
            return self.admit_new(client_id, now);
        };

        entry.prune(now, self.window);

        if entry.timestamps.len() >= self.limit {
            let retry_after = self.retry_after(entry.timestamps.front().copied(), now);
            debug!(
                client = client_id,
                in_window = entry.timestamps.len(),
                retry_after_secs = retry_after.as_secs_f64(),
                "Rate limit exceeded"
            );
            return Admission::Denied { retry_after };
        }

        entry.timestamps.push_back(now);
        trace!(client = client_id, in_window = entry.timestamps.len(), "Request admitted");
        Admission::Admitted
    }

    /// Same decision as [`check_and_record`](Self::check_and_record) without touching stored state.
    pub fn peek(&self, client_id: &str, now: Duration) -> Admission {
        let client_id = normalize_client(client_id);

        let Some(entry) = self.windows.get(client_id) else {
            return self.fresh_decision(now);
        };

        if entry.live_count(now, self.window) >= self.limit {
            let oldest = entry.oldest_live(now, self.window);
            Admission::Denied {
                retry_after: self.retry_after(oldest, now),
            }
        } else {
            Admission::Admitted
        }
    }

    /// Number of clients currently holding a window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    fn admit_new(&self, client_id: &str, now: Duration) -> Admission {
        if self.limit == 0 {
            return self.fresh_decision(now);
        }

        let mut entry = self.windows.entry(client_id.to_string()).or_default();

        // another request for the same client may have raced us into the map
        entry.prune(now, self.window);
        if entry.timestamps.len() >= self.limit {
            let retry_after = self.retry_after(entry.timestamps.front().copied(), now);
            return Admission::Denied { retry_after };
        }

        entry.timestamps.push_back(now);
        Admission::Admitted
    }

    // a zero limit never admits anything
    fn fresh_decision(&self, now: Duration) -> Admission {
        if self.limit == 0 {
            Admission::Denied {
                retry_after: self.retry_after(None, now),
            }
        } else {
            Admission::Admitted
        }
    }

    fn retry_after(&self, oldest: Option<Duration>, now: Duration) -> Duration {
        match oldest {
            Some(ts) => self.window.saturating_sub(now.saturating_sub(ts)),
            None => self.window,
        }
    }

    #[cfg(test)]
    fn timestamps(&self, client_id: &str) -> Vec<Duration> {
        self.windows
            .get(client_id)
            .map(|w| w.timestamps.iter().copied().collect())
            .unwrap_or_default()
    }
}

fn normalize_client(client_id: &str) -> &str {
    let trimmed = client_id.trim();
    if trimmed.is_empty() {
        UNKNOWN_CLIENT
    } else {
        trimmed
    }
}
