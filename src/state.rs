use std::sync::Arc;

use crate::rate_limit::{Clock, SlidingWindowLimiter};
use crate::upstream::LookupBackend;

// app's shared state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<SlidingWindowLimiter>, // per-client request windows
    pub clock: Arc<dyn Clock>,              // time source for the limiter
    pub backend: Arc<dyn LookupBackend>,    // where lookups are forwarded
}

impl AppState {
    pub fn new(
        limiter: Arc<SlidingWindowLimiter>,
        clock: Arc<dyn Clock>,
        backend: Arc<dyn LookupBackend>,
    ) -> Self {
        Self {
            limiter,
            clock,
            backend,
        }
    }

    // human readable limit, e.g. "30 requests per minute"
    pub fn rate_limit_summary(&self) -> String {
        let window = self.limiter.window().as_secs();
        let per = if window == 60 {
            "minute".to_string()
        } else {
            format!("{} seconds", window)
        };
        format!("{} requests per {}", self.limiter.limit(), per)
    }
}
