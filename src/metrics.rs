use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, IntCounterVec, register_counter, register_gauge, register_histogram,
    register_int_counter_vec,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lookup_requests_total",
        "Total number of lookup requests",
        &["kind"]
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("lookup_rate_limited_total", "Requests denied by the rate limiter").unwrap();
    pub static ref UPSTREAM_FAILURES: Counter =
        register_counter!("lookup_upstream_failures_total", "Lookups that failed upstream").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "lookup_request_latency_seconds",
        "Lookup latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("lookup_tracked_clients", "Clients currently holding a rate limit window").unwrap();
}
