//! Lookup Gateway - a rate limited HTTP front for an external lookup service.
//!
//! Phone and Aadhaar lookups are validated, admitted through a per-client
//! sliding-window limiter, forwarded to the configured upstream and returned
//! as a flat JSON record.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod router;
pub mod state;
pub mod upstream;
