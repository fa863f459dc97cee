mod health;
mod metrics;
mod lookup;

pub use health::{docs_handler, health_handler, index_handler, not_found_handler};
pub use metrics::metrics_handler;
pub use lookup::{lookup_aadhaar, lookup_number};
