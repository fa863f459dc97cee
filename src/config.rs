use clap::Parser;
use std::time::Duration;

use crate::upstream::RetryPolicy;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "lookup-gateway")]
#[command(about = "Rate limited HTTP gateway in front of an external lookup service")]
pub struct Args {
    // Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    // Lookup endpoint of the upstream service
    #[arg(short, long, env = "UPSTREAM_URL", default_value = "http://localhost:8000/api/lookup")]
    pub upstream_url: String,

    // Rate limit max requests per window, per client
    #[arg(long, env = "RATE_LIMIT", default_value_t = 30)]
    pub rate_limit: usize,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // Upstream request timeout in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT", default_value_t = 15)]
    pub upstream_timeout: u64,

    // Total attempts per lookup, first try included
    #[arg(long, env = "RETRY_ATTEMPTS", default_value_t = 2)]
    pub retry_attempts: u32,
}

impl Args {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            backoff: None,
        }
    }
}
