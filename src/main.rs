use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lookup_gateway::config::Args;
use lookup_gateway::rate_limit::{SlidingWindowLimiter, SystemClock};
use lookup_gateway::router::app;
use lookup_gateway::state::AppState;
use lookup_gateway::upstream::{HttpLookupBackend, build_client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // parse cli arguments
    let args = Args::parse();

    let client = build_client(args.upstream_timeout())?;
    let backend = HttpLookupBackend::new(client, &args.upstream_url, args.retry_policy())?;
    let limiter = SlidingWindowLimiter::new(args.rate_limit, args.rate_window());

    let state = AppState::new(Arc::new(limiter), Arc::new(SystemClock), Arc::new(backend));

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(version = env!("CARGO_PKG_VERSION"), %addr, "Lookup gateway running");
    info!(upstream = %args.upstream_url, "Forwarding lookups");
    info!(
        limit = args.rate_limit,
        window_secs = args.rate_window,
        "Rate limit per client"
    );

    // peer addresses feed the rate limiter
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Lookup gateway stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
