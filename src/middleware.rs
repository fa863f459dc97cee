use axum::Json;
use axum::extract::connect_info::MockConnectInfo;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

use crate::metrics::{RATE_LIMITED_TOTAL, TRACKED_CLIENTS};
use crate::rate_limit::{Admission, UNKNOWN_CLIENT};
use crate::state::AppState;

// Gate in front of the lookup routes, one window per peer IP
pub async fn rate_limit_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let client = client_id(&req);
    let decision = state.limiter.check_and_record(&client, state.clock.now());
    TRACKED_CLIENTS.set(state.limiter.tracked_clients() as f64);

    match decision {
        Admission::Admitted => next.run(req).await,
        Admission::Denied { retry_after } => {
            RATE_LIMITED_TOTAL.inc();
            warn!(client = %client, path = %req.uri().path(), "Rate limit exceeded");
            too_many_requests(&state, retry_after)
        }
    }
}

// requests without connection info share one bucket rather than skipping the limiter
fn client_id(req: &Request) -> String {
    let extensions = req.extensions();
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
        .or_else(|| {
            extensions
                .get::<MockConnectInfo<SocketAddr>>()
                .map(|MockConnectInfo(addr)| *addr)
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn too_many_requests(state: &AppState, retry_after: Duration) -> Response {
    let body = Json(json!({
        "error": "Rate limit exceeded",
        "message": format!("Maximum {}", state.rate_limit_summary()),
    }));

    let mut res = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    res.headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
    res
}

// whole seconds, rounded up, never zero
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}
