use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use std::time::Instant;
use tracing::{info, warn};

use crate::error::{GatewayError, UpstreamError};
use crate::fingerprint::query_fingerprint;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL, UPSTREAM_FAILURES};
use crate::models::{LookupKind, LookupRecord};
use crate::state::AppState;

// Raw query pairs; repeated keys are allowed and the first one wins
type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

// GET /num?number=
pub async fn lookup_number(
    State(state): State<AppState>,
    params: QueryPairs,
) -> Result<Json<LookupRecord>, GatewayError> {
    let kind = LookupKind::Mobile;
    run_lookup(&state, kind, first_param(params, kind)).await
}

// GET /aadhar?aadhar=
pub async fn lookup_aadhaar(
    State(state): State<AppState>,
    params: QueryPairs,
) -> Result<Json<LookupRecord>, GatewayError> {
    let kind = LookupKind::Aadhaar;
    run_lookup(&state, kind, first_param(params, kind)).await
}

// an unparseable query string counts as a missing parameter
fn first_param(params: QueryPairs, kind: LookupKind) -> Option<String> {
    let Query(pairs) = params.ok()?;
    pairs
        .into_iter()
        .find(|(key, _)| key == kind.param())
        .map(|(_, value)| value)
}

async fn run_lookup(
    state: &AppState,
    kind: LookupKind,
    raw: Option<String>,
) -> Result<Json<LookupRecord>, GatewayError> {
    REQUEST_TOTAL.with_label_values(&[kind.as_str()]).inc();

    let raw = raw
        .filter(|s| !s.is_empty())
        .ok_or(GatewayError::MissingParameter(kind))?;
    let query = normalize_digits(kind, &raw)?;
    let fingerprint = query_fingerprint(kind, &query);

    let start_time = Instant::now();
    let result = state.backend.lookup(kind, &query).await;
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    match result {
        Ok(record) => {
            info!(kind = kind.as_str(), query = %fingerprint, "Lookup succeeded");
            Ok(Json(record))
        }
        Err(e) => {
            if !matches!(e, UpstreamError::NoRecords) {
                UPSTREAM_FAILURES.inc();
            }
            warn!(kind = kind.as_str(), query = %fingerprint, error = %e, "Lookup failed");
            Err(e.into())
        }
    }
}

// keep only the digits, then insist on the exact length for the kind
fn normalize_digits(kind: LookupKind, raw: &str) -> Result<String, GatewayError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != kind.digits() {
        return Err(GatewayError::InvalidParameter(kind));
    }
    Ok(digits)
}
