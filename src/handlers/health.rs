use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crate::models::LookupKind;
use crate::state::AppState;

const SERVICE_NAME: &str = "Lookup Gateway";

const ENDPOINTS: [&str; 6] = ["/", "/num", "/aadhar", "/health", "/docs", "/metrics"];

// health handler
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}

// GET / - what this service offers
pub async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": format!("{} - phone and Aadhaar lookup", SERVICE_NAME),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/num": format!("Lookup by phone number - GET {}", example(LookupKind::Mobile)),
            "/aadhar": format!("Lookup by Aadhaar number - GET {}", example(LookupKind::Aadhaar)),
            "/health": "Health check endpoint",
            "/docs": "API documentation",
            "/metrics": "Prometheus metrics",
        },
        "rate_limit": state.rate_limit_summary(),
    }))
}

pub async fn docs_handler(State(state): State<AppState>) -> impl IntoResponse {
    let endpoint = |kind: LookupKind, description: &str| {
        json!({
            "path": kind.path(),
            "method": "GET",
            "description": description,
            "parameters": format!("{} ({} digits)", kind.param(), kind.digits()),
            "example": example(kind),
        })
    };

    Json(json!({
        "api_name": SERVICE_NAME,
        "description": "Lookup records by phone number or Aadhaar number",
        "authentication": "None required",
        "rate_limits": format!("{} per client IP", state.rate_limit_summary()),
        "endpoints": [
            endpoint(LookupKind::Mobile, "Lookup by phone number"),
            endpoint(LookupKind::Aadhaar, "Lookup by Aadhaar number"),
        ],
        "response_format": {
            "success": {
                "name": "string",
                "father_name": "string",
                "address": "string",
                "mobile": "string",
                "aadhaar": "string",
                "email": "string",
                "timestamp": "string",
                "status": "success",
                "source": "string",
            },
            "error": {
                "error": "string",
            },
        },
    }))
}

pub async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "available_endpoints": ENDPOINTS,
        })),
    )
}

fn example(kind: LookupKind) -> String {
    format!("{}?{}={}", kind.path(), kind.param(), kind.example())
}
