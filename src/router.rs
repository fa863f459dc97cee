use axum::{Router, middleware, routing::get};

use crate::handlers::{
    docs_handler, health_handler, index_handler, lookup_aadhaar, lookup_number, metrics_handler,
    not_found_handler,
};
use crate::middleware::rate_limit_gate;
use crate::state::AppState;

/// Build the gateway router. Only the lookup routes sit behind the rate limiter.
pub fn app(state: AppState) -> Router {
    let lookups = Router::new()
        .route("/num", get(lookup_number))
        .route("/aadhar", get(lookup_aadhaar))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_gate));

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/docs", get(docs_handler))
        .route("/metrics", get(metrics_handler))
        .merge(lookups)
        .fallback(not_found_handler)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::models::{LookupKind, LookupRecord};
    use crate::rate_limit::{Clock, SlidingWindowLimiter, UNKNOWN_CLIENT};
    use crate::upstream::LookupBackend;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{Request, StatusCode, header::RETRY_AFTER};
    use serde_json::{Map, Value, json};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tower::ServiceExt;

    struct ManualClock(Mutex<Duration>);

    impl ManualClock {
        fn at(secs: u64) -> Arc<Self> {
            Arc::new(Self(Mutex::new(Duration::from_secs(secs))))
        }

        fn advance(&self, secs: u64) {
            *self.0.lock().unwrap() += Duration::from_secs(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            *self.0.lock().unwrap()
        }
    }

    #[derive(Clone, Copy)]
    enum Reply {
        Found,
        Empty,
        Down,
    }

    struct FakeBackend {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LookupBackend for FakeBackend {
        async fn lookup(&self, kind: LookupKind, query: &str) -> Result<LookupRecord, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Found => Ok(LookupRecord {
                    name: "Test Person".to_string(),
                    father_name: String::new(),
                    address: String::new(),
                    mobile: if kind == LookupKind::Mobile { query.to_string() } else { String::new() },
                    aadhaar: if kind == LookupKind::Aadhaar { query.to_string() } else { String::new() },
                    email: String::new(),
                    timestamp: "2026-01-01 00:00:00".to_string(),
                    status: "success".to_string(),
                    source: "fake".to_string(),
                    extra: Map::new(),
                }),
                Reply::Empty => Err(UpstreamError::NoRecords),
                Reply::Down => Err(UpstreamError::Transport("connection refused by 10.9.9.9".into())),
            }
        }
    }

    fn state(limit: usize, clock: Arc<ManualClock>, backend: Arc<FakeBackend>) -> AppState {
        AppState::new(
            Arc::new(SlidingWindowLimiter::new(limit, Duration::from_secs(60))),
            clock,
            backend,
        )
    }

    fn from_ip(state: AppState, ip: [u8; 4]) -> Router {
        app(state).layer(MockConnectInfo(SocketAddr::from((ip, 40000))))
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
        let res = router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_lookup_passes_normalized_query() {
        let backend = FakeBackend::new(Reply::Found);
        let router = from_ip(state(30, ManualClock::at(0), backend.clone()), [10, 0, 0, 1]);

        let (status, body) = get_json(&router, "/num?number=98765-43210").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mobile"], "9876543210");
        assert_eq!(body["status"], "success");

        let (status, body) = get_json(&router, "/aadhar?aadhar=1234%205678%209012").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["aadhaar"], "123456789012");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_denies_with_429() {
        let clock = ManualClock::at(1_000);
        let backend = FakeBackend::new(Reply::Found);
        let router = from_ip(state(3, clock.clone(), backend.clone()), [10, 0, 0, 1]);

        for _ in 0..3 {
            let (status, _) = get_json(&router, "/num?number=9876543210").await;
            assert_eq!(status, StatusCode::OK);
        }

        let res = router
            .clone()
            .oneshot(Request::get("/num?number=9876543210").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()[RETRY_AFTER], "60");
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({"error": "Rate limit exceeded", "message": "Maximum 3 requests per minute"})
        );

        // denied requests never reach the backend
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);

        clock.advance(60);
        let (status, _) = get_json(&router, "/num?number=9876543210").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_endpoints_share_one_bucket_per_client() {
        let shared = state(2, ManualClock::at(0), FakeBackend::new(Reply::Found));
        let limiter = shared.limiter.clone();
        let first = from_ip(shared.clone(), [10, 0, 0, 1]);
        let second = from_ip(shared, [10, 0, 0, 2]);

        assert_eq!(get_json(&first, "/num?number=9876543210").await.0, StatusCode::OK);
        assert_eq!(get_json(&first, "/aadhar?aadhar=123456789012").await.0, StatusCode::OK);
        assert_eq!(
            get_json(&first, "/aadhar?aadhar=123456789012").await.0,
            StatusCode::TOO_MANY_REQUESTS
        );

        // a different peer has its own window
        assert_eq!(get_json(&second, "/num?number=9876543210").await.0, StatusCode::OK);
        assert_eq!(get_json(&second, "/num?number=9876543210").await.0, StatusCode::OK);
        assert_eq!(
            get_json(&second, "/num?number=9876543210").await.0,
            StatusCode::TOO_MANY_REQUESTS
        );

        // keyed by peer IP, not the shared "unknown" bucket
        assert_eq!(limiter.tracked_clients(), 2);
        assert!(!limiter.peek("10.0.0.1", Duration::ZERO).is_admitted());
        assert!(limiter.peek(UNKNOWN_CLIENT, Duration::ZERO).is_admitted());
    }

    #[tokio::test]
    async fn test_missing_connect_info_is_still_limited() {
        let router = app(state(1, ManualClock::at(0), FakeBackend::new(Reply::Found)));

        assert_eq!(get_json(&router, "/num?number=9876543210").await.0, StatusCode::OK);
        assert_eq!(
            get_json(&router, "/num?number=9876543210").await.0,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_bad_parameters() {
        let backend = FakeBackend::new(Reply::Found);
        let router = from_ip(state(30, ManualClock::at(0), backend.clone()), [10, 0, 0, 1]);

        let (status, body) = get_json(&router, "/num").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing parameter");
        assert_eq!(body["example"], "/num?number=9876543210");

        let (status, body) = get_json(&router, "/num?number=12345").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid phone number");
        assert_eq!(body["message"], "Must be exactly 10 digits");

        let (status, body) = get_json(&router, "/aadhar?aadhar=9876543210").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Must be exactly 12 digits");

        let (status, body) = get_json(&router, "/num?number=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing parameter");

        // only an empty value is missing, blanks are just not digits
        let (status, body) = get_json(&router, "/num?number=%20%20%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid phone number");

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repeated_parameter_uses_first_value() {
        let backend = FakeBackend::new(Reply::Found);
        let router = from_ip(state(30, ManualClock::at(0), backend.clone()), [10, 0, 0, 1]);

        let (status, body) = get_json(&router, "/num?number=9876543210&number=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mobile"], "9876543210");

        let (status, body) = get_json(&router, "/aadhar?aadhar=1&aadhar=123456789012").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid Aadhaar number");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upstream_failures_are_generic() {
        let router = from_ip(state(30, ManualClock::at(0), FakeBackend::new(Reply::Down)), [10, 0, 0, 1]);

        let (status, body) = get_json(&router, "/num?number=9876543210").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Service unavailable");
        assert!(!body.to_string().contains("10.9.9.9"));

        let router = from_ip(state(30, ManualClock::at(0), FakeBackend::new(Reply::Empty)), [10, 0, 0, 1]);
        let (status, body) = get_json(&router, "/aadhar?aadhar=123456789012").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No records found");
    }

    #[tokio::test]
    async fn test_info_routes_are_not_limited() {
        let router = from_ip(state(1, ManualClock::at(0), FakeBackend::new(Reply::Found)), [10, 0, 0, 1]);

        for _ in 0..3 {
            let (status, body) = get_json(&router, "/health").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "healthy");
        }

        let (_, body) = get_json(&router, "/").await;
        assert_eq!(body["rate_limit"], "1 requests per minute");

        let (status, body) = get_json(&router, "/docs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endpoints"][1]["path"], "/aadhar");

        let res = router
            .clone()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let router = from_ip(state(30, ManualClock::at(0), FakeBackend::new(Reply::Found)), [10, 0, 0, 1]);

        let (status, body) = get_json(&router, "/lookup").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Endpoint not found");
        assert!(body["available_endpoints"].as_array().unwrap().contains(&json!("/num")));
    }
}
