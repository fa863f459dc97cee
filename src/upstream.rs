//! Client side of the external lookup service.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Url;
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{SetupError, UpstreamError};
use crate::models::{LookupKind, LookupRecord, UpstreamLookupForm};

// fields copied into the record only when the upstream filled them in
const OPTIONAL_FIELDS: [&str; 5] = ["dob", "gender", "pincode", "state", "district"];

/// Anything that can answer a lookup; the HTTP handlers only see this trait.
#[async_trait]
pub trait LookupBackend: Send + Sync {
    async fn lookup(&self, kind: LookupKind, query: &str) -> Result<LookupRecord, UpstreamError>;
}

/// How many times a lookup is attempted before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: None,
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails with a non-retryable error, or attempts run out.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, UpstreamError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(attempt, error = %e, "Lookup attempt failed, retrying");
                    if let Some(delay) = self.backoff {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

// reqwest client with the fixed headers every upstream call carries
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, SetupError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("lookup-gateway/", env!("CARGO_PKG_VERSION"))),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(SetupError::Client)
}

/// Lookup backend that posts form-encoded queries to a single URL.
pub struct HttpLookupBackend {
    client: reqwest::Client,
    url: Url,
    source: String,
    retry: RetryPolicy,
}

impl HttpLookupBackend {
    pub fn new(client: reqwest::Client, url: &str, retry: RetryPolicy) -> Result<Self, SetupError> {
        let url = Url::parse(url).map_err(|e| SetupError::InvalidUpstreamUrl(e.to_string()))?;
        let source = url.host_str().unwrap_or_default().to_string();

        Ok(Self {
            client,
            url,
            source,
            retry,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    async fn lookup_once(&self, kind: LookupKind, query: &str) -> Result<LookupRecord, UpstreamError> {
        let form = UpstreamLookupForm {
            kind: kind.as_str(),
            query,
        };

        let res = self.client.post(self.url.clone()).form(&form).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = res.text().await?;
        debug!(bytes = body.len(), "Upstream responded");
        extract_record(&body, &self.source, current_timestamp())
    }
}

#[async_trait]
impl LookupBackend for HttpLookupBackend {
    async fn lookup(&self, kind: LookupKind, query: &str) -> Result<LookupRecord, UpstreamError> {
        self.retry.run(|_| self.lookup_once(kind, query)).await
    }
}

pub fn current_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Reshape the upstream's nested JSON into a flat [`LookupRecord`].
///
/// Rows live under `data.result.result`, or directly under `data.result`
/// for older responses. Only the first row is used.
pub fn extract_record(body: &str, source: &str, timestamp: String) -> Result<LookupRecord, UpstreamError> {
    let parsed: Value =
        serde_json::from_str(body).map_err(|e| UpstreamError::MalformedJson(e.to_string()))?;

    let result = parsed
        .get("data")
        .and_then(|data| data.get("result"))
        .ok_or(UpstreamError::UnexpectedShape)?;

    let rows = result.get("result").unwrap_or(result);

    let row = match rows {
        Value::Null => return Err(UpstreamError::NoRecords),
        Value::Array(rows) => rows.first().ok_or(UpstreamError::NoRecords)?,
        _ => return Err(UpstreamError::UnexpectedShape),
    };
    let row = row.as_object().ok_or(UpstreamError::UnexpectedShape)?;

    let mut extra = Map::new();
    for field in OPTIONAL_FIELDS {
        if let Some(value) = row.get(field).filter(|v| is_filled(v)) {
            extra.insert(field.to_string(), value.clone());
        }
    }

    Ok(LookupRecord {
        name: text_field(row, "name"),
        father_name: text_field(row, "father_name"),
        address: text_field(row, "address").replace('!', ", ").trim().to_string(),
        mobile: text_field(row, "mobile"),
        aadhaar: text_field(row, "id_number"),
        email: text_field(row, "email"),
        timestamp,
        status: "success".to_string(),
        source: source.to_string(),
        extra,
    })
}

fn text_field(row: &Map<String, Value>, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Bool(true) => true,
    }
}
