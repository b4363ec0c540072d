//! Array HTTP client
//!
//! Executes single requests against the array's REST interface and classifies
//! each (method, status) pair into a uniform outcome, so every resource kind
//! gets identical diagnostics. The array's notion of success differs by verb:
//!
//! | Method | Success |
//! |--------|---------|
//! | GET    | 200     |
//! | POST   | 201     |
//! | PATCH  | 204     |
//! | DELETE | 204     |
//!
//! Transient server errors are retried with bounded exponential backoff and
//! jitter, but only on idempotent methods (GET, and DELETE — a 404 on delete
//! means the resource is already gone and counts as success). POST creates
//! resources and is never retried automatically.

pub mod api;

pub use api::HttpArrayApi;

use crate::error::{Error, Result};
use crate::filter::CompiledFilter;
use backoff::ExponentialBackoffBuilder;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Immutable client configuration, constructed once and injected into every
/// operation. There is no ambient global state.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the array management API, e.g. `https://array.local/api/rest`
    pub endpoint: String,
    pub username: String,
    pub password: String,
    /// Accept self-signed appliance certificates. Off by default; this is an
    /// explicit opt-in, not an ambient accommodation.
    pub insecure: bool,
    /// Per-request timeout
    pub timeout: Duration,
    /// Page size for paginated list reads
    pub page_size: usize,
    /// Upper bound on total time spent retrying one transient failure
    pub retry_max_elapsed: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            password: String::new(),
            insecure: false,
            timeout: Duration::from_secs(10),
            page_size: 1000,
            retry_max_elapsed: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Request Outcome
// =============================================================================

/// Classification of one completed HTTP exchange. The raw body is kept in
/// every variant for operator-facing diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Success { body: String },
    ClientError { status: u16, body: String },
    ServerError { status: u16, body: String },
}

impl RequestOutcome {
    /// Classify a (method, status) pair against the per-method success table.
    /// Any non-success 4xx is a client error; everything else, including
    /// unexpected 2xx/3xx codes, is treated as a server error because the
    /// array violated its own contract.
    pub fn classify(method: &Method, status: u16, body: String) -> Self {
        let expected = match method.as_str() {
            "POST" => StatusCode::CREATED.as_u16(),
            "PATCH" | "DELETE" => StatusCode::NO_CONTENT.as_u16(),
            // GET, and any verb outside the array's contract
            _ => StatusCode::OK.as_u16(),
        };
        if status == expected {
            RequestOutcome::Success { body }
        } else if (400..500).contains(&status) {
            RequestOutcome::ClientError { status, body }
        } else {
            RequestOutcome::ServerError { status, body }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success { .. })
    }

    /// Convert into the error taxonomy, yielding the body on success
    pub fn into_result(self) -> Result<String> {
        match self {
            RequestOutcome::Success { body } => Ok(body),
            RequestOutcome::ClientError { status, body } => Err(Error::ApiClient { status, body }),
            RequestOutcome::ServerError { status, body } => Err(Error::ApiServer { status, body }),
        }
    }
}

// =============================================================================
// Array Client
// =============================================================================

/// HTTP executor for the array management API
pub struct ArrayClient {
    http: reqwest::Client,
    base: String,
    auth: String,
    config: ClientConfig,
}

// Manual impl: the auth header and config carry credentials that must not
// leak into logs or test output.
impl std::fmt::Debug for ArrayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayClient")
            .field("base", &self.base)
            .field("username", &self.config.username)
            .field("insecure", &self.config.insecure)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl ArrayClient {
    /// Build a client from an immutable configuration. TLS verification stays
    /// on unless `insecure` was explicitly set.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(Error::Configuration("endpoint must not be empty".into()));
        }
        if config.username.is_empty() {
            return Err(Error::Configuration("username must not be empty".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure)
            .default_headers(headers)
            .build()?;

        let base = config.endpoint.trim_end_matches('/').to_string();
        let auth = auth_header(&config.username, &config.password);

        Ok(Self {
            http,
            base,
            auth,
            config,
        })
    }

    /// Execute one request and classify the response. Transient failures are
    /// retried with jitter when (and only when) the method is idempotent.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<String> {
        if !is_idempotent(&method) {
            return self.execute_once(method, path, query, body).await;
        }

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_elapsed_time(Some(self.config.retry_max_elapsed))
            .build();

        let path_owned = path.to_string();
        backoff::future::retry_notify(
            policy,
            || {
                let method = method.clone();
                let path = path_owned.clone();
                async move {
                    self.execute_once(method, &path, query, body)
                        .await
                        .map_err(|e| {
                            if e.is_retryable() {
                                backoff::Error::transient(e)
                            } else {
                                backoff::Error::permanent(e)
                            }
                        })
                }
            },
            |err, delay| {
                warn!(error = %err, retry_in = ?delay, "transient array failure, retrying");
            },
        )
        .await
    }

    async fn execute_once(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<String> {
        let url = self.build_url(path, query);
        debug!(%method, %url, "array request");

        let mut request = self
            .http
            .request(method.clone(), url.as_str())
            .header(AUTHORIZATION, &self.auth);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        // A delete racing another deleter is still a converged delete.
        if method == Method::DELETE && status == StatusCode::NOT_FOUND.as_u16() {
            debug!(%url, "delete target already gone, treating as success");
            return Ok(text);
        }

        RequestOutcome::classify(&method, status, text).into_result()
    }

    /// Read a full collection page by page. Pagination stops at the first
    /// short page; a bad-range response mid-read terminates cleanly, since it
    /// means instances were deleted while paginating.
    pub async fn get_paginated(
        &self,
        path: &str,
        filter: &CompiledFilter,
    ) -> Result<Vec<Value>> {
        let mut collected = Vec::new();
        let mut offset = 0usize;
        loop {
            let mut query = filter.to_query();
            query.push(("limit".to_string(), self.config.page_size.to_string()));
            query.push(("offset".to_string(), offset.to_string()));

            let body = match self.execute(Method::GET, path, &query, None).await {
                Ok(body) => body,
                Err(Error::ApiClient { status: 416, .. }) if offset > 0 => break,
                Err(e) => return Err(e),
            };

            let page: Vec<Value> = serde_json::from_str(&body)?;
            let page_len = page.len();
            collected.extend(page);
            if page_len < self.config.page_size {
                break;
            }
            offset += page_len;
        }
        Ok(collected)
    }

    fn build_url(&self, path: &str, query: &[(String, String)]) -> String {
        let mut url = format!("{}/{}", self.base, path);
        if !query.is_empty() {
            url.push('?');
            let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            url.push_str(&pairs.join("&"));
        }
        url
    }

    /// The `Authorization` header value sent on every request
    pub fn authorization(&self) -> &str {
        &self.auth
    }
}

/// `Basic base64(username:password)`
fn auth_header(username: &str, password: &str) -> String {
    let raw = format!("{}:{}", username, password);
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(raw)
    )
}

fn is_idempotent(method: &Method) -> bool {
    *method == Method::GET || *method == Method::DELETE
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP/1.1 stub: routes on the request line, one connection per
    /// exchange.
    async fn stub_server<F>(route: F) -> SocketAddr
    where
        F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let route = Arc::new(route);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let route = route.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    loop {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => {
                                buf.extend_from_slice(&chunk[..n]);
                                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                    break;
                                }
                            }
                        }
                    }
                    let request_line = String::from_utf8_lossy(&buf)
                        .lines()
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    let (status, body) = route(&request_line);
                    let reason = match status {
                        200 => "OK",
                        201 => "Created",
                        204 => "No Content",
                        404 => "Not Found",
                        416 => "Range Not Satisfiable",
                        _ => "Error",
                    };
                    let response = format!(
                        "HTTP/1.1 {} {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        reason,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        addr
    }

    fn stub_config(addr: SocketAddr) -> ClientConfig {
        ClientConfig {
            endpoint: format!("http://{}/api/rest", addr),
            username: "admin".into(),
            password: "secret".into(),
            page_size: 2,
            retry_max_elapsed: Duration::from_secs(5),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn test_pagination_assembles_full_pages_until_bad_range() {
        // a full first page forces a second fetch; the 416 there means
        // instances vanished mid-read and must terminate cleanly
        let addr = stub_server(|line| {
            if line.contains("offset=0") {
                (200, r#"[{"id":"a"},{"id":"b"}]"#.to_string())
            } else {
                (416, "bad range".to_string())
            }
        })
        .await;

        let client = ArrayClient::new(stub_config(addr)).unwrap();
        let rows = client
            .get_paginated("host_group", &CompiledFilter::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "a");
    }

    #[tokio::test]
    async fn test_pagination_stops_on_short_page() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let addr = stub_server(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            (200, r#"[{"id":"only"}]"#.to_string())
        })
        .await;

        let client = ArrayClient::new(stub_config(addr)).unwrap();
        let rows = client
            .get_paginated("volume_group", &CompiledFilter::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_of_absent_resource_is_success_equivalent() {
        let addr = stub_server(|_| (404, "already gone".to_string())).await;

        let client = ArrayClient::new(stub_config(addr)).unwrap();
        let body = client
            .execute(Method::DELETE, "host_group/hg-1", &[], None)
            .await
            .unwrap();
        assert_eq!(body, "already gone");
    }

    #[tokio::test]
    async fn test_post_is_never_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let addr = stub_server(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            (500, "boom".to_string())
        })
        .await;

        let client = ArrayClient::new(stub_config(addr)).unwrap();
        let err = client
            .execute(
                Method::POST,
                "volume_group",
                &[],
                Some(&serde_json::json!({"name": "vg"})),
            )
            .await
            .unwrap_err();
        assert_matches!(err, Error::ApiServer { status: 500, .. });
        // a create must reach the array exactly once
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_get_failure_is_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let addr = stub_server(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                (500, "warming up".to_string())
            } else {
                (200, r#"{"id":"hg-1","name":"app-hosts"}"#.to_string())
            }
        })
        .await;

        let client = ArrayClient::new(stub_config(addr)).unwrap();
        let body = client
            .execute(Method::GET, "host_group/hg-1", &[], None)
            .await
            .unwrap();
        assert!(body.contains("hg-1"));
        assert!(hits.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_debug_output_redacts_credentials() {
        let client = ArrayClient::new(ClientConfig {
            endpoint: "https://array.local/api/rest".into(),
            username: "admin".into(),
            password: "hunter2".into(),
            ..ClientConfig::default()
        })
        .unwrap();

        let auth = client.authorization().to_string();
        let text = format!("{:?}", client);
        assert!(text.contains("array.local"));
        assert!(!text.contains("hunter2"));
        assert!(!text.contains(&auth));
    }

    #[test]
    fn test_classification_table() {
        assert!(RequestOutcome::classify(&Method::GET, 200, String::new()).is_success());
        assert_matches!(
            RequestOutcome::classify(&Method::GET, 404, "missing".into()),
            RequestOutcome::ClientError { status: 404, ref body } if body == "missing"
        );
        assert!(RequestOutcome::classify(&Method::POST, 201, String::new()).is_success());
        assert_matches!(
            RequestOutcome::classify(&Method::POST, 400, String::new()),
            RequestOutcome::ClientError { status: 400, .. }
        );
        assert!(RequestOutcome::classify(&Method::PATCH, 204, String::new()).is_success());
        assert!(RequestOutcome::classify(&Method::DELETE, 204, String::new()).is_success());
        assert_matches!(
            RequestOutcome::classify(&Method::DELETE, 500, String::new()),
            RequestOutcome::ServerError { status: 500, .. }
        );
    }

    #[test]
    fn test_unexpected_2xx_is_not_success() {
        // POST expects 201; a 200 means the array broke its contract
        assert_matches!(
            RequestOutcome::classify(&Method::POST, 200, String::new()),
            RequestOutcome::ServerError { status: 200, .. }
        );
    }

    #[test]
    fn test_outcome_into_result_preserves_body() {
        let err = RequestOutcome::classify(&Method::GET, 503, "busy".into())
            .into_result()
            .unwrap_err();
        assert_matches!(err, Error::ApiServer { status: 503, ref body } if body == "busy");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_auth_header_construction() {
        // base64("u:p") == "dTpw"
        assert_eq!(auth_header("u", "p"), "Basic dTpw");
    }

    #[test]
    fn test_client_rejects_empty_endpoint() {
        let err = ArrayClient::new(ClientConfig::default()).unwrap_err();
        assert_matches!(err, Error::Configuration(_));
    }

    #[test]
    fn test_build_url_with_query() {
        let client = ArrayClient::new(ClientConfig {
            endpoint: "https://array.local/api/rest/".into(),
            username: "admin".into(),
            password: "secret".into(),
            ..ClientConfig::default()
        })
        .unwrap();

        let filter = CompiledFilter::compile("name=eq.foo").unwrap();
        let mut query = filter.to_query();
        query.push(("limit".into(), "1000".into()));
        assert_eq!(
            client.build_url("host_group", &query),
            "https://array.local/api/rest/host_group?name=eq.foo&limit=1000"
        );
    }

    #[test]
    fn test_idempotency_gate() {
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::DELETE));
        assert!(!is_idempotent(&Method::POST));
        assert!(!is_idempotent(&Method::PATCH));
    }
}
