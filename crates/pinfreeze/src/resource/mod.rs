// ABOUTME: Frontend document fetching with a loopback fallback for containerized/local environments.
// ABOUTME: Handles the primary GET, host-spoofed retry on 127.0.0.1, size limits and charset decoding.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, HOST, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CaptureError;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Request timeout for each attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Redirects followed per attempt.
pub const MAX_REDIRECTS: usize = 3;

/// Authority the fallback request is sent to.
pub const DEFAULT_LOOPBACK_HOST: &str = "127.0.0.1";

pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml";

pub const DEFAULT_USER_AGENT: &str = concat!("pinfreeze/", env!("CARGO_PKG_VERSION"));

const FALLBACK_UNAVAILABLE: &str = "could not build fallback URL";

/// Which network path produced the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOrigin {
    Remote,
    LocalFallback,
}

impl FetchOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOrigin::Remote => "remote",
            FetchOrigin::LocalFallback => "local_fallback",
        }
    }
}

impl fmt::Display for FetchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for fetching a document.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub accept: String,
    pub user_agent: String,
    /// `host[:port]` used for the fallback request.
    pub loopback_host: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            accept: DEFAULT_ACCEPT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            loopback_host: DEFAULT_LOOPBACK_HOST.to_string(),
        }
    }
}

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub body: String,
    pub origin: FetchOrigin,
    pub status: u16,
    pub url: String,
    pub final_url: String,
}

/// Build the HTTP client used for capture: bounded timeout and capped redirects.
pub fn build_http_client(
    timeout: Duration,
    max_redirects: usize,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(max_redirects))
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
}

/// Why a single attempt did not produce a document.
#[derive(Debug)]
enum AttemptFailure {
    Request(String),
    Status(u16),
    Body(String),
    TooLarge,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Request(msg) => write!(f, "request failed: {}", msg),
            AttemptFailure::Status(code) => write!(f, "HTTP {}", code),
            AttemptFailure::Body(msg) => write!(f, "failed to read body: {}", msg),
            AttemptFailure::TooLarge => f.write_str("content too large"),
        }
    }
}

struct Page {
    status: u16,
    final_url: String,
    content_type: Option<String>,
    body: Bytes,
}

impl Page {
    fn into_result(self, url: &str, origin: FetchOrigin) -> FetchResult {
        FetchResult {
            body: decode_body(&self.body, self.content_type.as_deref()),
            origin,
            status: self.status,
            url: url.to_string(),
            final_url: self.final_url,
        }
    }
}

/// Fetch a document, retrying once against the loopback address when the primary fails.
///
/// A primary response outside `[200, 300)` is not an error by itself; it triggers
/// the fallback. When both attempts fail the error carries both descriptions.
pub async fn fetch_document(
    client: &reqwest::Client,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchResult, CaptureError> {
    let headers = request_headers(opts);

    tracing::debug!(url, "fetching frontend document");
    let primary = match attempt(client, url, headers.clone()).await {
        Ok(page) => {
            tracing::debug!(url, status = page.status, "primary fetch succeeded");
            return Ok(page.into_result(url, FetchOrigin::Remote));
        }
        Err(failure) => failure,
    };
    tracing::warn!(url, error = %primary, "primary fetch failed, trying loopback fallback");

    let fallback = match local_fallback_request(url, &opts.loopback_host) {
        Some((fallback_url, forwarded)) => {
            let mut fallback_headers = headers;
            fallback_headers.extend(forwarded);
            match attempt(client, fallback_url.as_str(), fallback_headers).await {
                Ok(page) => {
                    tracing::info!(
                        url,
                        fallback = %fallback_url,
                        status = page.status,
                        "loopback fallback succeeded"
                    );
                    return Ok(page.into_result(url, FetchOrigin::LocalFallback));
                }
                Err(failure) => failure.to_string(),
            }
        }
        None => FALLBACK_UNAVAILABLE.to_string(),
    };

    tracing::warn!(url, %primary, %fallback, "both fetch attempts failed");
    Err(CaptureError::network_failure(url, primary.to_string(), fallback))
}

/// Rewrite `url` onto the loopback authority, keeping path and query.
///
/// Returns `None` when the URL cannot be split into path components.
pub fn build_local_fallback_url(url: &str, loopback_host: &str) -> Option<Url> {
    let parsed = Url::parse(url).ok()?;
    if parsed.cannot_be_a_base() {
        return None;
    }

    let mut target = format!("http://{}{}", loopback_host, parsed.path());
    if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }
    Url::parse(&target).ok()
}

/// Fallback URL plus the Host / X-Forwarded-* headers naming the original virtual host.
fn local_fallback_request(url: &str, loopback_host: &str) -> Option<(Url, HeaderMap)> {
    let fallback_url = build_local_fallback_url(url, loopback_host)?;
    let original = Url::parse(url).ok()?;

    let mut headers = HeaderMap::new();
    if let Some(host) = original.host_str() {
        if let Ok(value) = HeaderValue::from_str(host) {
            headers.insert(HOST, value.clone());
            headers.insert(HeaderName::from_static("x-forwarded-host"), value);
        }
        if let Ok(proto) = HeaderValue::from_str(original.scheme()) {
            headers.insert(HeaderName::from_static("x-forwarded-proto"), proto);
        }
    }

    Some((fallback_url, headers))
}

fn request_headers(opts: &FetchOptions) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(accept) = HeaderValue::from_str(&opts.accept) {
        headers.insert(ACCEPT, accept);
    }
    if let Ok(agent) = HeaderValue::from_str(&opts.user_agent) {
        headers.insert(USER_AGENT, agent);
    }
    headers
}

async fn attempt(
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
) -> Result<Page, AttemptFailure> {
    let response = client
        .get(url)
        .headers(headers)
        .send()
        .await
        .map_err(|e| AttemptFailure::Request(e.to_string()))?;

    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        return Err(AttemptFailure::Status(status));
    }

    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(AttemptFailure::TooLarge);
        }
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    let body = response
        .bytes()
        .await
        .map_err(|e| AttemptFailure::Body(e.to_string()))?;
    if body.len() > MAX_CONTENT_LENGTH {
        return Err(AttemptFailure::TooLarge);
    }

    Ok(Page {
        status,
        final_url,
        content_type,
        body,
    })
}

/// Decode body bytes to a String using charset from content-type header or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        if let Some(charset) = part.trim().strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}
