// ABOUTME: The main Client struct that captures a page's rendered HTML and extracts the configured selector.
// ABOUTME: Provides async fetch() and capture() plus extract_html() for markup already in hand.

use serde::Serialize;
use url::Url;

use crate::error::CaptureError;
use crate::extract::extract;
use crate::formats::sanitize_for_user;
use crate::options::{ClientBuilder, Options};
use crate::resource::{build_http_client, fetch_document, FetchOrigin, FetchResult};
use crate::selector::SelectorContract;
use crate::settings::SelectorSource;

/// Successful capture of a frontend document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureResult {
    pub url: String,
    pub html: String,
    pub selector: SelectorContract,
    pub origin: FetchOrigin,
}

/// The capture client. Holds no per-request state, so one instance can serve
/// concurrent captures.
pub struct Client {
    opts: Options,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new ClientBuilder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Client with the given options.
    pub fn new(opts: Options) -> Self {
        let http_client = opts.http_client.clone().unwrap_or_else(|| {
            build_http_client(opts.timeout, opts.max_redirects)
                .expect("failed to build HTTP client")
        });

        Self { opts, http_client }
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Fetch `url` with the loopback fallback, without extracting anything.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, CaptureError> {
        let url = validate_url(url, "Fetch")?;
        fetch_document(&self.http_client, url.as_str(), &self.opts.fetch_options()).await
    }

    /// Fetch `url` and extract the selector supplied by `source`.
    ///
    /// The selector is resolved once per call; a missing or corrupt stored
    /// selector resolves to the default rather than failing the capture.
    pub async fn capture(
        &self,
        url: &str,
        source: &dyn SelectorSource,
    ) -> Result<CaptureResult, CaptureError> {
        let target = validate_url(url, "Capture")?;
        let selector = source.selector_contract().normalized();

        let fetched =
            fetch_document(&self.http_client, target.as_str(), &self.opts.fetch_options()).await?;
        if fetched.body.trim().is_empty() {
            return Err(CaptureError::parse_failed(
                url,
                "Capture",
                Some(anyhow::anyhow!("the frontend returned an empty body")),
            ));
        }

        let html = self.extract_html(&fetched.body, &selector)?;
        tracing::info!(
            url,
            selector = %selector,
            origin = %fetched.origin,
            bytes = html.len(),
            "captured frontend HTML"
        );

        Ok(CaptureResult {
            url: url.to_string(),
            html,
            selector,
            origin: fetched.origin,
        })
    }

    /// Extract `selector` from `html` and apply the sanitisation policy.
    pub fn extract_html(
        &self,
        html: &str,
        selector: &SelectorContract,
    ) -> Result<String, CaptureError> {
        let extracted = extract(html, selector)?;
        Ok(sanitize_for_user(&extracted, self.opts.allow_unfiltered_html).into_owned())
    }
}

fn validate_url(url: &str, op: &str) -> Result<Url, CaptureError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(CaptureError::invalid_input(
            url,
            op,
            Some(anyhow::anyhow!("URL is empty")),
        ));
    }

    let parsed = Url::parse(trimmed).map_err(|e| {
        CaptureError::invalid_input(url, op, Some(anyhow::anyhow!("malformed URL: {}", e)))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(CaptureError::invalid_input(
            url,
            op,
            Some(anyhow::anyhow!("unsupported scheme {:?}", other)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::settings::Settings;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<html><body><header>nav</header><div id="content"><p>Hello</p></div></body></html>"#;

    #[tokio::test]
    async fn capture_returns_remote_content() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/page");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body(PAGE);
        });

        let client = Client::builder().build();
        let result = client
            .capture(&server.url("/page"), &SelectorContract::default())
            .await
            .expect("capture should succeed");

        mock.assert();
        assert_eq!(result.html, "<p>Hello</p>");
        assert_eq!(result.origin, FetchOrigin::Remote);
        assert_eq!(result.selector, SelectorContract::default());
    }

    #[tokio::test]
    async fn capture_resolves_selector_from_settings() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .body(r#"<main class="site-main">a</main><aside class="site-main">b</aside>"#);
        });

        let settings = Settings {
            capture_selector: Some(".site-main".to_string()),
            ..Default::default()
        };
        let client = Client::builder().build();
        let result = client.capture(&server.url("/"), &settings).await.unwrap();
        assert_eq!(result.html, "a\nb");
        assert_eq!(result.selector, SelectorContract::class("site-main").unwrap());
    }

    #[tokio::test]
    async fn capture_rejects_bad_urls() {
        let client = Client::builder().build();
        for url in ["", "   ", "not a url", "ftp://example.com/x"] {
            let err = client
                .capture(url, &SelectorContract::default())
                .await
                .expect_err("should reject");
            assert_eq!(err.code, ErrorCode::InvalidInput, "url {:?}", url);
            assert_eq!(err.http_status(), 400);
        }
    }

    #[tokio::test]
    async fn capture_empty_body_is_parse_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/blank");
            then.status(200).body("   ");
        });

        let client = Client::builder().build();
        let err = client
            .capture(&server.url("/blank"), &SelectorContract::default())
            .await
            .unwrap_err();
        assert!(err.is_parse_failed());
        assert_eq!(err.http_status(), 500);
    }

    #[tokio::test]
    async fn capture_sanitises_when_unfiltered_html_disallowed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .body(r#"<div id="content"><p>ok</p><script>bad()</script></div>"#);
        });

        let client = Client::builder().allow_unfiltered_html(false).build();
        let result = client
            .capture(&server.url("/"), &SelectorContract::default())
            .await
            .unwrap();
        assert_eq!(result.html, "<p>ok</p>");
    }

    #[test]
    fn extract_html_reports_selector_errors() {
        let client = Client::builder().build();
        let err = client
            .extract_html(PAGE, &SelectorContract::id("missing").unwrap())
            .unwrap_err();
        assert!(err.is_selector_not_found());
        assert_eq!(err.http_status(), 422);
    }
}
