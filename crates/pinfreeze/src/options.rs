// ABOUTME: Configuration options for frontend capture and the ClientBuilder fluent API.
// ABOUTME: Holds timeout, redirect cap, request identity headers, loopback host and sanitisation policy.

use std::time::Duration;

use crate::client::Client;
use crate::resource::{
    FetchOptions, DEFAULT_ACCEPT, DEFAULT_LOOPBACK_HOST, DEFAULT_USER_AGENT, MAX_REDIRECTS,
    REQUEST_TIMEOUT,
};

/// Configuration options for the capture client.
#[derive(Debug, Clone)]
pub struct Options {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    pub accept: String,
    pub loopback_host: String,
    /// When false, captured HTML is passed through the post-content sanitiser.
    pub allow_unfiltered_html: bool,
    pub http_client: Option<reqwest::Client>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: REQUEST_TIMEOUT,
            max_redirects: MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            loopback_host: DEFAULT_LOOPBACK_HOST.to_string(),
            allow_unfiltered_html: true,
            http_client: None,
        }
    }
}

impl Options {
    pub(crate) fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            accept: self.accept.clone(),
            user_agent: self.user_agent.clone(),
            loopback_host: self.loopback_host.clone(),
        }
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    opts: Options,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Set the per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.opts.max_redirects = max;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.opts.accept = accept.into();
        self
    }

    /// Set the `host[:port]` the fallback request is sent to.
    pub fn loopback_host(mut self, host: impl Into<String>) -> Self {
        self.opts.loopback_host = host.into();
        self
    }

    /// Return captured HTML as-is (true) or sanitised (false).
    pub fn allow_unfiltered_html(mut self, allow: bool) -> Self {
        self.opts.allow_unfiltered_html = allow;
        self
    }

    /// Use a custom HTTP client. Timeout and redirect settings are then the client's own.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Build the Client with the configured options.
    pub fn build(self) -> Client {
        Client::new(self.opts)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::default();
        assert_eq!(opts.timeout, Duration::from_secs(15));
        assert_eq!(opts.max_redirects, 3);
        assert_eq!(opts.loopback_host, "127.0.0.1");
        assert_eq!(opts.accept, "text/html,application/xhtml+xml");
        assert!(opts.user_agent.starts_with("pinfreeze/"));
        assert!(opts.allow_unfiltered_html);
    }

    #[test]
    fn test_fetch_options_follow_builder() {
        let client = ClientBuilder::new()
            .loopback_host("127.0.0.1:8080")
            .user_agent("tester/1.0")
            .build();
        let fetch = client.options().fetch_options();
        assert_eq!(fetch.loopback_host, "127.0.0.1:8080");
        assert_eq!(fetch.user_agent, "tester/1.0");
    }
}
