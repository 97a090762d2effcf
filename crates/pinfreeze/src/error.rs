// ABOUTME: Error types for frontend capture including the ErrorCode enum and CaptureError struct.
// ABOUTME: Provides categorized errors with convenience constructors, boolean helpers and HTTP severities.

use std::fmt;

/// Error codes representing the categories of capture failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidInput,
    NetworkFailure,
    CapabilityMissing,
    ParseFailed,
    InvalidSelector,
    SelectorNotFound,
    SelectorEmpty,
}

impl ErrorCode {
    /// Stable machine-readable identifier for the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::NetworkFailure => "network_failure",
            ErrorCode::CapabilityMissing => "capability_missing",
            ErrorCode::ParseFailed => "parse_failed",
            ErrorCode::InvalidSelector => "invalid_selector",
            ErrorCode::SelectorNotFound => "selector_not_found",
            ErrorCode::SelectorEmpty => "selector_empty",
        }
    }

    /// HTTP-status-like severity reported to the editor layer.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InvalidInput => 400,
            ErrorCode::InvalidSelector | ErrorCode::SelectorNotFound | ErrorCode::SelectorEmpty => {
                422
            }
            ErrorCode::NetworkFailure | ErrorCode::CapabilityMissing | ErrorCode::ParseFailed => {
                500
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidInput => "invalid input",
            ErrorCode::NetworkFailure => "network failure",
            ErrorCode::CapabilityMissing => "capability missing",
            ErrorCode::ParseFailed => "parse failed",
            ErrorCode::InvalidSelector => "invalid selector",
            ErrorCode::SelectorNotFound => "selector not found",
            ErrorCode::SelectorEmpty => "selector empty",
        };
        write!(f, "{}", s)
    }
}

/// Descriptions of both fetch attempts when the primary and the loopback fallback fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub primary: String,
    pub fallback: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote: {}; local fallback: {}", self.primary, self.fallback)
    }
}

/// The main error type for capture operations.
#[derive(Debug, thiserror::Error)]
pub struct CaptureError {
    pub code: ErrorCode,
    pub target: String,
    pub op: String,
    pub fetch: Option<FetchFailure>,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pinfreeze: {} {}: {}", self.op, self.target, self.code)?;
        if let Some(ref fetch) = self.fetch {
            write!(f, ": {}", fetch)?;
        }
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl CaptureError {
    fn new(
        code: ErrorCode,
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            target: target.into(),
            op: op.into(),
            fetch: None,
            source,
        }
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::InvalidInput, target, op, source)
    }

    /// Create a NetworkFailure error carrying both attempt descriptions.
    pub fn network_failure(
        target: impl Into<String>,
        primary: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            fetch: Some(FetchFailure {
                primary: primary.into(),
                fallback: fallback.into(),
            }),
            ..Self::new(ErrorCode::NetworkFailure, target, "Fetch", None)
        }
    }

    /// Create a CapabilityMissing error.
    pub fn capability_missing(op: impl Into<String>, capability: &str) -> Self {
        Self::new(
            ErrorCode::CapabilityMissing,
            "",
            op,
            Some(anyhow::anyhow!("{} is not available", capability)),
        )
    }

    /// Create a ParseFailed error.
    pub fn parse_failed(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::ParseFailed, target, op, source)
    }

    /// Create an InvalidSelector error.
    pub fn invalid_selector(
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::InvalidSelector, target, op, source)
    }

    /// Create a SelectorNotFound error naming the selector.
    pub fn selector_not_found(selector: impl Into<String>, op: impl Into<String>) -> Self {
        let selector = selector.into();
        let source = anyhow::anyhow!("no content found for selector \"{}\"", selector);
        Self::new(ErrorCode::SelectorNotFound, selector, op, Some(source))
    }

    /// Create a SelectorEmpty error.
    pub fn selector_empty(selector: impl Into<String>, op: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SelectorEmpty,
            selector,
            op,
            Some(anyhow::anyhow!("the selector exists but its content is empty")),
        )
    }

    /// HTTP-status-like severity for this error.
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Returns true if this is an InvalidInput error.
    pub fn is_invalid_input(&self) -> bool {
        self.code == ErrorCode::InvalidInput
    }

    /// Returns true if this is a NetworkFailure error.
    pub fn is_network_failure(&self) -> bool {
        self.code == ErrorCode::NetworkFailure
    }

    /// Returns true if this is a CapabilityMissing error.
    pub fn is_capability_missing(&self) -> bool {
        self.code == ErrorCode::CapabilityMissing
    }

    /// Returns true if this is a ParseFailed error.
    pub fn is_parse_failed(&self) -> bool {
        self.code == ErrorCode::ParseFailed
    }

    /// Returns true if this is an InvalidSelector error.
    pub fn is_invalid_selector(&self) -> bool {
        self.code == ErrorCode::InvalidSelector
    }

    /// Returns true if this is a SelectorNotFound error.
    pub fn is_selector_not_found(&self) -> bool {
        self.code == ErrorCode::SelectorNotFound
    }

    /// Returns true if this is a SelectorEmpty error.
    pub fn is_selector_empty(&self) -> bool {
        self.code == ErrorCode::SelectorEmpty
    }
}
