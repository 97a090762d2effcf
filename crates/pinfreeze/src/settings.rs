// ABOUTME: Persisted plugin settings: the capture selector (typed + legacy) and the snapshot limit.
// ABOUTME: Validates selectors at write time and resolves a usable contract at read time.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::history::DEFAULT_SNAPSHOT_LIMIT;
use crate::selector::contract::{convert_legacy, DEFAULT_SELECTOR_VALUE};
use crate::selector::{SelectorContract, SelectorKind};

/// Supplies the selector contract used for a capture.
pub trait SelectorSource {
    /// Never fails: missing, legacy or corrupt configuration yields the default contract.
    fn selector_contract(&self) -> SelectorContract;
}

impl SelectorSource for SelectorContract {
    fn selector_contract(&self) -> SelectorContract {
        self.clone()
    }
}

/// Stored settings. Fields are kept as raw strings so corrupt values survive a load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_selector_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_selector_value: Option<String>,
    /// Legacy `#id` / `.class` / tag selector string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_limit: Option<i64>,
}

/// Parse a stored selector type; unknown values become `id`.
pub fn sanitize_selector_type(raw: &str) -> SelectorKind {
    raw.parse().unwrap_or_default()
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing settings in {}", path.display()))
    }

    /// Write settings as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing settings to {}", path.display()))
    }

    /// Resolve the capture selector for reading.
    ///
    /// The type is sanitised, an empty value falls back to the legacy string and
    /// anything still empty or invalid falls back to `{id, content}`.
    pub fn capture_selector_contract(&self) -> SelectorContract {
        let mut kind = sanitize_selector_type(self.capture_selector_type.as_deref().unwrap_or(""));
        let mut value = self
            .capture_selector_value
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_string();

        if value.is_empty() {
            if let Some(legacy) = self.capture_selector.as_deref().and_then(convert_legacy) {
                kind = legacy.kind;
                value = legacy.value;
            }
        }

        if value.is_empty() || !kind.accepts(&value) {
            return SelectorContract::default();
        }

        SelectorContract { kind, value }
    }

    /// Store a new capture selector after validating it.
    ///
    /// An empty value stores the default value under the chosen type. An invalid
    /// value is rejected and the current settings are left untouched.
    pub fn set_capture_selector(
        &mut self,
        raw_type: &str,
        raw_value: &str,
    ) -> Result<SelectorContract, CaptureError> {
        let kind = sanitize_selector_type(raw_type);
        let value = raw_value.trim();
        let contract = if value.is_empty() {
            SelectorContract::new(kind, DEFAULT_SELECTOR_VALUE)?
        } else {
            SelectorContract::new(kind, value)?
        };

        self.capture_selector_type = Some(contract.kind.as_str().to_string());
        self.capture_selector_value = Some(contract.value.clone());
        tracing::info!(selector = %contract, "capture selector updated");
        Ok(contract)
    }

    /// Snapshots kept per parent; values below 1 fall back to the default.
    pub fn snapshot_limit(&self) -> usize {
        match self.snapshot_limit {
            Some(limit) if limit >= 1 => limit as usize,
            _ => DEFAULT_SNAPSHOT_LIMIT,
        }
    }
}

impl SelectorSource for Settings {
    fn selector_contract(&self) -> SelectorContract {
        self.capture_selector_contract()
    }
}
