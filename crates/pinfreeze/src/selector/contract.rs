// ABOUTME: Typed selector contract (kind + value) with per-kind validation grammars.
// ABOUTME: Also converts legacy string selectors (#id, .class, bare tag) into contracts.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Value used by the fallback contract `{id, content}`.
pub const DEFAULT_SELECTOR_VALUE: &str = "content";

static NAME_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());
static TAG_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9:-]*$").unwrap());

/// The four supported selector kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    #[default]
    Id,
    Class,
    Tag,
    XPath,
}

impl SelectorKind {
    pub const ALL: [SelectorKind; 4] = [
        SelectorKind::Id,
        SelectorKind::Class,
        SelectorKind::Tag,
        SelectorKind::XPath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorKind::Id => "id",
            SelectorKind::Class => "class",
            SelectorKind::Tag => "tag",
            SelectorKind::XPath => "xpath",
        }
    }

    /// Whether `value` satisfies this kind's grammar.
    ///
    /// - id / class: `[A-Za-z0-9_-]+`
    /// - tag: `[A-Za-z][A-Za-z0-9:-]*`
    /// - xpath: starts with `/`
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            SelectorKind::Id | SelectorKind::Class => NAME_TOKEN_RE.is_match(value),
            SelectorKind::Tag => TAG_NAME_RE.is_match(value),
            SelectorKind::XPath => value.starts_with('/'),
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectorKind {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        SelectorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| {
                CaptureError::invalid_selector(
                    s,
                    "SelectorKind",
                    Some(anyhow::anyhow!("expected one of id, class, tag, xpath")),
                )
            })
    }
}

/// Which page element to extract, as a typed `(kind, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectorContract {
    #[serde(rename = "type")]
    pub kind: SelectorKind,
    pub value: String,
}

impl Default for SelectorContract {
    fn default() -> Self {
        Self {
            kind: SelectorKind::Id,
            value: DEFAULT_SELECTOR_VALUE.to_string(),
        }
    }
}

impl SelectorContract {
    /// Build a validated contract. The value is trimmed before validation.
    pub fn new(kind: SelectorKind, value: impl AsRef<str>) -> Result<Self, CaptureError> {
        let value = value.as_ref().trim();
        if !kind.accepts(value) {
            return Err(CaptureError::invalid_selector(
                format!("{}={}", kind, value),
                "SelectorContract",
                Some(anyhow::anyhow!(
                    "invalid selector for the chosen type; use id, class, tag or xpath"
                )),
            ));
        }
        Ok(Self {
            kind,
            value: value.to_string(),
        })
    }

    pub fn id(value: impl AsRef<str>) -> Result<Self, CaptureError> {
        Self::new(SelectorKind::Id, value)
    }

    pub fn class(value: impl AsRef<str>) -> Result<Self, CaptureError> {
        Self::new(SelectorKind::Class, value)
    }

    pub fn tag(value: impl AsRef<str>) -> Result<Self, CaptureError> {
        Self::new(SelectorKind::Tag, value)
    }

    pub fn xpath(value: impl AsRef<str>) -> Result<Self, CaptureError> {
        Self::new(SelectorKind::XPath, value)
    }

    pub fn is_valid(&self) -> bool {
        self.kind.accepts(&self.value)
    }

    /// Trimmed copy of the contract; an empty value becomes the default contract.
    pub fn normalized(&self) -> SelectorContract {
        let value = self.value.trim();
        if value.is_empty() {
            return SelectorContract::default();
        }
        SelectorContract {
            kind: self.kind,
            value: value.to_string(),
        }
    }

    /// Render in the legacy string form: `#id`, `.class`, bare tag or the raw xpath.
    pub fn to_legacy_string(&self) -> String {
        match self.kind {
            SelectorKind::Id => format!("#{}", self.value),
            SelectorKind::Class => format!(".{}", self.value),
            SelectorKind::Tag | SelectorKind::XPath => self.value.clone(),
        }
    }
}

impl fmt::Display for SelectorContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_legacy_string())
    }
}

/// A stored selector, either in the legacy string form or as a typed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    Legacy(String),
    Typed(SelectorContract),
}

impl Selector {
    /// Convert to a typed contract. Returns `None` when the stored value is unusable.
    pub fn into_contract(self) -> Option<SelectorContract> {
        match self {
            Selector::Legacy(s) => convert_legacy(&s),
            Selector::Typed(contract) => {
                let contract = SelectorContract {
                    kind: contract.kind,
                    value: contract.value.trim().to_string(),
                };
                contract.is_valid().then_some(contract)
            }
        }
    }

    /// Convert to a typed contract, falling back to the default `{id, content}`.
    pub fn resolve(self) -> SelectorContract {
        self.into_contract().unwrap_or_default()
    }
}

/// Convert a legacy string selector (`#id`, `.class` or a bare tag name).
pub fn convert_legacy(selector: &str) -> Option<SelectorContract> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }

    if let Some(id) = selector.strip_prefix('#') {
        if SelectorKind::Id.accepts(id) {
            return SelectorContract::id(id).ok();
        }
    }

    if let Some(class) = selector.strip_prefix('.') {
        if SelectorKind::Class.accepts(class) {
            return SelectorContract::class(class).ok();
        }
    }

    if SelectorKind::Tag.accepts(selector) {
        return SelectorContract::tag(selector).ok();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_contract() {
        let c = SelectorContract::default();
        assert_eq!(c.kind, SelectorKind::Id);
        assert_eq!(c.value, "content");
        assert_eq!(c.to_legacy_string(), "#content");
    }

    #[test]
    fn test_rejects_id_with_space() {
        let err = SelectorContract::id("bad id").unwrap_err();
        assert!(err.is_invalid_selector());
    }

    #[test]
    fn test_grammars() {
        assert!(SelectorKind::Id.accepts("main-content_2"));
        assert!(!SelectorKind::Id.accepts(""));
        assert!(!SelectorKind::Class.accepts("a.b"));
        assert!(SelectorKind::Tag.accepts("svg:rect"));
        assert!(SelectorKind::Tag.accepts("my-element"));
        assert!(!SelectorKind::Tag.accepts("1div"));
        assert!(SelectorKind::XPath.accepts("//main[@id='content']"));
        assert!(!SelectorKind::XPath.accepts("main"));
    }

    #[test]
    fn test_new_trims_value() {
        let c = SelectorContract::class("  site-main ").unwrap();
        assert_eq!(c.value, "site-main");
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("XPath".parse::<SelectorKind>().unwrap(), SelectorKind::XPath);
        assert_eq!(" class ".parse::<SelectorKind>().unwrap(), SelectorKind::Class);
        assert!("css".parse::<SelectorKind>().is_err());
    }

    #[test]
    fn test_convert_legacy() {
        assert_eq!(convert_legacy("#content"), Some(SelectorContract::id("content").unwrap()));
        assert_eq!(convert_legacy(".site-main"), Some(SelectorContract::class("site-main").unwrap()));
        assert_eq!(convert_legacy("main"), Some(SelectorContract::tag("main").unwrap()));
        assert_eq!(convert_legacy("#bad id"), None);
        assert_eq!(convert_legacy("div > p"), None);
        assert_eq!(convert_legacy("   "), None);
    }

    #[test]
    fn test_selector_resolve_falls_back_to_default() {
        let corrupt = Selector::Typed(SelectorContract {
            kind: SelectorKind::Class,
            value: "two words".to_string(),
        });
        assert_eq!(corrupt.resolve(), SelectorContract::default());
        assert_eq!(
            Selector::Legacy(".entry".to_string()).resolve(),
            SelectorContract::class("entry").unwrap()
        );
    }

    #[test]
    fn test_serde_shapes() {
        let typed: Selector = serde_json::from_str(r#"{"type":"xpath","value":"//main"}"#).unwrap();
        assert_eq!(typed.resolve(), SelectorContract::xpath("//main").unwrap());

        let legacy: Selector = serde_json::from_str(r##""#content""##).unwrap();
        assert_eq!(legacy, Selector::Legacy("#content".to_string()));

        let json = serde_json::to_string(&SelectorContract::tag("article").unwrap()).unwrap();
        assert_eq!(json, r#"{"type":"tag","value":"article"}"#);
    }

    #[test]
    fn test_normalized_empty_becomes_default() {
        let blank = SelectorContract {
            kind: SelectorKind::Tag,
            value: "   ".to_string(),
        };
        assert_eq!(blank.normalized(), SelectorContract::default());
    }
}
