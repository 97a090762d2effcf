// ABOUTME: Compiles a SelectorContract into a structured tree query and runs it on a parsed document.
// ABOUTME: id/class/tag become element predicates; xpath compiles through the XPath subset.

use scraper::{ElementRef, Html};

use crate::error::CaptureError;
use crate::selector::contract::{SelectorContract, SelectorKind};
use crate::selector::xpath::XPath;

/// A compiled selector, ready to run against a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Elements whose `id` attribute equals the value exactly.
    Id(String),
    /// Elements whose class list contains the value as a whole token.
    Class(String),
    /// Elements with this tag name, compared case-insensitively.
    Tag(String),
    Path(XPath),
}

impl Query {
    /// Compile a contract. Values failing their kind's grammar are rejected, never defaulted.
    pub fn compile(contract: &SelectorContract) -> Result<Self, CaptureError> {
        if !contract.is_valid() {
            return Err(CaptureError::invalid_selector(
                contract.to_legacy_string(),
                "Compile",
                Some(anyhow::anyhow!(
                    "value does not match the {} selector grammar",
                    contract.kind
                )),
            ));
        }

        let value = contract.value.clone();
        Ok(match contract.kind {
            SelectorKind::Id => Query::Id(value),
            SelectorKind::Class => Query::Class(value),
            SelectorKind::Tag => Query::Tag(value.to_ascii_lowercase()),
            SelectorKind::XPath => Query::Path(XPath::parse(&value)?),
        })
    }

    /// All matching elements in document order.
    pub fn select<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        match self {
            Query::Path(xpath) => xpath.select(doc),
            _ => doc
                .tree
                .root()
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(|el| self.matches(el))
                .collect(),
        }
    }

    fn matches(&self, el: &ElementRef) -> bool {
        let element = el.value();
        match self {
            Query::Id(id) => element.attr("id") == Some(id.as_str()),
            Query::Class(class) => element
                .attr("class")
                .map(|list| list.split_ascii_whitespace().any(|token| token == class))
                .unwrap_or(false),
            Query::Tag(tag) => element.name().eq_ignore_ascii_case(tag),
            Query::Path(_) => false,
        }
    }
}
