// ABOUTME: Extracts the inner HTML of every element matching a selector contract.
// ABOUTME: Pure function of (html, selector); distinguishes not-found from matched-but-empty.

//! Selector extraction.
//!
//! The extractor normalizes the contract, compiles it, parses the markup with
//! html5ever's tolerant tree builder and serializes the children of each match.
//! Matches are joined with `\n` in document order and the result is trimmed.

use scraper::Html;

use crate::error::CaptureError;
use crate::selector::{Query, SelectorContract};

/// Extract the concatenated inner HTML of all elements matching `selector`.
///
/// Errors:
/// - `invalid_selector` when the value fails its kind's grammar
/// - `parse_failed` when `html` is blank and no document can be built
/// - `selector_not_found` when nothing matches
/// - `selector_empty` when the matches hold no content after trimming
pub fn extract(html: &str, selector: &SelectorContract) -> Result<String, CaptureError> {
    let selector = selector.normalized();
    let label = selector.to_legacy_string();
    let query = Query::compile(&selector)?;

    let doc = parse_document(html)?;
    let matches = query.select(&doc);
    if matches.is_empty() {
        return Err(CaptureError::selector_not_found(label, "Extract"));
    }

    let chunks: Vec<String> = matches.iter().map(|el| el.inner_html()).collect();
    let joined = chunks.join("\n");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        return Err(CaptureError::selector_empty(label, "Extract"));
    }

    Ok(trimmed.to_string())
}

/// Parse markup as an HTML document. Parser errors are tolerated and dropped.
fn parse_document(html: &str) -> Result<Html, CaptureError> {
    if html.trim().is_empty() {
        return Err(CaptureError::parse_failed(
            "",
            "Extract",
            Some(anyhow::anyhow!("the document is empty")),
        ));
    }

    let doc = Html::parse_document(html);
    if !doc.errors.is_empty() {
        tracing::trace!(errors = doc.errors.len(), "tolerated HTML parse errors");
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::SelectorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_id_content() {
        let out = extract(
            r#"<div id="content">X</div>"#,
            &SelectorContract::default(),
        )
        .unwrap();
        assert_eq!(out, "X");
    }

    #[test]
    fn test_inner_html_excludes_own_tag() {
        let html = r#"<html><body><main id="content"><h1>Title</h1><p>Body <em>text</em></p></main></body></html>"#;
        let out = extract(html, &SelectorContract::id("content").unwrap()).unwrap();
        assert_eq!(out, "<h1>Title</h1><p>Body <em>text</em></p>");
    }

    #[test]
    fn test_class_matches_are_joined_in_order() {
        let html = r#"<div class="site-main">first</div><aside>x</aside><section class="wide site-main">second</section>"#;
        let out = extract(html, &SelectorContract::class("site-main").unwrap()).unwrap();
        assert_eq!(out, "first\nsecond");
    }

    #[test]
    fn test_not_found() {
        let err = extract("<div id=\"other\">x</div>", &SelectorContract::id("content").unwrap())
            .unwrap_err();
        assert!(err.is_selector_not_found());
        assert!(err.to_string().contains("#content"));
    }

    #[test]
    fn test_empty_match() {
        let err = extract(
            "<div id=\"content\">   \n </div>",
            &SelectorContract::id("content").unwrap(),
        )
        .unwrap_err();
        assert!(err.is_selector_empty());
    }

    #[test]
    fn test_invalid_selector_is_not_defaulted() {
        let bad = SelectorContract {
            kind: SelectorKind::Id,
            value: "bad id".to_string(),
        };
        let err = extract("<div id=\"content\">x</div>", &bad).unwrap_err();
        assert!(err.is_invalid_selector());
    }

    #[test]
    fn test_blank_selector_uses_default() {
        let blank = SelectorContract {
            kind: SelectorKind::Class,
            value: "  ".to_string(),
        };
        let out = extract("<div id=\"content\">fallback</div>", &blank).unwrap();
        assert_eq!(out, "fallback");
    }

    #[test]
    fn test_blank_document_is_parse_failure() {
        let err = extract("  \n ", &SelectorContract::default()).unwrap_err();
        assert!(err.is_parse_failed());
    }

    #[test]
    fn test_malformed_markup_is_tolerated() {
        let html = "<div id=\"content\"><p>unclosed <b>bold</div><span>";
        let out = extract(html, &SelectorContract::id("content").unwrap()).unwrap();
        assert!(out.starts_with("<p>unclosed <b>bold"));
    }

    #[test]
    fn test_tag_and_xpath() {
        let html = "<body><main><p>a</p></main><main><p>b</p></main></body>";
        let tag = extract(html, &SelectorContract::tag("MAIN").unwrap()).unwrap();
        assert_eq!(tag, "<p>a</p>\n<p>b</p>");

        let xpath = extract(html, &SelectorContract::xpath("//main[2]").unwrap());
        // Both <main> elements are children of <body>, so [2] picks the second.
        assert_eq!(xpath.unwrap(), "<p>b</p>");
    }

    #[test]
    fn test_idempotent() {
        let html = r#"<div class="a">1</div><div class="a">2</div>"#;
        let sel = SelectorContract::class("a").unwrap();
        assert_eq!(extract(html, &sel).unwrap(), extract(html, &sel).unwrap());
    }
}
