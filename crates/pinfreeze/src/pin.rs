// ABOUTME: Pin state for blocks and whole posts: render-time replacement and save-time sanitisation.
// ABOUTME: Saving a post pin stores the HTML and records a snapshot through the history layer.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::formats::{sanitize_for_user, sanitize_html};
use crate::history::{History, HistoryError, Snapshot, SnapshotStore};

/// Block attribute flagging a pinned block.
pub const PINNED_ATTR: &str = "wppf_is_pinned";
/// Block attribute carrying the pinned HTML.
pub const HTML_ATTR: &str = "wppf_html";

/// Boolean coercion used for request and attribute values.
///
/// `null`, `false`, `0`, `""`, `"0"` and `"false"` (any case) are false. Other
/// strings, non-zero numbers, non-empty arrays and objects are true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn pinned_html(attrs: &Map<String, Value>) -> Option<&str> {
    if !attrs.get(PINNED_ATTR).is_some_and(is_truthy) {
        return None;
    }
    match attrs.get(HTML_ATTR) {
        Some(Value::String(html)) if !html.trim().is_empty() => Some(html),
        _ => None,
    }
}

/// Replace a block's rendered output with its pinned HTML.
///
/// Unpinned blocks, or pinned blocks without stored HTML, render unchanged.
pub fn render_pinned_block<'a>(
    rendered: &'a str,
    attrs: &'a Map<String, Value>,
    allow_unfiltered_html: bool,
) -> Cow<'a, str> {
    match pinned_html(attrs) {
        Some(html) => sanitize_for_user(html, allow_unfiltered_html),
        None => Cow::Borrowed(rendered),
    }
}

/// Whole-post pin state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPin {
    pub is_pinned: bool,
    pub html: String,
}

impl PostPin {
    /// Post content to display: the pinned HTML when pinned and non-blank, `content` otherwise.
    pub fn render<'a>(&'a self, content: &'a str, allow_unfiltered_html: bool) -> Cow<'a, str> {
        if !self.is_pinned || self.html.trim().is_empty() {
            return Cow::Borrowed(content);
        }
        sanitize_for_user(&self.html, allow_unfiltered_html)
    }

    pub fn unpin(&mut self) {
        self.is_pinned = false;
        self.html.clear();
    }
}

/// A parsed editor block. Unknown fields are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "blockName", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attrs: Map<String, Value>,
    #[serde(rename = "innerBlocks", default)]
    pub inner_blocks: Vec<Block>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Sanitise the stored HTML of every pinned block, nested blocks included.
pub fn sanitize_pinned_blocks(blocks: &mut [Block]) {
    for block in blocks.iter_mut() {
        if block.attrs.get(PINNED_ATTR).is_some_and(is_truthy) {
            if let Some(html) = block.attrs.get_mut(HTML_ATTR) {
                let raw = match &*html {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                *html = Value::String(sanitize_html(&raw));
            }
        }
        sanitize_pinned_blocks(&mut block.inner_blocks);
    }
}

/// A request to store a post pin.
#[derive(Debug, Clone)]
pub struct PinUpdate {
    pub parent_id: u64,
    pub parent_title: String,
    pub author_id: u64,
    pub html: String,
    pub is_pinned: bool,
    pub skip_snapshot: bool,
    pub allow_unfiltered_html: bool,
}

/// Store pin state and HTML, then snapshot it unless `skip_snapshot` is set.
///
/// The pin is updated before the snapshot is attempted, so a failed snapshot
/// still leaves the new pin in place.
pub fn save_post_pin<S: SnapshotStore>(
    pin: &mut PostPin,
    update: PinUpdate,
    history: &mut History<S>,
) -> Result<Option<Snapshot>, HistoryError> {
    let html = sanitize_for_user(&update.html, update.allow_unfiltered_html).into_owned();
    pin.is_pinned = update.is_pinned;
    pin.html = html;

    if update.skip_snapshot {
        tracing::debug!(parent_id = update.parent_id, "pin updated without snapshot");
        return Ok(None);
    }

    let snapshot = history.create_snapshot(
        update.parent_id,
        &update.parent_title,
        &pin.html,
        update.author_id,
    )?;
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemorySnapshotStore;
    use serde_json::json;

    fn attrs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("attrs must be an object"),
        }
    }

    fn update(html: &str) -> PinUpdate {
        PinUpdate {
            parent_id: 12,
            parent_title: "Landing".to_string(),
            author_id: 3,
            html: html.to_string(),
            is_pinned: true,
            skip_snapshot: false,
            allow_unfiltered_html: true,
        }
    }

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(""), json!("0"), json!("FALSE")] {
            assert!(!is_truthy(&falsy), "{falsy} should be false");
        }
        for truthy in [json!(true), json!(1), json!("1"), json!("true"), json!("yes")] {
            assert!(is_truthy(&truthy), "{truthy} should be true");
        }
    }

    #[test]
    fn test_render_pinned_block() {
        let pinned = attrs(json!({"wppf_is_pinned": true, "wppf_html": "<p>frozen</p>"}));
        assert_eq!(render_pinned_block("<p>live</p>", &pinned, true), "<p>frozen</p>");

        let string_flag = attrs(json!({"wppf_is_pinned": "1", "wppf_html": "<p>frozen</p>"}));
        assert_eq!(render_pinned_block("<p>live</p>", &string_flag, true), "<p>frozen</p>");
    }

    #[test]
    fn test_render_unpinned_or_blank_block() {
        let off = attrs(json!({"wppf_is_pinned": "false", "wppf_html": "<p>frozen</p>"}));
        assert_eq!(render_pinned_block("<p>live</p>", &off, true), "<p>live</p>");

        let blank = attrs(json!({"wppf_is_pinned": true, "wppf_html": "   "}));
        assert_eq!(render_pinned_block("<p>live</p>", &blank, true), "<p>live</p>");

        assert_eq!(render_pinned_block("<p>live</p>", &Map::new(), true), "<p>live</p>");
    }

    #[test]
    fn test_render_pinned_block_sanitises_for_untrusted() {
        let pinned = attrs(json!({"wppf_is_pinned": true, "wppf_html": "<p>a</p><script>b</script>"}));
        assert_eq!(render_pinned_block("", &pinned, false), "<p>a</p>");
    }

    #[test]
    fn test_post_pin_render_and_unpin() {
        let mut pin = PostPin {
            is_pinned: true,
            html: "<main>static</main>".to_string(),
        };
        assert_eq!(pin.render("dynamic", true), "<main>static</main>");

        pin.unpin();
        assert_eq!(pin, PostPin::default());
        assert_eq!(pin.render("dynamic", true), "dynamic");
    }

    #[test]
    fn test_sanitize_pinned_blocks_recurses() {
        let mut blocks: Vec<Block> = serde_json::from_value(json!([
            {
                "blockName": "core/group",
                "attrs": {"wppf_is_pinned": true, "wppf_html": "<p onclick=\"x()\">outer</p>"},
                "innerBlocks": [
                    {
                        "blockName": "core/html",
                        "attrs": {"wppf_is_pinned": "1", "wppf_html": "<b>in</b><script>y</script>"},
                        "innerBlocks": []
                    },
                    {
                        "blockName": "core/html",
                        "attrs": {"wppf_html": "<script>untouched</script>"},
                        "innerBlocks": []
                    }
                ],
                "innerHTML": "<div></div>"
            }
        ]))
        .unwrap();

        sanitize_pinned_blocks(&mut blocks);

        assert_eq!(blocks[0].attrs[HTML_ATTR], json!("<p>outer</p>"));
        assert_eq!(blocks[0].inner_blocks[0].attrs[HTML_ATTR], json!("<b>in</b>"));
        assert_eq!(
            blocks[0].inner_blocks[1].attrs[HTML_ATTR],
            json!("<script>untouched</script>")
        );
        assert_eq!(blocks[0].rest["innerHTML"], json!("<div></div>"));
    }

    #[test]
    fn test_save_post_pin_creates_snapshot() {
        let mut history = History::new(MemorySnapshotStore::new(), 10);
        let mut pin = PostPin::default();

        let snap = save_post_pin(&mut pin, update("<p>v1</p>"), &mut history)
            .unwrap()
            .unwrap();
        assert!(pin.is_pinned);
        assert_eq!(pin.html, "<p>v1</p>");
        assert_eq!(snap.html, "<p>v1</p>");
        assert_eq!(snap.parent_id, 12);
    }

    #[test]
    fn test_save_post_pin_skip_snapshot() {
        let mut history = History::new(MemorySnapshotStore::new(), 10);
        let mut pin = PostPin::default();
        let mut req = update("<p>v2</p>");
        req.skip_snapshot = true;
        req.allow_unfiltered_html = false;
        req.html.push_str("<script>z</script>");

        assert!(save_post_pin(&mut pin, req, &mut history).unwrap().is_none());
        assert_eq!(pin.html, "<p>v2</p>");
        assert!(history.snapshots(12).is_empty());
    }

    #[test]
    fn test_save_post_pin_invalid_parent_keeps_pin() {
        let mut history = History::new(MemorySnapshotStore::new(), 10);
        let mut pin = PostPin::default();
        let mut req = update("<p>v3</p>");
        req.parent_id = 0;

        assert!(save_post_pin(&mut pin, req, &mut history).is_err());
        assert_eq!(pin.html, "<p>v3</p>");
    }
}
