// ABOUTME: HTML sanitisation for pinned content written or rendered by users without unfiltered HTML.
// ABOUTME: Applies an ammonia policy modelled on the usual "post content" allow-list.

//! Output sanitisation.
//!
//! Captured markup is returned verbatim to trusted users. Everyone else gets
//! it through [`sanitize_html`], which keeps structural and inline formatting
//! tags and drops scripts, event handlers and unknown URL schemes.

use std::borrow::Cow;

const POST_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "audio", "b", "blockquote", "br", "caption",
    "cite", "code", "col", "colgroup", "dd", "del", "details", "div", "dl", "dt", "em",
    "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "i",
    "img", "ins", "kbd", "li", "main", "mark", "nav", "ol", "p", "picture", "pre", "q", "s",
    "section", "small", "source", "span", "strong", "sub", "summary", "sup", "table", "tbody",
    "td", "tfoot", "th", "thead", "time", "tr", "u", "ul", "video",
];

const GENERIC_ATTRS: &[&str] = &["class", "id", "title", "lang", "dir", "role", "aria-label"];

/// Sanitise HTML with the post-content policy.
pub fn sanitize_html(html: &str) -> String {
    let mut builder = ammonia::Builder::new();
    builder.tags(POST_TAGS.iter().copied().collect());
    builder.generic_attributes(GENERIC_ATTRS.iter().copied().collect());

    builder.add_tag_attributes("a", &["href", "target", "rel"]);
    builder.link_rel(None);
    builder.add_tag_attributes("img", &["src", "alt", "width", "height", "srcset", "sizes", "loading"]);
    builder.add_tag_attributes("source", &["src", "srcset", "type", "media"]);
    builder.add_tag_attributes("video", &["src", "poster", "controls", "width", "height"]);
    builder.add_tag_attributes("audio", &["src", "controls"]);
    builder.add_tag_attributes("time", &["datetime"]);
    builder.add_tag_attributes("td", &["colspan", "rowspan"]);
    builder.add_tag_attributes("th", &["colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("ol", &["start", "reversed"]);

    builder
        .url_schemes(["http", "https", "mailto", "tel"].iter().copied().collect())
        .clean(html)
        .to_string()
}

/// Return `html` untouched for trusted users, sanitised otherwise.
pub fn sanitize_for_user(html: &str, allow_unfiltered_html: bool) -> Cow<'_, str> {
    if allow_unfiltered_html {
        Cow::Borrowed(html)
    } else {
        Cow::Owned(sanitize_html(html))
    }
}
