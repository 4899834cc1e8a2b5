//! Turning feed markup into a plain-text post
//!
//! The steps always run in this order:
//! [`sanitize`] → [`linkify`] → [`decode_entities`] → [`collapse_whitespace`]
//! → [`truncate`].

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use ammonia::{Builder, UrlRelative};
use regex::Regex;

/// Longest post we submit; stays under the common 500 character limit
pub const MAX_POST_LENGTH: usize = 450;

const ELLIPSIS: &str = "...";

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href="([^"\s]+)">([^<]*)</a>"#).expect("Invalid anchor regex")
});

// Anchors whose href was removed carry no link any more
static BARE_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<a>([^<]*)</a>").expect("Invalid bare anchor regex"));

// The escapes the sanitizer's serializer produces
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(amp|lt|gt|quot|apos|#39|nbsp);").expect("Invalid entity regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Strip all markup except `<a href>` with a parseable mailto/http/https URL
pub fn sanitize(text: &str) -> String {
    let tags = HashSet::from(["a"]);
    let tag_attributes = HashMap::from([("a", HashSet::from(["href"]))]);
    let schemes = HashSet::from(["mailto", "http", "https"]);

    let cleaned = Builder::default()
        .tags(tags)
        .tag_attributes(tag_attributes)
        .generic_attributes(HashSet::new())
        .url_schemes(schemes)
        .url_relative(UrlRelative::Deny)
        .link_rel(None)
        .clean(text)
        .to_string();

    BARE_ANCHOR_RE.replace_all(&cleaned, "$1").into_owned()
}

/// Rewrite `<a href="URL">LABEL</a>` as `URL - LABEL`
pub fn linkify(text: &str) -> String {
    ANCHOR_RE.replace_all(text, "$1 - $2").into_owned()
}

/// Turn HTML escapes back into the characters they stand for.
///
/// Runs once over the text, so `&amp;lt;` becomes `&lt;` and not `<`.
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| match &caps[1] {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            "apos" | "#39" => "'",
            _ => " ",
        })
        .into_owned()
}

/// Trim the ends and fold every whitespace run into one space
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Cut text longer than `max_len` characters to `max_len - 4` characters plus `...`
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let keep = max_len.saturating_sub(ELLIPSIS.len() + 1);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Full pipeline applied to the selected item text before posting
pub fn normalize(text: &str) -> String {
    let text = sanitize(text);
    let text = linkify(&text);
    let text = decode_entities(&text);
    let text = collapse_whitespace(&text);
    truncate(&text, MAX_POST_LENGTH)
}
