//! Pure helpers that turn raw feed fields into storable text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::transport::RawFeedItem;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static IMG_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img[^>]+src="([^">]+)""#).expect("valid img regex"));

/// Decoded in order, so `&amp;lt;` becomes `<`.
const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Pick a representative image for an item.
///
/// Sources are tried in priority order: media content, enclosure, thumbnail,
/// the first inline `<img>` in the content, then the same scan over the
/// encoded content.
pub fn extract_image_url(item: &RawFeedItem) -> Option<String> {
    let attached = [
        item.media_content_url.as_deref(),
        item.enclosure_url.as_deref(),
        item.thumbnail_url.as_deref(),
    ];

    attached
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .map(str::to_string)
        .or_else(|| item.content.as_deref().and_then(first_inline_image))
        .or_else(|| item.encoded_content.as_deref().and_then(first_inline_image))
}

fn first_inline_image(html: &str) -> Option<String> {
    IMG_SRC_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Strip markup, decode the common entities and trim.
pub fn clean_text(text: Option<&str>) -> String {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return String::new(),
    };

    let mut cleaned = TAG_RE.replace_all(text, "").into_owned();
    for (entity, replacement) in ENTITIES {
        cleaned = cleaned.replace(entity, replacement);
    }

    cleaned.trim().to_string()
}

/// Keep at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
