//! Unsubscribe link extraction from HTML bodies

use regex::Regex;
use std::sync::LazyLock;

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>(.*?)</a\s*>"#)
        .unwrap()
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Find an unsubscribe URL in an HTML body
///
/// The first anchor whose visible text mentions "unsubscribe" wins; failing
/// that, the first anchor whose href does.
pub fn find_unsubscribe_link(html: Option<&str>) -> Option<String> {
    let html = html?;

    let anchors: Vec<(String, String)> = ANCHOR
        .captures_iter(html)
        .filter_map(|caps| {
            let href = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
            if href.is_empty() {
                return None;
            }
            let text = caps.get(3).map_or("", |m| m.as_str());
            let text = TAG.replace_all(text, "").to_lowercase();
            Some((href.to_string(), text))
        })
        .collect();

    anchors
        .iter()
        .find(|(_, text)| text.contains("unsubscribe"))
        .or_else(|| {
            anchors
                .iter()
                .find(|(href, _)| href.to_lowercase().contains("unsubscribe"))
        })
        .map(|(href, _)| href.clone())
}
