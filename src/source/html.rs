//! Post identifiers from saved profile pages

use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::Path;

lazy_static! {
    /// `/p/<id>/` or `/reel/<id>/` with an 11-character identifier
    static ref POST_LINK: Regex = Regex::new(
        r"/(?:p|reel)/([A-Za-z0-9_-]{11})/"
    ).unwrap();
}

/// Extracts post shortcodes from the markup of a saved profile page
///
/// The raw markup is scanned first, so identifiers keep the order they
/// appear in the page, including links embedded in scripts or JSON blobs.
/// Anchors are then parsed to pick up links whose `href` is entity-encoded
/// and invisible to the raw scan; those are appended. No duplicates.
///
/// ```
/// use reel_sift::source::extract_shortcodes_from_html;
///
/// let html = r#"<a href="/p/AAAAAAAAAAA/">one</a><a href="/reel/BBBBBBBBBBB/">two</a>"#;
/// assert_eq!(extract_shortcodes_from_html(html), vec!["AAAAAAAAAAA", "BBBBBBBBBBB"]);
/// ```
pub fn extract_shortcodes_from_html(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut shortcodes = Vec::new();
    let mut push = |code: &str| {
        if seen.insert(code.to_string()) {
            shortcodes.push(code.to_string());
        }
    };

    for captures in POST_LINK.captures_iter(html) {
        push(&captures[1]);
    }

    let document = Html::parse_document(html);
    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                for captures in POST_LINK.captures_iter(href) {
                    push(&captures[1]);
                }
            }
        }
    }

    shortcodes
}

/// Reads shortcodes from a file
///
/// A JSON array of strings is taken as-is (blank entries dropped, duplicates
/// removed); anything else is treated as a saved HTML page.
pub fn load_shortcodes(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);

    if let Ok(codes) = serde_json::from_str::<Vec<String>>(&text) {
        let mut seen = HashSet::new();
        let codes: Vec<String> = codes
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty() && seen.insert(c.clone()))
            .collect();
        tracing::info!("Loaded {} shortcodes from {}", codes.len(), path.display());
        return Ok(codes);
    }

    let codes = extract_shortcodes_from_html(&text);
    tracing::info!(
        "Extracted {} unique shortcodes from {}",
        codes.len(),
        path.display()
    );
    Ok(codes)
}
