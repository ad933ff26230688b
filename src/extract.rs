//! Unsubscribe link extraction from HTML bodies.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

const NEEDLE: &str = "unsubscribe";

/// Return the `href` of every anchor whose target contains "unsubscribe"
/// (case-insensitive), in document order. Duplicates are kept; link text is
/// not considered. Malformed markup never fails, it just yields fewer links.
pub fn extract_unsubscribe_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| is_unsubscribe_href(href))
        .map(str::to_string)
        .collect()
}

/// Case-insensitive substring match on the link target.
pub fn is_unsubscribe_href(href: &str) -> bool {
    href.to_lowercase().contains(NEEDLE)
}
