//! Small helpers for reading fields out of item containers
//!
//! Every helper resolves missing markup to an empty string or `None`;
//! none of them fail.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// First descendant of `scope` matching `css`
pub(crate) fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

/// All descendants of `scope` matching `css`, in document order
pub(crate) fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Text content with every text node trimmed and empty nodes dropped
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Text of the first match of `css` inside `scope`, or an empty string
pub(crate) fn first_text(scope: ElementRef<'_>, css: &str) -> String {
    select_first(scope, css).map(text_of).unwrap_or_default()
}

/// Attribute `attr` of the first match of `css` inside `scope`, or an empty string
pub(crate) fn first_attr(scope: ElementRef<'_>, css: &str, attr: &str) -> String {
    select_first(scope, css)
        .and_then(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// First token of the element's `class` attribute
pub(crate) fn first_class<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    element.value().attr("class")?.split_whitespace().next()
}

/// True when the element has no class attribute or an empty one
pub(crate) fn has_no_class(element: ElementRef<'_>) -> bool {
    element
        .value()
        .attr("class")
        .map_or(true, |classes| classes.trim().is_empty())
}

/// Text of `root` leaving out everything inside descendants carrying one of
/// `excluded_classes`
pub(crate) fn text_excluding(root: ElementRef<'_>, excluded_classes: &[&str]) -> String {
    let mut out = String::new();

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root.id())
            .filter_map(ElementRef::wrap)
            .any(|el| {
                el.value().attr("class").map_or(false, |classes| {
                    classes
                        .split_whitespace()
                        .any(|class| excluded_classes.contains(&class))
                })
            });

        if !hidden {
            out.push_str(text.trim());
        }
    }

    out
}

/// Text up to the first `/`, trimmed
pub(crate) fn before_slash(text: &str) -> String {
    text.split('/').next().unwrap_or_default().trim().to_string()
}

/// Collapses line breaks and tabs into spaces
pub(crate) fn clean_text(text: &str) -> String {
    text.trim().replace(['\n', '\t'], " ")
}

/// Extracts the numeric subject id from a detail URL
///
/// Returns an empty string when the URL has no `subject/<digits>` segment.
///
/// # Example
///
/// ```
/// use douban_backup::extract::subject_id;
///
/// assert_eq!(subject_id("https://movie.douban.com/subject/1292052/"), "1292052");
/// assert_eq!(subject_id("https://movie.douban.com/people/alice/"), "");
/// ```
pub fn subject_id(url: &str) -> String {
    static SUBJECT_RE: OnceLock<Regex> = OnceLock::new();
    let subject_re = SUBJECT_RE.get_or_init(|| Regex::new(r"subject/(\d+)").unwrap());

    subject_re
        .captures(url)
        .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
        .unwrap_or_default()
}

/// Finds the first element matching one of `selectors` (tried in order) and
/// resolves its `href` against `base`
pub(crate) fn next_link(page: &Html, selectors: &[&str], base: &Url) -> Option<Url> {
    let element = selectors.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        page.select(&selector).next()
    })?;

    let href = element.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }

    match base.join(href) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Ignoring unparseable next-page link '{}': {}", href, e);
            None
        }
    }
}
