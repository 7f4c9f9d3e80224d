//! Book collection pages (`book.douban.com/people/<id>/<bucket>`)

use crate::extract::markup::{
    first_attr, first_class, first_text, next_link, select_first, subject_id, text_of,
};
use crate::extract::{extract_with_shapes, ExtractError, ExtractionStrategy, ItemShape};
use crate::model::{Bucket, MediaType, Record};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;
use url::Url;

/// Current list view, then the older grid layout. Both carry the same
/// fields, only the container differs.
const SHAPES: [ItemShape; 2] = [
    ItemShape {
        name: "subject-item",
        container: "li.subject-item",
        parse: parse_book_item,
    },
    ItemShape {
        name: "grid",
        container: "div.item",
        parse: parse_book_item,
    },
];

const NEXT_SELECTORS: [&str; 2] = ["span.next a", "a.next"];

pub struct BookStrategy {
    base: Url,
}

impl BookStrategy {
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

impl ExtractionStrategy for BookStrategy {
    fn media_type(&self) -> MediaType {
        MediaType::Book
    }

    fn extract_records(&self, page: &Html, bucket: Bucket) -> Vec<Record> {
        extract_with_shapes(page, &SHAPES, MediaType::Book, bucket)
    }

    fn next_page_url(&self, page: &Html) -> Option<Url> {
        next_link(page, &NEXT_SELECTORS, &self.base)
    }
}

/// Title and detail link: `div.info h2 a` on current pages, `span.title`
/// plus the first link on older ones
fn title_and_link(item: ElementRef<'_>) -> (String, String) {
    if let Some(link) = select_first(item, "div.info h2 a") {
        let title = text_of(link);
        if !title.is_empty() {
            let href = link.value().attr("href").unwrap_or_default().trim();
            return (title, href.to_string());
        }
    }

    match select_first(item, "span.title") {
        Some(title) => (text_of(title), first_attr(item, "a[href]", "href")),
        None => (String::new(), String::new()),
    }
}

fn book_rating(item: ElementRef<'_>) -> String {
    static RATING_RE: OnceLock<Regex> = OnceLock::new();
    let rating_re = RATING_RE.get_or_init(|| Regex::new(r"rating(\d+)-t").unwrap());

    select_first(item, r#"[class^="rating"][class*="-t"]"#)
        .and_then(first_class)
        .and_then(|class| rating_re.captures(class))
        .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
        .unwrap_or_default()
}

fn parse_book_item(item: ElementRef<'_>, bucket: Bucket) -> Result<Record, ExtractError> {
    let (title, detail_url) = title_and_link(item);
    if title.is_empty() && detail_url.is_empty() {
        return Err(ExtractError::NoTitleOrLink);
    }

    // Author, translator and publisher share one line
    let author = select_first(item, "div.pub")
        .map(text_of)
        .unwrap_or_else(|| first_text(item, "span.author"));

    Ok(Record {
        external_id: subject_id(&detail_url),
        title,
        cover_url: first_attr(item, "img", "src"),
        rating: book_rating(item),
        comment: first_text(item, "p.comment"),
        date: first_text(item, "span.date"),
        author: Some(author),
        ..Record::empty(MediaType::Book, bucket)
    })
}
