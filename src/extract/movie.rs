//! Movie collection pages (`movie.douban.com/people/<id>/<bucket>`)

use crate::extract::markup::{
    clean_text, first_attr, first_class, first_text, next_link, select_first, subject_id,
    text_of,
};
use crate::extract::{extract_with_shapes, ExtractError, ExtractionStrategy, ItemShape};
use crate::model::{Bucket, MediaType, Record};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;
use url::Url;

/// Grid view first, then the legacy one-line list view
const SHAPES: [ItemShape; 2] = [
    ItemShape {
        name: "grid",
        container: "div.item",
        parse: parse_grid_item,
    },
    ItemShape {
        name: "list",
        container: "li.ll",
        parse: parse_list_item,
    },
];

const NEXT_SELECTORS: [&str; 2] = ["span.next a", "a.next"];

pub struct MovieStrategy {
    base: Url,
}

impl MovieStrategy {
    /// `base` is the movie host; relative pagination links resolve against it
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

impl ExtractionStrategy for MovieStrategy {
    fn media_type(&self) -> MediaType {
        MediaType::Movie
    }

    fn extract_records(&self, page: &Html, bucket: Bucket) -> Vec<Record> {
        extract_with_shapes(page, &SHAPES, MediaType::Movie, bucket)
    }

    fn next_page_url(&self, page: &Html) -> Option<Url> {
        next_link(page, &NEXT_SELECTORS, &self.base)
    }
}

/// Movie ratings are encoded as `rating<N>-t` on the first class
fn movie_rating(item: ElementRef<'_>, css: &str) -> String {
    static RATING_RE: OnceLock<Regex> = OnceLock::new();
    let rating_re = RATING_RE.get_or_init(|| Regex::new(r"rating(\d+)-t").unwrap());

    select_first(item, css)
        .and_then(first_class)
        .and_then(|class| rating_re.captures(class))
        .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
        .unwrap_or_default()
}

fn parse_grid_item(item: ElementRef<'_>, bucket: Bucket) -> Result<Record, ExtractError> {
    // Drop alternate titles and markers such as "[可播放]"
    let title = select_first(item, ".title a")
        .or_else(|| select_first(item, ".title"))
        .map(|el| {
            text_of(el)
                .split('/')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        })
        .unwrap_or_default();

    let detail_url = first_attr(item, "a[href]", "href");
    if title.is_empty() && detail_url.is_empty() {
        return Err(ExtractError::NoTitleOrLink);
    }

    let tags = first_text(item, "span.tags");
    let tags = tags
        .strip_prefix("标签:")
        .map(str::trim)
        .unwrap_or(&tags)
        .to_string();

    Ok(Record {
        external_id: subject_id(&detail_url),
        title,
        cover_url: first_attr(item, "img", "src"),
        rating: movie_rating(item, r#"[class^="rating"][class*="-t"]"#),
        comment: first_text(item, "span.comment"),
        date: first_text(item, "span.date"),
        tags: Some(tags),
        ..Record::empty(MediaType::Movie, bucket)
    })
}

fn parse_list_item(item: ElementRef<'_>, bucket: Bucket) -> Result<Record, ExtractError> {
    let title = clean_text(&first_text(item, "span.title"));
    let detail_url = first_attr(item, r#"a[href*="/subject/"]"#, "href");
    if title.is_empty() && detail_url.is_empty() {
        return Err(ExtractError::NoTitleOrLink);
    }

    Ok(Record {
        external_id: subject_id(&detail_url),
        title,
        cover_url: first_attr(item, "img", "src"),
        rating: movie_rating(item, r#"span[class^="rating"]"#),
        ..Record::empty(MediaType::Movie, bucket)
    })
}
