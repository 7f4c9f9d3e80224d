//! Music collection pages (`music.douban.com/people/<id>/<bucket>`)

use crate::extract::markup::{
    before_slash, first_attr, first_class, first_text, has_no_class, next_link, select_all,
    select_first, subject_id, text_of,
};
use crate::extract::{extract_with_shapes, ExtractError, ExtractionStrategy, ItemShape};
use crate::model::{Bucket, MediaType, Record};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;
use url::Url;

const SHAPES: [ItemShape; 1] = [ItemShape {
    name: "grid",
    container: "div.item",
    parse: parse_music_item,
}];

const NEXT_SELECTORS: [&str; 2] = ["span.next a", "a.next"];

pub struct MusicStrategy {
    base: Url,
}

impl MusicStrategy {
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

impl ExtractionStrategy for MusicStrategy {
    fn media_type(&self) -> MediaType {
        MediaType::Music
    }

    fn extract_records(&self, page: &Html, bucket: Bucket) -> Vec<Record> {
        extract_with_shapes(page, &SHAPES, MediaType::Music, bucket)
    }

    fn next_page_url(&self, page: &Html) -> Option<Url> {
        next_link(page, &NEXT_SELECTORS, &self.base)
    }
}

/// Music ratings use `rating<N>` on the first class, with or without `-t`
fn music_rating(item: ElementRef<'_>) -> String {
    static RATING_RE: OnceLock<Regex> = OnceLock::new();
    let rating_re = RATING_RE.get_or_init(|| Regex::new(r"rating(\d+)").unwrap());

    select_first(item, r#"span[class^="rating"]"#)
        .and_then(first_class)
        .and_then(|class| rating_re.captures(class))
        .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
        .unwrap_or_default()
}

/// The comment is the trailing unclassed `<li>` of the info block, unless
/// that line is the date/rating line
fn music_comment(info: ElementRef<'_>) -> String {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    let date_re = DATE_RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());

    let Some(last) = select_all(info, "li").pop() else {
        return String::new();
    };
    if !has_no_class(last) {
        return String::new();
    }

    let text = text_of(last);
    if date_re.is_match(&text) {
        String::new()
    } else {
        text
    }
}

fn parse_music_item(item: ElementRef<'_>, bucket: Bucket) -> Result<Record, ExtractError> {
    let info = select_first(item, ".info").ok_or(ExtractError::MissingElement(".info"))?;

    let title = select_first(info, "a em")
        .or_else(|| select_first(info, "a"))
        .map(text_of)
        .unwrap_or_default();
    let detail_url = first_attr(info, "a", "href");
    if title.is_empty() && detail_url.is_empty() {
        return Err(ExtractError::NoTitleOrLink);
    }

    let intro = first_text(info, "li.intro");

    Ok(Record {
        external_id: subject_id(&detail_url),
        title,
        cover_url: first_attr(item, "img", "src"),
        rating: music_rating(item),
        comment: music_comment(info),
        artist: Some(before_slash(&intro)),
        info: Some(intro),
        ..Record::empty(MediaType::Music, bucket)
    })
}
