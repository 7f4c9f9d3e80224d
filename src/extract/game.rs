//! Game collection pages (`www.douban.com/people/<id>/games?action=<bucket>`)

use crate::extract::markup::{
    before_slash, first_attr, first_text, next_link, select_first, subject_id, text_excluding,
    text_of,
};
use crate::extract::{extract_with_shapes, ExtractError, ExtractionStrategy, ItemShape};
use crate::model::{Bucket, MediaType, Record};
use scraper::{ElementRef, Html};
use url::Url;

const SHAPES: [ItemShape; 1] = [ItemShape {
    name: "common-item",
    container: "div.common-item",
    parse: parse_game_item,
}];

const NEXT_SELECTORS: [&str; 1] = ["span.next a"];

/// Blocks of `.info` that are not part of the user's comment
const NON_COMMENT_CLASSES: [&str; 3] = ["title", "desc", "rating-info"];

pub struct GameStrategy {
    base: Url,
}

impl GameStrategy {
    /// `base` is the user's games page; pagination links on it are bare
    /// query strings such as `?action=wish&start=15`
    pub fn new(base: Url) -> Self {
        Self { base }
    }
}

impl ExtractionStrategy for GameStrategy {
    fn media_type(&self) -> MediaType {
        MediaType::Game
    }

    fn extract_records(&self, page: &Html, bucket: Bucket) -> Vec<Record> {
        extract_with_shapes(page, &SHAPES, MediaType::Game, bucket)
    }

    fn next_page_url(&self, page: &Html) -> Option<Url> {
        next_link(page, &NEXT_SELECTORS, &self.base)
    }
}

/// Game stars are `allstarNN` on a 10–50 scale; a two-digit suffix is divided
/// by ten. When no usable class is present the element's `title` is kept as is.
fn game_rating(item: ElementRef<'_>) -> String {
    let Some(stars) = select_first(item, r#"span[class^="allstar"]"#)
        .or_else(|| select_first(item, "span.rating-star"))
    else {
        return String::new();
    };

    let mut rating = String::new();
    let allstar = stars
        .value()
        .attr("class")
        .unwrap_or_default()
        .split_whitespace()
        .find_map(|class| class.strip_prefix("allstar"));

    if let Some(value) = allstar {
        if value.chars().count() == 2 {
            if let Ok(stars) = value.parse::<u32>() {
                rating = (stars / 10).to_string();
            }
        }
    }

    if rating.is_empty() {
        if let Some(title) = stars.value().attr("title") {
            rating = title.trim().to_string();
        }
    }

    rating
}

fn parse_game_item(item: ElementRef<'_>, bucket: Bucket) -> Result<Record, ExtractError> {
    let link = select_first(item, ".title a");
    let title = link.map(text_of).unwrap_or_default();
    let detail_url = link
        .and_then(|a| a.value().attr("href"))
        .unwrap_or_default()
        .trim()
        .to_string();
    if title.is_empty() && detail_url.is_empty() {
        return Err(ExtractError::NoTitleOrLink);
    }

    // "2021-03-04 / Switch / RPG": the date leads the description line
    let desc = first_text(item, ".desc");
    let comment = select_first(item, ".info")
        .map(|info| text_excluding(info, &NON_COMMENT_CLASSES))
        .unwrap_or_default();

    Ok(Record {
        external_id: subject_id(&detail_url),
        title,
        cover_url: first_attr(item, "img", "src"),
        rating: game_rating(item),
        comment,
        date: before_slash(&desc),
        info: Some(desc),
        ..Record::empty(MediaType::Game, bucket)
    })
}
