//! Per-media-type extraction of collection pages
//!
//! Each media type has an [`ExtractionStrategy`] that turns one parsed
//! collection page into records and finds the link to the following page.
//! The site has served several markup generations over the years and any
//! account can still get pages in any of them, so item containers are looked
//! up through an ordered list of [`ItemShape`]s: the first shape that matches
//! anything on the page wins.
//!
//! Strategies are pure: they never touch the network and never fail as a
//! whole. A malformed item is logged and skipped; a page with no recognised
//! items yields an empty list.

mod book;
mod game;
mod markup;
mod movie;
mod music;

pub use book::BookStrategy;
pub use game::GameStrategy;
pub use markup::subject_id;
pub use movie::MovieStrategy;
pub use music::MusicStrategy;

use crate::config::SiteConfig;
use crate::model::{Bucket, MediaType, Record};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Why a single item could not be turned into a record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("item has neither a title nor a detail link")]
    NoTitleOrLink,

    #[error("item is missing required element '{0}'")]
    MissingElement(&'static str),
}

/// Extraction capability of one media type
///
/// The crawl engine only knows this interface; everything that depends on
/// the markup of a particular collection lives behind it.
pub trait ExtractionStrategy: Send + Sync {
    /// The media type this strategy understands
    fn media_type(&self) -> MediaType;

    /// Extracts every recognisable item on `page`, in page order
    ///
    /// Items that fail to parse are logged and skipped. Never fails.
    fn extract_records(&self, page: &Html, bucket: Bucket) -> Vec<Record>;

    /// Returns the absolute URL of the next page, or `None` when the page
    /// has no recognised "next" link
    fn next_page_url(&self, page: &Html) -> Option<Url>;
}

/// Parses one item container into a record
pub type ItemParser = for<'a> fn(ElementRef<'a>, Bucket) -> Result<Record, ExtractError>;

/// One historical markup generation of a collection list
#[derive(Clone, Copy)]
pub struct ItemShape {
    /// Short name used in logs
    pub name: &'static str,

    /// CSS selector of the repeating item container
    pub container: &'static str,

    /// Field extraction for containers of this shape
    pub parse: ItemParser,
}

impl ItemShape {
    /// Returns the item containers of this shape, or `None` when the shape
    /// does not occur on the page
    pub fn find<'a>(&self, page: &'a Html) -> Option<Vec<ElementRef<'a>>> {
        let selector = Selector::parse(self.container).ok()?;
        let items: Vec<ElementRef<'a>> = page.select(&selector).collect();
        if items.is_empty() {
            None
        } else {
            Some(items)
        }
    }
}

/// Runs the shapes in order and parses the items of the first one that matches
pub fn extract_with_shapes(
    page: &Html,
    shapes: &[ItemShape],
    media_type: MediaType,
    bucket: Bucket,
) -> Vec<Record> {
    let Some((shape, items)) = shapes
        .iter()
        .find_map(|shape| shape.find(page).map(|items| (shape, items)))
    else {
        tracing::debug!("No known {} item layout found on page", media_type);
        return Vec::new();
    };

    tracing::trace!(
        "Matched {} layout '{}' with {} items",
        media_type,
        shape.name,
        items.len()
    );

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match (shape.parse)(item, bucket) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(
                "Skipping {} item #{} ({} layout): {}",
                media_type,
                index + 1,
                shape.name,
                e
            ),
        }
    }

    records
}

/// Builds the extraction strategy for `media_type`
///
/// Relative pagination links are resolved against the type's host; game
/// pagination links are bare query strings, so games resolve against the
/// user's games page instead.
pub fn strategy_for(
    media_type: MediaType,
    site: &SiteConfig,
    user_id: &str,
) -> Result<Box<dyn ExtractionStrategy>, url::ParseError> {
    let host = Url::parse(site.host_for(media_type))?;
    let strategy: Box<dyn ExtractionStrategy> = match media_type {
        MediaType::Movie => Box::new(MovieStrategy::new(host)),
        MediaType::Book => Box::new(BookStrategy::new(host)),
        MediaType::Music => Box::new(MusicStrategy::new(host)),
        MediaType::Game => {
            let games_page = Url::parse(&format!("{}/people/{}/games", site.www(), user_id))?;
            Box::new(GameStrategy::new(games_page))
        }
    };
    Ok(strategy)
}
