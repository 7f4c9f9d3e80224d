//! Media types and their status buckets
//!
//! Every media type exposes exactly three buckets. The bucket code is what
//! the site uses in collection URLs; the label is the localized status name
//! stored on each record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A status bucket of one media type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bucket {
    /// URL code, e.g. `wish`, `collect`, `do`, `reading`
    pub code: &'static str,

    /// Localized human-readable status name
    pub label: &'static str,
}

const MOVIE_BUCKETS: [Bucket; 3] = [
    Bucket { code: "wish", label: "想看" },
    Bucket { code: "collect", label: "看过" },
    Bucket { code: "do", label: "在看" },
];

const BOOK_BUCKETS: [Bucket; 3] = [
    Bucket { code: "wish", label: "想读" },
    Bucket { code: "collect", label: "已读" },
    Bucket { code: "reading", label: "在读" },
];

const MUSIC_BUCKETS: [Bucket; 3] = [
    Bucket { code: "wish", label: "想听" },
    Bucket { code: "collect", label: "听过" },
    Bucket { code: "do", label: "在听" },
];

const GAME_BUCKETS: [Bucket; 3] = [
    Bucket { code: "wish", label: "想玩" },
    Bucket { code: "collect", label: "玩过" },
    Bucket { code: "do", label: "在玩" },
];

/// The kind of item a collection tracks
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[value(alias = "movies")]
    Movie,
    #[value(alias = "books")]
    Book,
    Music,
    #[value(alias = "games")]
    Game,
}

impl MediaType {
    /// All media types in backup order
    pub const ALL: [MediaType; 4] = [
        MediaType::Movie,
        MediaType::Book,
        MediaType::Music,
        MediaType::Game,
    ];

    /// The three status buckets of this media type, in crawl order
    pub fn buckets(&self) -> &'static [Bucket; 3] {
        match self {
            Self::Movie => &MOVIE_BUCKETS,
            Self::Book => &BOOK_BUCKETS,
            Self::Music => &MUSIC_BUCKETS,
            Self::Game => &GAME_BUCKETS,
        }
    }

    /// Looks up a bucket by its URL code
    pub fn bucket(&self, code: &str) -> Option<Bucket> {
        self.buckets().iter().copied().find(|b| b.code == code)
    }

    /// Singular type name stored on records (`movie`, `book`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Book => "book",
            Self::Music => "music",
            Self::Game => "game",
        }
    }

    /// Key used in the exported JSON and the `category` column
    pub fn export_key(&self) -> &'static str {
        match self {
            Self::Movie => "movies",
            Self::Book => "books",
            Self::Music => "music",
            Self::Game => "games",
        }
    }

    /// Parses an export key back into a media type
    pub fn from_export_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.export_key() == key)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
