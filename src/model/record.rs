use crate::model::{Bucket, MediaType};
use serde::{Deserialize, Serialize};

/// One tracked item extracted from a collection page
///
/// String fields whose markup was missing are empty, never absent. The
/// type-specific fields are `None` for media types that do not carry them
/// and are left out of the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Site-assigned subject identifier (empty if the detail URL had none)
    #[serde(rename = "douban_id")]
    pub external_id: String,

    pub title: String,

    #[serde(rename = "cover")]
    pub cover_url: String,

    /// Star rating as a string, empty when unrated
    pub rating: String,

    pub comment: String,

    /// Site-formatted date, empty when not shown
    pub date: String,

    #[serde(rename = "type")]
    pub media_type: MediaType,

    /// Localized status name of the bucket the item was found in
    #[serde(rename = "collection")]
    pub collection_label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl Record {
    /// An empty record for `media_type` found in `bucket`
    pub fn empty(media_type: MediaType, bucket: Bucket) -> Self {
        Self {
            external_id: String::new(),
            title: String::new(),
            cover_url: String::new(),
            rating: String::new(),
            comment: String::new(),
            date: String::new(),
            media_type,
            collection_label: bucket.label.to_string(),
            author: None,
            artist: None,
            tags: None,
            info: None,
        }
    }
}
