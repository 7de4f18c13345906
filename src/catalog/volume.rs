//! Wire shape of external catalog records and the transform into [`Book`].

use crate::db::{Book, BookImages};
use serde::Deserialize;

/// Search response envelope.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    /// Matching volumes; absent when nothing matched.
    pub items: Option<Vec<VolumeRecord>>,
}

/// One catalog record.
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeRecord {
    /// Catalog-assigned ID.
    pub id: String,
    /// Nested volume metadata.
    #[serde(default, rename = "volumeInfo")]
    pub volume_info: VolumeInfo,
}

/// Nested volume metadata. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct VolumeInfo {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub industry_identifiers: Option<Vec<IndustryIdentifier>>,
    pub page_count: Option<i64>,
    pub categories: Option<Vec<String>>,
    pub language: Option<String>,
    pub image_links: Option<ImageLinks>,
}

/// Identifier entry (ISBN-10, ISBN-13, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct IndustryIdentifier {
    /// Identifier kind, e.g. "ISBN_13".
    #[serde(rename = "type")]
    pub id_type: String,
    /// Identifier value.
    pub identifier: String,
}

/// Cover image variants as the catalog sends them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ImageLinks {
    pub small_thumbnail: Option<String>,
    pub thumbnail: Option<String>,
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
    pub extra_large: Option<String>,
}

impl Book {
    /// Transform a catalog record into a mirrored book, filling placeholders
    /// for everything the catalog omits.
    pub fn from_volume(record: VolumeRecord) -> Self {
        let info = record.volume_info;

        let isbn13 = info
            .industry_identifiers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|id| id.id_type == "ISBN_13")
            .map(|id| id.identifier.clone())
            .unwrap_or_else(|| "N/A".to_string());

        let images = info
            .image_links
            .map(|links| BookImages {
                small_thumbnail: links.small_thumbnail,
                thumbnail: links.thumbnail,
                small: links.small,
                medium: links.medium,
                large: links.large,
                extra_large: links.extra_large,
            })
            .unwrap_or_default();

        Book {
            id: record.id,
            title: info.title.unwrap_or_default(),
            authors: info
                .authors
                .unwrap_or_else(|| vec!["Unknown author".to_string()]),
            publisher: info
                .publisher
                .unwrap_or_else(|| "Unknown publisher".to_string()),
            published_date: info.published_date,
            description: info
                .description
                .unwrap_or_else(|| "No description available".to_string()),
            isbn13,
            page_count: info.page_count.unwrap_or(0),
            categories: info
                .categories
                .unwrap_or_else(|| vec!["Uncategorized".to_string()]),
            language: info.language.unwrap_or_else(|| "N/A".to_string()),
            images,
        }
    }
}
