mod schema;

pub use schema::Database;

use crate::error::{AppError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// User account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Email for login (globally unique).
    pub email: String,
    /// Username for login (globally unique).
    pub username: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display nickname.
    pub nickname: String,
    /// Profile bio.
    pub bio: String,
    /// Consecutive failed login attempts since the last success.
    #[serde(skip_serializing)]
    pub login_attempts: i64,
    /// Timestamp of the last failed login attempt.
    #[serde(skip_serializing)]
    pub last_login_attempt: Option<i64>,
    /// Account creation timestamp.
    pub created_at: i64,
}

/// Image link variants from the external catalog. Each is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct BookImages {
    pub small_thumbnail: Option<String>,
    pub thumbnail: Option<String>,
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
    pub extra_large: Option<String>,
}

/// Cached book metadata (mirror of an external catalog record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// External catalog ID (stable, never generated locally).
    pub id: String,
    /// Book title.
    pub title: String,
    /// Ordered list of authors.
    pub authors: Vec<String>,
    /// Publisher.
    pub publisher: String,
    /// Publication date.
    pub published_date: Option<String>,
    /// Description.
    pub description: String,
    /// ISBN-13 identifier, or "N/A".
    pub isbn13: String,
    /// Page count (0 = unknown).
    pub page_count: i64,
    /// Categories.
    pub categories: Vec<String>,
    /// Language code, or "N/A".
    pub language: String,
    /// Cover image variants.
    pub images: BookImages,
}

/// Per-user reading state for a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerStatus {
    /// Wanted but not owned. Progress is always 0.
    #[serde(rename = "WISHLIST")]
    Wishlist,
    /// Owned.
    #[serde(rename = "POSSESSION")]
    Possession,
}

impl LedgerStatus {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Wishlist => "WISHLIST",
            LedgerStatus::Possession => "POSSESSION",
        }
    }

    /// Parse the stored or request string form.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "WISHLIST" => Ok(LedgerStatus::Wishlist),
            "POSSESSION" => Ok(LedgerStatus::Possession),
            _ => Err(AppError::BadRequest(
                "Invalid status. Must be one of: WISHLIST, POSSESSION".to_string(),
            )),
        }
    }
}

/// Library entry: one row per (user, book).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// User ID.
    pub user_id: i64,
    /// Book ID.
    pub book_id: String,
    /// Reading state.
    pub status: LedgerStatus,
    /// Current page (0 when unread or wishlisted).
    pub current_page: i64,
    /// When the book was added to the library.
    pub added_at: i64,
    /// Last state change.
    pub updated_at: i64,
}

/// Book joined with the caller's library state.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryBook {
    /// Cached book metadata.
    #[serde(flatten)]
    pub book: Book,
    /// Reading state.
    pub status: LedgerStatus,
    /// Current page.
    pub current_page: i64,
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}
