//! Per-user library ledger.

use crate::db::{Database, LedgerStatus, LibraryBook};
use crate::error::{AppError, Result};
use crate::mirror::CatalogMirror;

/// Tracks which books a user has and how far along they are.
#[derive(Clone)]
pub struct LibraryService {
    db: Database,
    mirror: CatalogMirror,
}

impl LibraryService {
    /// Create a new library service.
    pub fn new(db: Database, mirror: CatalogMirror) -> Self {
        Self { db, mirror }
    }

    /// List the user's library. Books with no entry for this user are
    /// excluded entirely.
    pub fn list(&self, user_id: i64) -> Result<Vec<LibraryBook>> {
        self.db.list_library(user_id)
    }

    /// Add a book to the user's library, caching it locally on first
    /// reference.
    pub async fn add(
        &self,
        user_id: i64,
        book_id: &str,
        status: LedgerStatus,
        current_page: Option<i64>,
    ) -> Result<()> {
        let current_page = current_page.unwrap_or(0);
        if current_page < 0 {
            return Err(AppError::BadRequest(
                "Current page must be a non-negative integer".to_string(),
            ));
        }

        // Wishlisted books carry no progress.
        let current_page = match status {
            LedgerStatus::Wishlist => 0,
            LedgerStatus::Possession => current_page,
        };

        // The book must exist in the mirror before it can be referenced.
        let book = self.mirror.ensure_cached(book_id).await?;

        // Unknown page count (0) means the bound is unenforced.
        if book.page_count > 0 && current_page > book.page_count {
            return Err(AppError::BadRequest(
                "Current page cannot be greater than total page count".to_string(),
            ));
        }

        // Advisory pre-check; the primary key catches the race.
        if self.db.get_ledger_entry(user_id, book_id)?.is_some() {
            return Err(AppError::Conflict(
                "This book is already in your library".to_string(),
            ));
        }

        self.db
            .insert_ledger_entry(user_id, book_id, status, current_page)
    }

    /// Update status and/or progress of an existing entry.
    pub async fn update(
        &self,
        user_id: i64,
        book_id: &str,
        status: Option<LedgerStatus>,
        current_page: Option<i64>,
    ) -> Result<()> {
        // A page supplied alongside a wishlist move is forced back to zero.
        let current_page = if status == Some(LedgerStatus::Wishlist) && current_page.is_some() {
            Some(0)
        } else {
            current_page
        };

        if let Some(page) = current_page {
            if page < 0 {
                return Err(AppError::BadRequest(
                    "Current page must be a non-negative integer".to_string(),
                ));
            }

            let book = self
                .db
                .get_book(book_id)?
                .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

            // Unknown page count (0) means the bound is unenforced.
            if book.page_count > 0 && page > book.page_count {
                return Err(AppError::BadRequest(
                    "Current page cannot be greater than total page count".to_string(),
                ));
            }
        }

        if !self
            .db
            .update_ledger_entry(user_id, book_id, status, current_page)?
        {
            return Err(AppError::NotFound(
                "Book not found in your library".to_string(),
            ));
        }

        Ok(())
    }

    /// Remove a book from the user's library. Removing a book that is not
    /// there is an error, not a silent success.
    pub fn remove(&self, user_id: i64, book_id: &str) -> Result<()> {
        if !self.db.delete_ledger_entry(user_id, book_id)? {
            return Err(AppError::NotFound(
                "Book not found in your library".to_string(),
            ));
        }

        Ok(())
    }
}
