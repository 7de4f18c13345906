//! Local mirror of the external catalog.
//!
//! Two search operations are deliberately distinct: [`CatalogMirror::search`]
//! always consults the external source and writes every result through to
//! the mirror, while [`CatalogMirror::search_cached`] only matches titles
//! already mirrored and never touches the network.

use crate::catalog::CatalogClient;
use crate::db::{Book, Database};
use crate::error::{AppError, Result};

/// Read-through cache of external catalog records.
#[derive(Clone)]
pub struct CatalogMirror {
    db: Database,
    client: CatalogClient,
}

impl CatalogMirror {
    /// Create a new mirror.
    pub fn new(db: Database, client: CatalogClient) -> Self {
        Self { db, client }
    }

    /// Canonical search: query the external catalog and upsert every result.
    pub async fn search(&self, term: &str) -> Result<Vec<Book>> {
        if term.is_empty() {
            return Err(AppError::BadRequest("Search term is required".to_string()));
        }

        let records = self.client.search_volumes(term).await?;
        let books: Vec<Book> = records.into_iter().map(Book::from_volume).collect();

        for book in &books {
            self.db.upsert_book(book)?;
        }

        tracing::debug!(term, results = books.len(), "Catalog search mirrored");
        Ok(books)
    }

    /// Local-only search: title substring match over the mirror.
    pub async fn search_cached(&self, term: &str) -> Result<Vec<Book>> {
        if term.is_empty() {
            return Err(AppError::BadRequest("Search term is required".to_string()));
        }

        self.db.search_books_by_title(term)
    }

    /// Look up a book, mirror first. A bare read does not write through;
    /// only search and library adds populate the mirror.
    pub async fn get_by_id(&self, id: &str) -> Result<Book> {
        if let Some(book) = self.db.get_book(id)? {
            return Ok(book);
        }

        let record = self
            .client
            .fetch_volume(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        Ok(Book::from_volume(record))
    }

    /// Guarantee a book exists locally, fetching and inserting on first
    /// reference. Idempotent: an already-cached ID is a plain read.
    pub async fn ensure_cached(&self, id: &str) -> Result<Book> {
        if let Some(book) = self.db.get_book(id)? {
            return Ok(book);
        }

        let record = self
            .client
            .fetch_volume(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found in catalog".to_string()))?;

        let book = Book::from_volume(record);
        self.db.upsert_book(&book)?;
        tracing::info!(id = %book.id, title = %book.title, "Book cached from catalog");
        Ok(book)
    }
}
