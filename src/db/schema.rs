use crate::db::*;
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE NOT NULL,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                nickname TEXT NOT NULL,
                bio TEXT NOT NULL DEFAULT '',
                login_attempts INTEGER NOT NULL DEFAULT 0,
                last_login_attempt INTEGER,
                created_at INTEGER NOT NULL
            );

            -- Books table (local mirror of the external catalog)
            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                authors TEXT NOT NULL,
                publisher TEXT NOT NULL,
                published_date TEXT,
                description TEXT NOT NULL,
                isbn13 TEXT NOT NULL,
                page_count INTEGER NOT NULL DEFAULT 0,
                categories TEXT NOT NULL,
                language TEXT NOT NULL,
                images TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- Library table (per-user reading state)
            CREATE TABLE IF NOT EXISTS library (
                user_id INTEGER NOT NULL,
                book_id TEXT NOT NULL,
                status TEXT NOT NULL,
                current_page INTEGER NOT NULL DEFAULT 0,
                added_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, book_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_books_title ON books(title);
            CREATE INDEX IF NOT EXISTS idx_library_user ON library(user_id);
            "#,
        )
        .map_err(|e| AppError::Internal(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== USER OPERATIONS ==========

    /// Create a new user and return the stored row.
    pub fn create_user(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
        nickname: &str,
        bio: &str,
    ) -> Result<User> {
        let conn = self.conn.lock();
        let created_at = now_timestamp();

        conn.execute(
            "INSERT INTO users (email, username, password_hash, nickname, bio, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![email, username, password_hash, nickname, bio, created_at],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Conflict("User with this email or username already exists".to_string())
            } else {
                AppError::Internal(format!("Failed to create user: {}", e))
            }
        })?;

        Ok(User {
            id: conn.last_insert_rowid(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            nickname: nickname.to_string(),
            bio: bio.to_string(),
            login_attempts: 0,
            last_login_attempt: None,
            created_at,
        })
    }

    /// Check whether a user with this email or username exists.
    pub fn user_exists(&self, email: &str, username: &str) -> Result<bool> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1 OR username = ?2",
            params![email, username],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)
        .map_err(|e| AppError::Internal(format!("Failed to check user: {}", e)))
    }

    /// Get user by email or username.
    pub fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, email, username, password_hash, nickname, bio,
                    login_attempts, last_login_attempt, created_at
             FROM users WHERE email = ?1 OR username = ?1",
            params![identifier],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// Get user by ID.
    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, email, username, password_hash, nickname, bio,
                    login_attempts, last_login_attempt, created_at
             FROM users WHERE id = ?1",
            params![id],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// Record a failed login attempt. Counter bump and timestamp happen in a
    /// single UPDATE so concurrent failures never under-count.
    pub fn record_failed_login(&self, user_id: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET login_attempts = login_attempts + 1, last_login_attempt = ?1
             WHERE id = ?2",
            params![now_timestamp(), user_id],
        )
        .map_err(|e| AppError::Internal(format!("Failed to record login attempt: {}", e)))?;
        Ok(())
    }

    /// Reset the failed login counter after a successful login.
    pub fn reset_login_attempts(&self, user_id: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET login_attempts = 0 WHERE id = ?1",
            params![user_id],
        )
        .map_err(|e| AppError::Internal(format!("Failed to reset login attempts: {}", e)))?;
        Ok(())
    }

    /// Update profile fields. Only supplied fields are written.
    pub fn update_user_profile(
        &self,
        user_id: i64,
        nickname: Option<&str>,
        bio: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE users SET nickname = COALESCE(?1, nickname), bio = COALESCE(?2, bio)
                 WHERE id = ?3",
                params![nickname, bio, user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update profile: {}", e)))?;
        Ok(rows > 0)
    }

    /// Overwrite the stored password hash.
    pub fn update_user_password(&self, user_id: i64, password_hash: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2",
                params![password_hash, user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update password: {}", e)))?;
        Ok(rows > 0)
    }

    /// Helper to convert a row to User.
    fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            password_hash: row.get(3)?,
            nickname: row.get(4)?,
            bio: row.get(5)?,
            login_attempts: row.get(6)?,
            last_login_attempt: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    // ========== BOOK OPERATIONS ==========

    /// Insert or overwrite a mirrored book. Re-fetch replaces all fields.
    pub fn upsert_book(&self, book: &Book) -> Result<()> {
        let conn = self.conn.lock();
        let now = now_timestamp();

        conn.execute(
            "INSERT INTO books
             (id, title, authors, publisher, published_date, description, isbn13,
              page_count, categories, language, images, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                authors = excluded.authors,
                publisher = excluded.publisher,
                published_date = excluded.published_date,
                description = excluded.description,
                isbn13 = excluded.isbn13,
                page_count = excluded.page_count,
                categories = excluded.categories,
                language = excluded.language,
                images = excluded.images,
                updated_at = excluded.updated_at",
            params![
                book.id,
                book.title,
                to_json(&book.authors)?,
                book.publisher,
                book.published_date,
                book.description,
                book.isbn13,
                book.page_count,
                to_json(&book.categories)?,
                book.language,
                to_json(&book.images)?,
                now,
                now,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to save book: {}", e)))?;
        Ok(())
    }

    /// Get a mirrored book by catalog ID.
    pub fn get_book(&self, id: &str) -> Result<Option<Book>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, title, authors, publisher, published_date, description,
                    isbn13, page_count, categories, language, images
             FROM books WHERE id = ?1",
            params![id],
            Self::row_to_book,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get book: {}", e)))
    }

    /// Search the mirror by title substring (case-insensitive).
    pub fn search_books_by_title(&self, term: &str) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, title, authors, publisher, published_date, description,
                        isbn13, page_count, categories, language, images
                 FROM books WHERE title LIKE '%' || ?1 || '%' ORDER BY title",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(params![term], Self::row_to_book)
            .map_err(|e| AppError::Internal(format!("Failed to search books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Helper to convert a row to Book. JSON columns are parsed here.
    fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
        let authors_json: String = row.get(2)?;
        let categories_json: String = row.get(8)?;
        let images_json: String = row.get(10)?;

        Ok(Book {
            id: row.get(0)?,
            title: row.get(1)?,
            authors: serde_json::from_str(&authors_json).unwrap_or_default(),
            publisher: row.get(3)?,
            published_date: row.get(4)?,
            description: row.get(5)?,
            isbn13: row.get(6)?,
            page_count: row.get(7)?,
            categories: serde_json::from_str(&categories_json).unwrap_or_default(),
            language: row.get(9)?,
            images: serde_json::from_str(&images_json).unwrap_or_default(),
        })
    }

    // ========== LIBRARY OPERATIONS ==========

    /// Insert a library entry. The primary key on (user_id, book_id) is the
    /// authority on uniqueness; a violation surfaces as Conflict.
    pub fn insert_ledger_entry(
        &self,
        user_id: i64,
        book_id: &str,
        status: LedgerStatus,
        current_page: i64,
    ) -> Result<()> {
        let conn = self.conn.lock();
        let now = now_timestamp();

        conn.execute(
            "INSERT INTO library (user_id, book_id, status, current_page, added_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![user_id, book_id, status.as_str(), current_page, now, now],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Conflict("This book is already in your library".to_string())
            } else {
                AppError::Internal(format!("Failed to add book to library: {}", e))
            }
        })?;
        Ok(())
    }

    /// Get a single library entry.
    pub fn get_ledger_entry(&self, user_id: i64, book_id: &str) -> Result<Option<LedgerEntry>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT user_id, book_id, status, current_page, added_at, updated_at
             FROM library WHERE user_id = ?1 AND book_id = ?2",
            params![user_id, book_id],
            |row| {
                let status: String = row.get(2)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    status,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            },
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get library entry: {}", e)))?
        .map(
            |(user_id, book_id, status, current_page, added_at, updated_at)| {
                Ok(LedgerEntry {
                    user_id,
                    book_id,
                    status: LedgerStatus::parse(&status)?,
                    current_page,
                    added_at,
                    updated_at,
                })
            },
        )
        .transpose()
    }

    /// Partial update of a library entry. Only supplied fields are written.
    pub fn update_ledger_entry(
        &self,
        user_id: i64,
        book_id: &str,
        status: Option<LedgerStatus>,
        current_page: Option<i64>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE library SET
                    status = COALESCE(?1, status),
                    current_page = COALESCE(?2, current_page),
                    updated_at = ?3
                 WHERE user_id = ?4 AND book_id = ?5",
                params![
                    status.map(|s| s.as_str()),
                    current_page,
                    now_timestamp(),
                    user_id,
                    book_id,
                ],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update library entry: {}", e)))?;
        Ok(rows > 0)
    }

    /// Delete a library entry. Returns false if nothing was deleted.
    pub fn delete_ledger_entry(&self, user_id: i64, book_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM library WHERE user_id = ?1 AND book_id = ?2",
                params![user_id, book_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to delete library entry: {}", e)))?;
        Ok(rows > 0)
    }

    /// List a user's library: books joined with their reading state. Only
    /// books with an entry for this user are returned.
    pub fn list_library(&self, user_id: i64) -> Result<Vec<LibraryBook>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT b.id, b.title, b.authors, b.publisher, b.published_date,
                        b.description, b.isbn13, b.page_count, b.categories,
                        b.language, b.images, l.status, l.current_page
                 FROM books b
                 INNER JOIN library l ON b.id = l.book_id
                 WHERE l.user_id = ?1
                 ORDER BY l.added_at",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                let book = Self::row_to_book(row)?;
                let status: String = row.get(11)?;
                let current_page: i64 = row.get(12)?;
                Ok((book, status, current_page))
            })
            .map_err(|e| AppError::Internal(format!("Failed to list library: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect library: {}", e)))?;

        rows.into_iter()
            .map(|(book, status, current_page)| {
                Ok(LibraryBook {
                    book,
                    status: LedgerStatus::parse(&status)?,
                    current_page,
                })
            })
            .collect()
    }
}

/// Serialize a JSON column value.
fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("Failed to serialize column: {}", e)))
}
