use crate::auth::AuthService;
use crate::catalog::{CatalogClient, VolumeRecord};
use crate::config::Config;
use crate::db::{Book, BookImages, Database, LedgerStatus};
use crate::error::AppError;
use crate::library::LibraryService;
use crate::mirror::CatalogMirror;
use crate::token::TokenService;
use axum::{Json, Router, extract::Path, http::StatusCode, routing::get};

fn test_db() -> Database {
    Database::open_memory().unwrap()
}

fn test_tokens() -> TokenService {
    TokenService::new("test-secret", 90)
}

fn test_auth(db: Database) -> AuthService {
    AuthService::new(db, test_tokens(), 30)
}

fn register_alice(auth: &AuthService) -> (crate::db::User, String) {
    auth.register("a@x.com", "password123", "alice", "Alice", None)
        .unwrap()
}

fn sample_book(id: &str, title: &str, page_count: i64) -> Book {
    Book {
        id: id.to_string(),
        title: title.to_string(),
        authors: vec!["Author".to_string()],
        publisher: "Publisher".to_string(),
        published_date: Some("2020-01-01".to_string()),
        description: "A book".to_string(),
        isbn13: "9781234567890".to_string(),
        page_count,
        categories: vec!["Fiction".to_string()],
        language: "en".to_string(),
        images: BookImages::default(),
    }
}

fn volume_json(id: &str, title: &str, page_count: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "volumeInfo": {
            "title": title,
            "authors": ["Jane Doe"],
            "publisher": "Acme Press",
            "publishedDate": "2019-05-01",
            "description": "A test volume",
            "industryIdentifiers": [
                { "type": "ISBN_10", "identifier": "1234567890" },
                { "type": "ISBN_13", "identifier": "9780000000001" }
            ],
            "pageCount": page_count,
            "categories": ["Fiction"],
            "language": "en",
            "imageLinks": { "thumbnail": "http://img/thumb.jpg" }
        }
    })
}

/// Serve a canned catalog on an ephemeral local port, returning its base URL.
async fn spawn_stub_catalog() -> String {
    async fn volumes() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "items": [
                volume_json("bookA", "The Long Road", 200),
                volume_json("bookB", "Road Atlas", 120),
            ]
        }))
    }

    async fn volume(Path(id): Path<String>) -> Result<Json<serde_json::Value>, StatusCode> {
        match id.as_str() {
            "bookA" => Ok(Json(volume_json("bookA", "The Long Road", 200))),
            "bookB" => Ok(Json(volume_json("bookB", "Road Atlas", 120))),
            "bare" => Ok(Json(serde_json::json!({
                "id": "bare",
                "volumeInfo": { "title": "Bare Record" }
            }))),
            _ => Err(StatusCode::NOT_FOUND),
        }
    }

    let app = Router::new()
        .route("/volumes", get(volumes))
        .route("/volumes/{id}", get(volume));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn stub_mirror(db: &Database) -> CatalogMirror {
    let base_url = spawn_stub_catalog().await;
    CatalogMirror::new(db.clone(), CatalogClient::new(&base_url, None))
}

// ========== TRANSFORM ==========

#[test]
fn transform_fills_placeholders() {
    let record: VolumeRecord = serde_json::from_value(serde_json::json!({
        "id": "sparse",
        "volumeInfo": { "title": "Sparse" }
    }))
    .unwrap();

    let book = Book::from_volume(record);
    assert_eq!(book.authors, vec!["Unknown author".to_string()]);
    assert_eq!(book.publisher, "Unknown publisher");
    assert_eq!(book.description, "No description available");
    assert_eq!(book.isbn13, "N/A");
    assert_eq!(book.page_count, 0);
    assert_eq!(book.categories, vec!["Uncategorized".to_string()]);
    assert_eq!(book.language, "N/A");
    assert_eq!(book.images, BookImages::default());
    assert!(book.published_date.is_none());
}

#[test]
fn transform_extracts_isbn13() {
    let record: VolumeRecord =
        serde_json::from_value(volume_json("full", "Full Record", 300)).unwrap();

    let book = Book::from_volume(record);
    assert_eq!(book.isbn13, "9780000000001");
    assert_eq!(book.authors, vec!["Jane Doe".to_string()]);
    assert_eq!(book.page_count, 300);
    assert_eq!(
        book.images.thumbnail.as_deref(),
        Some("http://img/thumb.jpg")
    );
    assert!(book.images.small_thumbnail.is_none());
    assert!(book.images.extra_large.is_none());
}

// ========== TOKENS ==========

#[test]
fn token_round_trip() {
    let db = test_db();
    let auth = test_auth(db);
    let (user, _) = register_alice(&auth);

    let tokens = test_tokens();
    let token = tokens.issue(&user).unwrap();
    let claims = tokens.verify(&token).unwrap();

    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.email, "a@x.com");
    assert_eq!(claims.username, "alice");
    assert!(claims.exp > claims.iat);
}

#[test]
fn token_rejects_wrong_secret() {
    let db = test_db();
    let auth = test_auth(db);
    let (user, _) = register_alice(&auth);

    let token = test_tokens().issue(&user).unwrap();
    let other = TokenService::new("other-secret", 90);
    assert!(matches!(
        other.verify(&token),
        Err(AppError::Unauthorized(_))
    ));
}

#[test]
fn token_rejects_expired() {
    let db = test_db();
    let auth = test_auth(db);
    let (user, _) = register_alice(&auth);

    let expired = TokenService::new("test-secret", 0);
    let token = expired.issue(&user).unwrap();
    assert!(matches!(
        expired.verify(&token),
        Err(AppError::Unauthorized(_))
    ));
}

#[test]
fn token_rejects_garbage() {
    let tokens = test_tokens();
    assert!(tokens.verify("not-a-token").is_err());
    assert!(tokens.verify("").is_err());
    assert!(tokens.verify("a.b.c.d").is_err());
}

// ========== AUTH ==========

#[test]
fn auth_register_and_login() {
    let db = test_db();
    let auth = test_auth(db);

    let (user, token) = register_alice(&auth);
    assert_eq!(user.username, "alice");
    assert_eq!(user.bio, "");
    assert!(!token.is_empty());

    let (by_email, _) = auth.login("a@x.com", "password123").unwrap();
    assert_eq!(by_email.id, user.id);

    let (by_username, _) = auth.login("alice", "password123").unwrap();
    assert_eq!(by_username.id, user.id);
}

#[test]
fn auth_register_missing_fields() {
    let db = test_db();
    let auth = test_auth(db);

    let result = auth.register("a@x.com", "password123", "", "Alice", None);
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[test]
fn auth_duplicate_registration_conflicts() {
    let db = test_db();
    let auth = test_auth(db);
    register_alice(&auth);

    // Same email, different username
    let result = auth.register("a@x.com", "password123", "alice2", "Alice", None);
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // Same username, different email
    let result = auth.register("b@x.com", "password123", "alice", "Alice", None);
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[test]
fn auth_login_identical_error_for_unknown_and_mismatch() {
    let db = test_db();
    let auth = test_auth(db);
    register_alice(&auth);

    let unknown = auth.login("nobody", "password123").unwrap_err();
    let mismatch = auth.login("alice", "wrong-password").unwrap_err();

    match (&unknown, &mismatch) {
        (AppError::Unauthorized(a), AppError::Unauthorized(b)) => assert_eq!(a, b),
        _ => panic!("expected Unauthorized for both"),
    }
}

#[test]
fn auth_login_missing_fields() {
    let db = test_db();
    let auth = test_auth(db);

    assert!(matches!(
        auth.login("", "password123"),
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        auth.login("alice", ""),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn auth_lockout_after_three_failures() {
    let db = test_db();
    let auth = test_auth(db);
    register_alice(&auth);

    for _ in 0..3 {
        assert!(matches!(
            auth.login("alice", "wrong"),
            Err(AppError::Unauthorized(_))
        ));
    }

    // Locked regardless of password correctness
    assert!(matches!(
        auth.login("alice", "password123"),
        Err(AppError::TooManyRequests(_))
    ));
    assert!(matches!(
        auth.login("alice", "wrong"),
        Err(AppError::TooManyRequests(_))
    ));
}

#[test]
fn auth_lockout_expires_with_window() {
    let db = test_db();
    // Zero-length window: the lockout never bites
    let auth = AuthService::new(db, test_tokens(), 0);
    register_alice(&auth);

    for _ in 0..3 {
        let _ = auth.login("alice", "wrong");
    }

    assert!(auth.login("alice", "password123").is_ok());
}

#[test]
fn auth_success_resets_counter() {
    let db = test_db();
    let auth = test_auth(db.clone());
    register_alice(&auth);

    let _ = auth.login("alice", "wrong");
    let _ = auth.login("alice", "wrong");
    assert_eq!(
        db.get_user_by_identifier("alice")
            .unwrap()
            .unwrap()
            .login_attempts,
        2
    );

    auth.login("alice", "password123").unwrap();
    assert_eq!(
        db.get_user_by_identifier("alice")
            .unwrap()
            .unwrap()
            .login_attempts,
        0
    );
}

#[test]
fn auth_current_user_returns_live_record() {
    let db = test_db();
    let auth = test_auth(db);
    let (user, token) = register_alice(&auth);

    auth.update_profile(user.id, Some("New Nick"), None).unwrap();

    // Live row reflects the edit...
    let current = auth.current_user(&token).unwrap();
    assert_eq!(current.nickname, "New Nick");

    // ...while the outstanding token keeps its issuance-time claims.
    let claims = test_tokens().verify(&token).unwrap();
    assert_eq!(claims.nickname, "Alice");
}

#[test]
fn auth_current_user_rejects_bad_token() {
    let db = test_db();
    let auth = test_auth(db);
    register_alice(&auth);

    assert!(matches!(
        auth.current_user("garbage"),
        Err(AppError::Unauthorized(_))
    ));
}

#[test]
fn auth_update_profile_validation() {
    let db = test_db();
    let auth = test_auth(db);
    let (user, _) = register_alice(&auth);

    assert!(matches!(
        auth.update_profile(user.id, None, None),
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        auth.update_profile(user.id, Some("   "), None),
        Err(AppError::BadRequest(_))
    ));
    let long_nickname = "x".repeat(51);
    assert!(matches!(
        auth.update_profile(user.id, Some(long_nickname.as_str()), None),
        Err(AppError::BadRequest(_))
    ));
    let long_bio = "x".repeat(501);
    assert!(matches!(
        auth.update_profile(user.id, None, Some(long_bio.as_str())),
        Err(AppError::BadRequest(_))
    ));

    // Partial update: bio untouched
    let updated = auth
        .update_profile(user.id, Some("Nick"), None)
        .unwrap();
    assert_eq!(updated.nickname, "Nick");
    assert_eq!(updated.bio, "");

    let updated = auth
        .update_profile(user.id, None, Some("About me"))
        .unwrap();
    assert_eq!(updated.nickname, "Nick");
    assert_eq!(updated.bio, "About me");
}

#[test]
fn auth_update_profile_unknown_user() {
    let db = test_db();
    let auth = test_auth(db);

    assert!(matches!(
        auth.update_profile(999, Some("Nick"), None),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn auth_change_password_validation() {
    let db = test_db();
    let auth = test_auth(db);
    let (user, _) = register_alice(&auth);

    // Too short
    assert!(matches!(
        auth.change_password(user.id, "password123", "short", "short"),
        Err(AppError::BadRequest(_))
    ));
    // Confirmation mismatch
    assert!(matches!(
        auth.change_password(user.id, "password123", "newpassword", "different"),
        Err(AppError::BadRequest(_))
    ));
    // Same as current
    assert!(matches!(
        auth.change_password(user.id, "password123", "password123", "password123"),
        Err(AppError::BadRequest(_))
    ));
    // Wrong current password
    assert!(matches!(
        auth.change_password(user.id, "wrong", "newpassword", "newpassword"),
        Err(AppError::Unauthorized(_))
    ));

    auth.change_password(user.id, "password123", "newpassword", "newpassword")
        .unwrap();

    assert!(auth.login("alice", "password123").is_err());
    assert!(auth.login("alice", "newpassword").is_ok());
}

#[test]
fn user_serialization_strips_password_hash() {
    let db = test_db();
    let auth = test_auth(db);
    let (user, _) = register_alice(&auth);

    let value = serde_json::to_value(&user).unwrap();
    assert!(value.get("password_hash").is_none());
    assert!(value.get("login_attempts").is_none());
    assert_eq!(value["username"], "alice");
}

// ========== DATABASE ==========

#[test]
fn db_upsert_book_overwrites_all_fields() {
    let db = test_db();
    db.upsert_book(&sample_book("book-1", "Old Title", 100))
        .unwrap();

    let mut updated = sample_book("book-1", "New Title", 250);
    updated.authors = vec!["Someone Else".to_string()];
    db.upsert_book(&updated).unwrap();

    let found = db.get_book("book-1").unwrap().unwrap();
    assert_eq!(found.title, "New Title");
    assert_eq!(found.page_count, 250);
    assert_eq!(found.authors, vec!["Someone Else".to_string()]);
}

#[test]
fn db_search_books_by_title_substring() {
    let db = test_db();
    db.upsert_book(&sample_book("b1", "The Long Road", 200))
        .unwrap();
    db.upsert_book(&sample_book("b2", "Road Atlas", 120)).unwrap();
    db.upsert_book(&sample_book("b3", "Gardening", 80)).unwrap();

    let found = db.search_books_by_title("road").unwrap();
    assert_eq!(found.len(), 2);

    let found = db.search_books_by_title("Garden").unwrap();
    assert_eq!(found.len(), 1);

    let found = db.search_books_by_title("nothing").unwrap();
    assert!(found.is_empty());
}

#[test]
fn db_ledger_duplicate_insert_conflicts() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    db.upsert_book(&sample_book("book-1", "Test", 100)).unwrap();

    db.insert_ledger_entry(user.id, "book-1", LedgerStatus::Wishlist, 0)
        .unwrap();

    let result = db.insert_ledger_entry(user.id, "book-1", LedgerStatus::Possession, 5);
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[test]
fn db_ledger_partial_update() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    db.upsert_book(&sample_book("book-1", "Test", 100)).unwrap();
    db.insert_ledger_entry(user.id, "book-1", LedgerStatus::Possession, 10)
        .unwrap();

    // Only the page changes
    assert!(
        db.update_ledger_entry(user.id, "book-1", None, Some(42))
            .unwrap()
    );
    let entry = db.get_ledger_entry(user.id, "book-1").unwrap().unwrap();
    assert_eq!(entry.status, LedgerStatus::Possession);
    assert_eq!(entry.current_page, 42);

    // Only the status changes
    assert!(
        db.update_ledger_entry(user.id, "book-1", Some(LedgerStatus::Wishlist), None)
            .unwrap()
    );
    let entry = db.get_ledger_entry(user.id, "book-1").unwrap().unwrap();
    assert_eq!(entry.status, LedgerStatus::Wishlist);
    assert_eq!(entry.current_page, 42);
}

#[test]
fn db_open_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("test.db");

    let db = Database::open(&path).unwrap();
    db.upsert_book(&sample_book("b1", "Persisted", 10)).unwrap();
    assert!(db.get_book("b1").unwrap().is_some());
    assert!(path.exists());
}

// ========== MIRROR ==========

#[tokio::test]
async fn mirror_ensure_cached_is_idempotent() {
    let db = test_db();
    let mirror = stub_mirror(&db).await;

    assert!(db.get_book("bookA").unwrap().is_none());

    let first = mirror.ensure_cached("bookA").await.unwrap();
    let second = mirror.ensure_cached("bookA").await.unwrap();

    assert_eq!(first, second);
    let stored = db.get_book("bookA").unwrap().unwrap();
    assert_eq!(stored, first);
    assert_eq!(stored.title, "The Long Road");
    assert_eq!(stored.page_count, 200);
}

#[tokio::test]
async fn mirror_get_by_id_does_not_cache() {
    let db = test_db();
    let mirror = stub_mirror(&db).await;

    let book = mirror.get_by_id("bookA").await.unwrap();
    assert_eq!(book.title, "The Long Road");

    // A bare read leaves the mirror untouched
    assert!(db.get_book("bookA").unwrap().is_none());
}

#[tokio::test]
async fn mirror_get_by_id_prefers_local_row() {
    let db = test_db();
    let mirror = stub_mirror(&db).await;

    db.upsert_book(&sample_book("bookA", "Local Copy", 50))
        .unwrap();

    let book = mirror.get_by_id("bookA").await.unwrap();
    assert_eq!(book.title, "Local Copy");
}

#[tokio::test]
async fn mirror_get_by_id_unknown_is_not_found() {
    let db = test_db();
    let mirror = stub_mirror(&db).await;

    assert!(matches!(
        mirror.get_by_id("missing").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn mirror_search_upserts_every_result() {
    let db = test_db();
    let mirror = stub_mirror(&db).await;

    let books = mirror.search("road").await.unwrap();
    assert_eq!(books.len(), 2);

    assert!(db.get_book("bookA").unwrap().is_some());
    assert!(db.get_book("bookB").unwrap().is_some());
}

#[tokio::test]
async fn mirror_search_cached_never_hits_network() {
    let db = test_db();
    db.upsert_book(&sample_book("b1", "The Long Road", 200))
        .unwrap();

    // Dead catalog endpoint: only the local mirror can answer
    let client = CatalogClient::new("http://127.0.0.1:9", None);
    let mirror = CatalogMirror::new(db, client);

    let books = mirror.search_cached("Road").await.unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, "b1");
}

#[tokio::test]
async fn mirror_search_empty_term_rejected() {
    let db = test_db();
    let mirror = stub_mirror(&db).await;

    assert!(matches!(
        mirror.search("").await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        mirror.search_cached("").await,
        Err(AppError::BadRequest(_))
    ));
}

#[tokio::test]
async fn mirror_unreachable_catalog_is_bad_gateway() {
    let db = test_db();
    let client = CatalogClient::new("http://127.0.0.1:9", None);
    let mirror = CatalogMirror::new(db, client);

    assert!(matches!(
        mirror.search("road").await,
        Err(AppError::BadGateway(_))
    ));
    assert!(matches!(
        mirror.ensure_cached("bookA").await,
        Err(AppError::BadGateway(_))
    ));
}

// ========== LIBRARY ==========

#[tokio::test]
async fn library_add_caches_book_first() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db.clone(), mirror);

    library
        .add(user.id, "bookA", LedgerStatus::Wishlist, None)
        .await
        .unwrap();

    assert!(db.get_book("bookA").unwrap().is_some());
    let entry = db.get_ledger_entry(user.id, "bookA").unwrap().unwrap();
    assert_eq!(entry.status, LedgerStatus::Wishlist);
    assert_eq!(entry.current_page, 0);
}

#[tokio::test]
async fn library_add_wishlist_ignores_supplied_page() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db.clone(), mirror);

    library
        .add(user.id, "bookA", LedgerStatus::Wishlist, Some(50))
        .await
        .unwrap();

    let entry = db.get_ledger_entry(user.id, "bookA").unwrap().unwrap();
    assert_eq!(entry.current_page, 0);
}

#[tokio::test]
async fn library_duplicate_add_conflicts() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db.clone(), mirror);

    library
        .add(user.id, "bookA", LedgerStatus::Wishlist, None)
        .await
        .unwrap();

    let result = library
        .add(user.id, "bookA", LedgerStatus::Possession, None)
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // Exactly one row for the pair
    assert_eq!(library.list(user.id).unwrap().len(), 1);
}

#[tokio::test]
async fn library_add_unknown_book_not_found() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db, mirror);

    let result = library
        .add(user.id, "missing", LedgerStatus::Wishlist, None)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn library_add_page_beyond_count_rejected() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db.clone(), mirror);

    // bookA has 200 pages
    let result = library
        .add(user.id, "bookA", LedgerStatus::Possession, Some(201))
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(db.get_ledger_entry(user.id, "bookA").unwrap().is_none());
}

#[tokio::test]
async fn library_update_page_beyond_count_rejected() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db.clone(), mirror);

    library
        .add(user.id, "bookA", LedgerStatus::Possession, Some(10))
        .await
        .unwrap();

    // bookA has 200 pages
    let result = library.update(user.id, "bookA", None, Some(201)).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    // Row is unchanged
    let entry = db.get_ledger_entry(user.id, "bookA").unwrap().unwrap();
    assert_eq!(entry.current_page, 10);
    assert_eq!(entry.status, LedgerStatus::Possession);
}

#[tokio::test]
async fn library_update_unknown_page_count_is_unbounded() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db.clone(), mirror);

    // "bare" has no pageCount in the catalog, so it mirrors as 0
    library
        .add(user.id, "bare", LedgerStatus::Possession, None)
        .await
        .unwrap();

    library
        .update(user.id, "bare", None, Some(10_000))
        .await
        .unwrap();

    let entry = db.get_ledger_entry(user.id, "bare").unwrap().unwrap();
    assert_eq!(entry.current_page, 10_000);
}

#[tokio::test]
async fn library_update_wishlist_coerces_page_to_zero() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db.clone(), mirror);

    library
        .add(user.id, "bookA", LedgerStatus::Possession, Some(50))
        .await
        .unwrap();

    library
        .update(user.id, "bookA", Some(LedgerStatus::Wishlist), Some(80))
        .await
        .unwrap();

    let entry = db.get_ledger_entry(user.id, "bookA").unwrap().unwrap();
    assert_eq!(entry.status, LedgerStatus::Wishlist);
    assert_eq!(entry.current_page, 0);
}

#[tokio::test]
async fn library_update_negative_page_rejected() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db, mirror);

    library
        .add(user.id, "bookA", LedgerStatus::Possession, None)
        .await
        .unwrap();

    let result = library.update(user.id, "bookA", None, Some(-1)).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn library_update_missing_entry_not_found() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db.clone(), mirror);

    db.upsert_book(&sample_book("bookA", "Test", 100)).unwrap();

    let result = library
        .update(user.id, "bookA", Some(LedgerStatus::Possession), None)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn library_remove_twice_fails() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (user, _) = register_alice(&auth);
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db, mirror);

    library
        .add(user.id, "bookA", LedgerStatus::Wishlist, None)
        .await
        .unwrap();

    library.remove(user.id, "bookA").unwrap();
    assert!(matches!(
        library.remove(user.id, "bookA"),
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn library_list_only_own_entries() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let (alice, _) = register_alice(&auth);
    let (bob, _) = auth
        .register("b@x.com", "password123", "bob", "Bob", None)
        .unwrap();
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db, mirror);

    library
        .add(alice.id, "bookA", LedgerStatus::Wishlist, None)
        .await
        .unwrap();
    library
        .add(bob.id, "bookB", LedgerStatus::Possession, None)
        .await
        .unwrap();

    let alices = library.list(alice.id).unwrap();
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0].book.id, "bookA");

    let bobs = library.list(bob.id).unwrap();
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].book.id, "bookB");
}

// ========== END TO END ==========

#[tokio::test]
async fn full_flow_register_add_update_list() {
    let db = test_db();
    let auth = test_auth(db.clone());
    let mirror = stub_mirror(&db).await;
    let library = LibraryService::new(db.clone(), mirror);

    auth.register("a@x.com", "password123", "alice", "Alice", None)
        .unwrap();
    let (alice, token) = auth.login("alice", "password123").unwrap();
    assert!(!token.is_empty());

    // bookA is uncached before the add
    assert!(db.get_book("bookA").unwrap().is_none());

    library
        .add(alice.id, "bookA", LedgerStatus::Wishlist, None)
        .await
        .unwrap();

    assert!(db.get_book("bookA").unwrap().is_some());
    let entry = db.get_ledger_entry(alice.id, "bookA").unwrap().unwrap();
    assert_eq!(entry.status, LedgerStatus::Wishlist);
    assert_eq!(entry.current_page, 0);

    // bookA.page_count = 200, so page 10 is fine
    library
        .update(
            alice.id,
            "bookA",
            Some(LedgerStatus::Possession),
            Some(10),
        )
        .await
        .unwrap();

    let list = library.list(alice.id).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].book.id, "bookA");
    assert_eq!(list[0].status, LedgerStatus::Possession);
    assert_eq!(list[0].current_page, 10);
}

// ========== CONFIG ==========

#[test]
fn config_parse_toml() {
    let toml = r#"
[server]
bind = "127.0.0.1:9090"

[database]
path = "/tmp/test.db"

[auth]
token_secret = "secret"
token_days = 7
lockout_window_seconds = 60

[catalog]
base_url = "http://localhost:1234"
api_key = "key"
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.server.bind.port(), 9090);
    assert_eq!(config.auth.token_secret, "secret");
    assert_eq!(config.auth.token_days, 7);
    assert_eq!(config.auth.lockout_window_seconds, 60);
    assert_eq!(config.catalog.base_url, "http://localhost:1234");
    assert_eq!(config.catalog.api_key.as_deref(), Some("key"));
}

#[test]
fn config_default_values() {
    let config = Config::default();
    assert_eq!(config.server.bind.port(), 3000);
    assert!(config.auth.token_secret.is_empty());
    assert_eq!(config.auth.token_days, 90);
    assert_eq!(config.auth.lockout_window_seconds, 30);
    assert!(config.catalog.base_url.contains("googleapis"));
}
