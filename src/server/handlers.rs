//! HTTP request handlers.

use crate::db::{Book, LedgerStatus, LibraryBook, User};
use crate::error::{AppError, Result};
use crate::server::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
};
use serde::{Deserialize, Serialize};

// ============================================================================
// AUTH API
// ============================================================================

/// Register request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    nickname: String,
    bio: Option<String>,
}

/// Login request. Either email or username identifies the account.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    username: Option<String>,
    #[serde(default)]
    password: String,
}

/// User plus freshly issued token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    user: User,
    token: String,
}

/// Current user envelope.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    user: User,
}

/// Register a new account.
pub async fn auth_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let (user, token) = state.auth.register(
        &req.email,
        &req.password,
        &req.username,
        &req.nickname,
        req.bio.as_deref(),
    )?;

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

/// Login with email or username.
pub async fn auth_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let identifier = req.email.or(req.username).unwrap_or_default();
    let (user, token) = state.auth.login(&identifier, &req.password)?;

    Ok(Json(AuthResponse { user, token }))
}

/// Get current user info (live store record, not token snapshot).
pub async fn auth_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>> {
    let user = get_authenticated_user(&state, &headers)?;
    Ok(Json(UserResponse { user }))
}

/// Profile update request.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    nickname: Option<String>,
    bio: Option<String>,
}

/// Update nickname and/or bio.
pub async fn auth_update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<UserResponse>> {
    let user = get_authenticated_user(&state, &headers)?;
    let user = state
        .auth
        .update_profile(user.id, req.nickname.as_deref(), req.bio.as_deref())?;

    Ok(Json(UserResponse { user }))
}

/// Password change request.
#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
    #[serde(default)]
    confirm_password: String,
}

/// Mutation acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

/// Change the account password.
pub async fn auth_change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PasswordChangeRequest>,
) -> Result<Json<MessageResponse>> {
    let user = get_authenticated_user(&state, &headers)?;
    state.auth.change_password(
        user.id,
        &req.current_password,
        &req.new_password,
        &req.confirm_password,
    )?;

    Ok(Json(MessageResponse {
        message: "Password changed".to_string(),
    }))
}

// ============================================================================
// BOOKS API
// ============================================================================

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

/// Book list envelope.
#[derive(Debug, Serialize)]
pub struct BooksResponse {
    books: Vec<Book>,
}

/// Single book envelope.
#[derive(Debug, Serialize)]
pub struct BookResponse {
    book: Book,
}

/// Live catalog search; every result is written through to the mirror.
pub async fn books_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<BooksResponse>> {
    let books = state.mirror.search(&params.q).await?;
    Ok(Json(BooksResponse { books }))
}

/// Search only the local mirror by title substring.
pub async fn books_search_cached(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<BooksResponse>> {
    let books = state.mirror.search_cached(&params.q).await?;
    Ok(Json(BooksResponse { books }))
}

/// Book detail, mirror first.
pub async fn books_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookResponse>> {
    let book = state.mirror.get_by_id(&id).await?;
    Ok(Json(BookResponse { book }))
}

// ============================================================================
// LIBRARY API
// ============================================================================

/// Library list envelope.
#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    books: Vec<LibraryBook>,
}

/// Add-to-library request.
#[derive(Debug, Deserialize)]
pub struct LibraryAddRequest {
    status: Option<String>,
    current_page: Option<i64>,
}

/// Library update request.
#[derive(Debug, Deserialize)]
pub struct LibraryUpdateRequest {
    status: Option<String>,
    current_page: Option<i64>,
}

/// Library mutation acknowledgement.
#[derive(Debug, Serialize)]
pub struct LibraryMessageResponse {
    message: String,
    book_id: String,
}

/// List the caller's library.
pub async fn library_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LibraryResponse>> {
    let user = get_authenticated_user(&state, &headers)?;
    let books = state.library.list(user.id)?;
    Ok(Json(LibraryResponse { books }))
}

/// Add a book to the caller's library.
pub async fn library_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
    Json(req): Json<LibraryAddRequest>,
) -> Result<(StatusCode, Json<LibraryMessageResponse>)> {
    let user = get_authenticated_user(&state, &headers)?;

    let status = req
        .status
        .ok_or_else(|| AppError::BadRequest("Status is required".to_string()))?;
    let status = LedgerStatus::parse(&status)?;

    state
        .library
        .add(user.id, &book_id, status, req.current_page)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LibraryMessageResponse {
            message: "Book added to your library".to_string(),
            book_id,
        }),
    ))
}

/// Update status and/or progress of a library entry.
pub async fn library_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
    Json(req): Json<LibraryUpdateRequest>,
) -> Result<Json<LibraryMessageResponse>> {
    let user = get_authenticated_user(&state, &headers)?;

    let status = req.status.as_deref().map(LedgerStatus::parse).transpose()?;

    state
        .library
        .update(user.id, &book_id, status, req.current_page)
        .await?;

    Ok(Json(LibraryMessageResponse {
        message: "Book updated in your library".to_string(),
        book_id,
    }))
}

/// Remove a book from the caller's library.
pub async fn library_remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
) -> Result<Json<LibraryMessageResponse>> {
    let user = get_authenticated_user(&state, &headers)?;
    state.library.remove(user.id, &book_id)?;

    Ok(Json(LibraryMessageResponse {
        message: "Book removed from your library".to_string(),
        book_id,
    }))
}

// ============================================================================
// HELPERS
// ============================================================================

/// Extract token from Authorization header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Get authenticated user from the bearer token.
fn get_authenticated_user(state: &AppState, headers: &HeaderMap) -> Result<User> {
    let token = extract_token(headers).ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid authorization header".to_string())
    })?;

    state.auth.current_user(&token)
}
