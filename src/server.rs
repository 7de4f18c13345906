//! HTTP server and routes.

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth_register))
        .route("/login", post(handlers::auth_login))
        .route("/me", get(handlers::auth_me))
        .route("/profile", put(handlers::auth_update_profile))
        .route("/password", put(handlers::auth_change_password));

    let book_routes = Router::new()
        .route("/", get(handlers::books_search))
        .route("/cached", get(handlers::books_search_cached))
        .route("/{id}", get(handlers::books_get));

    let library_routes = Router::new()
        .route("/", get(handlers::library_list))
        .route("/{id}", post(handlers::library_add))
        .route("/{id}", put(handlers::library_update))
        .route("/{id}", delete(handlers::library_remove));

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/books", book_routes)
        .nest("/library", library_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
