//! Shared application state.

use crate::auth::AuthService;
use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::db::Database;
use crate::library::LibraryService;
use crate::mirror::CatalogMirror;
use crate::token::TokenService;

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Database handle.
    pub db: Database,
    /// Authentication service.
    pub auth: AuthService,
    /// Catalog mirror (search and read-through cache).
    pub mirror: CatalogMirror,
    /// Per-user library ledger.
    pub library: LibraryService,
}

impl AppState {
    /// Wire up all services from configuration and an open database.
    pub fn new(config: Config, db: Database) -> Self {
        let tokens = TokenService::new(&config.auth.token_secret, config.auth.token_days);
        let auth = AuthService::new(db.clone(), tokens, config.auth.lockout_window_seconds);

        let client = CatalogClient::new(&config.catalog.base_url, config.catalog.api_key.clone());
        let mirror = CatalogMirror::new(db.clone(), client);
        let library = LibraryService::new(db.clone(), mirror.clone());

        Self {
            config,
            db,
            auth,
            mirror,
            library,
        }
    }
}
