//! External book catalog client.
//!
//! Read-only HTTP lookups against a Google-Books-shaped volumes API. The
//! catalog is treated as unreliable: every call is attempted once, and
//! transport or decode failures become gateway errors instead of crashing
//! the request.

pub mod volume;

pub use volume::VolumeRecord;

use crate::error::{AppError, Result};

/// HTTP client for the external catalog.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CatalogClient {
    /// Create a client. Base URL and API key come from configuration.
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Free-text volume search. Returns the raw catalog records.
    pub async fn search_volumes(&self, term: &str) -> Result<Vec<VolumeRecord>> {
        let url = format!("{}/volumes", self.base_url);
        let mut query: Vec<(&str, &str)> = vec![("q", term)];
        if let Some(key) = &self.api_key {
            query.push(("key", key));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::BadGateway(format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::BadGateway(format!(
                "Catalog returned {}",
                response.status()
            )));
        }

        let body: volume::SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::BadGateway(format!("Malformed search response: {}", e)))?;

        Ok(body.items.unwrap_or_default())
    }

    /// Fetch a single volume by catalog ID. `None` when the catalog does not
    /// know the ID.
    pub async fn fetch_volume(&self, id: &str) -> Result<Option<VolumeRecord>> {
        let url = format!("{}/volumes/{}", self.base_url, id);
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(key) = &self.api_key {
            query.push(("key", key));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::BadGateway(format!("Volume request failed: {}", e)))?;

        if !response.status().is_success() {
            tracing::debug!(id, status = %response.status(), "Volume not found in catalog");
            return Ok(None);
        }

        let record: VolumeRecord = response
            .json()
            .await
            .map_err(|e| AppError::BadGateway(format!("Malformed volume response: {}", e)))?;

        Ok(Some(record))
    }
}
