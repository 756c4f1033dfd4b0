//! Remote book catalog: ISBN lookups and raw image downloads.

pub mod images;
pub mod volumes;

use reqwest::Client;
use thiserror::Error;

pub use volumes::{CatalogItem, CatalogResponse, ImageLinks};

pub const DEFAULT_API_ROOT: &str = "https://www.googleapis.com/books/v1";

/// Every variant is transient from the pipeline's point of view and is retried.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    Deserialize(String),
}

/// Read-only view of the catalog used by the resolution pipeline.
pub trait Catalog {
    async fn lookup(&self, isbn: &str) -> Result<CatalogResponse, CatalogError>;
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CatalogError>;
}

#[derive(Debug, Clone)]
pub struct BooksCatalog {
    api_root: String,
    http: Client,
}

impl BooksCatalog {
    pub fn new(api_root: &str, http: Client) -> Self {
        Self {
            api_root: api_root.trim_end_matches('/').to_string(),
            http,
        }
    }
}

impl Catalog for BooksCatalog {
    async fn lookup(&self, isbn: &str) -> Result<CatalogResponse, CatalogError> {
        volumes::search_by_isbn(&self.http, &self.api_root, isbn).await
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        images::download_image(&self.http, url).await
    }
}
