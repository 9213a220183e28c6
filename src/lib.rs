//! Pustaka Digital Library catalog data layer
//!
//! Typed, cached, read-only access to the hosted `books` table behind the
//! catalog front end: browse, paged title search, single-record lookup and
//! related titles, plus the debounced search-input stage the list view uses.
//! Rendering (including the PDF viewer fed by each book's `url`) lives in
//! the consuming application.

use std::sync::Arc;
use std::time::Duration;

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod queries;
pub mod repository;

pub use config::CatalogConfig;
pub use error::{AppError, AppResult};
pub use models::{Book, BookFilters, BookSearchResult};
pub use queries::{BookQueries, QueryState, SearchSession};

/// Catalog handle shared across the whole front end
#[derive(Clone)]
pub struct Catalog {
    pub config: Arc<CatalogConfig>,
    pub queries: BookQueries,
}

impl Catalog {
    /// Connect to the configured hosted backend.
    pub fn new(config: CatalogConfig) -> AppResult<Self> {
        let backend = Arc::new(backend::RestBackend::new(&config.backend)?);
        Ok(Self::with_backend(config, backend))
    }

    /// Build over any table backend (tests, local development).
    pub fn with_backend(config: CatalogConfig, backend: Arc<dyn backend::TableBackend>) -> Self {
        let repository = repository::Repository::new(backend, &config.backend.table);
        Self {
            queries: BookQueries::new(repository.books),
            config: Arc::new(config),
        }
    }

    /// Load `.env` and the configuration, then connect.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        let config = CatalogConfig::load()?;
        Self::new(config)
    }

    /// Fresh browse state wired to the configured page size and debounce
    /// window.
    pub fn search_session(&self) -> SearchSession {
        SearchSession::new(
            self.config.search.page_size,
            Duration::from_millis(self.config.search.debounce_ms),
        )
    }
}
