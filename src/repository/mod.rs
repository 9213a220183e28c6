//! Repository layer for backend table operations

pub mod books;

use std::sync::Arc;

use crate::backend::TableBackend;

/// Main repository struct holding the backend handle
#[derive(Clone)]
pub struct Repository {
    pub books: books::BooksRepository,
}

impl Repository {
    /// Create a new repository over the given table backend
    pub fn new(backend: Arc<dyn TableBackend>, books_table: &str) -> Self {
        Self {
            books: books::BooksRepository::new(backend, books_table),
        }
    }
}
