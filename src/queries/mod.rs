//! Query-bound caching layer over the books repository.
//!
//! The front end's counterpart to its data hooks: each repository operation
//! is memoized by a structured key with single-flight semantics, so
//! re-rendering views never duplicates a network call for parameters that
//! were already fetched. Results are exposed as [`QueryState`] snapshots.

pub mod cache;
pub mod debounce;
pub mod session;

pub use cache::{QueryCache, QueryState};
pub use debounce::DebouncedInput;
pub use session::SearchSession;

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    models::{Book, BookFilters, BookSearchResult},
    repository::books::BooksRepository,
};

/// Cached, deduplicated access to every catalog read.
#[derive(Clone)]
pub struct BookQueries {
    repository: BooksRepository,
    all_books: Arc<QueryCache<(), Vec<Book>>>,
    book_by_id: Arc<QueryCache<String, Option<Book>>>,
    search: Arc<QueryCache<BookFilters, BookSearchResult>>,
    related: Arc<QueryCache<(Uuid, u32), Vec<Book>>>,
}

impl BookQueries {
    pub fn new(repository: BooksRepository) -> Self {
        Self {
            repository,
            all_books: Arc::new(QueryCache::new()),
            book_by_id: Arc::new(QueryCache::new()),
            search: Arc::new(QueryCache::new()),
            related: Arc::new(QueryCache::new()),
        }
    }

    /// The whole catalog, one shared cache entry.
    pub async fn all_books(&self) -> QueryState<Vec<Book>> {
        let repository = self.repository.clone();
        let books = self
            .all_books
            .fetch((), || async move { repository.get_all_books().await })
            .await;
        QueryState::Ready(books)
    }

    /// One book, keyed by id. Disabled (no call issued) while the id is
    /// absent, e.g. before a route parameter is available.
    pub async fn book(&self, id: Option<&str>) -> QueryState<Option<Book>> {
        let Some(id) = id else {
            return QueryState::Idle;
        };

        let repository = self.repository.clone();
        let lookup = id.to_string();
        let book = self
            .book_by_id
            .fetch(id.to_string(), || async move {
                repository.get_book_by_id(&lookup).await
            })
            .await;
        QueryState::Ready(book)
    }

    /// Paged search, keyed by the full filters object: any change to query
    /// text, page or limit is a distinct cache entry.
    pub async fn search(&self, filters: &BookFilters) -> QueryState<BookSearchResult> {
        let repository = self.repository.clone();
        let request = filters.clone();
        let result = self
            .search
            .fetch(filters.clone(), || async move {
                repository.search_books(&request).await
            })
            .await;
        QueryState::Ready(result)
    }

    /// Related titles for a detail view, keyed by source id and limit.
    /// Disabled until a book is available.
    pub async fn related_books(&self, book: Option<&Book>, limit: u32) -> QueryState<Vec<Book>> {
        let Some(book) = book else {
            return QueryState::Idle;
        };

        let repository = self.repository.clone();
        let source = book.clone();
        let books = self
            .related
            .fetch((book.id, limit), || async move {
                repository.get_related_books(&source, limit).await
            })
            .await;
        QueryState::Ready(books)
    }

    /// Observe the search entry for `filters` without fetching.
    pub async fn peek_search(&self, filters: &BookFilters) -> QueryState<BookSearchResult> {
        self.search.peek(filters).await
    }

    /// Observe the by-id entry for `id` without fetching.
    pub async fn peek_book(&self, id: &str) -> QueryState<Option<Book>> {
        self.book_by_id.peek(&id.to_string()).await
    }

    /// Drop every cached result; subsequent calls refetch.
    pub async fn invalidate_all(&self) {
        self.all_books.clear().await;
        self.book_by_id.clear().await;
        self.search.clear().await;
        self.related.clear().await;
    }
}
