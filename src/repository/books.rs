//! Books repository: read-only queries against the hosted books table.
//!
//! Every operation here is idempotent, so error recovery defaults to "empty":
//! backend failures are logged and collapsed into an empty value at this
//! boundary, and callers never see a transport error. "Not found" for a
//! single-record lookup is `None`, which is a distinct state from a failure.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    backend::{TableBackend, TableQuery, TableRows},
    error::{AppError, AppResult},
    models::{Book, BookFilters, BookSearchResult},
};

#[derive(Clone)]
pub struct BooksRepository {
    backend: Arc<dyn TableBackend>,
    table: String,
}

impl BooksRepository {
    pub fn new(backend: Arc<dyn TableBackend>, table: &str) -> Self {
        Self {
            backend,
            table: table.to_string(),
        }
    }

    // Newest first; id ascending keeps rows with the same timestamp in a
    // fixed order across calls.
    fn ordered() -> TableQuery {
        TableQuery::new().order_desc("created_at").order_asc("id")
    }

    /// Fetch the whole catalog, newest first.
    pub async fn get_all_books(&self) -> Vec<Book> {
        match self.try_get_all_books().await {
            Ok(books) => books,
            Err(error) => {
                tracing::error!("Error fetching books: {}", error);
                Vec::new()
            }
        }
    }

    async fn try_get_all_books(&self) -> AppResult<Vec<Book>> {
        let result = self.backend.query(&self.table, Self::ordered()).await?;
        rows_to_books(result)
    }

    /// Fetch a single book by id. Malformed ids, missing rows and backend
    /// errors all surface as `None`.
    pub async fn get_book_by_id(&self, id: &str) -> Option<Book> {
        let id = match Uuid::parse_str(id.trim()) {
            Ok(id) => id,
            Err(_) => {
                tracing::debug!("Skipping lookup for malformed book id '{}'", id);
                return None;
            }
        };

        match self.try_get_book_by_id(id).await {
            Ok(book) => book,
            Err(error) => {
                tracing::error!("Error fetching book {}: {}", id, error);
                None
            }
        }
    }

    async fn try_get_book_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        // limit 2 so a duplicated id is detectable without pulling the table
        let result = self
            .backend
            .query(
                &self.table,
                TableQuery::new().eq("id", id.to_string()).limit(2),
            )
            .await?;

        if result.rows.len() > 1 {
            return Err(AppError::BadResponse(format!(
                "multiple rows share book id {}",
                id
            )));
        }

        result
            .rows
            .into_iter()
            .next()
            .map(|row| serde_json::from_value(row).map_err(AppError::from))
            .transpose()
    }

    /// Search the catalog with an optional title filter and pagination.
    ///
    /// The exact count and the page of rows are requested concurrently; if
    /// either request fails the whole result degrades to the empty value
    /// rather than reporting a page inconsistent with its total.
    pub async fn search_books(&self, filters: &BookFilters) -> BookSearchResult {
        match self.try_search_books(filters).await {
            Ok(result) => result,
            Err(error) => {
                tracing::error!("Error searching books: {}", error);
                BookSearchResult::empty()
            }
        }
    }

    async fn try_search_books(&self, filters: &BookFilters) -> AppResult<BookSearchResult> {
        let limit = filters.limit();
        let (from, to) = filters.row_range();

        let mut count_query = TableQuery::new().count_exact().head_only();
        let mut data_query = Self::ordered().range(from, to);
        if let Some(needle) = filters.normalized_query() {
            count_query = count_query.ilike("title", needle.clone());
            data_query = data_query.ilike("title", needle);
        }

        let (count_result, data_result) = tokio::join!(
            self.backend.query(&self.table, count_query),
            self.backend.query(&self.table, data_query),
        );

        let total = count_result?.count.unwrap_or(0);
        let books = rows_to_books(data_result?)?;

        Ok(BookSearchResult {
            books,
            total,
            total_pages: BookSearchResult::page_count(total, limit),
        })
    }

    /// Fetch up to `limit` other titles for the detail view, newest first.
    pub async fn get_related_books(&self, book: &Book, limit: u32) -> Vec<Book> {
        match self.try_get_related_books(book, limit).await {
            Ok(books) => books,
            Err(error) => {
                tracing::error!("Error fetching related books: {}", error);
                Vec::new()
            }
        }
    }

    async fn try_get_related_books(&self, book: &Book, limit: u32) -> AppResult<Vec<Book>> {
        let result = self
            .backend
            .query(
                &self.table,
                Self::ordered().neq("id", book.id.to_string()).limit(limit),
            )
            .await?;
        rows_to_books(result)
    }
}

fn rows_to_books(result: TableRows) -> AppResult<Vec<Book>> {
    result
        .rows
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(AppError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, MockTableBackend, TableRows};
    use chrono::{TimeZone, Utc};

    fn book(n: u128, title: &str, day: u32) -> Book {
        let stamp = Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap();
        Book {
            id: Uuid::from_u128(n),
            title: title.to_string(),
            cover_url: format!("https://cdn.example.org/covers/{}.jpg", n),
            url: format!("https://cdn.example.org/books/{}.pdf", n),
            created_at: stamp,
            updated_at: stamp,
        }
    }

    fn repository_with(books: &[Book]) -> (Arc<MemoryBackend>, BooksRepository) {
        let backend = Arc::new(MemoryBackend::seed_books(books));
        let repository = BooksRepository::new(backend.clone(), "books");
        (backend, repository)
    }

    fn titles(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.title.as_str()).collect()
    }

    #[tokio::test]
    async fn get_all_books_orders_newest_first() {
        let (_, repository) =
            repository_with(&[book(1, "Oldest", 1), book(2, "Newest", 20), book(3, "Middle", 10)]);
        let books = repository.get_all_books().await;
        assert_eq!(titles(&books), vec!["Newest", "Middle", "Oldest"]);
    }

    #[tokio::test]
    async fn search_matches_title_substring_case_insensitively() {
        let (_, repository) = repository_with(&[
            book(1, "FooBar", 3),
            book(2, "barfoo", 2),
            book(3, "fo o", 1),
        ]);

        let result = repository
            .search_books(&BookFilters {
                query: Some("foo".to_string()),
                ..Default::default()
            })
            .await;

        assert_eq!(titles(&result.books), vec!["FooBar", "barfoo"]);
        assert_eq!(result.total, 2);
        assert_eq!(result.total_pages, 1);
    }

    #[tokio::test]
    async fn whitespace_query_is_equivalent_to_no_filter() {
        let (_, repository) = repository_with(&[book(1, "A", 1), book(2, "B", 2)]);

        let unfiltered = repository.search_books(&BookFilters::default()).await;
        let blank = repository
            .search_books(&BookFilters {
                query: Some("   ".to_string()),
                ..Default::default()
            })
            .await;

        assert_eq!(unfiltered, blank);
        assert_eq!(blank.total, 2);
        assert_eq!(titles(&blank.books), titles(&repository.get_all_books().await));
    }

    #[tokio::test]
    async fn search_pages_through_results() {
        let books: Vec<Book> = (1..=13).map(|n| book(n as u128, &format!("Book {:02}", n), n)).collect();
        let (_, repository) = repository_with(&books);

        let first = repository
            .search_books(&BookFilters {
                page: Some(1),
                limit: Some(12),
                ..Default::default()
            })
            .await;
        assert_eq!(first.books.len(), 12);
        assert_eq!(first.total, 13);
        assert_eq!(first.total_pages, 2);

        let second = repository
            .search_books(&BookFilters {
                page: Some(2),
                limit: Some(12),
                ..Default::default()
            })
            .await;
        assert_eq!(second.books.len(), 1);
        // Newest first: page 2 holds the single oldest title.
        assert_eq!(second.books[0].title, "Book 01");
    }

    #[tokio::test]
    async fn empty_search_still_reports_one_page() {
        let (_, repository) = repository_with(&[]);
        let result = repository
            .search_books(&BookFilters {
                query: Some("nothing".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(result.total, 0);
        assert_eq!(result.total_pages, 1);
        assert!(result.books.is_empty());
    }

    #[tokio::test]
    async fn search_is_idempotent() {
        let books: Vec<Book> = (1..=5).map(|n| book(n as u128, &format!("Book {}", n), n)).collect();
        let (_, repository) = repository_with(&books);
        let filters = BookFilters {
            query: Some("book".to_string()),
            page: Some(1),
            limit: Some(3),
        };

        let first = repository.search_books(&filters).await;
        let second = repository.search_books(&filters).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn backend_failure_degrades_search_to_the_empty_value() {
        let (backend, repository) = repository_with(&[book(1, "Kept", 1)]);
        backend.set_failing(true);

        let result = repository.search_books(&BookFilters::default()).await;
        assert_eq!(result, BookSearchResult::empty());
        assert_eq!(result.total_pages, 0);

        assert!(repository.get_all_books().await.is_empty());
        assert_eq!(repository.get_book_by_id(&Uuid::from_u128(1).to_string()).await, None);
    }

    #[tokio::test]
    async fn partial_failure_never_yields_a_partial_result() {
        // Count succeeds, data fails: the join must degrade the whole search.
        let mut backend = MockTableBackend::new();
        backend
            .expect_query()
            .withf(|_, query| query.head)
            .returning(|_, _| {
                Ok(TableRows {
                    rows: Vec::new(),
                    count: Some(40),
                })
            });
        backend
            .expect_query()
            .withf(|_, query| !query.head)
            .returning(|_, _| Err(AppError::backend(502, "upstream gone")));

        let repository = BooksRepository::new(Arc::new(backend), "books");
        let result = repository.search_books(&BookFilters::default()).await;
        assert_eq!(result, BookSearchResult::empty());
    }

    #[tokio::test]
    async fn get_book_by_id_finds_exactly_one_row() {
        let target = book(7, "Wanted", 5);
        let (_, repository) = repository_with(&[book(1, "Other", 1), target.clone()]);

        let found = repository.get_book_by_id(&target.id.to_string()).await;
        assert_eq!(found, Some(target));
    }

    #[tokio::test]
    async fn get_book_by_id_absent_is_none_not_an_error() {
        let (_, repository) = repository_with(&[book(1, "Only", 1)]);
        let missing = repository
            .get_book_by_id(&Uuid::from_u128(99).to_string())
            .await;
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn malformed_id_skips_the_backend_entirely() {
        let (backend, repository) = repository_with(&[book(1, "Only", 1)]);
        assert_eq!(repository.get_book_by_id("not-a-uuid").await, None);
        assert_eq!(backend.queries_served(), 0);
    }

    #[tokio::test]
    async fn related_books_exclude_the_source_and_respect_the_cap() {
        let books: Vec<Book> = (1..=6).map(|n| book(n as u128, &format!("Book {}", n), n)).collect();
        let source = books[0].clone();
        let (_, repository) = repository_with(&books);

        let related = repository.get_related_books(&source, 4).await;
        assert_eq!(related.len(), 4);
        assert!(related.iter().all(|b| b.id != source.id));
    }
}
