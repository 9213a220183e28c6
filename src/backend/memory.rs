//! In-memory table backend.
//!
//! Implements the same predicate / ordering / range / count semantics as the
//! hosted store against a plain vector of JSON rows. Used by the test suite
//! and handy for local development without network access. The instance
//! counts queries served (to assert cache dedup) and can be switched into a
//! failing mode (to exercise degrade-to-empty paths).

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering},
    RwLock,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    backend::{CountMode, Predicate, TableBackend, TableQuery, TableRows},
    error::{AppError, AppResult},
    models::Book,
};

#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: RwLock<Vec<Value>>,
    queries_served: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            rows: RwLock::new(rows),
            ..Default::default()
        }
    }

    /// Seed from typed records; panics only on a non-serializable book, which
    /// cannot happen for the plain field types involved.
    pub fn seed_books(books: &[Book]) -> Self {
        let rows = books
            .iter()
            .map(|book| serde_json::to_value(book).expect("Book serializes to JSON"))
            .collect();
        Self::with_rows(rows)
    }

    pub fn insert(&self, row: Value) {
        self.rows.write().expect("rows lock poisoned").push(row);
    }

    /// Number of queries answered so far, including failed ones.
    pub fn queries_served(&self) -> usize {
        self.queries_served.load(AtomicOrdering::SeqCst)
    }

    /// When failing, every query returns a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl TableBackend for MemoryBackend {
    async fn query(&self, _table: &str, query: TableQuery) -> AppResult<TableRows> {
        self.queries_served.fetch_add(1, AtomicOrdering::SeqCst);

        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(AppError::backend(503, "memory backend is in failing mode"));
        }

        let mut matched: Vec<Value> = self
            .rows
            .read()
            .expect("rows lock poisoned")
            .iter()
            .filter(|row| query.predicates.iter().all(|p| matches(row, p)))
            .cloned()
            .collect();

        sort_rows(&mut matched, &query);

        // The exact count covers every matching row, not just the window.
        let count = match query.count {
            CountMode::Exact => Some(matched.len() as u64),
            CountMode::None => None,
        };

        if let Some(range) = query.range {
            let from = (range.from as usize).min(matched.len());
            let to = ((range.to + 1) as usize).min(matched.len());
            matched = matched[from..to].to_vec();
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit as usize);
        }

        if query.head {
            matched.clear();
        }

        Ok(TableRows {
            rows: matched,
            count,
        })
    }
}

fn matches(row: &Value, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Eq { column, value } => column_text(row, column) == *value,
        Predicate::Neq { column, value } => column_text(row, column) != *value,
        Predicate::ILike { column, needle } => column_text(row, column)
            .to_lowercase()
            .contains(&needle.to_lowercase()),
    }
}

fn sort_rows(rows: &mut [Value], query: &TableQuery) {
    rows.sort_by(|a, b| {
        for ordering in &query.order {
            let left = column_text(a, &ordering.column);
            let right = column_text(b, &ordering.column);
            let cmp = if ordering.descending {
                right.cmp(&left)
            } else {
                left.cmp(&right)
            };
            if cmp != std::cmp::Ordering::Equal {
                return cmp;
            }
        }
        std::cmp::Ordering::Equal
    });
}

// RFC 3339 timestamps and UUIDs compare correctly as strings, which is all
// the catalog ever orders by.
fn column_text(row: &Value, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend() -> MemoryBackend {
        MemoryBackend::with_rows(vec![
            json!({"id": "a", "title": "FooBar", "created_at": "2024-03-01T00:00:00Z"}),
            json!({"id": "b", "title": "barfoo", "created_at": "2024-02-01T00:00:00Z"}),
            json!({"id": "c", "title": "fo o", "created_at": "2024-01-01T00:00:00Z"}),
            json!({"id": "d", "title": "Dune", "created_at": "2024-03-01T00:00:00Z"}),
        ])
    }

    fn titles(rows: &TableRows) -> Vec<String> {
        rows.rows
            .iter()
            .map(|row| column_text(row, "title"))
            .collect()
    }

    #[tokio::test]
    async fn ilike_is_case_insensitive_substring() {
        let backend = backend();
        let rows = backend
            .query("books", TableQuery::new().ilike("title", "foo"))
            .await
            .unwrap();
        assert_eq!(titles(&rows), vec!["FooBar", "barfoo"]);
    }

    #[tokio::test]
    async fn ordering_applies_tie_break_columns() {
        let backend = backend();
        let rows = backend
            .query(
                "books",
                TableQuery::new().order_desc("created_at").order_asc("id"),
            )
            .await
            .unwrap();
        // a and d share a timestamp; id ascending puts a first.
        assert_eq!(titles(&rows), vec!["FooBar", "Dune", "barfoo", "fo o"]);
    }

    #[tokio::test]
    async fn range_windows_and_count_cover_all_matches() {
        let backend = backend();
        let rows = backend
            .query(
                "books",
                TableQuery::new()
                    .order_asc("id")
                    .range(1, 2)
                    .count_exact(),
            )
            .await
            .unwrap();
        assert_eq!(rows.count, Some(4));
        assert_eq!(titles(&rows), vec!["barfoo", "fo o"]);
    }

    #[tokio::test]
    async fn out_of_range_window_is_empty_not_an_error() {
        let backend = backend();
        let rows = backend
            .query("books", TableQuery::new().range(10, 19))
            .await
            .unwrap();
        assert!(rows.rows.is_empty());
    }

    #[tokio::test]
    async fn head_query_drops_rows_but_keeps_count() {
        let backend = backend();
        let rows = backend
            .query(
                "books",
                TableQuery::new().ilike("title", "foo").count_exact().head_only(),
            )
            .await
            .unwrap();
        assert_eq!(rows.count, Some(2));
        assert!(rows.rows.is_empty());
    }

    #[tokio::test]
    async fn failing_mode_returns_backend_error() {
        let backend = backend();
        backend.set_failing(true);
        let result = backend.query("books", TableQuery::new()).await;
        assert!(result.is_err());
        assert_eq!(backend.queries_served(), 1);
    }
}
