//! Narrow interface to the hosted table store.
//!
//! The catalog only ever needs filtered, ordered, range-limited reads and
//! exact-count reads against a single table, so the backend surface is one
//! trait with one method. [`rest::RestBackend`] speaks the PostgREST-style
//! HTTP dialect of the hosted service; [`memory::MemoryBackend`] implements
//! the same semantics in process for tests and local development.

pub mod memory;
pub mod rest;

use async_trait::async_trait;

use crate::error::AppResult;

pub use memory::MemoryBackend;
pub use rest::RestBackend;

/// A single filter condition on a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Exact equality
    Eq { column: String, value: String },
    /// Exact inequality
    Neq { column: String, value: String },
    /// Case-insensitive substring match
    ILike { column: String, needle: String },
}

/// Ordering on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub column: String,
    pub descending: bool,
}

/// Inclusive row window `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub from: u64,
    pub to: u64,
}

/// Whether the backend should compute the exact number of rows matching the
/// predicate (independent of the requested window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountMode {
    #[default]
    None,
    Exact,
}

/// One read request against a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    pub predicates: Vec<Predicate>,
    pub order: Vec<Ordering>,
    pub range: Option<RowRange>,
    pub limit: Option<u32>,
    pub count: CountMode,
    /// Count-only request: no row payload is returned.
    pub head: bool,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn neq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Neq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn ilike(mut self, column: &str, needle: impl Into<String>) -> Self {
        self.predicates.push(Predicate::ILike {
            column: column.to_string(),
            needle: needle.into(),
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push(Ordering {
            column: column.to_string(),
            descending: true,
        });
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order.push(Ordering {
            column: column.to_string(),
            descending: false,
        });
        self
    }

    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some(RowRange { from, to });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn count_exact(mut self) -> Self {
        self.count = CountMode::Exact;
        self
    }

    /// Request the count only; the row payload is dropped server-side.
    pub fn head_only(mut self) -> Self {
        self.head = true;
        self
    }
}

/// Raw query response: JSON rows plus the exact count when one was requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRows {
    pub rows: Vec<serde_json::Value>,
    pub count: Option<u64>,
}

/// The capability set the catalog depends on. Any relational/table store that
/// can satisfy it will do; the concrete product behind it is invisible to the
/// repository layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableBackend: Send + Sync {
    async fn query(&self, table: &str, query: TableQuery) -> AppResult<TableRows>;
}
