//! Book (catalog record) model and search value objects.
//!
//! Records live in a single hosted `books` table; this crate only ever reads
//! them. The canonical ordering everywhere is `created_at` descending with
//! `id` ascending as the tie-break, so result pages are stable across calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Books per page when a search request does not say otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// A catalog record.
///
/// `url` points at the PDF payload rendered by the viewer, `cover_url` at the
/// cover image shown on list pages. Both are plain references into external
/// storage; the catalog never fetches them itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub cover_url: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Search request shape.
///
/// `page` is 1-indexed. A missing or whitespace-only `query` means
/// "no title filter". The raw value (not the normalized one) is used as the
/// cache key, so any field change produces a fresh fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookFilters {
    pub query: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl BookFilters {
    /// Effective page number (1-indexed, never 0).
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Effective page size.
    pub fn limit(&self) -> u32 {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    /// Query text prepared for matching: trimmed, lower-cased, empty → None.
    pub fn normalized_query(&self) -> Option<String> {
        let query = self.query.as_deref()?.trim().to_lowercase();
        if query.is_empty() {
            None
        } else {
            Some(query)
        }
    }

    /// Inclusive row range `[from, to]` selected by `page` and `limit`.
    pub fn row_range(&self) -> (u64, u64) {
        let limit = self.limit() as u64;
        let from = (self.page() as u64 - 1) * limit;
        (from, from + limit - 1)
    }
}

/// One page of search results plus the pagination totals derived from the
/// exact match count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookSearchResult {
    pub books: Vec<Book>,
    pub total: u64,
    pub total_pages: u64,
}

impl BookSearchResult {
    /// The degraded value returned when a backend request fails. Note
    /// `total_pages` is 0 here, while a successful empty search reports 1.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `max(1, ceil(total / limit))`; an empty catalog still has one page.
    pub fn page_count(total: u64, limit: u32) -> u64 {
        let limit = limit.max(1) as u64;
        (total.div_ceil(limit)).max(1)
    }
}

/// Clamp a requested page to the available range, so a stale page number
/// (e.g. after a narrower search shrank the result) still lands on a page
/// that exists.
pub fn clamp_page(page: u32, total_pages: u64) -> u32 {
    let last = total_pages.max(1).min(u32::MAX as u64) as u32;
    page.clamp(1, last)
}
