//! Browse-state session for a catalog list view.
//!
//! Holds the committed `BookFilters` the UI is currently rendering. Raw
//! search-box edits go through the debounce stage and reset the page to 1;
//! page navigation commits immediately. Consumers watch the committed
//! filters and feed each change into [`BookQueries::search`].
//!
//! [`BookQueries::search`]: crate::queries::BookQueries::search

use std::time::Duration;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::models::BookFilters;
use crate::queries::debounce::DebouncedInput;

pub struct SearchSession {
    input: DebouncedInput<BookFilters>,
    limit: u32,
}

impl SearchSession {
    pub fn new(page_size: u32, window: Duration) -> Self {
        let initial = BookFilters {
            query: None,
            page: Some(1),
            limit: Some(page_size),
        };
        Self {
            input: DebouncedInput::new(initial, window),
            limit: page_size,
        }
    }

    /// Feed a raw search-box edit. Commits after the quiescence window,
    /// back on page 1. Re-submitting the committed text is a no-op.
    pub fn edit_query(&self, text: &str) {
        let current = self.input.current();
        if current.query.as_deref().unwrap_or("") == text {
            return;
        }
        self.input.submit(BookFilters {
            query: (!text.is_empty()).then(|| text.to_string()),
            page: Some(1),
            limit: Some(self.limit),
        });
    }

    /// Jump to a page of the current query. Takes effect immediately.
    pub fn set_page(&self, page: u32) {
        let mut filters = self.input.current();
        filters.page = Some(page.max(1));
        self.input.commit_now(filters);
    }

    /// The committed filters.
    pub fn filters(&self) -> BookFilters {
        self.input.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<BookFilters> {
        self.input.subscribe()
    }

    /// Committed filters as a `Stream`, starting from the current value.
    pub fn stream(&self) -> WatchStream<BookFilters> {
        self.input.stream()
    }
}
