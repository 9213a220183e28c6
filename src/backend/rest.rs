//! PostgREST-dialect HTTP backend.
//!
//! The hosted table store exposes each table at `{base}/rest/v1/{table}` and
//! encodes predicates as query parameters (`title=ilike.*dune*`), ordering as
//! `order=created_at.desc,id.asc`, the row window as a `Range` header and the
//! exact match count in the `Content-Range` response header when asked for
//! via `Prefer: count=exact`. Count-only queries use the HEAD method.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_RANGE, RANGE},
    Client, Method,
};

use crate::{
    backend::{CountMode, Predicate, TableBackend, TableQuery, TableRows},
    config::BackendConfig,
    error::{AppError, AppResult},
};

// One HTTP client for the whole process; connection pools are shared across
// every backend handle.
static HTTP_CLIENT: OnceCell<Client> = OnceCell::new();

#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> AppResult<Self> {
        let client = HTTP_CLIENT
            .get_or_try_init(|| Client::builder().build())?
            .clone();

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }
}

#[async_trait]
impl TableBackend for RestBackend {
    async fn query(&self, table: &str, query: TableQuery) -> AppResult<TableRows> {
        let method = if query.head { Method::HEAD } else { Method::GET };
        let url = self.table_url(table);

        tracing::debug!("{} {} ({} predicates)", method, url, query.predicates.len());

        let mut request = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(ACCEPT, "application/json")
            .query(&query_params(&query));

        if let Some(range) = query.range {
            request = request
                .header("Range-Unit", "items")
                .header(RANGE, format!("{}-{}", range.from, range.to));
        }

        if query.count == CountMode::Exact {
            request = request.header("Prefer", "count=exact");
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::backend(status.as_u16(), message));
        }

        let count = match query.count {
            CountMode::Exact => {
                let header = response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| {
                        AppError::BadResponse(
                            "exact count requested but Content-Range header is missing".to_string(),
                        )
                    })?;
                Some(parse_content_range(header)?)
            }
            CountMode::None => None,
        };

        let rows = if query.head {
            Vec::new()
        } else {
            response.json().await?
        };

        Ok(TableRows { rows, count })
    }
}

/// Encode predicates, ordering and limit as PostgREST query parameters.
fn query_params(query: &TableQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    for predicate in &query.predicates {
        let (column, operand) = match predicate {
            Predicate::Eq { column, value } => (column, format!("eq.{}", value)),
            Predicate::Neq { column, value } => (column, format!("neq.{}", value)),
            Predicate::ILike { column, needle } => (column, format!("ilike.*{}*", needle)),
        };
        params.push((column.clone(), operand));
    }

    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|o| {
                format!(
                    "{}.{}",
                    o.column,
                    if o.descending { "desc" } else { "asc" }
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }

    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

/// Extract the total from a `Content-Range` value such as `0-11/57`,
/// `items 0-11/57` or `*/0`.
fn parse_content_range(value: &str) -> AppResult<u64> {
    let total = value
        .rsplit('/')
        .next()
        .ok_or_else(|| bad_content_range(value))?;
    total.trim().parse().map_err(|_| bad_content_range(value))
}

fn bad_content_range(value: &str) -> AppError {
    AppError::BadResponse(format!("unparseable Content-Range '{}'", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_encodes_all_params() {
        let query = TableQuery::new()
            .ilike("title", "dune")
            .order_desc("created_at")
            .order_asc("id")
            .limit(4);

        let params = query_params(&query);
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("title".to_string(), "ilike.*dune*".to_string()),
                ("order".to_string(), "created_at.desc,id.asc".to_string()),
                ("limit".to_string(), "4".to_string()),
            ]
        );
    }

    #[test]
    fn eq_and_neq_predicates_encode_operands() {
        let query = TableQuery::new().eq("id", "abc").neq("id", "def");
        let params = query_params(&query);
        assert_eq!(params[1], ("id".to_string(), "eq.abc".to_string()));
        assert_eq!(params[2], ("id".to_string(), "neq.def".to_string()));
    }

    #[test]
    fn content_range_totals_parse() {
        assert_eq!(parse_content_range("0-11/57").unwrap(), 57);
        assert_eq!(parse_content_range("items 0-11/57").unwrap(), 57);
        assert_eq!(parse_content_range("*/0").unwrap(), 0);
        assert!(parse_content_range("0-11/*").is_err());
        assert!(parse_content_range("garbage").is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = RestBackend::new(&BackendConfig {
            url: "https://example.supabase.co/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            backend.table_url("books"),
            "https://example.supabase.co/rest/v1/books"
        );
    }
}
