//! Configuration management for the Pustaka catalog client

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Base URL of the hosted table store, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// API key sent as `apikey` and bearer token on every request
    pub api_key: String,
    /// Table holding the catalog records
    pub table: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Books per result page
    pub page_size: u32,
    /// Related-titles cap on the detail view
    pub related_limit: u32,
    /// Quiescence window before raw search input is committed, in milliseconds
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CatalogConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix PUSTAKA_)
            .add_source(
                Environment::with_prefix("PUSTAKA")
                    .separator("_")
                    .try_parsing(true),
            )
            // Override backend URL from SUPABASE_URL env var if present
            .set_override_option("backend.url", env::var("SUPABASE_URL").ok())?
            // Override API key from SUPABASE_ANON_KEY env var if present
            .set_override_option("backend.api_key", env::var("SUPABASE_ANON_KEY").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            table: "books".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: 12,
            related_limit: 4,
            debounce_ms: 500,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
