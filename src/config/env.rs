//! Runtime settings read from the environment (optionally seeded from `.env`).

use crate::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Process settings. Every field has a default so a bare environment still starts.
#[derive(Clone, Debug)]
pub struct Settings {
    /// `DATABASE_URL`, default `postgres://localhost/jsonapi`.
    pub database_url: String,
    /// `JSONAPI_SCHEMA_DIR`: directory holding `models.json` and `resources.json`.
    pub schema_dir: String,
    /// `JSONAPI_URL_PREFIX`: prefix for generated links, e.g. `http://localhost:3000/api/v1`.
    pub url_prefix: String,
    /// `JSONAPI_PAGE_SIZE`
    pub page_size: u32,
    /// `JSONAPI_MAX_PAGE_SIZE`
    pub max_page_size: u32,
    /// `JSONAPI_BIND_ADDR`
    pub bind_addr: String,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Settings {
            database_url: var_or("DATABASE_URL", "postgres://localhost/jsonapi"),
            schema_dir: var_or("JSONAPI_SCHEMA_DIR", "schema"),
            url_prefix: var_or("JSONAPI_URL_PREFIX", ""),
            page_size: parse_or("JSONAPI_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            max_page_size: parse_or("JSONAPI_MAX_PAGE_SIZE", MAX_PAGE_SIZE),
            bind_addr: var_or("JSONAPI_BIND_ADDR", "127.0.0.1:3000"),
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn parse_or(name: &str, default: u32) -> u32 {
    match std::env::var(name) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %v, "not a number, using default {}", default);
            default
        }),
        Err(_) => default,
    }
}
