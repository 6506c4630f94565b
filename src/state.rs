//! Shared application state for all routes.

use crate::config::{ResolvedModel, Settings};
use crate::i18n::{DefaultTranslator, Translator};
use crate::pagination::{BasicPagination, PaginationStrategy};
use crate::service::{CrudHooks, TimestampHooks};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub model: Arc<ResolvedModel>,
    pub translator: Arc<dyn Translator>,
    pub pagination: Arc<dyn PaginationStrategy>,
    pub hooks: Arc<dyn CrudHooks>,
    /// Prepended to every generated link, e.g. `/api`.
    pub url_prefix: String,
}

impl AppState {
    /// English messages, offset/limit pagination and timestamping hooks.
    pub fn new(pool: PgPool, model: ResolvedModel) -> Self {
        AppState {
            pool,
            model: Arc::new(model),
            translator: Arc::new(DefaultTranslator::new()),
            pagination: Arc::new(BasicPagination::default()),
            hooks: Arc::new(TimestampHooks),
            url_prefix: String::new(),
        }
    }

    pub fn from_settings(pool: PgPool, model: ResolvedModel, settings: &Settings) -> Self {
        AppState::new(pool, model)
            .with_pagination(BasicPagination::new(settings.page_size, settings.max_page_size))
            .with_url_prefix(settings.url_prefix.as_str())
    }

    pub fn with_translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    pub fn with_pagination(mut self, pagination: impl PaginationStrategy + 'static) -> Self {
        self.pagination = Arc::new(pagination);
        self
    }

    pub fn with_hooks(mut self, hooks: impl CrudHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }
}
