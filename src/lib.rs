//! jsonapi-crud: JSON:API resources over PostgreSQL, driven by model and resource declarations.

pub mod case;
pub mod config;
pub mod document;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod i18n;
pub mod migration;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod transformer;

#[cfg(test)]
mod fixtures;

pub use config::{load_from_dir, resolve, validate, FullConfig, ResolvedModel, Settings};
pub use document::{Encoder, ErrorCollection, ErrorObject, MEDIA_TYPE};
pub use error::{AppError, ConfigError};
pub use i18n::{DefaultTranslator, Message, Translator};
pub use migration::{ensure_database_exists, migrate, rollback};
pub use pagination::{BasicPagination, PaginationStrategy};
pub use routes::{common_routes, common_routes_with_ready, resource_routes};
pub use service::{Crud, CrudHooks, DefaultHooks, TimestampHooks};
pub use state::AppState;
pub use transformer::{ResourceInput, Transformer};
