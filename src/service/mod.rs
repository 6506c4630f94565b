//! Resource CRUD over PostgreSQL, write hooks and attribute value checks.

mod crud;
mod hooks;
mod validation;
pub use crud::{Crud, IndexParams, Page, RelatedData};
pub use hooks::{writable_attributes, CrudHooks, DefaultHooks, TimestampHooks, TIMESTAMP_FORMAT};
pub use validation::AttributeValidator;
