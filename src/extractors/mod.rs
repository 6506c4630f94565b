//! Request extractors.

mod document;
pub use document::{check_content_type, JsonApiBody};
