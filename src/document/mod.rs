//! JSON:API wire shapes: request resources, error objects, response documents.

mod encoder;
mod errors;
mod resource;

pub use encoder::{id_string, Encoder, IncludedRelationship, PageLinks};
pub use errors::{ErrorCollection, ErrorObject, ErrorSource};
pub use resource::{RelationshipData, ResourceIdentifier, ResourceObject};

/// Media type for request and response bodies.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";
