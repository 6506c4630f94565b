//! Resource objects read from request documents.

use crate::document::ErrorCollection;
use crate::i18n::{Message, Translator};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(type_: impl Into<String>, id: impl Into<String>) -> Self {
        ResourceIdentifier {
            type_: type_.into(),
            id: id.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RelationshipData {
    ToOne(Option<ResourceIdentifier>),
    ToMany(Vec<ResourceIdentifier>),
}

/// Primary data of a create/update request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceObject {
    pub type_: String,
    pub id: Option<String>,
    pub attributes: Map<String, Value>,
    pub relationships: BTreeMap<String, RelationshipData>,
}

impl ResourceObject {
    /// Reads `{"data": {...}}`. Problems go to `errors`; `None` when the document
    /// is too broken to yield a resource at all.
    pub fn parse(body: &Value, errors: &mut ErrorCollection, t: &dyn Translator) -> Option<ResourceObject> {
        let Some(data) = body.get("data").and_then(Value::as_object) else {
            errors.add_data_error(t.get(Message::MalformedDocument));
            return None;
        };

        let type_ = match data.get("type").and_then(Value::as_str) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => {
                errors.add_data_type_error(t.get(Message::InvalidResourceType));
                return None;
            }
        };

        let id = match data.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                errors.add_data_id_error(t.get(Message::InvalidIdentifier));
                None
            }
        };

        let attributes = match data.get("attributes") {
            None => Map::new(),
            Some(Value::Object(m)) => m.clone(),
            Some(_) => {
                errors.add(
                    crate::document::ErrorObject::new(
                        axum::http::StatusCode::BAD_REQUEST,
                        t.get(Message::MalformedDocument),
                    )
                    .with_pointer("/data/attributes"),
                );
                Map::new()
            }
        };

        let mut relationships = BTreeMap::new();
        match data.get("relationships") {
            None => {}
            Some(Value::Object(rels)) => {
                for (name, rel) in rels {
                    if let Some(parsed) = parse_relationship(name, rel, errors, t) {
                        relationships.insert(name.clone(), parsed);
                    }
                }
            }
            Some(_) => {
                errors.add(
                    crate::document::ErrorObject::new(
                        axum::http::StatusCode::BAD_REQUEST,
                        t.get(Message::MalformedDocument),
                    )
                    .with_pointer("/data/relationships"),
                );
            }
        }

        Some(ResourceObject {
            type_,
            id,
            attributes,
            relationships,
        })
    }
}

fn parse_relationship(
    name: &str,
    rel: &Value,
    errors: &mut ErrorCollection,
    t: &dyn Translator,
) -> Option<RelationshipData> {
    let Some(data) = rel.as_object().and_then(|o| o.get("data")) else {
        errors.add_relationship_error(name, t.get(Message::MalformedDocument));
        return None;
    };
    match data {
        Value::Null => Some(RelationshipData::ToOne(None)),
        Value::Object(_) => {
            let identifier = parse_identifier(data);
            if identifier.is_none() {
                errors.add_relationship_error(name, t.get(Message::InvalidIdentifier));
            }
            identifier.map(|i| RelationshipData::ToOne(Some(i)))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match parse_identifier(item) {
                    Some(i) => out.push(i),
                    None => {
                        errors.add_relationship_error(name, t.get(Message::InvalidIdentifier));
                        return None;
                    }
                }
            }
            Some(RelationshipData::ToMany(out))
        }
        _ => {
            errors.add_relationship_error(name, t.get(Message::MalformedDocument));
            None
        }
    }
}

fn parse_identifier(v: &Value) -> Option<ResourceIdentifier> {
    let type_ = v.get("type")?.as_str()?;
    let id = v.get("id")?.as_str()?;
    Some(ResourceIdentifier::new(type_, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::DefaultTranslator;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(body: Value) -> (Option<ResourceObject>, ErrorCollection) {
        let mut errors = ErrorCollection::new();
        let r = ResourceObject::parse(&body, &mut errors, &DefaultTranslator::new());
        (r, errors)
    }

    #[test]
    fn reads_attributes_and_both_relationship_shapes() {
        let (r, errors) = parse(json!({
            "data": {
                "type": "posts",
                "attributes": {"title": "Hello"},
                "relationships": {
                    "board": {"data": {"type": "boards", "id": "1"}},
                    "editor": {"data": null},
                    "tags": {"data": [{"type": "tags", "id": "3"}, {"type": "tags", "id": "4"}]}
                }
            }
        }));
        assert!(errors.is_empty());
        let r = r.unwrap();
        assert_eq!(r.type_, "posts");
        assert_eq!(r.id, None);
        assert_eq!(r.attributes.get("title"), Some(&json!("Hello")));
        assert_eq!(
            r.relationships.get("board"),
            Some(&RelationshipData::ToOne(Some(ResourceIdentifier::new("boards", "1"))))
        );
        assert_eq!(r.relationships.get("editor"), Some(&RelationshipData::ToOne(None)));
        assert_eq!(
            r.relationships.get("tags"),
            Some(&RelationshipData::ToMany(vec![
                ResourceIdentifier::new("tags", "3"),
                ResourceIdentifier::new("tags", "4"),
            ]))
        );
    }

    #[test]
    fn missing_data_is_a_document_error() {
        let (r, errors) = parse(json!({"type": "posts"}));
        assert!(r.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn numeric_id_is_rejected() {
        let (r, errors) = parse(json!({"data": {"type": "posts", "id": 5}}));
        assert!(r.is_some());
        let e = errors.iter().next().unwrap();
        assert_eq!(e.source.as_ref().unwrap().pointer.as_deref(), Some("/data/id"));
    }

    #[test]
    fn relationship_without_data_member_is_reported() {
        let (r, errors) = parse(json!({
            "data": {"type": "posts", "relationships": {"board": {"links": {}}}}
        }));
        assert!(r.unwrap().relationships.is_empty());
        let e = errors.iter().next().unwrap();
        assert_eq!(e.source.as_ref().unwrap().pointer.as_deref(), Some("/data/relationships/board"));
    }
}
