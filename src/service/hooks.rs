//! Override points applied by [`Crud`](super::Crud) before it writes rows.

use crate::config::{ModelScheme, FIELD_CREATED_AT, FIELD_UPDATED_AT};
use serde_json::Value;
use std::collections::HashMap;

/// Timestamp format written into date columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub trait CrudHooks: Send + Sync {
    /// Model attributes about to be inserted.
    fn filter_attributes_on_create(
        &self,
        model: &ModelScheme,
        attributes: HashMap<String, Value>,
    ) -> HashMap<String, Value> {
        writable_attributes(model, attributes)
    }

    /// Model attributes about to be updated.
    fn filter_attributes_on_update(
        &self,
        model: &ModelScheme,
        attributes: HashMap<String, Value>,
    ) -> HashMap<String, Value> {
        writable_attributes(model, attributes)
    }

    /// Extra columns for intermediate rows written while creating a resource.
    fn relationship_values_on_create(&self) -> Vec<(String, Value)> {
        Vec::new()
    }

    /// Extra columns for intermediate rows written while updating a resource.
    fn relationship_values_on_update(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}

/// Drops the primary key and anything the model does not declare.
pub fn writable_attributes(model: &ModelScheme, mut attributes: HashMap<String, Value>) -> HashMap<String, Value> {
    attributes.retain(|k, _| *k != model.primary_key && model.has_column(k));
    attributes
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHooks;

impl CrudHooks for DefaultHooks {}

/// Stamps `created_at` on create, `updated_at` on update, and `created_at` on
/// every intermediate row.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimestampHooks;

impl TimestampHooks {
    fn now() -> Value {
        Value::String(chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string())
    }
}

impl CrudHooks for TimestampHooks {
    fn filter_attributes_on_create(
        &self,
        model: &ModelScheme,
        attributes: HashMap<String, Value>,
    ) -> HashMap<String, Value> {
        let mut allowed = writable_attributes(model, attributes);
        allowed.insert(FIELD_CREATED_AT.to_string(), Self::now());
        allowed
    }

    fn filter_attributes_on_update(
        &self,
        model: &ModelScheme,
        attributes: HashMap<String, Value>,
    ) -> HashMap<String, Value> {
        let mut allowed = writable_attributes(model, attributes);
        allowed.insert(FIELD_UPDATED_AT.to_string(), Self::now());
        allowed
    }

    fn relationship_values_on_create(&self) -> Vec<(String, Value)> {
        vec![(FIELD_CREATED_AT.to_string(), Self::now())]
    }

    fn relationship_values_on_update(&self) -> Vec<(String, Value)> {
        vec![(FIELD_CREATED_AT.to_string(), Self::now())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::blog_model;
    use serde_json::json;

    fn attrs(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn default_hooks_drop_key_and_unknown_fields() {
        let model = blog_model();
        let board = model.models.model("board").unwrap();
        let out = DefaultHooks.filter_attributes_on_create(
            board,
            attrs(&[("id_board", json!(1)), ("title", json!("t")), ("color", json!("red"))]),
        );
        assert_eq!(out, attrs(&[("title", json!("t"))]));
    }

    #[test]
    fn timestamp_hooks_stamp_create_and_update() {
        let model = blog_model();
        let board = model.models.model("board").unwrap();
        let created = TimestampHooks.filter_attributes_on_create(board, attrs(&[("title", json!("t"))]));
        let stamp = created.get(FIELD_CREATED_AT).and_then(Value::as_str).unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok());
        assert!(!created.contains_key(FIELD_UPDATED_AT));

        let updated = TimestampHooks.filter_attributes_on_update(board, HashMap::new());
        assert!(updated.contains_key(FIELD_UPDATED_AT));
        assert!(!updated.contains_key(FIELD_CREATED_AT));
    }

    #[test]
    fn timestamp_hooks_stamp_intermediate_rows() {
        let on_create = TimestampHooks.relationship_values_on_create();
        let on_update = TimestampHooks.relationship_values_on_update();
        assert_eq!(on_create.len(), 1);
        assert_eq!(on_create[0].0, FIELD_CREATED_AT);
        assert_eq!(on_update[0].0, FIELD_CREATED_AT);
        assert!(DefaultHooks.relationship_values_on_create().is_empty());
    }
}
