//! Resolved model: declarations validated and flattened for runtime lookups.
//!
//! [`SchemaStorage`] answers questions about models (tables, fields, relationships);
//! [`JsonSchemes`] answers questions about JSON:API resources and their mappings.

use crate::config::{FieldType, RelationshipKind};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub field_type: FieldType,
    pub length: Option<u32>,
    pub unique: bool,
    pub nullable: bool,
    pub is_pk: bool,
}

impl ColumnInfo {
    pub fn cast(&self) -> &'static str {
        self.field_type.cast()
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedRelationship {
    pub name: String,
    pub kind: RelationshipKind,
    /// Id of the related model.
    pub model: String,
    pub foreign_key: String,
    pub reverse: String,
    pub intermediate_table: Option<String>,
    pub reverse_foreign_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ModelScheme {
    pub id: String,
    pub table: String,
    pub primary_key: String,
    pub pk_type: FieldType,
    pub columns: Vec<ColumnInfo>,
    pub relationships: Vec<ResolvedRelationship>,
}

impl ModelScheme {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn relationship(&self, name: &str) -> Option<&ResolvedRelationship> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

/// Model schemes keyed by model id.
#[derive(Clone, Debug, Default)]
pub struct SchemaStorage {
    models: HashMap<String, ModelScheme>,
}

impl SchemaStorage {
    pub fn new(models: Vec<ModelScheme>) -> Self {
        SchemaStorage {
            models: models.into_iter().map(|m| (m.id.clone(), m)).collect(),
        }
    }

    pub fn model(&self, model: &str) -> Option<&ModelScheme> {
        self.models.get(model)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelScheme> {
        self.models.values()
    }

    pub fn attribute_types(&self, model: &str) -> HashMap<&str, FieldType> {
        self.model(model)
            .map(|m| m.columns.iter().map(|c| (c.name.as_str(), c.field_type)).collect())
            .unwrap_or_default()
    }

    pub fn attribute_lengths(&self, model: &str) -> HashMap<&str, u32> {
        self.model(model)
            .map(|m| {
                m.columns
                    .iter()
                    .filter_map(|c| c.length.map(|n| (c.name.as_str(), n)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn relationship(&self, model: &str, rel: &str) -> Option<&ResolvedRelationship> {
        self.model(model).and_then(|m| m.relationship(rel))
    }

    pub fn relationship_type(&self, model: &str, rel: &str) -> Option<RelationshipKind> {
        self.relationship(model, rel).map(|r| r.kind)
    }

    /// Returns (related model id, name of the relationship on the related model).
    pub fn reverse_relationship(&self, model: &str, rel: &str) -> Option<(&str, &str)> {
        self.relationship(model, rel).map(|r| (r.model.as_str(), r.reverse.as_str()))
    }
}

/// Two-way name mapping between JSON:API members and model fields/relationships.
#[derive(Clone, Debug, Default)]
pub struct Mappings {
    /// JSON attribute name -> model field.
    pub attributes: BTreeMap<String, String>,
    /// JSON relationship name -> model relationship.
    pub relationships: BTreeMap<String, String>,
}

impl Mappings {
    pub fn field_for_attribute(&self, json_name: &str) -> Option<&str> {
        self.attributes.get(json_name).map(String::as_str)
    }

    pub fn attribute_for_field(&self, field: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(_, f)| f.as_str() == field)
            .map(|(j, _)| j.as_str())
    }

    pub fn model_relationship(&self, json_name: &str) -> Option<&str> {
        self.relationships.get(json_name).map(String::as_str)
    }

    pub fn json_relationship(&self, model_rel: &str) -> Option<&str> {
        self.relationships
            .iter()
            .find(|(_, r)| r.as_str() == model_rel)
            .map(|(j, _)| j.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct ResourceSchema {
    pub resource_type: String,
    /// Id of the backing model.
    pub model: String,
    pub mappings: Mappings,
}

/// JSON:API schemes keyed by resource type, with a reverse index by model.
#[derive(Clone, Debug, Default)]
pub struct JsonSchemes {
    by_type: HashMap<String, ResourceSchema>,
    type_by_model: HashMap<String, String>,
}

impl JsonSchemes {
    pub fn new(schemas: Vec<ResourceSchema>) -> Self {
        let type_by_model = schemas
            .iter()
            .map(|s| (s.model.clone(), s.resource_type.clone()))
            .collect();
        JsonSchemes {
            by_type: schemas.into_iter().map(|s| (s.resource_type.clone(), s)).collect(),
            type_by_model,
        }
    }

    pub fn schema_by_type(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.by_type.get(resource_type)
    }

    pub fn schema_by_model(&self, model: &str) -> Option<&ResourceSchema> {
        self.type_by_model.get(model).and_then(|t| self.by_type.get(t))
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub models: SchemaStorage,
    pub schemes: JsonSchemes,
}
