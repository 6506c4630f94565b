//! Raw declaration types for models (tables) and JSON:API resources, as read from `models.json` and `resources.json`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field names every model carries even when the declaration omits them.
pub const FIELD_CREATED_AT: &str = "created_at";
pub const FIELD_UPDATED_AT: &str = "updated_at";
pub const FIELD_DELETED_AT: &str = "deleted_at";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Int,
    Float,
    String,
    Text,
    Bool,
    Date,
    Uuid,
}

impl FieldType {
    /// PostgreSQL type used for column DDL. `length` only applies to strings.
    pub fn pg_type(&self, length: Option<u32>) -> String {
        match self {
            FieldType::Int => "INTEGER".into(),
            FieldType::Float => "DOUBLE PRECISION".into(),
            FieldType::String => match length {
                Some(n) => format!("VARCHAR({})", n),
                None => "VARCHAR(255)".into(),
            },
            FieldType::Text => "TEXT".into(),
            FieldType::Bool => "BOOLEAN".into(),
            FieldType::Date => "TIMESTAMP".into(),
            FieldType::Uuid => "UUID".into(),
        }
    }

    /// Cast applied to every bound parameter for a column of this type.
    pub fn cast(&self) -> &'static str {
        match self {
            FieldType::Int => "integer",
            FieldType::Float => "double precision",
            FieldType::String | FieldType::Text => "text",
            FieldType::Bool => "boolean",
            FieldType::Date => "timestamp",
            FieldType::Uuid => "uuid",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttributeConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default = "default_true")]
    pub nullable: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    HasMany,
    BelongsTo,
    BelongsToMany,
}

impl RelationshipKind {
    /// Kind expected on the other side of a relationship.
    pub fn reverse(&self) -> RelationshipKind {
        match self {
            RelationshipKind::HasMany => RelationshipKind::BelongsTo,
            RelationshipKind::BelongsTo => RelationshipKind::HasMany,
            RelationshipKind::BelongsToMany => RelationshipKind::BelongsToMany,
        }
    }

    pub fn is_to_many(&self) -> bool {
        !matches!(self, RelationshipKind::BelongsTo)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipConfig {
    pub name: String,
    pub kind: RelationshipKind,
    /// Id of the related model.
    pub model: String,
    /// belongs_to: column on this model. has_many: column on the related model.
    /// belongs_to_many: column in the intermediate table pointing at this model.
    pub foreign_key: String,
    /// Name of the relationship on the related model pointing back here.
    pub reverse: String,
    #[serde(default)]
    pub intermediate_table: Option<String>,
    /// belongs_to_many only: column in the intermediate table pointing at the related model.
    #[serde(default)]
    pub reverse_foreign_key: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub table: String,
    pub primary_key: String,
    pub attributes: Vec<AttributeConfig>,
    #[serde(default)]
    pub relationships: Vec<RelationshipConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(rename = "type")]
    pub type_: String,
    pub model: String,
    /// JSON:API attribute name -> model field. Omitted: every non-key field under its camelCase name.
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, String>>,
    /// JSON:API relationship name -> model relationship. Omitted: every relationship under its own name.
    #[serde(default)]
    pub relationships: Option<BTreeMap<String, String>>,
}

/// All declarations in one struct for in-memory loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    pub models: Vec<ModelConfig>,
    pub resources: Vec<ResourceConfig>,
}
