//! Load declarations from a directory and resolve them into runtime lookups.

use crate::case::to_camel_case;
use crate::config::resolved::{ColumnInfo, JsonSchemes, Mappings, ModelScheme, ResolvedModel, ResolvedRelationship, ResourceSchema, SchemaStorage};
use crate::config::types::*;
use crate::config::{validate, FullConfig};
use crate::error::ConfigError;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub const MODELS_FILE: &str = "models.json";
pub const RESOURCES_FILE: &str = "resources.json";

/// Build resolved model from full config (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let models: Vec<ModelScheme> = config.models.iter().map(resolve_model).collect();
    let storage = SchemaStorage::new(models);

    let mut schemas = Vec::with_capacity(config.resources.len());
    for res in &config.resources {
        let model = storage.model(&res.model).ok_or_else(|| ConfigError::MissingReference {
            kind: "model",
            id: res.model.clone(),
        })?;
        let attributes = match &res.attributes {
            Some(map) => map.clone(),
            None => default_attribute_mapping(model),
        };
        let relationships = match &res.relationships {
            Some(map) => map.clone(),
            None => model
                .relationships
                .iter()
                .map(|r| (r.name.clone(), r.name.clone()))
                .collect(),
        };
        schemas.push(ResourceSchema {
            resource_type: res.type_.clone(),
            model: res.model.clone(),
            mappings: Mappings {
                attributes,
                relationships,
            },
        });
    }

    Ok(ResolvedModel {
        models: storage,
        schemes: JsonSchemes::new(schemas),
    })
}

fn resolve_model(m: &ModelConfig) -> ModelScheme {
    let mut columns: Vec<ColumnInfo> = m
        .attributes
        .iter()
        .map(|a| ColumnInfo {
            name: a.name.clone(),
            field_type: a.type_,
            length: a.length,
            unique: a.unique,
            nullable: a.nullable && a.name != m.primary_key,
            is_pk: a.name == m.primary_key,
        })
        .collect();

    let declared: HashSet<String> = columns.iter().map(|c| c.name.clone()).collect();
    for name in [FIELD_CREATED_AT, FIELD_UPDATED_AT, FIELD_DELETED_AT] {
        if !declared.contains(name) {
            columns.push(ColumnInfo {
                name: name.to_string(),
                field_type: FieldType::Date,
                length: None,
                unique: false,
                nullable: true,
                is_pk: false,
            });
        }
    }

    let pk_type = m
        .attributes
        .iter()
        .find(|a| a.name == m.primary_key)
        .map(|a| a.type_)
        .unwrap_or(FieldType::Int);

    ModelScheme {
        id: m.id.clone(),
        table: m.table.clone(),
        primary_key: m.primary_key.clone(),
        pk_type,
        columns,
        relationships: m
            .relationships
            .iter()
            .map(|r| ResolvedRelationship {
                name: r.name.clone(),
                kind: r.kind,
                model: r.model.clone(),
                foreign_key: r.foreign_key.clone(),
                reverse: r.reverse.clone(),
                intermediate_table: r.intermediate_table.clone(),
                reverse_foreign_key: r.reverse_foreign_key.clone(),
            })
            .collect(),
    }
}

/// Every non-key column except belongs-to foreign keys (those travel as relationships), under its camelCase name.
fn default_attribute_mapping(model: &ModelScheme) -> BTreeMap<String, String> {
    let foreign_keys: HashSet<&str> = model
        .relationships
        .iter()
        .filter(|r| r.kind == RelationshipKind::BelongsTo)
        .map(|r| r.foreign_key.as_str())
        .collect();
    model
        .columns
        .iter()
        .filter(|c| !c.is_pk && !foreign_keys.contains(c.name.as_str()))
        .map(|c| (to_camel_case(&c.name), c.name.clone()))
        .collect()
}

/// Read `models.json` and `resources.json` from a directory.
pub async fn load_from_dir(dir: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let dir = dir.as_ref();
    let models: Vec<ModelConfig> = read_json(&dir.join(MODELS_FILE)).await?;
    let resources: Vec<ResourceConfig> = read_json(&dir.join(RESOURCES_FILE)).await?;
    tracing::debug!(dir = %dir.display(), models = models.len(), resources = resources.len(), "loaded declarations");
    Ok(FullConfig { models, resources })
}

async fn read_json<T>(path: &Path) -> Result<T, ConfigError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}
