//! Declaration validation: referential integrity between models, relationships and resources.

use crate::config::{FullConfig, RelationshipKind};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// JSON:API member names: alphanumeric start and end, `-` and `_` allowed inside.
const MEMBER_NAME_PATTERN: &str = r"^[A-Za-z0-9](?:[A-Za-z0-9_-]*[A-Za-z0-9])?$";

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let member_name = Regex::new(MEMBER_NAME_PATTERN).map_err(|e| ConfigError::Validation(e.to_string()))?;
    let models_by_id: HashMap<&str, _> = config.models.iter().map(|m| (m.id.as_str(), m)).collect();
    if models_by_id.len() != config.models.len() {
        return Err(ConfigError::Validation("duplicate model id".into()));
    }

    for m in &config.models {
        if !m.attributes.iter().any(|a| a.name == m.primary_key) {
            return Err(ConfigError::InvalidPrimaryKey {
                model: m.id.clone(),
                column: m.primary_key.clone(),
            });
        }
        let mut rel_names = HashSet::new();
        for rel in &m.relationships {
            if !rel_names.insert(rel.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "model {}: duplicate relationship {}",
                    m.id, rel.name
                )));
            }
            let other = models_by_id.get(rel.model.as_str()).ok_or_else(|| ConfigError::MissingReference {
                kind: "model",
                id: rel.model.clone(),
            })?;
            let reverse = other
                .relationships
                .iter()
                .find(|r| r.name == rel.reverse)
                .ok_or_else(|| ConfigError::MissingReference {
                    kind: "reverse relationship",
                    id: format!("{}.{}", other.id, rel.reverse),
                })?;
            if reverse.kind != rel.kind.reverse() || reverse.model != m.id {
                return Err(ConfigError::Validation(format!(
                    "relationship {}.{} and its reverse {}.{} disagree",
                    m.id, rel.name, other.id, reverse.name
                )));
            }
            match rel.kind {
                RelationshipKind::BelongsTo => {
                    if !m.attributes.iter().any(|a| a.name == rel.foreign_key) {
                        return Err(ConfigError::MissingReference {
                            kind: "foreign key",
                            id: format!("{}.{}", m.id, rel.foreign_key),
                        });
                    }
                }
                RelationshipKind::HasMany => {
                    if !other.attributes.iter().any(|a| a.name == rel.foreign_key) {
                        return Err(ConfigError::MissingReference {
                            kind: "foreign key",
                            id: format!("{}.{}", other.id, rel.foreign_key),
                        });
                    }
                }
                RelationshipKind::BelongsToMany => {
                    if rel.intermediate_table.is_none() || rel.reverse_foreign_key.is_none() {
                        return Err(ConfigError::Validation(format!(
                            "relationship {}.{}: belongs_to_many requires intermediate_table and reverse_foreign_key",
                            m.id, rel.name
                        )));
                    }
                    if reverse.intermediate_table != rel.intermediate_table {
                        return Err(ConfigError::Validation(format!(
                            "relationship {}.{}: intermediate table differs from reverse",
                            m.id, rel.name
                        )));
                    }
                }
            }
        }
    }

    let mut types = HashSet::new();
    let mut resource_models = HashSet::new();
    for res in &config.resources {
        if !member_name.is_match(&res.type_) {
            return Err(ConfigError::Validation(format!("invalid resource type name: {}", res.type_)));
        }
        if !types.insert(res.type_.as_str()) {
            return Err(ConfigError::DuplicateResourceType(res.type_.clone()));
        }
        if !resource_models.insert(res.model.as_str()) {
            return Err(ConfigError::Validation(format!("model {} exposed by more than one resource", res.model)));
        }
        let model = models_by_id.get(res.model.as_str()).ok_or_else(|| ConfigError::MissingReference {
            kind: "model",
            id: res.model.clone(),
        })?;
        if let Some(attrs) = &res.attributes {
            for (json_name, field) in attrs {
                if !member_name.is_match(json_name) {
                    return Err(ConfigError::Validation(format!("invalid attribute name: {}", json_name)));
                }
                if field == &model.primary_key {
                    return Err(ConfigError::Validation(format!(
                        "resource {}: primary key {} is the resource id, not an attribute",
                        res.type_, field
                    )));
                }
                let known = model.attributes.iter().any(|a| &a.name == field) || is_implicit_field(field);
                if !known {
                    return Err(ConfigError::MissingReference {
                        kind: "attribute",
                        id: format!("{}.{}", model.id, field),
                    });
                }
            }
        }
        if let Some(rels) = &res.relationships {
            for (json_name, rel) in rels {
                if !member_name.is_match(json_name) {
                    return Err(ConfigError::Validation(format!("invalid relationship name: {}", json_name)));
                }
                if !model.relationships.iter().any(|r| &r.name == rel) {
                    return Err(ConfigError::MissingReference {
                        kind: "relationship",
                        id: format!("{}.{}", model.id, rel),
                    });
                }
            }
        }
    }

    Ok(())
}

fn is_implicit_field(name: &str) -> bool {
    matches!(
        name,
        crate::config::FIELD_CREATED_AT | crate::config::FIELD_UPDATED_AT | crate::config::FIELD_DELETED_AT
    )
}
