//! Maps JSON:API resource members onto model fields and relationships.
//!
//! Every check is a lookup in the resource's declared [`Mappings`](crate::config::Mappings)
//! and the model's relationship metadata. Failures never abort: they are added to the
//! caller's [`ErrorCollection`] and the offending member is skipped, so one request
//! reports all of its problems at once.

use crate::config::{RelationshipKind, ResolvedModel, ResourceSchema};
use crate::document::{ErrorCollection, RelationshipData, ResourceIdentifier, ResourceObject};
use crate::i18n::{Message, Translator};
use crate::service::AttributeValidator;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A request resource expressed in model terms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceInput {
    /// Client-supplied id (create) or the id echoed back on update.
    pub id: Option<String>,
    /// Model field -> value.
    pub attributes: HashMap<String, Value>,
    /// Belongs-to relationship name -> related id (`None` clears it).
    pub to_one: Vec<(String, Option<String>)>,
    /// Belongs-to-many relationship name -> complete set of related ids.
    pub to_many: Vec<(String, Vec<String>)>,
}

pub struct Transformer<'a> {
    schema: &'a ResourceSchema,
    model: &'a ResolvedModel,
    translator: &'a dyn Translator,
}

impl<'a> Transformer<'a> {
    pub fn new(schema: &'a ResourceSchema, model: &'a ResolvedModel, translator: &'a dyn Translator) -> Self {
        Transformer {
            schema,
            model,
            translator,
        }
    }

    pub fn schema(&self) -> &ResourceSchema {
        self.schema
    }

    pub fn is_valid_type(&self, resource_type: &str) -> bool {
        self.schema.resource_type == resource_type
    }

    /// Renames attributes to model fields. Only names are checked here.
    pub fn transform_attributes(
        &self,
        errors: &mut ErrorCollection,
        json_attributes: &Map<String, Value>,
    ) -> HashMap<String, Value> {
        let mut transformed = HashMap::with_capacity(json_attributes.len());
        let mut err_msg: Option<String> = None;
        for (json_attr, value) in json_attributes {
            let Some(field) = self.schema.mappings.field_for_attribute(json_attr) else {
                let msg = err_msg.get_or_insert_with(|| self.translator.get(Message::InvalidElement));
                errors.add_data_attribute_error(json_attr, msg.clone());
                continue;
            };
            transformed.insert(field.to_string(), value.clone());
        }
        transformed
    }

    /// Returns (model relationship, related id) for a belongs-to relationship.
    pub fn transform_to_one_relationship(
        &self,
        errors: &mut ErrorCollection,
        json_name: &str,
        identifier: Option<&ResourceIdentifier>,
    ) -> Option<(String, Option<String>)> {
        let model_rel = self.map_relationship_and_check_its_type(errors, json_name, RelationshipKind::BelongsTo)?;

        let mut index = None;
        if let Some(identifier) = identifier {
            if self.expected_resource_type(model_rel) != Some(identifier.type_.as_str()) {
                errors.add_relationship_type_error(json_name, self.translator.get(Message::InvalidElement));
                return None;
            }
            index = Some(identifier.id.clone());
        }

        Some((model_rel.to_string(), index))
    }

    /// Returns (model relationship, related ids) for a belongs-to-many relationship.
    pub fn transform_to_many_relationship(
        &self,
        errors: &mut ErrorCollection,
        json_name: &str,
        identifiers: &[ResourceIdentifier],
    ) -> Option<(String, Vec<String>)> {
        let model_rel = self.map_relationship_and_check_its_type(errors, json_name, RelationshipKind::BelongsToMany)?;

        let expected = self.expected_resource_type(model_rel);
        let mut indexes = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            if expected != Some(identifier.type_.as_str()) {
                errors.add_relationship_type_error(json_name, self.translator.get(Message::InvalidElement));
                return None;
            }
            indexes.push(identifier.id.clone());
        }

        Some((model_rel.to_string(), indexes))
    }

    /// Whole-resource transform: type check, attribute names and values, and
    /// relationships dispatched by the shape of their `data`.
    pub fn transform_resource(&self, errors: &mut ErrorCollection, resource: &ResourceObject) -> ResourceInput {
        if !self.is_valid_type(&resource.type_) {
            errors.add_data_type_error(self.translator.get(Message::InvalidResourceType));
        }

        let attributes = self.transform_attributes(errors, &resource.attributes);
        self.check_attribute_values(errors, &resource.attributes);

        let mut input = ResourceInput {
            id: resource.id.clone(),
            attributes,
            ..Default::default()
        };
        for (json_name, data) in &resource.relationships {
            match data {
                RelationshipData::ToOne(identifier) => {
                    if let Some(r) = self.transform_to_one_relationship(errors, json_name, identifier.as_ref()) {
                        input.to_one.push(r);
                    }
                }
                RelationshipData::ToMany(identifiers) => {
                    if let Some(r) = self.transform_to_many_relationship(errors, json_name, identifiers) {
                        input.to_many.push(r);
                    }
                }
            }
        }
        input
    }

    fn check_attribute_values(&self, errors: &mut ErrorCollection, json_attributes: &Map<String, Value>) {
        let Some(model) = self.model.models.model(&self.schema.model) else {
            return;
        };
        for (json_attr, value) in json_attributes {
            let column = self
                .schema
                .mappings
                .field_for_attribute(json_attr)
                .and_then(|f| model.column(f));
            if let Some(column) = column {
                if let Some(message) = AttributeValidator::check(column, value) {
                    errors.add_data_attribute_error(json_attr, self.translator.get(message));
                }
            }
        }
    }

    fn map_relationship_and_check_its_type(
        &self,
        errors: &mut ErrorCollection,
        json_name: &str,
        expected: RelationshipKind,
    ) -> Option<&'a str> {
        let Some(model_rel) = self.schema.mappings.model_relationship(json_name) else {
            errors.add_relationship_error(json_name, self.translator.get(Message::InvalidElement));
            return None;
        };

        if self.model.models.relationship_type(&self.schema.model, model_rel) != Some(expected) {
            errors.add_relationship_error(json_name, self.translator.get(Message::InvalidElement));
            return None;
        }

        Some(model_rel)
    }

    fn expected_resource_type(&self, model_rel: &str) -> Option<&'a str> {
        let (reverse_model, _) = self.model.models.reverse_relationship(&self.schema.model, model_rel)?;
        self.model
            .schemes
            .schema_by_model(reverse_model)
            .map(|s| s.resource_type.as_str())
    }
}
