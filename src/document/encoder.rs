//! Model rows -> JSON:API resource objects and top-level documents.

use crate::config::{RelationshipKind, ResolvedModel, ResourceSchema};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

/// Related rows loaded for `?include=`, keyed by the id of the primary resource they belong to.
#[derive(Clone, Debug)]
pub struct IncludedRelationship {
    /// JSON:API relationship name on the primary resource.
    pub name: String,
    /// Resource type of the related rows.
    pub resource_type: String,
    pub by_parent: HashMap<String, Vec<Value>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageLinks {
    pub self_: String,
    pub first: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

pub struct Encoder<'a> {
    model: &'a ResolvedModel,
    url_prefix: &'a str,
}

impl<'a> Encoder<'a> {
    pub fn new(model: &'a ResolvedModel, url_prefix: &'a str) -> Self {
        Encoder { model, url_prefix }
    }

    pub fn collection_url(&self, resource_type: &str) -> String {
        format!("{}/{}", self.url_prefix, resource_type)
    }

    pub fn resource_url(&self, resource_type: &str, id: &str) -> String {
        format!("{}/{}/{}", self.url_prefix, resource_type, id)
    }

    /// Primary key of a row as a JSON:API id string.
    pub fn row_id(&self, schema: &ResourceSchema, row: &Value) -> Option<String> {
        let pk = &self.model.models.model(&schema.model)?.primary_key;
        row.get(pk).and_then(id_string)
    }

    pub fn resource(&self, schema: &ResourceSchema, row: &Value, included: &[IncludedRelationship]) -> Value {
        let id = self.row_id(schema, row).unwrap_or_default();
        let self_url = self.resource_url(&schema.resource_type, &id);

        let mut attributes = Map::new();
        for (json_name, field) in &schema.mappings.attributes {
            if let Some(v) = row.get(field) {
                attributes.insert(json_name.clone(), v.clone());
            }
        }

        let mut relationships = Map::new();
        for (json_name, model_rel) in &schema.mappings.relationships {
            let Some(rel) = self.model.models.relationship(&schema.model, model_rel) else {
                continue;
            };
            let target_type = self
                .model
                .schemes
                .schema_by_model(&rel.model)
                .map(|s| s.resource_type.as_str());
            let mut member = Map::new();
            member.insert(
                "links".into(),
                json!({
                    "self": format!("{}/relationships/{}", self_url, json_name),
                    "related": format!("{}/{}", self_url, json_name),
                }),
            );
            match (rel.kind, target_type) {
                (RelationshipKind::BelongsTo, Some(t)) => {
                    let data = row
                        .get(&rel.foreign_key)
                        .and_then(id_string)
                        .map(|fk| json!({"type": t, "id": fk}))
                        .unwrap_or(Value::Null);
                    member.insert("data".into(), data);
                }
                (_, Some(t)) => {
                    if let Some(inc) = included.iter().find(|i| &i.name == json_name) {
                        let target = self.model.schemes.schema_by_type(t);
                        let ids: Vec<Value> = inc
                            .by_parent
                            .get(&id)
                            .map(|rows| {
                                rows.iter()
                                    .filter_map(|r| target.and_then(|s| self.row_id(s, r)))
                                    .map(|rid| json!({"type": t, "id": rid}))
                                    .collect()
                            })
                            .unwrap_or_default();
                        member.insert("data".into(), Value::Array(ids));
                    }
                }
                _ => {}
            }
            relationships.insert(json_name.clone(), Value::Object(member));
        }

        let mut out = Map::new();
        out.insert("type".into(), Value::String(schema.resource_type.clone()));
        out.insert("id".into(), Value::String(id));
        if !attributes.is_empty() {
            out.insert("attributes".into(), Value::Object(attributes));
        }
        if !relationships.is_empty() {
            out.insert("relationships".into(), Value::Object(relationships));
        }
        out.insert("links".into(), json!({ "self": self_url }));
        Value::Object(out)
    }

    pub fn single(&self, schema: &ResourceSchema, row: &Value, included: &[IncludedRelationship]) -> Value {
        let data = self.resource(schema, row, included);
        let self_url = data
            .pointer("/links/self")
            .cloned()
            .unwrap_or(Value::Null);
        let mut doc = json!({ "data": data, "links": { "self": self_url } });
        self.attach_included(&mut doc, included);
        doc
    }

    /// Empty to-one relationship.
    pub fn null_document(&self, self_url: String) -> Value {
        json!({ "data": null, "links": { "self": self_url } })
    }

    pub fn collection(
        &self,
        schema: &ResourceSchema,
        rows: &[Value],
        links: Option<&PageLinks>,
        included: &[IncludedRelationship],
    ) -> Value {
        let data: Vec<Value> = rows.iter().map(|r| self.resource(schema, r, included)).collect();
        let mut doc = json!({ "data": data });
        if let Some(l) = links {
            let mut m = Map::new();
            m.insert("self".into(), Value::String(l.self_.clone()));
            m.insert("first".into(), Value::String(l.first.clone()));
            if let Some(p) = &l.prev {
                m.insert("prev".into(), Value::String(p.clone()));
            }
            if let Some(n) = &l.next {
                m.insert("next".into(), Value::String(n.clone()));
            }
            doc["links"] = Value::Object(m);
        }
        self.attach_included(&mut doc, included);
        doc
    }

    fn attach_included(&self, doc: &mut Value, included: &[IncludedRelationship]) {
        let resources = self.included_resources(included);
        if !resources.is_empty() {
            doc["included"] = Value::Array(resources);
        }
    }

    /// Related rows as resource objects, one per (type, id).
    pub fn included_resources(&self, included: &[IncludedRelationship]) -> Vec<Value> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for inc in included {
            let Some(schema) = self.model.schemes.schema_by_type(&inc.resource_type) else {
                continue;
            };
            let mut parents: Vec<&String> = inc.by_parent.keys().collect();
            parents.sort();
            for parent in parents {
                for row in &inc.by_parent[parent] {
                    let Some(id) = self.row_id(schema, row) else { continue };
                    if seen.insert((inc.resource_type.clone(), id)) {
                        out.push(self.resource(schema, row, &[]));
                    }
                }
            }
        }
        out
    }
}

/// JSON:API ids are strings; integer keys are rendered in decimal.
pub fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::blog_model;
    use pretty_assertions::assert_eq;

    #[test]
    fn resource_maps_fields_to_members() {
        let model = blog_model();
        let enc = Encoder::new(&model, "/api");
        let posts = model.schemes.schema_by_type("posts").unwrap();
        let row = json!({
            "id_post": 7, "id_board_fk": 2, "id_user_fk": 3,
            "title": "Hello", "text": "World", "created_at": null
        });
        let res = enc.resource(posts, &row, &[]);
        assert_eq!(res["type"], "posts");
        assert_eq!(res["id"], "7");
        assert_eq!(res["attributes"]["title"], "Hello");
        assert_eq!(res["attributes"]["createdAt"], Value::Null);
        assert!(res["attributes"].get("idBoardFk").is_none());
        assert_eq!(res["relationships"]["board"]["data"], json!({"type": "boards", "id": "2"}));
        assert_eq!(
            res["relationships"]["comments"]["links"]["related"],
            "/api/posts/7/comments"
        );
        assert!(res["relationships"]["comments"].get("data").is_none());
        assert_eq!(res["links"]["self"], "/api/posts/7");
    }

    #[test]
    fn included_rows_become_linkage_and_compound_members() {
        let model = blog_model();
        let enc = Encoder::new(&model, "");
        let boards = model.schemes.schema_by_type("boards").unwrap();
        let rows = vec![json!({"id_board": 1, "title": "a"}), json!({"id_board": 2, "title": "b"})];
        let post = json!({"id_post": 5, "id_board_fk": 1, "id_user_fk": 1, "title": "p", "text": "t"});
        let included = vec![IncludedRelationship {
            name: "posts".into(),
            resource_type: "posts".into(),
            by_parent: HashMap::from([("1".to_string(), vec![post.clone()]), ("2".to_string(), vec![post])]),
        }];
        let doc = enc.collection(boards, &rows, None, &included);
        assert_eq!(doc["data"][0]["relationships"]["posts"]["data"], json!([{"type": "posts", "id": "5"}]));
        assert_eq!(doc["included"].as_array().unwrap().len(), 1);
        assert_eq!(doc["included"][0]["id"], "5");
    }

    #[test]
    fn collection_links() {
        let model = blog_model();
        let enc = Encoder::new(&model, "");
        let roles = model.schemes.schema_by_type("roles").unwrap();
        let links = PageLinks {
            self_: "/roles?page[offset]=0".into(),
            first: "/roles?page[offset]=0".into(),
            prev: None,
            next: Some("/roles?page[offset]=20".into()),
        };
        let doc = enc.collection(roles, &[], Some(&links), &[]);
        assert_eq!(doc["data"], json!([]));
        assert_eq!(doc["links"]["next"], "/roles?page[offset]=20");
        assert!(doc["links"].get("prev").is_none());
        assert!(doc.get("included").is_none());
    }

    #[test]
    fn ids_are_strings() {
        assert_eq!(id_string(&json!(12)), Some("12".into()));
        assert_eq!(id_string(&json!("ab")), Some("ab".into()));
        assert_eq!(id_string(&Value::Null), None);
    }
}
