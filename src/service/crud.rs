//! CRUD for one JSON:API resource against PostgreSQL.

use crate::config::{ModelScheme, RelationshipKind, ResolvedModel, ResolvedRelationship, ResourceSchema};
use crate::document::{id_string, ErrorCollection, IncludedRelationship};
use crate::error::AppError;
use crate::i18n::{Message, Translator};
use crate::pagination::{page_params, PaginationStrategy};
use crate::service::validation::is_date;
use crate::service::CrudHooks;
use crate::sql::{
    delete, delete_intermediate, insert, insert_intermediate, select_by_column_in, select_by_id, select_list,
    select_via_intermediate, sync_key_sequence, update, IntermediateTable, PgBindValue, QueryBuf, SortField, OWNER_KEY_ALIAS,
};
use crate::transformer::ResourceInput;
use serde_json::Value;
use sqlx::{PgPool, Postgres};
use std::collections::{HashMap, HashSet};

/// Pseudo attribute addressing the primary key in `filter[id]` and `sort=id`.
const ID_MEMBER: &str = "id";

/// Collection read parameters in model terms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexParams {
    pub filters: Vec<(String, Value)>,
    pub sort: Vec<SortField>,
    /// JSON:API relationship names.
    pub includes: Vec<String>,
    pub offset: u32,
    pub limit: u32,
}

#[derive(Clone, Debug, Default)]
pub struct Page {
    pub rows: Vec<Value>,
    pub has_more: bool,
    pub offset: u32,
    pub limit: u32,
}

/// Rows reached through one relationship of one resource.
#[derive(Clone, Debug)]
pub enum RelatedData {
    One(Option<Value>),
    Many(Vec<Value>),
}

pub struct Crud<'a> {
    pool: &'a PgPool,
    model: &'a ResolvedModel,
    schema: &'a ResourceSchema,
    scheme: &'a ModelScheme,
    pagination: &'a dyn PaginationStrategy,
    hooks: &'a dyn CrudHooks,
    translator: &'a dyn Translator,
}

impl<'a> Crud<'a> {
    pub fn new(
        pool: &'a PgPool,
        model: &'a ResolvedModel,
        resource_type: &str,
        pagination: &'a dyn PaginationStrategy,
        hooks: &'a dyn CrudHooks,
        translator: &'a dyn Translator,
    ) -> Result<Self, AppError> {
        let schema = model
            .schemes
            .schema_by_type(resource_type)
            .ok_or_else(|| AppError::NotFound(resource_type.to_string()))?;
        let scheme = model
            .models
            .model(&schema.model)
            .ok_or_else(|| AppError::NotFound(schema.model.clone()))?;
        Ok(Crud {
            pool,
            model,
            schema,
            scheme,
            pagination,
            hooks,
            translator,
        })
    }

    pub fn schema(&self) -> &'a ResourceSchema {
        self.schema
    }

    pub fn scheme(&self) -> &'a ModelScheme {
        self.scheme
    }

    /// Route id -> key value. An id that cannot be a key of this model cannot exist either.
    pub fn parse_id(&self, id_str: &str) -> Result<Value, AppError> {
        key_value(self.scheme, id_str).ok_or_else(|| AppError::NotFound(id_str.to_string()))
    }

    /// Reads `filter[...]`, `sort`, `include` and `page[...]` from the query string.
    pub fn parse_index_params(
        &self,
        query: &HashMap<String, String>,
        errors: &mut ErrorCollection,
    ) -> IndexParams {
        let t = self.translator;
        let (offset, limit) = self.pagination.parameters(&page_params(query));
        let mut params = IndexParams {
            offset,
            limit,
            ..Default::default()
        };

        let mut keys: Vec<&String> = query.keys().collect();
        keys.sort();
        for key in keys {
            let raw = &query[key];
            if let Some(name) = key.strip_prefix("filter[").and_then(|r| r.strip_suffix(']')) {
                match self.filter_value(name, raw) {
                    Some(pair) => params.filters.push(pair),
                    None => errors.add_query_parameter_error(key, t.get(Message::InvalidElement)),
                }
            }
        }

        if let Some(sort) = query.get("sort") {
            for item in sort.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let (name, descending) = match item.strip_prefix('-') {
                    Some(n) => (n, true),
                    None => (item, false),
                };
                match self.field_for_member(name) {
                    Some(field) => params.sort.push(SortField {
                        field: field.to_string(),
                        descending,
                    }),
                    None => errors.add_query_parameter_error("sort", t.get(Message::InvalidElement)),
                }
            }
        }

        if let Some(include) = query.get("include") {
            params.includes = self.parse_includes(include, errors);
        }

        params
    }

    /// Relationship names for `include=`, one level deep.
    pub fn parse_includes(&self, include: &str, errors: &mut ErrorCollection) -> Vec<String> {
        let t = self.translator;
        let mut out = Vec::new();
        for name in include.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if self.schema.mappings.model_relationship(name).is_some() {
                if !out.iter().any(|n| n == name) {
                    out.push(name.to_string());
                }
            } else {
                errors.add_query_parameter_error("include", t.get(Message::InvalidElement));
            }
        }
        out
    }

    fn field_for_member(&self, name: &str) -> Option<&'a str> {
        if name == ID_MEMBER {
            return Some(self.scheme.primary_key.as_str());
        }
        self.schema.mappings.field_for_attribute(name)
    }

    fn filter_value(&self, name: &str, raw: &str) -> Option<(String, Value)> {
        let field = self.field_for_member(name)?;
        let column = self.scheme.column(field)?;
        let value = typed_value(column.field_type, raw)?;
        Some((field.to_string(), value))
    }

    pub async fn index(&self, params: &IndexParams) -> Result<Page, AppError> {
        let q = select_list(
            self.scheme,
            &params.filters,
            &params.sort,
            Some(params.limit + 1),
            Some(params.offset),
        );
        let mut rows = fetch_all(self.pool, &q).await?;
        let has_more = rows.len() > params.limit as usize;
        rows.truncate(params.limit as usize);
        Ok(Page {
            rows,
            has_more,
            offset: params.offset,
            limit: params.limit,
        })
    }

    pub async fn read(&self, id: &Value) -> Result<Option<Value>, AppError> {
        fetch_optional(self.pool, &select_by_id(self.scheme, id)).await
    }

    /// Inserts the row and its belongs-to-many links in one transaction. Returns the stored row.
    pub async fn create(&self, input: ResourceInput) -> Result<Value, AppError> {
        let mut errors = ErrorCollection::new();
        let mut attributes = self.hooks.filter_attributes_on_create(self.scheme, input.attributes);
        self.apply_to_one(&mut attributes, &input.to_one, &mut errors);
        let links = self.to_many_values(&input.to_many, &mut errors);
        let client_id = match input.id.as_deref() {
            Some(id) => match key_value(self.scheme, id) {
                Some(v) => Some(v),
                None => {
                    errors.add_data_id_error(self.translator.get(Message::InvalidIdentifier));
                    None
                }
            },
            None => None,
        };
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        if let Some(id) = client_id {
            attributes.insert(self.scheme.primary_key.clone(), id);
        }

        let include_pk = attributes.contains_key(&self.scheme.primary_key);
        let mut tx = self.pool.begin().await?;
        let row = fetch_optional(&mut *tx, &insert(self.scheme, &attributes, include_pk))
            .await
            .map_err(missing_related)?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        if include_pk {
            if let Some(q) = sync_key_sequence(self.scheme) {
                execute(&mut *tx, &q).await?;
            }
        }
        let id = row.get(&self.scheme.primary_key).cloned().unwrap_or(Value::Null);
        let extra = self.hooks.relationship_values_on_create();
        for (rel, ids) in &links {
            let link = self.intermediate(rel)?;
            for target in ids {
                execute(&mut *tx, &insert_intermediate(link, &id, target, &extra))
                    .await
                    .map_err(missing_related)?;
            }
        }
        tx.commit().await?;
        tracing::info!(resource = %self.schema.resource_type, id = %id, "created");
        Ok(row)
    }

    /// Updates columns and replaces the belongs-to-many links named in the input.
    /// `None` when the row does not exist.
    pub async fn update(&self, id: &Value, input: ResourceInput) -> Result<Option<Value>, AppError> {
        let mut errors = ErrorCollection::new();
        let mut attributes = self.hooks.filter_attributes_on_update(self.scheme, input.attributes);
        self.apply_to_one(&mut attributes, &input.to_one, &mut errors);
        let links = self.to_many_values(&input.to_many, &mut errors);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let mut tx = self.pool.begin().await?;
        let Some(row) = fetch_optional(&mut *tx, &update(self.scheme, id, &attributes))
            .await
            .map_err(missing_related)?
        else {
            tx.rollback().await?;
            return Ok(None);
        };
        let extra = self.hooks.relationship_values_on_update();
        for (rel, ids) in &links {
            let link = self.intermediate(rel)?;
            execute(&mut *tx, &delete_intermediate(link, id)).await?;
            for target in ids {
                execute(&mut *tx, &insert_intermediate(link, id, target, &extra))
                    .await
                    .map_err(missing_related)?;
            }
        }
        tx.commit().await?;
        tracing::info!(resource = %self.schema.resource_type, id = %id, "updated");
        Ok(Some(row))
    }

    /// `false` when there was nothing to delete.
    pub async fn delete(&self, id: &Value) -> Result<bool, AppError> {
        let deleted = fetch_optional(self.pool, &delete(self.scheme, id))
            .await
            .map_err(|e| match e {
                AppError::Db(sqlx::Error::Database(db)) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                    AppError::Conflict("resource is still referenced".into())
                }
                other => other,
            })?;
        if deleted.is_some() {
            tracing::info!(resource = %self.schema.resource_type, id = %id, "deleted");
        }
        Ok(deleted.is_some())
    }

    /// Related rows behind one relationship. `None` when the owner does not exist.
    pub async fn read_relationship(
        &self,
        id: &Value,
        json_name: &str,
    ) -> Result<Option<(&'a ResourceSchema, RelatedData)>, AppError> {
        let (rel, target, target_schema) = self.relationship_target(json_name)?;
        let Some(owner) = self.read(id).await? else {
            return Ok(None);
        };
        let data = match rel.kind {
            RelationshipKind::BelongsTo => {
                let fk = owner.get(&rel.foreign_key).cloned().unwrap_or(Value::Null);
                if fk.is_null() {
                    RelatedData::One(None)
                } else {
                    RelatedData::One(fetch_optional(self.pool, &select_by_id(target, &fk)).await?)
                }
            }
            RelationshipKind::HasMany => {
                let q = select_by_column_in(target, &rel.foreign_key, std::slice::from_ref(id));
                RelatedData::Many(fetch_all(self.pool, &q).await?)
            }
            RelationshipKind::BelongsToMany => {
                let link = self.intermediate(&rel.name)?;
                let q = select_via_intermediate(target, link, std::slice::from_ref(id));
                let mut rows = fetch_all(self.pool, &q).await?;
                for row in rows.iter_mut() {
                    if let Some(obj) = row.as_object_mut() {
                        obj.remove(OWNER_KEY_ALIAS);
                    }
                }
                RelatedData::Many(rows)
            }
        };
        Ok(Some((target_schema, data)))
    }

    /// Batch-loads one level of related rows for `rows`, one query per relationship.
    pub async fn load_included(&self, rows: &[Value], includes: &[String]) -> Result<Vec<IncludedRelationship>, AppError> {
        let mut out = Vec::with_capacity(includes.len());
        if rows.is_empty() {
            return Ok(out);
        }
        let pk = &self.scheme.primary_key;
        let owner_ids: Vec<Value> = rows.iter().filter_map(|r| r.get(pk).cloned()).collect();

        for json_name in includes {
            let (rel, target, target_schema) = self.relationship_target(json_name)?;
            let mut by_parent: HashMap<String, Vec<Value>> = HashMap::new();
            match rel.kind {
                RelationshipKind::BelongsTo => {
                    let mut seen = HashSet::new();
                    let fks: Vec<Value> = rows
                        .iter()
                        .filter_map(|r| r.get(&rel.foreign_key))
                        .filter(|v| !v.is_null())
                        .filter(|v| seen.insert(id_string(v)))
                        .cloned()
                        .collect();
                    let related = fetch_all(self.pool, &select_by_column_in(target, &target.primary_key, &fks)).await?;
                    let by_id: HashMap<String, Value> = related
                        .into_iter()
                        .filter_map(|r| r.get(&target.primary_key).and_then(id_string).map(|k| (k, r)))
                        .collect();
                    for row in rows {
                        let parent = row.get(pk).and_then(id_string);
                        let fk = row.get(&rel.foreign_key).and_then(id_string);
                        if let (Some(parent), Some(fk)) = (parent, fk) {
                            if let Some(r) = by_id.get(&fk) {
                                by_parent.entry(parent).or_default().push(r.clone());
                            }
                        }
                    }
                }
                RelationshipKind::HasMany => {
                    let related = fetch_all(self.pool, &select_by_column_in(target, &rel.foreign_key, &owner_ids)).await?;
                    for r in related {
                        if let Some(parent) = r.get(&rel.foreign_key).and_then(id_string) {
                            by_parent.entry(parent).or_default().push(r);
                        }
                    }
                }
                RelationshipKind::BelongsToMany => {
                    let link = self.intermediate(&rel.name)?;
                    let related = fetch_all(self.pool, &select_via_intermediate(target, link, &owner_ids)).await?;
                    for mut r in related {
                        let parent = r
                            .as_object_mut()
                            .and_then(|o| o.remove(OWNER_KEY_ALIAS))
                            .as_ref()
                            .and_then(id_string);
                        if let Some(parent) = parent {
                            by_parent.entry(parent).or_default().push(r);
                        }
                    }
                }
            }
            out.push(IncludedRelationship {
                name: json_name.clone(),
                resource_type: target_schema.resource_type.clone(),
                by_parent,
            });
        }
        Ok(out)
    }

    fn relationship_target(
        &self,
        json_name: &str,
    ) -> Result<(&'a ResolvedRelationship, &'a ModelScheme, &'a ResourceSchema), AppError> {
        let not_found = || AppError::NotFound(format!("{}/{}", self.schema.resource_type, json_name));
        let model_rel = self.schema.mappings.model_relationship(json_name).ok_or_else(not_found)?;
        let rel = self.scheme.relationship(model_rel).ok_or_else(not_found)?;
        let target = self.model.models.model(&rel.model).ok_or_else(not_found)?;
        let target_schema = self.model.schemes.schema_by_model(&rel.model).ok_or_else(not_found)?;
        Ok((rel, target, target_schema))
    }

    fn intermediate(&self, model_rel: &str) -> Result<IntermediateTable<'a>, AppError> {
        let invalid = || AppError::Config(crate::error::ConfigError::Validation(format!(
            "{}.{} is not a belongs_to_many relationship",
            self.scheme.id, model_rel
        )));
        let rel = self.scheme.relationship(model_rel).ok_or_else(invalid)?;
        let target = self.model.models.model(&rel.model).ok_or_else(invalid)?;
        Ok(IntermediateTable {
            table: rel.intermediate_table.as_deref().ok_or_else(invalid)?,
            owner_key: &rel.foreign_key,
            owner_cast: self.scheme.pk_type.cast(),
            target_key: rel.reverse_foreign_key.as_deref().ok_or_else(invalid)?,
            target_cast: target.pk_type.cast(),
        })
    }

    /// Belongs-to ids become foreign key columns.
    fn apply_to_one(
        &self,
        attributes: &mut HashMap<String, Value>,
        to_one: &[(String, Option<String>)],
        errors: &mut ErrorCollection,
    ) {
        for (rel_name, id) in to_one {
            let Some(rel) = self.scheme.relationship(rel_name) else { continue };
            let value = match id {
                None => Value::Null,
                Some(id) => match self.related_key(rel, id) {
                    Some(v) => v,
                    None => {
                        let json_name = self.schema.mappings.json_relationship(rel_name).unwrap_or(rel_name);
                        errors.add_relationship_id_error(json_name, self.translator.get(Message::InvalidIdentifier));
                        continue;
                    }
                },
            };
            attributes.insert(rel.foreign_key.clone(), value);
        }
    }

    fn to_many_values(
        &self,
        to_many: &[(String, Vec<String>)],
        errors: &mut ErrorCollection,
    ) -> Vec<(String, Vec<Value>)> {
        let mut out = Vec::with_capacity(to_many.len());
        for (rel_name, ids) in to_many {
            let Some(rel) = self.scheme.relationship(rel_name) else { continue };
            let mut values = Vec::with_capacity(ids.len());
            for id in ids {
                match self.related_key(rel, id) {
                    Some(v) if values.contains(&v) => {}
                    Some(v) => values.push(v),
                    None => {
                        let json_name = self.schema.mappings.json_relationship(rel_name).unwrap_or(rel_name);
                        errors.add_relationship_id_error(json_name, self.translator.get(Message::InvalidIdentifier));
                    }
                }
            }
            out.push((rel_name.clone(), values));
        }
        out
    }

    fn related_key(&self, rel: &ResolvedRelationship, id: &str) -> Option<Value> {
        self.model.models.model(&rel.model).and_then(|m| key_value(m, id))
    }
}

const FOREIGN_KEY_VIOLATION: &str = "23503";

/// A write naming a related row that does not exist.
fn missing_related(e: AppError) -> AppError {
    match e {
        AppError::Db(sqlx::Error::Database(db)) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
            AppError::NotFound("related resource".into())
        }
        other => other,
    }
}

/// JSON:API id string -> key value of `model`.
fn key_value(model: &ModelScheme, id: &str) -> Option<Value> {
    let column = model.column(&model.primary_key)?;
    typed_value(column.field_type, id)
}

/// Query-string or id text -> JSON value for a column of `field_type`.
fn typed_value(field_type: crate::config::FieldType, raw: &str) -> Option<Value> {
    use crate::config::FieldType;
    match field_type {
        FieldType::Int => raw.parse::<i32>().ok().map(Value::from),
        FieldType::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        FieldType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        FieldType::Uuid => uuid::Uuid::parse_str(raw).ok().map(|u| Value::String(u.to_string())),
        FieldType::Date => is_date(raw).then(|| Value::String(raw.to_string())),
        FieldType::String | FieldType::Text => Some(Value::String(raw.to_string())),
    }
}

fn bind_all<'q>(
    q: &'q QueryBuf,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

async fn fetch_optional<'e, E>(executor: E, q: &QueryBuf) -> Result<Option<Value>, AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let row = bind_all(q).fetch_optional(executor).await?;
    Ok(row.map(|r| row_to_json(&r)))
}

async fn fetch_all<'e, E>(executor: E, q: &QueryBuf) -> Result<Vec<Value>, AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let rows = bind_all(q).fetch_all(executor).await?;
    Ok(rows.iter().map(row_to_json).collect())
}

async fn execute<'e, E>(executor: E, q: &QueryBuf) -> Result<u64, AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
    let done = bind_all(q).execute(executor).await?;
    Ok(done.rows_affected())
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<serde_json::Value>, _>(name) {
        return j;
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::blog_model;
    use crate::i18n::DefaultTranslator;
    use crate::pagination::BasicPagination;
    use crate::service::DefaultHooks;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn lazy_pool() -> PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn index_params_map_members_to_fields() {
        let model = blog_model();
        let pool = lazy_pool();
        let pagination = BasicPagination::default();
        let translator = DefaultTranslator::new();
        let crud = Crud::new(&pool, &model, "posts", &pagination, &DefaultHooks, &translator).unwrap();
        let mut errors = ErrorCollection::new();
        let params = crud.parse_index_params(
            &query(&[
                ("filter[title]", "Hello"),
                ("filter[id]", "4"),
                ("sort", "-createdAt,title"),
                ("include", "board,comments,board"),
                ("page[limit]", "5"),
            ]),
            &mut errors,
        );
        assert!(errors.is_empty());
        assert_eq!(
            params.filters,
            vec![("id_post".to_string(), json!(4)), ("title".to_string(), json!("Hello"))]
        );
        assert_eq!(
            params.sort,
            vec![
                SortField { field: "created_at".into(), descending: true },
                SortField { field: "title".into(), descending: false },
            ]
        );
        assert_eq!(params.includes, vec!["board".to_string(), "comments".to_string()]);
        assert_eq!((params.offset, params.limit), (0, 5));
    }

    #[tokio::test]
    async fn bad_query_members_are_parameter_errors() {
        let model = blog_model();
        let pool = lazy_pool();
        let pagination = BasicPagination::default();
        let translator = DefaultTranslator::new();
        let crud = Crud::new(&pool, &model, "posts", &pagination, &DefaultHooks, &translator).unwrap();
        let mut errors = ErrorCollection::new();
        crud.parse_index_params(
            &query(&[("filter[color]", "red"), ("filter[id]", "x"), ("sort", "color"), ("include", "author")]),
            &mut errors,
        );
        let params: Vec<String> = errors
            .iter()
            .filter_map(|e| e.source.as_ref().and_then(|s| s.parameter.clone()))
            .collect();
        assert_eq!(params, vec!["filter[color]", "filter[id]", "sort", "include"]);
        assert_eq!(errors.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_type_and_bad_ids() {
        let model = blog_model();
        let pool = lazy_pool();
        let pagination = BasicPagination::default();
        let translator = DefaultTranslator::new();
        assert!(matches!(
            Crud::new(&pool, &model, "widgets", &pagination, &DefaultHooks, &translator),
            Err(AppError::NotFound(_))
        ));
        let crud = Crud::new(&pool, &model, "boards", &pagination, &DefaultHooks, &translator).unwrap();
        assert_eq!(crud.parse_id("12").unwrap(), json!(12));
        assert!(matches!(crud.parse_id("twelve"), Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_rejects_related_ids_of_the_wrong_shape() {
        let model = blog_model();
        let pool = lazy_pool();
        let pagination = BasicPagination::default();
        let translator = DefaultTranslator::new();
        let crud = Crud::new(&pool, &model, "comments", &pagination, &DefaultHooks, &translator).unwrap();
        let input = ResourceInput {
            to_one: vec![("post".into(), Some("first".into()))],
            to_many: vec![("emotions".into(), vec!["1".into(), "two".into()])],
            ..Default::default()
        };
        let Err(AppError::Validation(errors)) = crud.create(input).await else {
            panic!("expected validation error");
        };
        let pointers: Vec<String> = errors
            .iter()
            .filter_map(|e| e.source.as_ref().and_then(|s| s.pointer.clone()))
            .collect();
        assert_eq!(
            pointers,
            vec!["/data/relationships/post/data/id", "/data/relationships/emotions/data/id"]
        );
    }

    #[tokio::test]
    async fn values_outside_integer_columns_are_rejected_before_the_database() {
        let model = blog_model();
        let pool = lazy_pool();
        let pagination = BasicPagination::default();
        let translator = DefaultTranslator::new();
        let boards = Crud::new(&pool, &model, "boards", &pagination, &DefaultHooks, &translator).unwrap();
        assert!(matches!(boards.parse_id("99999999999"), Err(AppError::NotFound(_))));

        let mut errors = ErrorCollection::new();
        let params = boards.parse_index_params(
            &query(&[("filter[id]", "99999999999"), ("filter[createdAt]", "garbage")]),
            &mut errors,
        );
        assert!(params.filters.is_empty());
        let names: Vec<String> = errors
            .iter()
            .filter_map(|e| e.source.as_ref().and_then(|s| s.parameter.clone()))
            .collect();
        assert_eq!(names, vec!["filter[createdAt]", "filter[id]"]);

        let input = ResourceInput {
            id: Some("99999999999".into()),
            ..Default::default()
        };
        let Err(AppError::Validation(errors)) = boards.create(input).await else {
            panic!("expected validation error");
        };
        assert_eq!(errors.status(), axum::http::StatusCode::CONFLICT);

        let users = Crud::new(&pool, &model, "users", &pagination, &DefaultHooks, &translator).unwrap();
        let input = ResourceInput {
            to_one: vec![("role".into(), Some("99999999999".into()))],
            ..Default::default()
        };
        let Err(AppError::Validation(errors)) = users.create(input).await else {
            panic!("expected validation error");
        };
        assert_eq!(errors.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn date_filters_must_parse() {
        let model = blog_model();
        let pool = lazy_pool();
        let pagination = BasicPagination::default();
        let translator = DefaultTranslator::new();
        let crud = Crud::new(&pool, &model, "boards", &pagination, &DefaultHooks, &translator).unwrap();
        let mut errors = ErrorCollection::new();
        let params = crud.parse_index_params(&query(&[("filter[createdAt]", "2016-01-02 03:04:05")]), &mut errors);
        assert!(errors.is_empty());
        assert_eq!(
            params.filters,
            vec![("created_at".to_string(), json!("2016-01-02 03:04:05"))]
        );
    }

    #[test]
    fn typed_values_follow_field_types() {
        use crate::config::FieldType;
        assert_eq!(typed_value(FieldType::Int, "7"), Some(json!(7)));
        assert_eq!(typed_value(FieldType::Int, "7.5"), None);
        assert_eq!(typed_value(FieldType::Int, "2147483647"), Some(json!(2147483647)));
        assert_eq!(typed_value(FieldType::Int, "2147483648"), None);
        assert_eq!(typed_value(FieldType::Date, "2016-01-02"), Some(json!("2016-01-02")));
        assert_eq!(typed_value(FieldType::Date, "garbage"), None);
        assert_eq!(typed_value(FieldType::Bool, "TRUE"), Some(json!(true)));
        assert_eq!(typed_value(FieldType::Float, "0.5"), Some(json!(0.5)));
        assert_eq!(typed_value(FieldType::String, "x"), Some(json!("x")));
    }
}
