//! Resource controller: index, create, read, update, delete and related reads.

use crate::config::ResourceSchema;
use crate::document::{Encoder, ErrorCollection, ResourceIdentifier, ResourceObject};
use crate::error::AppError;
use crate::extractors::JsonApiBody;
use crate::i18n::Message;
use crate::pagination::page_links;
use crate::response;
use crate::service::{Crud, RelatedData};
use crate::state::AppState;
use crate::transformer::{ResourceInput, Transformer};
use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Controller methods, as named in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerMethod {
    Index,
    Create,
    Read,
    Update,
    Delete,
}

impl ControllerMethod {
    pub const INDEX: &'static str = "index";
    pub const CREATE: &'static str = "create";
    pub const READ: &'static str = "read";
    pub const UPDATE: &'static str = "update";
    pub const DELETE: &'static str = "delete";

    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerMethod::Index => Self::INDEX,
            ControllerMethod::Create => Self::CREATE,
            ControllerMethod::Read => Self::READ,
            ControllerMethod::Update => Self::UPDATE,
            ControllerMethod::Delete => Self::DELETE,
        }
    }
}

fn crud<'a>(state: &'a AppState, resource_type: &str, method: ControllerMethod) -> Result<Crud<'a>, AppError> {
    tracing::debug!(resource = resource_type, method = method.as_str(), "dispatch");
    Crud::new(
        &state.pool,
        &state.model,
        resource_type,
        state.pagination.as_ref(),
        state.hooks.as_ref(),
        state.translator.as_ref(),
    )
}

fn encoder(state: &AppState) -> Encoder<'_> {
    Encoder::new(&state.model, &state.url_prefix)
}

fn includes(crud: &Crud<'_>, query: &HashMap<String, String>) -> Result<Vec<String>, AppError> {
    let Some(include) = query.get("include") else {
        return Ok(Vec::new());
    };
    let mut errors = ErrorCollection::new();
    let names = crud.parse_includes(include, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok(names)
}

/// Request document -> model input. `route_id` is set for updates and must match the body.
fn read_input(
    state: &AppState,
    schema: &ResourceSchema,
    body: &Value,
    route_id: Option<&str>,
) -> Result<ResourceInput, AppError> {
    let t = state.translator.as_ref();
    let mut errors = ErrorCollection::new();
    let Some(resource) = ResourceObject::parse(body, &mut errors, t) else {
        return Err(AppError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let transformer = Transformer::new(schema, &state.model, t);
    if !transformer.is_valid_type(&resource.type_) {
        errors.add_data_type_error(t.get(Message::InvalidResourceType));
        return Err(AppError::Validation(errors));
    }
    if let Some(route_id) = route_id {
        if resource.id.as_deref() != Some(route_id) {
            errors.add_data_id_error(t.get(Message::InvalidIdentifier));
            return Err(AppError::Validation(errors));
        }
    }

    let input = transformer.transform_resource(&mut errors, &resource);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok(input)
}

/// GET /{type}
pub async fn index(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let crud = crud(&state, &resource_type, ControllerMethod::Index)?;
    let mut errors = ErrorCollection::new();
    let params = crud.parse_index_params(&query, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let page = crud.index(&params).await?;
    let included = crud.load_included(&page.rows, &params.includes).await?;
    let enc = encoder(&state);
    let links = page_links(
        &enc.collection_url(&resource_type),
        &query,
        page.offset,
        page.limit,
        page.has_more,
    );
    Ok(response::ok(enc.collection(crud.schema(), &page.rows, Some(&links), &included)))
}

/// POST /{type}
pub async fn create(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    JsonApiBody(body): JsonApiBody,
) -> Result<Response, AppError> {
    let crud = crud(&state, &resource_type, ControllerMethod::Create)?;
    let input = read_input(&state, crud.schema(), &body, None)?;
    let row = crud.create(input).await?;

    let enc = encoder(&state);
    let id = enc.row_id(crud.schema(), &row).unwrap_or_default();
    let location = enc.resource_url(&resource_type, &id);
    Ok(response::created(&location, enc.single(crud.schema(), &row, &[])))
}

/// GET /{type}/{id}
pub async fn read(
    State(state): State<AppState>,
    Path((resource_type, id_str)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let crud = crud(&state, &resource_type, ControllerMethod::Read)?;
    let id = crud.parse_id(&id_str)?;
    let include = includes(&crud, &query)?;
    let row = crud
        .read(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{}", resource_type, id_str)))?;
    let included = crud.load_included(std::slice::from_ref(&row), &include).await?;
    Ok(response::ok(encoder(&state).single(crud.schema(), &row, &included)))
}

/// PATCH /{type}/{id}
pub async fn update(
    State(state): State<AppState>,
    Path((resource_type, id_str)): Path<(String, String)>,
    JsonApiBody(body): JsonApiBody,
) -> Result<Response, AppError> {
    let crud = crud(&state, &resource_type, ControllerMethod::Update)?;
    let id = crud.parse_id(&id_str)?;
    let input = read_input(&state, crud.schema(), &body, Some(&id_str))?;
    let row = crud
        .update(&id, input)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{}", resource_type, id_str)))?;
    Ok(response::ok(encoder(&state).single(crud.schema(), &row, &[])))
}

/// DELETE /{type}/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path((resource_type, id_str)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let crud = crud(&state, &resource_type, ControllerMethod::Delete)?;
    let id = crud.parse_id(&id_str)?;
    if !crud.delete(&id).await? {
        return Err(AppError::NotFound(format!("{}/{}", resource_type, id_str)));
    }
    Ok(response::no_content())
}

/// GET /{type}/{id}/{relationship}: the related resource(s).
pub async fn read_related(
    State(state): State<AppState>,
    Path((resource_type, id_str, relationship)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let crud = crud(&state, &resource_type, ControllerMethod::Read)?;
    let id = crud.parse_id(&id_str)?;
    let (target, data) = crud
        .read_relationship(&id, &relationship)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{}", resource_type, id_str)))?;

    let enc = encoder(&state);
    let self_url = format!("{}/{}", enc.resource_url(&resource_type, &id_str), relationship);
    let mut doc = match data {
        RelatedData::One(None) => return Ok(response::ok(enc.null_document(self_url))),
        RelatedData::One(Some(row)) => enc.single(target, &row, &[]),
        RelatedData::Many(rows) => enc.collection(target, &rows, None, &[]),
    };
    doc["links"] = json!({ "self": self_url });
    Ok(response::ok(doc))
}

/// GET /{type}/{id}/relationships/{relationship}: resource linkage only.
pub async fn read_relationship(
    State(state): State<AppState>,
    Path((resource_type, id_str, relationship)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let crud = crud(&state, &resource_type, ControllerMethod::Read)?;
    let id = crud.parse_id(&id_str)?;
    let (target, data) = crud
        .read_relationship(&id, &relationship)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{}", resource_type, id_str)))?;

    let enc = encoder(&state);
    let identifier = |row: &Value| {
        enc.row_id(target, row)
            .map(|rid| ResourceIdentifier::new(target.resource_type.as_str(), rid))
    };
    let data = match data {
        RelatedData::One(row) => json!(row.as_ref().and_then(identifier)),
        RelatedData::Many(rows) => json!(rows.iter().filter_map(identifier).collect::<Vec<_>>()),
    };
    let base = enc.resource_url(&resource_type, &id_str);
    Ok(response::ok(json!({
        "data": data,
        "links": {
            "self": format!("{}/relationships/{}", base, relationship),
            "related": format!("{}/{}", base, relationship),
        }
    })))
}
