//! Typed errors and HTTP mapping. Every error leaves as a JSON:API error document.

use crate::document::{ErrorCollection, ErrorObject, MEDIA_TYPE};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} id '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: model {model} column {column}")]
    InvalidPrimaryKey { model: String, column: String },
    #[error("duplicate resource type: {0}")]
    DuplicateResourceType(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid document: {} error(s)", .0.len())]
    Validation(ErrorCollection),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
}

const UNIQUE_VIOLATION: &str = "23505";
const NOT_NULL_VIOLATION: &str = "23502";

#[derive(Serialize)]
pub struct ErrorBody {
    pub errors: Vec<ErrorObject>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(errors) => errors.status(),
            AppError::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Db(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StatusCode::CONFLICT
            }
            AppError::Db(sqlx::Error::Database(db)) if db.code().as_deref() == Some(NOT_NULL_VIOLATION) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }

    /// Error objects for the response body. Internal failures carry no detail.
    pub fn into_errors(self) -> Vec<ErrorObject> {
        let status = self.status();
        match self {
            AppError::Validation(errors) => errors.into_vec(),
            AppError::Db(sqlx::Error::RowNotFound) => vec![ErrorObject::new(status, "Resource not found.")],
            AppError::Db(_) if status == StatusCode::CONFLICT => {
                vec![ErrorObject::new(status, "Resource conflicts with an existing one.")]
            }
            AppError::Db(sqlx::Error::Database(db)) if status == StatusCode::UNPROCESSABLE_ENTITY => {
                let mut error = ErrorObject::new(status, "Required value is missing.");
                let pg = db.try_downcast_ref::<sqlx::postgres::PgDatabaseError>();
                if let Some(column) = pg.and_then(|e| e.column()) {
                    error = error.with_detail(column.to_string());
                }
                vec![error]
            }
            AppError::Db(_) | AppError::Config(_) => vec![ErrorObject::new(status, "Internal server error.")],
            AppError::NotFound(what) => {
                vec![ErrorObject::new(status, "Resource not found.").with_detail(what)]
            }
            AppError::Conflict(msg) => vec![ErrorObject::new(status, "Conflict.").with_detail(msg)],
            AppError::BadRequest(msg) => vec![ErrorObject::new(status, "Bad request.").with_detail(msg)],
            AppError::UnsupportedMediaType(msg) => {
                vec![ErrorObject::new(status, "Unsupported media type.").with_detail(msg)]
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            errors: self.into_errors(),
        };
        (status, [(header::CONTENT_TYPE, MEDIA_TYPE)], Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validation_errors_keep_their_status_and_pointers() {
        let mut errors = ErrorCollection::new();
        errors.add_data_attribute_error("title", "Invalid value.");
        errors.add_relationship_id_error("board", "Invalid identifier.");
        let err = AppError::Validation(errors);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let objects = err.into_errors();
        assert_eq!(objects.len(), 2);
        assert_eq!(
            objects[0].source.as_ref().and_then(|s| s.pointer.as_deref()),
            Some("/data/attributes/title")
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::Db(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let objects = err.into_errors();
        assert_eq!(objects[0].detail, None);
        assert_eq!(objects[0].status, "500");
    }

    #[test]
    fn response_uses_jsonapi_media_type() {
        let resp = AppError::NotFound("boards/9".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), MEDIA_TYPE);
    }
}
