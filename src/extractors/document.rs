//! Request body extractor for JSON:API documents.

use crate::document::{ErrorCollection, MEDIA_TYPE};
use crate::error::AppError;
use crate::i18n::Message;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, HeaderMap},
};
use serde_json::Value;

/// Parsed top-level request document. The body must be a JSON object sent as
/// `application/vnd.api+json` (without media type parameters) or `application/json`.
#[derive(Clone, Debug)]
pub struct JsonApiBody(pub Value);

/// Checks `Content-Type` against the JSON:API negotiation rules.
pub fn check_content_type(headers: &HeaderMap) -> Result<(), String> {
    let Some(raw) = headers.get(header::CONTENT_TYPE) else {
        return Err("missing content type".into());
    };
    let raw = raw.to_str().map_err(|_| "unreadable content type".to_string())?;
    let mut parts = raw.split(';');
    let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let has_params = parts.any(|p| !p.trim().is_empty());
    match essence.as_str() {
        MEDIA_TYPE if has_params => Err(format!("{} must not carry media type parameters", MEDIA_TYPE)),
        MEDIA_TYPE | "application/json" => Ok(()),
        other => Err(format!("{} is not accepted", other)),
    }
}

#[async_trait]
impl FromRequest<AppState> for JsonApiBody {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Err(msg) = check_content_type(req.headers()) {
            return Err(AppError::UnsupportedMediaType(msg));
        }
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(v @ Value::Object(_)) => Ok(JsonApiBody(v)),
            _ => {
                let mut errors = ErrorCollection::new();
                errors.add_data_error(state.translator.get(Message::MalformedDocument));
                Err(AppError::Validation(errors))
            }
        }
    }
}
