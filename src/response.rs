//! JSON:API response helpers.

use crate::document::MEDIA_TYPE;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// A top-level document with the JSON:API media type.
pub fn document(status: StatusCode, body: Value) -> Response {
    (status, [(header::CONTENT_TYPE, MEDIA_TYPE)], Json(body)).into_response()
}

pub fn ok(body: Value) -> Response {
    document(StatusCode::OK, body)
}

/// 201 with `Location` pointing at the new resource.
pub fn created(location: &str, body: Value) -> Response {
    let mut resp = document(StatusCode::CREATED, body);
    if let Ok(v) = HeaderValue::from_str(location) {
        resp.headers_mut().insert(header::LOCATION, v);
    }
    resp
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn created_sets_location_and_media_type() {
        let resp = created("/api/boards/1", json!({"data": null}));
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/api/boards/1");
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), MEDIA_TYPE);
    }

    #[test]
    fn no_content_has_no_body_type() {
        let resp = no_content();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(resp.headers().get(header::CONTENT_TYPE).is_none());
    }
}
