#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use jsonapi_crud::{resolve, resource_routes, AppState, FullConfig, ResolvedModel, MEDIA_TYPE};
use serde_json::Value;
use tower::ServiceExt;

pub fn blog_config() -> FullConfig {
    FullConfig {
        models: serde_json::from_str(include_str!("../../demo_server/schema/models.json")).unwrap(),
        resources: serde_json::from_str(include_str!("../../demo_server/schema/resources.json")).unwrap(),
    }
}

pub fn blog_model() -> ResolvedModel {
    resolve(&blog_config()).unwrap()
}

/// Router over a pool that never connects; only requests rejected before any query succeed.
pub fn offline_app() -> Router {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .unwrap();
    resource_routes(AppState::new(pool, blog_model()))
}

pub fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, MEDIA_TYPE)
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp: Response<Body> = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// `source.pointer` of every error in an error document.
pub fn pointers(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["source"]["pointer"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
