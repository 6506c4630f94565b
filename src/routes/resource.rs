//! JSON:API resource routes. The resource type is a path parameter; handlers
//! look it up in the resolved model and answer 404 for unknown types.

use crate::handlers::resource::{create, delete, index, read, read_related, read_relationship, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Largest accepted request body in bytes.
pub const BODY_LIMIT: usize = 1024 * 1024;

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/:resource_type", get(index).post(create))
        .route("/:resource_type/:id", get(read).patch(update).delete(delete))
        .route("/:resource_type/:id/:relationship", get(read_related))
        .route(
            "/:resource_type/:id/relationships/:relationship",
            get(read_relationship),
        )
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .with_state(state)
}
