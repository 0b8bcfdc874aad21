//! HTTP handlers, one module per controller.
//!
//! Every handler takes the unified `AppState` and returns either a typed JSON
//! body or an `ApiError` (course handlers: `CourseError`), so they can be
//! called directly in tests with `State(...)` and a `JsonBody(...)`.

pub mod auth;
pub mod courses;
pub mod expert;
pub mod stats;
pub mod students;

use axum::Json;
use serde_json::{Value, json};

/// [Public Route] Liveness probe served outside `/api`.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// [Public Route] Base route of the API.
#[utoipa::path(
    get,
    path = "/api",
    responses((status = 200, description = "API is running"))
)]
pub async fn api_root() -> Json<Value> {
    Json(json!({ "message": "API is running" }))
}
