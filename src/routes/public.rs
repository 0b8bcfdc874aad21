use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Credential exchange for both principal kinds plus read-only course
/// browsing. No token is inspected on these routes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api
        .route("/", get(handlers::api_root))
        // POST /auth/register, /auth/login
        // User accounts. `role: "Admin"` is honoured at registration.
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        // POST /expert/register, /expert/login
        // Expert accounts live in their own table and always carry `Admin`.
        .route("/expert/register", post(handlers::expert::register))
        .route("/expert/login", post(handlers::expert::login))
        // GET /courses, /courses/active, /courses/{id}
        // Admin-only writes on the same paths are merged in from `admin_routes`.
        .route("/courses", get(handlers::courses::list_courses))
        .route("/courses/active", get(handlers::courses::list_active_courses))
        .route("/courses/{id}", get(handlers::courses::get_course))
}
