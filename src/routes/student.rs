use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Student Router Module
///
/// Self-service routes for Student accounts. Handlers resolve the caller with
/// the `AuthUser` extractor; `require_student` has already rejected every
/// other role with 403.
pub fn student_routes() -> Router<AppState> {
    Router::new()
        // GET /auth/me and GET|PUT /me
        .route("/auth/me", get(handlers::auth::me))
        .route("/me", get(handlers::auth::me).put(handlers::auth::update_me))
        .route("/auth/dashboard/student", get(handlers::auth::student_dashboard))
        // POST /courses/{id}/enroll
        // Idempotent: enrolling twice leaves a single membership entry.
        .route("/courses/{id}/enroll", post(handlers::courses::enroll))
        // GET /courses/me/enrolled and its alias GET /me/course
        .route("/courses/me/enrolled", get(handlers::courses::my_courses))
        .route("/me/course", get(handlers::courses::my_courses))
}
