use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Student administration, statistics and course writes. `require_admin`
/// checks only the token's role, so admin users and experts are equivalent
/// here.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/dashboard/admin", get(handlers::auth::admin_dashboard))
        .route("/expert/dashboard", get(handlers::expert::dashboard))
        // --- Student administration ---
        // Updating a student with `courses` re-syncs course memberships;
        // deleting one purges their id from every course.
        .route(
            "/students",
            get(handlers::students::list_students).post(handlers::students::create_student),
        )
        .route(
            "/students/{id}",
            get(handlers::students::get_student)
                .put(handlers::students::update_student)
                .delete(handlers::students::delete_student),
        )
        .route("/stats/users", get(handlers::stats::user_stats))
        // --- Course writes ---
        .route("/courses", post(handlers::courses::create_course))
        .route(
            "/courses/{id}",
            put(handlers::courses::update_course).delete(handlers::courses::delete_course),
        )
        .route("/courses/{id}/students", get(handlers::courses::course_students))
}
