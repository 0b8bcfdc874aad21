use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes gated only by `authenticate`: any verified token is accepted,
/// whatever its role or principal kind.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /expert/me
        // Echoes the decoded claims of the caller.
        .route("/expert/me", get(handlers::expert::me))
}
