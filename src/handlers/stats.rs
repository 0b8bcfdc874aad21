use axum::{Json, extract::State};

use crate::{AppState, error::ApiError, models::{Role, UserStats}};

/// user_stats
///
/// [Admin Route] Counts every `users` row and the Student subset. Experts are
/// not included.
#[utoipa::path(
    get,
    path = "/api/stats/users",
    responses((status = 200, description = "User counts", body = UserStats)),
    security(("bearer_auth" = []))
)]
pub async fn user_stats(State(state): State<AppState>) -> Result<Json<UserStats>, ApiError> {
    let (total_users, total_students) = tokio::try_join!(
        state.repo.count_users(None),
        state.repo.count_users(Some(Role::Student)),
    )?;

    Ok(Json(UserStats {
        total_users,
        total_students,
    }))
}
