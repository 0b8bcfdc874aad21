use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::{
    AppState,
    error::{ApiError, JsonBody},
    handlers::auth::{login_principal, register_principal},
    models::{ExpertAuthResponse, LoginRequest, MessageResponse, PrincipalKind, RegisterRequest, Role},
    token::Claims,
};

/// register
///
/// [Public Route] Creates an `experts` row. Experts always carry the `Admin`
/// role in storage and in their tokens; any `role` in the body is ignored. Email uniqueness is checked only
/// against other experts.
#[utoipa::path(
    post,
    path = "/api/expert/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Expert registered", body = ExpertAuthResponse),
        (status = 400, description = "Missing fields or password mismatch", body = MessageResponse),
        (status = 409, description = "Email already registered", body = MessageResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<ExpertAuthResponse>), ApiError> {
    let (expert, tokens) =
        register_principal(&state, PrincipalKind::Expert, Role::Admin, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(ExpertAuthResponse {
            message: "Registered successfully".to_string(),
            expert: expert.expert_summary(),
            tokens,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/expert/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ExpertAuthResponse),
        (status = 400, description = "Missing credentials", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<ExpertAuthResponse>, ApiError> {
    let (expert, tokens) = login_principal(&state, PrincipalKind::Expert, payload).await?;

    Ok(Json(ExpertAuthResponse {
        message: "Logged in successfully".to_string(),
        expert: expert.expert_summary(),
        tokens,
    }))
}

#[derive(Debug, Serialize)]
pub struct ClaimsResponse {
    pub user: Claims,
}

/// me
///
/// [Authenticated Route] Echoes the verified token claims back. Any role is
/// accepted, so a student token answers here too.
#[utoipa::path(
    get,
    path = "/api/expert/me",
    responses((status = 200, description = "Decoded token claims")),
    security(("bearer_auth" = []))
)]
pub async fn me(Extension(claims): Extension<Claims>) -> Json<ClaimsResponse> {
    Json(ClaimsResponse { user: claims })
}

#[utoipa::path(
    get,
    path = "/api/expert/dashboard",
    responses((status = 200, description = "Expert dashboard", body = MessageResponse)),
    security(("bearer_auth" = []))
)]
pub async fn dashboard() -> Json<MessageResponse> {
    Json(MessageResponse::new("Expert dashboard"))
}
