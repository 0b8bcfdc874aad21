use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, JsonBody},
    models::{
        AuthResponse, LoginRequest, MessageResponse, NewPrincipal, Principal, PrincipalChanges,
        PrincipalKind, ProfileResponse, RegisterRequest, Role, TokenPair, UpdateMeRequest,
    },
    password::{hash_password, verify_password},
    token::Identity,
    validation::{non_empty, normalize_email},
};

// --- Shared credential flow (users and experts) ---

/// register_principal
///
/// Validates a registration body, rejects a duplicate email within `kind`'s
/// table, stores the principal with a bcrypt hash and issues a token pair.
pub(crate) async fn register_principal(
    state: &AppState,
    kind: PrincipalKind,
    role: Role,
    payload: RegisterRequest,
) -> Result<(Principal, TokenPair), ApiError> {
    let (Some(name), Some(email), Some(password), Some(confirm)) = (
        non_empty(payload.name),
        non_empty(payload.email),
        non_empty(payload.password),
        non_empty(payload.confirm_password),
    ) else {
        return Err(ApiError::validation("Missing required fields"));
    };
    if password != confirm {
        return Err(ApiError::validation("Passwords do not match"));
    }

    let email = normalize_email(&email);
    if state.repo.email_taken(kind, &email, None).await? {
        return Err(ApiError::conflict("Email already registered"));
    }

    let password_hash = hash_password(password, state.config.bcrypt_cost).await?;
    let principal = state
        .repo
        .create_principal(
            kind,
            NewPrincipal {
                name,
                email,
                password_hash,
                role,
            },
        )
        .await?;

    let tokens = state.tokens.issue_pair(&identity_of(&principal, kind))?;
    tracing::info!(id = %principal.id, ?kind, role = role.as_str(), "principal registered");
    Ok((principal, tokens))
}

/// login_principal
///
/// Unknown email and wrong password produce the same 401 so the response
/// never reveals which accounts exist.
pub(crate) async fn login_principal(
    state: &AppState,
    kind: PrincipalKind,
    payload: LoginRequest,
) -> Result<(Principal, TokenPair), ApiError> {
    let (Some(email), Some(password)) = (non_empty(payload.email), non_empty(payload.password))
    else {
        return Err(ApiError::validation("Email and password are required"));
    };

    let invalid = || ApiError::unauthorized("Invalid credentials");
    let principal = state
        .repo
        .find_principal_by_email(kind, &normalize_email(&email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(password, principal.password_hash.clone()).await? {
        tracing::debug!(id = %principal.id, "password mismatch");
        return Err(invalid());
    }

    let tokens = state.tokens.issue_pair(&identity_of(&principal, kind))?;
    Ok((principal, tokens))
}

fn identity_of(principal: &Principal, kind: PrincipalKind) -> Identity {
    Identity {
        id: principal.id,
        role: principal.role,
        principal_type: kind,
    }
}

// --- Handlers ---

/// register
///
/// [Public Route] Creates a `users` row. The account is `Admin` only when the
/// body's `role` is exactly `"Admin"`.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Missing fields or password mismatch", body = MessageResponse),
        (status = 409, description = "Email already registered", body = MessageResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let role = Role::from_requested(payload.role.as_deref());
    let (user, tokens) = register_principal(&state, PrincipalKind::User, role, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registered successfully".to_string(),
            user: user.summary(),
            tokens,
        }),
    ))
}

/// login
///
/// [Public Route] Exchanges user credentials for a token pair.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Missing credentials", body = MessageResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (user, tokens) = login_principal(&state, PrincipalKind::User, payload).await?;

    Ok(Json(AuthResponse {
        message: "Logged in successfully".to_string(),
        user: user.summary(),
        tokens,
    }))
}

/// me
///
/// [Student Route] Returns the caller's own profile. Served at both
/// `/api/auth/me` and `/api/me`.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current profile", body = ProfileResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state
        .repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse {
        message: None,
        user: user.profile(),
    }))
}

/// update_me
///
/// [Student Route] Partial self-service update. Blank `name` or `email` values
/// leave the stored ones untouched. Sending either password field requires
/// both, non-empty and equal.
#[utoipa::path(
    put,
    path = "/api/me",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Passwords do not match", body = MessageResponse),
        (status = 409, description = "Email already in use", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UpdateMeRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let mut changes = PrincipalChanges {
        name: non_empty(payload.name.map(|n| n.trim().to_string())),
        email: non_empty(payload.email.as_deref().map(normalize_email)),
        password_hash: None,
    };

    if payload.password.is_some() || payload.confirm_password.is_some() {
        match (non_empty(payload.password), payload.confirm_password) {
            (Some(password), Some(confirm)) if password == confirm => {
                changes.password_hash =
                    Some(hash_password(password, state.config.bcrypt_cost).await?);
            }
            _ => return Err(ApiError::validation("Passwords do not match")),
        }
    }

    if let Some(email) = changes.email.as_deref() {
        if state
            .repo
            .email_taken(PrincipalKind::User, email, Some(id))
            .await?
        {
            return Err(ApiError::conflict("Email already in use"));
        }
    }

    let user = state
        .repo
        .update_user(id, changes, None)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse {
        message: Some("Profile updated".to_string()),
        user: user.profile(),
    }))
}

/// [Student Route] Placeholder landing endpoint for the student UI.
#[utoipa::path(
    get,
    path = "/api/auth/dashboard/student",
    responses((status = 200, description = "Student dashboard", body = MessageResponse)),
    security(("bearer_auth" = []))
)]
pub async fn student_dashboard() -> Json<MessageResponse> {
    Json(MessageResponse::new("Student dashboard"))
}

/// [Admin Route] Placeholder landing endpoint for the admin UI.
#[utoipa::path(
    get,
    path = "/api/auth/dashboard/admin",
    responses((status = 200, description = "Admin dashboard", body = MessageResponse)),
    security(("bearer_auth" = []))
)]
pub async fn admin_dashboard() -> Json<MessageResponse> {
    Json(MessageResponse::new("Admin dashboard"))
}
