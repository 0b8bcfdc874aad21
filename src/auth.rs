use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{PrincipalKind, Role},
    token::{Claims, TokenService},
};

/// authenticate
///
/// Middleware applied to every protected router. Reads the bearer token from
/// the `Authorization` header, verifies it and stores the decoded `Claims` in
/// the request extensions for the role gate and the `AuthUser` extractor.
///
/// Rejection: 401 when the token is absent, malformed, forged or expired.
pub async fn authenticate(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers().get(header::AUTHORIZATION))
        .ok_or_else(|| ApiError::unauthorized("Authentication token missing"))?;

    let claims = tokens.verify_access_token(token)?;
    tracing::debug!(principal = %claims.id, role = claims.role.as_str(), "request authenticated");

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn bearer_token(value: Option<&axum::http::HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// authorize
///
/// The role gate. An empty `allowed` list admits any authenticated principal.
/// Only `claims.role` is consulted: an Expert token and an Admin user token
/// are interchangeable here.
pub fn authorize(allowed: &[Role], claims: Option<&Claims>) -> Result<(), ApiError> {
    let claims = claims.ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;
    if allowed.is_empty() || allowed.contains(&claims.role) {
        Ok(())
    } else {
        tracing::warn!(
            principal = %claims.id,
            role = claims.role.as_str(),
            "role not permitted on this route"
        );
        Err(ApiError::Forbidden)
    }
}

/// Middleware admitting only `Admin` principals. Must run after `authenticate`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    authorize(&[Role::Admin], request.extensions().get::<Claims>())?;
    Ok(next.run(request).await)
}

/// Middleware admitting only `Student` principals. Must run after `authenticate`.
pub async fn require_student(request: Request, next: Next) -> Result<Response, ApiError> {
    authorize(&[Role::Student], request.extensions().get::<Claims>())?;
    Ok(next.run(request).await)
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it as an
/// argument to learn who is calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub principal_type: PrincipalKind,
}

impl From<&Claims> for AuthUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.id,
            role: claims.role,
            principal_type: claims.principal_type,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Reads the `Claims` left by `authenticate`. Using it on a route without the
/// `authenticate` layer rejects every request with 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .map(AuthUser::from)
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
    }
}
