use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;

/// ApiError
///
/// The single failure taxonomy shared by every handler and the auth gate.
/// Each variant maps onto exactly one HTTP status; the carried string is the
/// client-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// 400: malformed or missing input.
    #[error("{0}")]
    Validation(String),
    /// 401: missing/invalid/expired token, or failed login.
    #[error("{0}")]
    Unauthorized(String),
    /// 403: authenticated, but the role is not allowed on this route.
    #[error("Forbidden")]
    Forbidden,
    /// 404: missing resource or malformed id.
    #[error("{0}")]
    NotFound(String),
    /// 409: uniqueness violation.
    #[error("{0}")]
    Conflict(String),
    /// 500: unexpected store or runtime failure. The message is passed through.
    #[error("{0}")]
    Server(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    /// Store failures become 500s, except unique-index violations that slipped
    /// past the handler-level checks (two concurrent registrations).
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                tracing::warn!("unique constraint rejected write: {}", db_err);
                return Self::Conflict("Resource already exists".to_string());
            }
        }
        tracing::error!("store error: {:?}", err);
        Self::Server(err.to_string())
    }
}

/// Auth, expert, student and stats routes answer with a bare `{message}` body.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

/// CourseError
///
/// Course routes use the `{success, message, data}` envelope for failures as
/// well as successes. Wrapping the shared `ApiError` keeps one taxonomy while
/// rendering the course-specific shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseError(pub ApiError);

impl From<ApiError> for CourseError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<sqlx::Error> for CourseError {
    fn from(err: sqlx::Error) -> Self {
        Self(ApiError::from(err))
    }
}

impl IntoResponse for CourseError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let body = json!({
            "success": false,
            "message": self.0.to_string(),
            "data": null,
        });
        (status, Json(body)).into_response()
    }
}

/// JsonBody
///
/// A `Json<T>` extractor whose rejection is an `ApiError::Validation`, so
/// malformed bodies surface as 400 with the usual JSON message instead of
/// axum's plain-text rejection.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}
