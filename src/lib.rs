use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::get,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod membership;
pub mod memory;
pub mod models;
pub mod password;
pub mod repository;
pub mod token;
pub mod validation;

// Routing segregated by required access (public, authenticated, student, admin).
pub mod routes;
use routes::{admin, authenticated, public, student};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use memory::MemoryRepository;
pub use repository::{PostgresRepository, RepositoryState};
pub use token::TokenService;

/// Registers the bearer-token scheme referenced by the protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// ApiDoc
///
/// The OpenAPI document aggregated from every `#[utoipa::path]` handler and
/// `ToSchema` model. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        handlers::health, handlers::api_root,
        handlers::auth::register, handlers::auth::login, handlers::auth::me,
        handlers::auth::update_me, handlers::auth::student_dashboard,
        handlers::auth::admin_dashboard,
        handlers::expert::register, handlers::expert::login, handlers::expert::me,
        handlers::expert::dashboard,
        handlers::students::list_students, handlers::students::get_student,
        handlers::students::create_student, handlers::students::update_student,
        handlers::students::delete_student,
        handlers::stats::user_stats,
        handlers::courses::create_course, handlers::courses::list_courses,
        handlers::courses::list_active_courses, handlers::courses::get_course,
        handlers::courses::update_course, handlers::courses::delete_course,
        handlers::courses::enroll, handlers::courses::course_students,
        handlers::courses::my_courses
    ),
    components(
        schemas(
            models::Role, models::PrincipalKind, models::Course, models::CourseRef,
            models::RegisterRequest, models::LoginRequest, models::UpdateMeRequest,
            models::CreateStudentRequest, models::UpdateStudentRequest,
            models::CreateCourseRequest, models::UpdateCourseRequest,
            models::PrincipalSummary, models::ExpertSummary, models::UserProfile, models::TokenPair,
            models::AuthResponse, models::ExpertAuthResponse, models::ProfileResponse,
            models::MessageResponse, models::StudentDetail, models::StudentPage,
            models::StudentResponse, models::StudentMutationResponse, models::UserStats,
            models::CourseList, models::EnrolledStudent, models::CourseStudents,
        )
    ),
    tags(
        (name = "course-enrollment", description = "Course enrollment API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single state container shared by every request: the persistence
/// layer, the token service and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub tokens: TokenService,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the state from a repository and the configuration, deriving the
    /// token service from the configured secrets and lifetimes.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            repo,
            tokens: TokenService::from_config(&config),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// cors_layer
///
/// With no configured origins every origin is allowed (without
/// credentials). Otherwise only the listed origins are, with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin `{}`", origin);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(AllowOrigin::list(allowed))
            .allow_credentials(true)
    }
}

/// create_router
///
/// Assembles the full application: `/health`, the `/api` tree with its gates,
/// the Swagger UI, and the observability and CORS layers.
///
/// Gate order matters: with `route_layer`, the layer added last runs first, so
/// `authenticate` always runs before the role check.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");
    let cors = cors_layer(&state.config.client_origins);

    let authenticate = || middleware::from_fn_with_state(state.clone(), auth::authenticate);

    let api = Router::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes().route_layer(authenticate()))
        .merge(
            student::student_routes()
                .route_layer(middleware::from_fn(auth::require_student))
                .route_layer(authenticate()),
        )
        .merge(
            admin::admin_routes()
                .route_layer(middleware::from_fn(auth::require_admin))
                .route_layer(authenticate()),
        );

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: records method, URI and the request id so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
