use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    AppState,
    error::{ApiError, JsonBody},
    membership::{dedup_ids, group_by_student, sync_student_courses},
    models::{
        CreateStudentRequest, MessageResponse, NewPrincipal, PrincipalChanges, PrincipalKind, Role,
        StudentDetail, StudentMutationResponse, StudentPage, StudentResponse, UpdateStudentRequest,
    },
    password::hash_password,
    validation::{clamp_limit, clamp_page, non_empty, normalize_email, page_count, parse_id, parse_ids_lenient},
};

const STUDENT_NOT_FOUND: &str = "Student not found";

/// StudentQuery
///
/// Query parameters for `GET /api/students`. Kept as raw strings so that
/// non-numeric values fall back to the defaults instead of failing extraction.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentQuery {
    /// 1-based page number.
    pub page: Option<String>,
    /// Page size, clamped to 1..=100.
    pub limit: Option<String>,
    /// Case-insensitive substring matched against name or email.
    pub q: Option<String>,
}

/// list_students
///
/// [Admin Route] One page of Student accounts, newest first. Course
/// references for the whole page come from a single overlap query and are
/// regrouped per student in memory.
#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentQuery),
    responses((status = 200, description = "Page of students", body = StudentPage)),
    security(("bearer_auth" = []))
)]
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> Result<Json<StudentPage>, ApiError> {
    let page = clamp_page(query.page.as_deref());
    let limit = clamp_limit(query.limit.as_deref());
    let search = query.q.as_deref().filter(|q| !q.is_empty());

    let (students, total) = state
        .repo
        .list_students(search, (page - 1).saturating_mul(limit), limit)
        .await?;

    let ids: Vec<_> = students.iter().map(|s| s.id).collect();
    let mut courses = group_by_student(&state.repo.memberships_for_students(&ids).await?);

    let items = students
        .iter()
        .map(|s| StudentDetail::new(s, courses.remove(&s.id).unwrap_or_default()))
        .collect();

    Ok(Json(StudentPage {
        items,
        page,
        limit,
        total,
        pages: page_count(total, limit),
    }))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = String, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student with courses", body = StudentResponse),
        (status = 404, description = "Student not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StudentResponse>, ApiError> {
    let id = parse_id(&id, STUDENT_NOT_FOUND)?;
    let student = state
        .repo
        .find_user(id)
        .await?
        .filter(|u| u.role == Role::Student)
        .ok_or_else(|| ApiError::not_found(STUDENT_NOT_FOUND))?;

    let courses = state
        .repo
        .courses_for_student(id)
        .await?
        .iter()
        .map(|c| c.reference())
        .collect();

    Ok(Json(StudentResponse {
        student: StudentDetail::new(&student, courses),
    }))
}

/// create_student
///
/// [Admin Route] Creates a Student and optionally enrolls them. Course ids
/// that do not parse are dropped; ids naming no course match nothing.
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student created", body = StudentMutationResponse),
        (status = 400, description = "Missing fields", body = MessageResponse),
        (status = 409, description = "Email already registered", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_student(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateStudentRequest>,
) -> Result<(StatusCode, Json<StudentMutationResponse>), ApiError> {
    let (Some(name), Some(email), Some(password)) = (
        non_empty(payload.name),
        non_empty(payload.email),
        non_empty(payload.password),
    ) else {
        return Err(ApiError::validation("name, email, password are required"));
    };

    let email = normalize_email(&email);
    if state.repo.email_taken(PrincipalKind::User, &email, None).await? {
        return Err(ApiError::conflict("Email already registered"));
    }

    let password_hash = hash_password(password, state.config.bcrypt_cost).await?;
    let student = state
        .repo
        .create_principal(
            PrincipalKind::User,
            NewPrincipal {
                name,
                email,
                password_hash,
                role: Role::Student,
            },
        )
        .await?;

    let course_ids = dedup_ids(&parse_ids_lenient(&payload.courses.unwrap_or_default()));
    if !course_ids.is_empty() {
        state
            .repo
            .add_student_to_courses(student.id, &course_ids)
            .await?;
    }

    tracing::info!(id = %student.id, courses = course_ids.len(), "student created");
    Ok((
        StatusCode::CREATED,
        Json(StudentMutationResponse {
            message: "Student created".to_string(),
            student: student.summary(),
        }),
    ))
}

/// update_student
///
/// [Admin Route] Partial update of a Student. When `courses` is present it is
/// the complete desired membership and the course side is brought in line
/// with it through `sync_student_courses`.
#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(("id" = String, Path, description = "Student id")),
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Student updated", body = StudentMutationResponse),
        (status = 404, description = "Student not found", body = MessageResponse),
        (status = 409, description = "Email already in use", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateStudentRequest>,
) -> Result<Json<StudentMutationResponse>, ApiError> {
    let id = parse_id(&id, STUDENT_NOT_FOUND)?;
    state
        .repo
        .find_user(id)
        .await?
        .filter(|u| u.role == Role::Student)
        .ok_or_else(|| ApiError::not_found(STUDENT_NOT_FOUND))?;

    let email = non_empty(payload.email.as_deref().map(normalize_email));
    if let Some(email) = email.as_deref() {
        if state
            .repo
            .email_taken(PrincipalKind::User, email, Some(id))
            .await?
        {
            return Err(ApiError::conflict("Email already in use"));
        }
    }

    let password_hash = match non_empty(payload.password) {
        Some(password) => Some(hash_password(password, state.config.bcrypt_cost).await?),
        None => None,
    };

    let changes = PrincipalChanges {
        name: non_empty(payload.name.map(|n| n.trim().to_string())),
        email,
        password_hash,
    };
    let student = state
        .repo
        .update_user(id, changes, Some(Role::Student))
        .await?
        .ok_or_else(|| ApiError::not_found(STUDENT_NOT_FOUND))?;

    if let Some(requested) = payload.courses {
        let requested = parse_ids_lenient(&requested);
        sync_student_courses(state.repo.as_ref(), id, &requested).await?;
    }

    Ok(Json(StudentMutationResponse {
        message: "Student updated".to_string(),
        student: student.summary(),
    }))
}

/// delete_student
///
/// [Admin Route] Deletes the Student row, then removes the id from every
/// course. The two writes are not atomic; a failure in between leaves a
/// dangling id that `course_students` skips.
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id" = String, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student deleted", body = MessageResponse),
        (status = 404, description = "Student not found", body = MessageResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, STUDENT_NOT_FOUND)?;
    if !state.repo.delete_user(id, Role::Student).await? {
        return Err(ApiError::not_found(STUDENT_NOT_FOUND));
    }

    let purged = state.repo.purge_student(id).await?;
    tracing::info!(%id, purged, "student deleted");
    Ok(Json(MessageResponse::new("Student deleted")))
}
