use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, CourseError, JsonBody},
    membership::dedup_ids,
    models::{
        Course, CourseChanges, CourseList, CourseStudents, CreateCourseRequest, EnrolledStudent,
        Envelope, NewCourse, UpdateCourseRequest,
    },
    validation::{normalize_course_code, parse_id, validate_course_duration, validate_course_name},
};

// Every course route answers with the `{success, message, data}` envelope,
// failures included, so bodies are taken as `Result<JsonBody<_>, ApiError>`
// and their rejections rendered through `CourseError`.

const COURSE_NOT_FOUND: &str = "Course not found";

type CourseResult<T> = Result<Json<Envelope<T>>, CourseError>;

fn course_id(raw: &str) -> Result<uuid::Uuid, ApiError> {
    parse_id(raw, COURSE_NOT_FOUND)
}

async fn ensure_code_free(
    state: &AppState,
    code: &str,
    exclude: Option<uuid::Uuid>,
) -> Result<(), ApiError> {
    if state.repo.course_code_taken(code, exclude).await? {
        return Err(ApiError::conflict(
            "A course with this course_code already exists",
        ));
    }
    Ok(())
}

/// create_course
///
/// [Admin Route] Validates and inserts a course. The code is stored
/// uppercase; `is_published` defaults to true and `students` is
/// de-duplicated.
#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created, wrapped in the course envelope", body = Course),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Duplicate course_code")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_course(
    State(state): State<AppState>,
    body: Result<JsonBody<CreateCourseRequest>, ApiError>,
) -> Result<(StatusCode, Json<Envelope<Course>>), CourseError> {
    let JsonBody(payload) = body?;

    let (Some(name), Some(code), Some(duration)) = (
        payload.course_name.filter(|v| !v.is_empty()),
        payload.course_code.filter(|v| !v.is_empty()),
        payload.course_duration,
    ) else {
        return Err(ApiError::validation(
            "course_name, course_code and course_duration are required",
        )
        .into());
    };

    let course_name = validate_course_name(&name)?;
    let course_code = normalize_course_code(&code)?;
    let course_duration = validate_course_duration(duration)?;
    ensure_code_free(&state, &course_code, None).await?;

    let course = state
        .repo
        .create_course(NewCourse {
            course_name,
            course_code,
            course_duration,
            description: payload.description.unwrap_or_default(),
            instructor_name: payload.instructor_name.unwrap_or_default(),
            thumbnail_url: payload.thumbnail_url.unwrap_or_default(),
            video_url: payload.video_url.unwrap_or_default(),
            is_published: payload.is_published.unwrap_or(true),
            students: dedup_ids(&payload.students.unwrap_or_default()),
        })
        .await?;

    tracing::info!(id = %course.id, code = %course.course_code, "course created");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok("Course created successfully", course)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/courses",
    responses((status = 200, description = "All courses, newest first", body = CourseList))
)]
pub async fn list_courses(State(state): State<AppState>) -> CourseResult<CourseList> {
    let courses = state.repo.list_courses(false).await?;
    Ok(Json(Envelope::ok(
        "Courses fetched successfully",
        CourseList::from(courses),
    )))
}

/// list_active_courses
///
/// [Public Route] Courses that are published or have never had the flag set.
#[utoipa::path(
    get,
    path = "/api/courses/active",
    responses((status = 200, description = "Active courses, newest first", body = CourseList))
)]
pub async fn list_active_courses(State(state): State<AppState>) -> CourseResult<CourseList> {
    let courses = state.repo.list_courses(true).await?;
    Ok(Json(Envelope::ok(
        "Active courses fetched successfully",
        CourseList::from(courses),
    )))
}

/// get_course
///
/// [Public Route] A malformed id answers 404 like a missing row.
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> CourseResult<Course> {
    let id = course_id(&id)?;
    let course = state
        .repo
        .get_course(id)
        .await?
        .ok_or_else(|| ApiError::not_found(COURSE_NOT_FOUND))?;
    Ok(Json(Envelope::ok("Course fetched successfully", course)))
}

/// update_course
///
/// [Admin Route] Applies the allow-listed fields present in the body. Each
/// provided field is validated as on create; a new code must not belong to
/// another course.
#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Invalid field"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Duplicate course_code")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<JsonBody<UpdateCourseRequest>, ApiError>,
) -> CourseResult<Course> {
    let id = course_id(&id)?;
    let JsonBody(payload) = body?;

    let course_name = payload
        .course_name
        .as_deref()
        .map(validate_course_name)
        .transpose()?;
    let course_code = payload
        .course_code
        .as_deref()
        .map(normalize_course_code)
        .transpose()?;
    let course_duration = payload
        .course_duration
        .map(validate_course_duration)
        .transpose()?;
    if let Some(code) = course_code.as_deref() {
        ensure_code_free(&state, code, Some(id)).await?;
    }

    let changes = CourseChanges {
        course_name,
        course_code,
        course_duration,
        description: payload.description,
        instructor_name: payload.instructor_name,
        thumbnail_url: payload.thumbnail_url,
        video_url: payload.video_url,
        is_published: payload.is_published,
        students: payload.students.as_deref().map(dedup_ids),
    };

    let course = state
        .repo
        .update_course(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found(COURSE_NOT_FOUND))?;
    Ok(Json(Envelope::ok("Course updated successfully", course)))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> CourseResult<()> {
    let id = course_id(&id)?;
    if !state.repo.delete_course(id).await? {
        return Err(ApiError::not_found(COURSE_NOT_FOUND).into());
    }
    tracing::info!(%id, "course deleted");
    Ok(Json(Envelope::ok("Course deleted successfully", ())))
}

/// enroll
///
/// [Student Route] Adds the caller to the course in one idempotent set-union
/// statement; enrolling twice leaves a single entry.
#[utoipa::path(
    post,
    path = "/api/courses/{id}/enroll",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrolled; returns the course", body = Course),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn enroll(
    AuthUser { id: student_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> CourseResult<Course> {
    let id = course_id(&id)?;
    let course = state
        .repo
        .enroll_student(id, student_id)
        .await?
        .ok_or_else(|| ApiError::not_found(COURSE_NOT_FOUND))?;
    tracing::info!(course = %id, student = %student_id, "enrolled");
    Ok(Json(Envelope::ok("Enrolled successfully", course)))
}

/// course_students
///
/// [Admin Route] Resolves the course's member ids to user records, keeping
/// membership order. Ids with no matching user are skipped.
#[utoipa::path(
    get,
    path = "/api/courses/{id}/students",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrolled students", body = CourseStudents),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn course_students(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> CourseResult<CourseStudents> {
    let id = course_id(&id)?;
    let course = state
        .repo
        .get_course(id)
        .await?
        .ok_or_else(|| ApiError::not_found(COURSE_NOT_FOUND))?;

    let mut users: HashMap<_, _> = state
        .repo
        .find_users(&course.students)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let students: Vec<EnrolledStudent> = course
        .students
        .iter()
        .filter_map(|sid| users.remove(sid))
        .map(|u| EnrolledStudent {
            id: u.id,
            full_name: u.name,
            email: u.email,
            created_at: u.created_at,
        })
        .collect();

    Ok(Json(Envelope::ok(
        "Students fetched successfully",
        CourseStudents {
            count: students.len(),
            students,
        },
    )))
}

/// my_courses
///
/// [Student Route] Courses whose membership holds the caller, newest first.
/// Served at `/api/courses/me/enrolled` and `/api/me/course`.
#[utoipa::path(
    get,
    path = "/api/courses/me/enrolled",
    responses((status = 200, description = "Caller's courses", body = CourseList)),
    security(("bearer_auth" = []))
)]
pub async fn my_courses(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> CourseResult<CourseList> {
    let courses = state.repo.courses_for_student(id).await?;
    Ok(Json(Envelope::ok(
        "My courses fetched successfully",
        CourseList::from(courses),
    )))
}
