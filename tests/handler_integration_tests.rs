use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use course_enrollment::{
    AppState, MemoryRepository,
    auth::AuthUser,
    config::AppConfig,
    error::{ApiError, CourseError, JsonBody},
    handlers::{self, students::StudentQuery},
    models::{
        CreateCourseRequest, CreateStudentRequest, LoginRequest, PrincipalKind, RegisterRequest,
        Role, UpdateCourseRequest, UpdateMeRequest, UpdateStudentRequest,
    },
    repository::RepositoryState,
};
use std::{collections::HashSet, sync::Arc};
use uuid::Uuid;

// --- Test Utilities ---

fn test_state() -> AppState {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    AppState::new(repo, AppConfig::default())
}

fn caller(id: Uuid, role: Role) -> AuthUser {
    AuthUser {
        id,
        role,
        principal_type: PrincipalKind::User,
    }
}

fn registration(name: &str, email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        password: Some(password.to_string()),
        confirm_password: Some(password.to_string()),
        role: None,
    }
}

/// Registers a user through the handler and returns its id.
async fn register_user(state: &AppState, email: &str, role: Option<&str>) -> Uuid {
    let mut req = registration("Test User", email, "pass1234");
    req.role = role.map(str::to_string);
    let (_, Json(body)) = handlers::auth::register(State(state.clone()), JsonBody(req))
        .await
        .unwrap();
    body.user.id
}

async fn create_student(state: &AppState, name: &str, email: &str, courses: Vec<String>) -> Uuid {
    let req = CreateStudentRequest {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        password: Some("pass1234".to_string()),
        courses: Some(courses),
    };
    let (status, Json(body)) =
        handlers::students::create_student(State(state.clone()), JsonBody(req))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    body.student.id
}

fn course_request(name: &str, code: &str, weeks: i64) -> CreateCourseRequest {
    CreateCourseRequest {
        course_name: Some(name.to_string()),
        course_code: Some(code.to_string()),
        course_duration: Some(weeks),
        ..Default::default()
    }
}

async fn create_course(state: &AppState, code: &str) -> Uuid {
    let (_, Json(body)) = handlers::courses::create_course(
        State(state.clone()),
        Ok(JsonBody(course_request("Intro Course", code, 12))),
    )
    .await
    .unwrap();
    body.data.id
}

async fn course_codes_for(state: &AppState, student: Uuid) -> HashSet<String> {
    let Json(body) = handlers::students::get_student(State(state.clone()), Path(student.to_string()))
        .await
        .unwrap();
    body.student
        .courses
        .into_iter()
        .map(|c| c.course_code)
        .collect()
}

fn page_query(page: Option<&str>, limit: Option<&str>, q: Option<&str>) -> Query<StudentQuery> {
    Query(StudentQuery {
        page: page.map(str::to_string),
        limit: limit.map(str::to_string),
        q: q.map(str::to_string),
    })
}

// --- Registration & Login ---

#[tokio::test]
async fn register_normalizes_email_and_rejects_case_variants() {
    let state = test_state();

    let (status, Json(body)) = handlers::auth::register(
        State(state.clone()),
        JsonBody(registration("Ann", "  Ann@Example.COM ", "pass1234")),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.message, "Registered successfully");
    assert_eq!(body.user.email, "ann@example.com");
    assert_eq!(body.user.role, Role::Student);

    let duplicate = handlers::auth::register(
        State(state.clone()),
        JsonBody(registration("Ann Again", "ANN@example.com", "pass1234")),
    )
    .await
    .unwrap_err();
    assert_eq!(duplicate, ApiError::conflict("Email already registered"));
}

#[tokio::test]
async fn register_validates_required_fields_and_confirmation() {
    let state = test_state();

    let mut missing = registration("Bob", "bob@example.com", "pass1234");
    missing.confirm_password = None;
    let err = handlers::auth::register(State(state.clone()), JsonBody(missing))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::validation("Missing required fields"));

    let mut mismatch = registration("Bob", "bob@example.com", "pass1234");
    mismatch.confirm_password = Some("different".to_string());
    let err = handlers::auth::register(State(state), JsonBody(mismatch))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::validation("Passwords do not match"));
}

#[tokio::test]
async fn only_the_exact_admin_string_grants_admin() {
    let state = test_state();
    let admin = register_user(&state, "root@example.com", Some("Admin")).await;
    let lower = register_user(&state, "lower@example.com", Some("admin")).await;

    let admin = state.repo.find_user(admin).await.unwrap().unwrap();
    let lower = state.repo.find_user(lower).await.unwrap().unwrap();
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(lower.role, Role::Student);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let state = test_state();
    register_user(&state, "carol@example.com", None).await;

    let wrong_password = handlers::auth::login(
        State(state.clone()),
        JsonBody(LoginRequest {
            email: Some("carol@example.com".to_string()),
            password: Some("nope".to_string()),
        }),
    )
    .await
    .unwrap_err();
    let unknown_email = handlers::auth::login(
        State(state.clone()),
        JsonBody(LoginRequest {
            email: Some("nobody@example.com".to_string()),
            password: Some("pass1234".to_string()),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(wrong_password, ApiError::unauthorized("Invalid credentials"));
    assert_eq!(wrong_password, unknown_email);

    let missing = handlers::auth::login(State(state), JsonBody(LoginRequest::default()))
        .await
        .unwrap_err();
    assert_eq!(missing, ApiError::validation("Email and password are required"));
}

#[tokio::test]
async fn login_issues_verifiable_tokens() {
    let state = test_state();
    let id = register_user(&state, "dave@example.com", None).await;

    let Json(body) = handlers::auth::login(
        State(state.clone()),
        JsonBody(LoginRequest {
            email: Some("DAVE@example.com".to_string()),
            password: Some("pass1234".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(body.message, "Logged in successfully");

    let claims = state
        .tokens
        .verify_access_token(&body.tokens.access_token)
        .unwrap();
    assert_eq!(claims.id, id);
    assert_eq!(claims.role, Role::Student);
    assert_eq!(claims.principal_type, PrincipalKind::User);
    assert!(state
        .tokens
        .verify_refresh_token(&body.tokens.refresh_token)
        .is_ok());
}

#[tokio::test]
async fn expert_and_user_may_share_an_email() {
    let state = test_state();
    register_user(&state, "shared@example.com", None).await;

    let (status, Json(body)) = handlers::expert::register(
        State(state.clone()),
        JsonBody(registration("Expert", "shared@example.com", "expertpass")),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.expert.role, "Expert");

    let Json(login) = handlers::expert::login(
        State(state.clone()),
        JsonBody(LoginRequest {
            email: Some("shared@example.com".to_string()),
            password: Some("expertpass".to_string()),
        }),
    )
    .await
    .unwrap();
    let claims = state
        .tokens
        .verify_access_token(&login.tokens.access_token)
        .unwrap();
    assert_eq!(login.expert.role, "Expert");
    assert_eq!(claims.principal_type, PrincipalKind::Expert);
    assert_eq!(claims.role, Role::Admin);

    // A second expert with the same email is still rejected.
    let duplicate = handlers::expert::register(
        State(state),
        JsonBody(registration("Other", "shared@example.com", "expertpass")),
    )
    .await
    .unwrap_err();
    assert_eq!(duplicate, ApiError::conflict("Email already registered"));
}

// --- Self Profile ---

#[tokio::test]
async fn me_and_update_me() {
    let state = test_state();
    let id = register_user(&state, "erin@example.com", None).await;
    register_user(&state, "taken@example.com", None).await;
    let who = caller(id, Role::Student);

    let Json(profile) = handlers::auth::me(who, State(state.clone())).await.unwrap();
    assert_eq!(profile.user.email, "erin@example.com");
    assert!(profile.message.is_none());

    let half_password = UpdateMeRequest {
        password: Some("newpass".to_string()),
        ..Default::default()
    };
    let err = handlers::auth::update_me(who, State(state.clone()), JsonBody(half_password))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::validation("Passwords do not match"));

    let taken = UpdateMeRequest {
        email: Some("Taken@Example.com".to_string()),
        ..Default::default()
    };
    let err = handlers::auth::update_me(who, State(state.clone()), JsonBody(taken))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::conflict("Email already in use"));

    let ok = UpdateMeRequest {
        name: Some("Erin B".to_string()),
        email: Some(" ERIN@example.com".to_string()),
        password: Some("newpass".to_string()),
        confirm_password: Some("newpass".to_string()),
    };
    let Json(updated) = handlers::auth::update_me(who, State(state.clone()), JsonBody(ok))
        .await
        .unwrap();
    assert_eq!(updated.message.as_deref(), Some("Profile updated"));
    assert_eq!(updated.user.name, "Erin B");
    assert_eq!(updated.user.email, "erin@example.com");

    // The new password is the one that works now.
    assert!(handlers::auth::login(
        State(state),
        JsonBody(LoginRequest {
            email: Some("erin@example.com".to_string()),
            password: Some("newpass".to_string()),
        }),
    )
    .await
    .is_ok());
}

#[tokio::test]
async fn update_me_ignores_blank_name_and_email() {
    let state = test_state();
    let id = register_user(&state, "fay@example.com", None).await;
    let who = caller(id, Role::Student);

    let blank = UpdateMeRequest {
        name: Some("   ".to_string()),
        email: Some("".to_string()),
        ..Default::default()
    };
    let Json(updated) = handlers::auth::update_me(who, State(state.clone()), JsonBody(blank))
        .await
        .unwrap();
    assert_eq!(updated.user.name, "Test User");
    assert_eq!(updated.user.email, "fay@example.com");

    let stored = state.repo.find_user(id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Test User");
    assert_eq!(stored.email, "fay@example.com");
}

#[tokio::test]
async fn me_for_a_deleted_account_is_not_found() {
    let state = test_state();
    let err = handlers::auth::me(caller(Uuid::new_v4(), Role::Student), State(state))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::not_found("User not found"));
}

// --- Student Administration ---

#[tokio::test]
async fn create_student_enrolls_valid_course_ids_only() {
    let state = test_state();
    let rust = create_course(&state, "RUST101").await;

    let student = create_student(
        &state,
        "Fay",
        "fay@example.com",
        vec!["not-an-id".to_string(), rust.to_string(), Uuid::new_v4().to_string()],
    )
    .await;

    assert_eq!(course_codes_for(&state, student).await, HashSet::from(["RUST101".to_string()]));

    let err = handlers::students::create_student(
        State(state),
        JsonBody(CreateStudentRequest {
            name: Some("Fay".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::validation("name, email, password are required"));
}

#[tokio::test]
async fn update_student_courses_moves_membership_from_b_c_to_a_b() {
    let state = test_state();
    let a = create_course(&state, "AAAA1").await;
    let b = create_course(&state, "BBBB1").await;
    let c = create_course(&state, "CCCC1").await;
    let student = create_student(
        &state,
        "Gus",
        "gus@example.com",
        vec![b.to_string(), c.to_string()],
    )
    .await;

    let Json(body) = handlers::students::update_student(
        State(state.clone()),
        Path(student.to_string()),
        JsonBody(UpdateStudentRequest {
            courses: Some(vec![a.to_string(), b.to_string()]),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(body.message, "Student updated");

    assert_eq!(
        course_codes_for(&state, student).await,
        HashSet::from(["AAAA1".to_string(), "BBBB1".to_string()])
    );
    let c_course = state.repo.get_course(c).await.unwrap().unwrap();
    assert!(!c_course.students.contains(&student));
}

#[tokio::test]
async fn update_student_without_courses_keeps_memberships() {
    let state = test_state();
    let a = create_course(&state, "KEEP1").await;
    let student = create_student(&state, "Hal", "hal@example.com", vec![a.to_string()]).await;
    create_student(&state, "Other", "other@example.com", vec![]).await;

    let Json(body) = handlers::students::update_student(
        State(state.clone()),
        Path(student.to_string()),
        JsonBody(UpdateStudentRequest {
            name: Some("Hal Jr".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(body.student.name, "Hal Jr");
    assert_eq!(course_codes_for(&state, student).await.len(), 1);

    let err = handlers::students::update_student(
        State(state),
        Path(student.to_string()),
        JsonBody(UpdateStudentRequest {
            email: Some("OTHER@example.com".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::conflict("Email already in use"));
}

#[tokio::test]
async fn update_of_unknown_student_is_not_found_even_with_a_taken_email() {
    let state = test_state();
    create_student(&state, "Taken", "taken@example.com", vec![]).await;

    let err = handlers::students::update_student(
        State(state.clone()),
        Path(Uuid::new_v4().to_string()),
        JsonBody(UpdateStudentRequest {
            email: Some("taken@example.com".to_string()),
            password: Some("newpass".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::not_found("Student not found"));

    let admin = register_user(&state, "root@example.com", Some("Admin")).await;
    let err = handlers::students::update_student(
        State(state),
        Path(admin.to_string()),
        JsonBody(UpdateStudentRequest {
            email: Some("taken@example.com".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::not_found("Student not found"));
}

#[tokio::test]
async fn update_student_ignores_blank_name_and_email() {
    let state = test_state();
    let student = create_student(&state, "Gus", "gus@example.com", vec![]).await;

    let Json(body) = handlers::students::update_student(
        State(state),
        Path(student.to_string()),
        JsonBody(UpdateStudentRequest {
            name: Some(" ".to_string()),
            email: Some("  ".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(body.student.name, "Gus");
    assert_eq!(body.student.email, "gus@example.com");
}

#[tokio::test]
async fn student_routes_do_not_touch_admins() {
    let state = test_state();
    let admin = register_user(&state, "admin@example.com", Some("Admin")).await;

    let err = handlers::students::get_student(State(state.clone()), Path(admin.to_string()))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::not_found("Student not found"));

    let err = handlers::students::delete_student(State(state.clone()), Path(admin.to_string()))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::not_found("Student not found"));
    assert!(state.repo.find_user(admin).await.unwrap().is_some());

    let err = handlers::students::get_student(State(state), Path("garbage".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::not_found("Student not found"));
}

#[tokio::test]
async fn deleting_a_student_purges_every_membership() {
    let state = test_state();
    let a = create_course(&state, "PURGE1").await;
    let b = create_course(&state, "PURGE2").await;
    let student = create_student(
        &state,
        "Ivy",
        "ivy@example.com",
        vec![a.to_string(), b.to_string()],
    )
    .await;
    let keeper = create_student(&state, "Jon", "jon@example.com", vec![a.to_string()]).await;

    let Json(body) = handlers::students::delete_student(State(state.clone()), Path(student.to_string()))
        .await
        .unwrap();
    assert_eq!(body.message, "Student deleted");

    for course in state.repo.list_courses(false).await.unwrap() {
        assert!(!course.students.contains(&student));
    }
    let a_course = state.repo.get_course(a).await.unwrap().unwrap();
    assert_eq!(a_course.students, vec![keeper]);

    let again = handlers::students::delete_student(State(state), Path(student.to_string()))
        .await
        .unwrap_err();
    assert_eq!(again, ApiError::not_found("Student not found"));
}

#[tokio::test]
async fn list_students_paginates_searches_and_attaches_courses() {
    let state = test_state();
    let course = create_course(&state, "LIST1").await;
    register_user(&state, "boss@example.com", Some("Admin")).await;
    create_student(&state, "Kim Alpha", "kim@example.com", vec![course.to_string()]).await;
    create_student(&state, "Lee Beta", "lee@example.com", vec![]).await;
    create_student(&state, "Max Gamma", "max@school.org", vec![]).await;

    let Json(page) = handlers::students::list_students(
        State(state.clone()),
        page_query(Some("1"), Some("2"), None),
    )
    .await
    .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.pages, 2);
    assert_eq!(page.items.len(), 2);
    // Newest first.
    assert_eq!(page.items[0].name, "Max Gamma");

    let Json(page) = handlers::students::list_students(
        State(state.clone()),
        page_query(Some("0"), Some("500"), None),
    )
    .await
    .unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.limit, 100);
    assert!(page.items.iter().all(|s| s.role == Role::Student));
    let kim = page.items.iter().find(|s| s.name == "Kim Alpha").unwrap();
    assert_eq!(kim.courses.len(), 1);
    assert_eq!(kim.courses[0].course_code, "LIST1");

    let Json(page) = handlers::students::list_students(
        State(state.clone()),
        page_query(None, Some("abc"), Some("SCHOOL")),
    )
    .await
    .unwrap();
    assert_eq!(page.limit, 20);
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].email, "max@school.org");

    let Json(empty) = handlers::students::list_students(
        State(state),
        page_query(None, None, Some("nobody-matches")),
    )
    .await
    .unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.pages, 1);
}

#[tokio::test]
async fn page_far_past_the_end_is_empty() {
    let state = test_state();
    create_student(&state, "Nia", "nia@example.com", vec![]).await;

    let max_page = i64::MAX.to_string();
    let Json(page) = handlers::students::list_students(
        State(state),
        page_query(Some(&max_page), Some("100"), None),
    )
    .await
    .unwrap();
    assert_eq!(page.page, i64::MAX);
    assert_eq!(page.total, 1);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn stats_count_users_and_students() {
    let state = test_state();
    register_user(&state, "a@example.com", Some("Admin")).await;
    register_user(&state, "b@example.com", None).await;
    create_student(&state, "C", "c@example.com", vec![]).await;

    let Json(stats) = handlers::stats::user_stats(State(state)).await.unwrap();
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.total_students, 2);
}

// --- Courses ---

#[tokio::test]
async fn course_codes_are_uppercased_and_unique() {
    let state = test_state();
    let (status, Json(body)) = handlers::courses::create_course(
        State(state.clone()),
        Ok(JsonBody(course_request("  Systems Programming ", "cs101", 10))),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.success);
    assert_eq!(body.message, "Course created successfully");
    assert_eq!(body.data.course_code, "CS101");
    assert_eq!(body.data.course_name, "Systems Programming");
    assert_eq!(body.data.is_published, Some(true));

    let duplicate = handlers::courses::create_course(
        State(state.clone()),
        Ok(JsonBody(course_request("Another", "Cs101", 10))),
    )
    .await
    .unwrap_err();
    assert_eq!(
        duplicate,
        CourseError(ApiError::conflict("A course with this course_code already exists"))
    );

    for (name, code, weeks, message) in [
        ("Ok name", "CS-1", 10, "course_code must match /^[A-Z0-9]{4,10}$/"),
        ("Ok name", "ABCDEFGHIJK", 10, "course_code must match /^[A-Z0-9]{4,10}$/"),
        ("No", "GOOD1", 10, "course_name must be a string between 3 and 255 chars"),
        ("Ok name", "GOOD1", 105, "course_duration must be a number between 1 and 104"),
        ("Ok name", "GOOD1", 0, "course_duration must be a number between 1 and 104"),
    ] {
        let err = handlers::courses::create_course(
            State(state.clone()),
            Ok(JsonBody(course_request(name, code, weeks))),
        )
        .await
        .unwrap_err();
        assert_eq!(err, CourseError(ApiError::validation(message)), "{code}/{weeks}");
    }

    let missing = handlers::courses::create_course(
        State(state),
        Ok(JsonBody(CreateCourseRequest::default())),
    )
    .await
    .unwrap_err();
    assert_eq!(
        missing,
        CourseError(ApiError::validation(
            "course_name, course_code and course_duration are required"
        ))
    );
}

#[tokio::test]
async fn malformed_body_is_reported_in_the_course_envelope() {
    let state = test_state();
    let err = handlers::courses::create_course(
        State(state),
        Err(ApiError::validation("Failed to parse the request body as JSON")),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn double_enrollment_leaves_one_entry() {
    let state = test_state();
    let course = create_course(&state, "ENRL1").await;
    let student = register_user(&state, "nia@example.com", None).await;
    let who = caller(student, Role::Student);

    for _ in 0..2 {
        let Json(body) =
            handlers::courses::enroll(who, State(state.clone()), Path(course.to_string()))
                .await
                .unwrap();
        assert_eq!(body.message, "Enrolled successfully");
    }

    let stored = state.repo.get_course(course).await.unwrap().unwrap();
    assert_eq!(stored.students, vec![student]);

    let Json(mine) = handlers::courses::my_courses(who, State(state.clone())).await.unwrap();
    assert_eq!(mine.data.count, 1);
    assert_eq!(mine.data.courses[0].id, course);

    let missing = handlers::courses::enroll(who, State(state), Path(Uuid::new_v4().to_string()))
        .await
        .unwrap_err();
    assert_eq!(missing, CourseError(ApiError::not_found("Course not found")));
}

#[tokio::test]
async fn active_listing_excludes_unpublished_courses() {
    let state = test_state();
    create_course(&state, "LIVE1").await;
    let mut hidden = course_request("Hidden course", "HIDE1", 3);
    hidden.is_published = Some(false);
    handlers::courses::create_course(State(state.clone()), Ok(JsonBody(hidden)))
        .await
        .unwrap();

    let Json(all) = handlers::courses::list_courses(State(state.clone())).await.unwrap();
    assert_eq!(all.data.count, 2);
    assert_eq!(all.message, "Courses fetched successfully");

    let Json(active) = handlers::courses::list_active_courses(State(state)).await.unwrap();
    assert_eq!(active.data.count, 1);
    assert_eq!(active.data.courses[0].course_code, "LIVE1");
}

#[tokio::test]
async fn bad_or_unknown_course_ids_are_not_found() {
    let state = test_state();
    for raw in ["not-a-uuid".to_string(), Uuid::new_v4().to_string()] {
        let err = handlers::courses::get_course(State(state.clone()), Path(raw.clone()))
            .await
            .unwrap_err();
        assert_eq!(err, CourseError(ApiError::not_found("Course not found")));

        let err = handlers::courses::delete_course(State(state.clone()), Path(raw))
            .await
            .unwrap_err();
        assert_eq!(err, CourseError(ApiError::not_found("Course not found")));
    }
}

#[tokio::test]
async fn update_course_validates_and_checks_code_ownership() {
    let state = test_state();
    let first = create_course(&state, "FIRST1").await;
    create_course(&state, "SECOND1").await;

    let stolen = handlers::courses::update_course(
        State(state.clone()),
        Path(first.to_string()),
        Ok(JsonBody(UpdateCourseRequest {
            course_code: Some("second1".to_string()),
            ..Default::default()
        })),
    )
    .await
    .unwrap_err();
    assert_eq!(
        stolen,
        CourseError(ApiError::conflict("A course with this course_code already exists"))
    );

    let student = Uuid::new_v4();
    let Json(body) = handlers::courses::update_course(
        State(state.clone()),
        Path(first.to_string()),
        Ok(JsonBody(UpdateCourseRequest {
            course_code: Some("first1".to_string()),
            course_duration: Some(20),
            is_published: Some(false),
            students: Some(vec![student, student]),
            ..Default::default()
        })),
    )
    .await
    .unwrap();
    assert_eq!(body.message, "Course updated successfully");
    assert_eq!(body.data.course_code, "FIRST1");
    assert_eq!(body.data.course_duration, 20);
    assert_eq!(body.data.is_published, Some(false));
    assert_eq!(body.data.students, vec![student]);
    assert_eq!(body.data.course_name, "Intro Course");

    let invalid = handlers::courses::update_course(
        State(state),
        Path(first.to_string()),
        Ok(JsonBody(UpdateCourseRequest {
            course_duration: Some(200),
            ..Default::default()
        })),
    )
    .await
    .unwrap_err();
    assert_eq!(
        invalid,
        CourseError(ApiError::validation(
            "course_duration must be a number between 1 and 104"
        ))
    );
}

#[tokio::test]
async fn course_students_skip_dangling_ids() {
    let state = test_state();
    let student = register_user(&state, "olga@example.com", None).await;
    let mut req = course_request("Roster course", "ROST1", 6);
    req.students = Some(vec![student, Uuid::new_v4()]);
    let (_, Json(created)) = handlers::courses::create_course(State(state.clone()), Ok(JsonBody(req)))
        .await
        .unwrap();

    let Json(body) = handlers::courses::course_students(
        State(state.clone()),
        Path(created.data.id.to_string()),
    )
    .await
    .unwrap();
    assert_eq!(body.message, "Students fetched successfully");
    assert_eq!(body.data.count, 1);
    assert_eq!(body.data.students[0].id, student);
    assert_eq!(body.data.students[0].full_name, "Test User");
    assert_eq!(body.data.students[0].email, "olga@example.com");
}

#[tokio::test]
async fn deleted_course_disappears_from_student_views() {
    let state = test_state();
    let course = create_course(&state, "GONE1").await;
    let student = create_student(&state, "Pam", "pam@example.com", vec![course.to_string()]).await;

    let Json(body) = handlers::courses::delete_course(State(state.clone()), Path(course.to_string()))
        .await
        .unwrap();
    assert_eq!(body.message, "Course deleted successfully");
    assert!(course_codes_for(&state, student).await.is_empty());
}
