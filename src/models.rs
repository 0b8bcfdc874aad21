use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles & Principal Kinds ---

/// Role
///
/// The RBAC field carried on every principal and every token. Serialized with
/// the capitalised names (`"Student"`, `"Admin"`) the API has always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum Role {
    #[default]
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Admin => "Admin",
        }
    }

    /// Registration only grants `Admin` when the caller asks for exactly that
    /// string; anything else (including absence) yields `Student`.
    pub fn from_requested(requested: Option<&str>) -> Self {
        match requested {
            Some("Admin") => Role::Admin,
            _ => Role::Student,
        }
    }
}

/// Raised when a stored role column holds something other than a known role.
#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Student" => Ok(Role::Student),
            "Admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(value)),
        }
    }
}

/// PrincipalKind
///
/// Users and Experts live in separate tables and therefore separate email
/// namespaces. The kind travels in the token as the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PrincipalKind {
    User,
    Expert,
}

// --- Core Records (Mapped to Database) ---

/// Principal
///
/// A row from either the `users` or the `experts` table. The password hash is
/// deliberately not serializable: responses are built from `summary()` or
/// `profile()` instead.
#[derive(Debug, Clone, FromRow)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    pub fn summary(&self) -> PrincipalSummary {
        PrincipalSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    /// Expert-facing view. The stored and signed role stays `Admin`; the wire
    /// shape labels the account `Expert`.
    pub fn expert_summary(&self) -> ExpertSummary {
        ExpertSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: EXPERT_LABEL.to_string(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Insert payload for a principal. The email is expected to be normalized
/// and the password already hashed.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update for a `users` row; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct PrincipalChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

/// Course
///
/// A row from the `courses` table. `students` is the embedded membership
/// set; it is only ever modified through set-union / set-removal statements
/// so it never holds duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    pub course_name: String,
    /// Always stored uppercase, which makes uniqueness case-insensitive.
    pub course_code: String,
    /// Weeks, 1 to 104 inclusive.
    pub course_duration: i32,
    pub description: String,
    pub instructor_name: String,
    pub thumbnail_url: String,
    pub video_url: String,
    /// `None` means the flag was never set; such courses count as published.
    pub is_published: Option<bool>,
    pub students: Vec<Uuid>,
    #[serde(rename = "createdAt")]
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn is_active(&self) -> bool {
        self.is_published != Some(false)
    }

    pub fn reference(&self) -> CourseRef {
        CourseRef {
            id: self.id,
            course_name: self.course_name.clone(),
            course_code: self.course_code.clone(),
        }
    }
}

/// Validated insert payload for a course.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub course_name: String,
    pub course_code: String,
    pub course_duration: i32,
    pub description: String,
    pub instructor_name: String,
    pub thumbnail_url: String,
    pub video_url: String,
    pub is_published: bool,
    pub students: Vec<Uuid>,
}

/// Validated partial update for a course; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub course_name: Option<String>,
    pub course_code: Option<String>,
    pub course_duration: Option<i32>,
    pub description: Option<String>,
    pub instructor_name: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub is_published: Option<bool>,
    pub students: Option<Vec<Uuid>>,
}

/// The slice of a course needed to build the student-side join view.
#[derive(Debug, Clone, FromRow)]
pub struct CourseMembership {
    pub id: Uuid,
    pub course_name: String,
    pub course_code: String,
    pub students: Vec<Uuid>,
}

impl CourseMembership {
    pub fn reference(&self) -> CourseRef {
        CourseRef {
            id: self.id,
            course_name: self.course_name.clone(),
            course_code: self.course_code.clone(),
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input for `POST /auth/register` and `POST /expert/register`. Every field is
/// optional at the serde level so that missing fields produce the API's own
/// "Missing required fields" message. `role` is ignored for experts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: Option<String>,
    pub role: Option<String>,
}

/// LoginRequest
///
/// Input for `POST /auth/login` and `POST /expert/login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// UpdateMeRequest
///
/// Partial self-service profile update (`PUT /me`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "confirmPassword", skip_serializing_if = "Option::is_none")]
    pub confirm_password: Option<String>,
}

/// CreateStudentRequest
///
/// Admin-side student creation. `courses` holds raw id strings; entries that
/// are not valid ids are dropped rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateStudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub courses: Option<Vec<String>>,
}

/// UpdateStudentRequest
///
/// Admin-side student update. When `courses` is present it is the complete
/// desired membership list and drives the bidirectional sync.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateStudentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<String>>,
}

/// CreateCourseRequest
///
/// Input for `POST /courses`. The three required fields are optional here so
/// their absence yields the dedicated 400 message.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCourseRequest {
    pub course_name: Option<String>,
    pub course_code: Option<String>,
    pub course_duration: Option<i64>,
    pub description: Option<String>,
    pub instructor_name: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub is_published: Option<bool>,
    pub students: Option<Vec<Uuid>>,
}

/// UpdateCourseRequest
///
/// The allow-list of fields an admin may change on a course. Any other key in
/// the body is ignored by deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCourseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students: Option<Vec<Uuid>>,
}

// --- Response Schemas (Output) ---

/// Public view of a principal; never includes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct PrincipalSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

pub const EXPERT_LABEL: &str = "Expert";

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct ExpertSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// UserProfile
///
/// Output of `GET /me` and `PUT /me`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "createdAt")]
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// AuthResponse
///
/// Output of user registration and login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub message: String,
    pub user: PrincipalSummary,
    pub tokens: TokenPair,
}

/// ExpertAuthResponse
///
/// Output of expert registration and login; same shape keyed by `expert`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ExpertAuthResponse {
    pub message: String,
    pub expert: ExpertSummary,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProfileResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Minimal course reference attached to student listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct CourseRef {
    pub id: Uuid,
    pub course_name: String,
    pub course_code: String,
}

/// StudentDetail
///
/// A student together with the courses currently containing their id. The
/// `courses` list is computed at read time, never stored on the student.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StudentDetail {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "createdAt")]
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub courses: Vec<CourseRef>,
}

impl StudentDetail {
    pub fn new(student: &Principal, courses: Vec<CourseRef>) -> Self {
        Self {
            id: student.id,
            name: student.name.clone(),
            email: student.email.clone(),
            role: student.role,
            created_at: student.created_at,
            updated_at: student.updated_at,
            courses,
        }
    }
}

/// StudentPage
///
/// Output of `GET /students`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StudentPage {
    pub items: Vec<StudentDetail>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StudentResponse {
    pub student: StudentDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StudentMutationResponse {
    pub message: String,
    pub student: PrincipalSummary,
}

/// UserStats
///
/// Output of `GET /stats/users`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserStats {
    #[serde(rename = "totalUsers")]
    pub total_users: i64,
    #[serde(rename = "totalStudents")]
    pub total_students: i64,
}

/// Envelope
///
/// The `{success, message, data}` wrapper used by every course route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CourseList {
    pub count: usize,
    pub courses: Vec<Course>,
}

impl From<Vec<Course>> for CourseList {
    fn from(courses: Vec<Course>) -> Self {
        Self {
            count: courses.len(),
            courses,
        }
    }
}

/// An enrolled student as shown on `GET /courses/{id}/students`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct EnrolledStudent {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(rename = "createdAt")]
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CourseStudents {
    pub count: usize,
    pub students: Vec<EnrolledStudent>,
}
