use crate::models::{
    Course, CourseChanges, CourseMembership, NewCourse, NewPrincipal, Principal, PrincipalChanges,
    PrincipalKind, Role,
};
use crate::validation::like_pattern;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Repository Trait
///
/// The persistence contract for principals, courses and memberships. Handlers
/// only see this trait, so the Postgres implementation and the in-memory one
/// used by tests are interchangeable.
///
/// Membership methods are single set-union / set-removal statements. None of
/// them read the `students` array back and rewrite it, so concurrent enrolls
/// on the same course cannot lose updates.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Startup ---
    /// Creates missing tables, drops stale index artifacts and ensures the
    /// unique and membership indexes. Failures are logged, never returned.
    async fn reconcile_schema(&self);

    // --- Principals ---
    async fn find_principal_by_email(
        &self,
        kind: PrincipalKind,
        email: &str,
    ) -> RepoResult<Option<Principal>>;
    /// Whether `email` belongs to a principal of `kind` other than `exclude`.
    async fn email_taken(
        &self,
        kind: PrincipalKind,
        email: &str,
        exclude: Option<Uuid>,
    ) -> RepoResult<bool>;
    async fn create_principal(&self, kind: PrincipalKind, new: NewPrincipal) -> RepoResult<Principal>;
    async fn find_user(&self, id: Uuid) -> RepoResult<Option<Principal>>;
    async fn find_users(&self, ids: &[Uuid]) -> RepoResult<Vec<Principal>>;
    /// Updates a `users` row. With `only_role` set, rows of another role are
    /// left alone and `None` is returned.
    async fn update_user(
        &self,
        id: Uuid,
        changes: PrincipalChanges,
        only_role: Option<Role>,
    ) -> RepoResult<Option<Principal>>;
    async fn delete_user(&self, id: Uuid, role: Role) -> RepoResult<bool>;
    /// One page of Student-role users (newest first) plus the total match count.
    async fn list_students(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> RepoResult<(Vec<Principal>, i64)>;
    async fn count_users(&self, role: Option<Role>) -> RepoResult<i64>;

    // --- Courses ---
    /// All courses newest first; `active_only` keeps published or unset ones.
    async fn list_courses(&self, active_only: bool) -> RepoResult<Vec<Course>>;
    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>>;
    async fn course_code_taken(&self, code: &str, exclude: Option<Uuid>) -> RepoResult<bool>;
    async fn create_course(&self, new: NewCourse) -> RepoResult<Course>;
    async fn update_course(&self, id: Uuid, changes: CourseChanges) -> RepoResult<Option<Course>>;
    async fn delete_course(&self, id: Uuid) -> RepoResult<bool>;

    // --- Membership ---
    /// Idempotent set-union of one student into one course.
    async fn enroll_student(&self, course_id: Uuid, student_id: Uuid) -> RepoResult<Option<Course>>;
    /// Set-union of one student into each listed course. Returns rows changed.
    async fn add_student_to_courses(&self, student_id: Uuid, course_ids: &[Uuid]) -> RepoResult<u64>;
    /// Set-removal of one student from each listed course. Returns rows changed.
    async fn remove_student_from_courses(
        &self,
        student_id: Uuid,
        course_ids: &[Uuid],
    ) -> RepoResult<u64>;
    /// Set-removal of one student from every course that holds them.
    async fn purge_student(&self, student_id: Uuid) -> RepoResult<u64>;
    /// Courses whose membership contains `student_id`, newest first.
    async fn courses_for_student(&self, student_id: Uuid) -> RepoResult<Vec<Course>>;
    /// Courses whose membership overlaps `student_ids`, for the listing join.
    async fn memberships_for_students(
        &self,
        student_ids: &[Uuid],
    ) -> RepoResult<Vec<CourseMembership>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

const PRINCIPAL_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

const COURSE_COLUMNS: &str = "id, course_name, course_code, course_duration, description, \
     instructor_name, thumbnail_url, video_url, is_published, students, created_at, updated_at";

/// Bootstrap statements run by `reconcile_schema`, each independently.
const SCHEMA_STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'Student',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS experts (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'Admin',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS courses (
        id UUID PRIMARY KEY,
        course_name TEXT NOT NULL,
        course_code TEXT NOT NULL,
        course_duration INTEGER NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        instructor_name TEXT NOT NULL DEFAULT '',
        thumbnail_url TEXT NOT NULL DEFAULT '',
        video_url TEXT NOT NULL DEFAULT '',
        is_published BOOLEAN DEFAULT TRUE,
        students UUID[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    // Legacy camel-case index left behind by an older schema.
    "DROP INDEX IF EXISTS courses_coursecode_idx",
    "CREATE UNIQUE INDEX IF NOT EXISTS courses_course_code_key ON courses (course_code)",
    "CREATE INDEX IF NOT EXISTS courses_students_gin ON courses USING GIN (students)",
];

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Course membership is
/// the `courses.students UUID[]` column.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn principal_table(kind: PrincipalKind) -> &'static str {
    match kind {
        PrincipalKind::User => "users",
        PrincipalKind::Expert => "experts",
    }
}

/// Appends the Student-role filter and the optional name/email search shared
/// by the page query and the count query.
fn push_student_filter(builder: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    builder.push(" WHERE role = ");
    builder.push_bind(Role::Student.as_str());
    if let Some(term) = search {
        let pattern = like_pattern(term);
        builder.push(" AND (name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// reconcile_schema
    ///
    /// Runs every bootstrap statement on its own so that one failure (for
    /// example a permissions problem on DROP INDEX) does not block the rest.
    async fn reconcile_schema(&self) {
        let mut failures = 0;
        for statement in SCHEMA_STATEMENTS {
            if let Err(e) = sqlx::query(statement).execute(&self.pool).await {
                failures += 1;
                tracing::warn!("schema reconciliation step skipped: {}", e);
            }
        }
        if failures == 0 {
            tracing::info!("Course indexes reconciled");
        }
    }

    async fn find_principal_by_email(
        &self,
        kind: PrincipalKind,
        email: &str,
    ) -> RepoResult<Option<Principal>> {
        let query = format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM {} WHERE email = $1",
            principal_table(kind)
        );
        sqlx::query_as::<_, Principal>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn email_taken(
        &self,
        kind: PrincipalKind,
        email: &str,
        exclude: Option<Uuid>,
    ) -> RepoResult<bool> {
        let query = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE email = $1 AND ($2::UUID IS NULL OR id <> $2))",
            principal_table(kind)
        );
        sqlx::query_scalar::<_, bool>(&query)
            .bind(email)
            .bind(exclude)
            .fetch_one(&self.pool)
            .await
    }

    async fn create_principal(&self, kind: PrincipalKind, new: NewPrincipal) -> RepoResult<Principal> {
        let query = format!(
            "INSERT INTO {} (id, name, email, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING {PRINCIPAL_COLUMNS}",
            principal_table(kind)
        );
        sqlx::query_as::<_, Principal>(&query)
            .bind(Uuid::new_v4())
            .bind(new.name)
            .bind(new.email)
            .bind(new.password_hash)
            .bind(new.role.as_str())
            .fetch_one(&self.pool)
            .await
    }

    async fn find_user(&self, id: Uuid) -> RepoResult<Option<Principal>> {
        let query = format!("SELECT {PRINCIPAL_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, Principal>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_users(&self, ids: &[Uuid]) -> RepoResult<Vec<Principal>> {
        let query = format!("SELECT {PRINCIPAL_COLUMNS} FROM users WHERE id = ANY($1)");
        sqlx::query_as::<_, Principal>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
    }

    /// update_user
    ///
    /// Uses `COALESCE` so only the provided fields change, like the rest of the
    /// partial updates in this module.
    async fn update_user(
        &self,
        id: Uuid,
        changes: PrincipalChanges,
        only_role: Option<Role>,
    ) -> RepoResult<Option<Principal>> {
        let query = format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                updated_at = NOW()
            WHERE id = $1 AND ($5::TEXT IS NULL OR role = $5)
            RETURNING {PRINCIPAL_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Principal>(&query)
            .bind(id)
            .bind(changes.name)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(only_role.map(|r| r.as_str()))
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_user(&self, id: Uuid, role: Role) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND role = $2")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// list_students
    ///
    /// Builds the filtered page and the count with `QueryBuilder` so the
    /// optional search term is always a bound parameter.
    async fn list_students(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> RepoResult<(Vec<Principal>, i64)> {
        let mut page: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PRINCIPAL_COLUMNS} FROM users"));
        push_student_filter(&mut page, search);
        page.push(" ORDER BY created_at DESC OFFSET ");
        page.push_bind(offset);
        page.push(" LIMIT ");
        page.push_bind(limit);

        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_student_filter(&mut count, search);

        let items = page
            .build_query_as::<Principal>()
            .fetch_all(&self.pool)
            .await?;
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok((items, total))
    }

    async fn count_users(&self, role: Option<Role>) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE ($1::TEXT IS NULL OR role = $1)",
        )
        .bind(role.map(|r| r.as_str()))
        .fetch_one(&self.pool)
        .await
    }

    /// list_courses
    ///
    /// `IS DISTINCT FROM FALSE` keeps rows whose flag is `NULL`, which is how
    /// a course that never had `is_published` set counts as active.
    async fn list_courses(&self, active_only: bool) -> RepoResult<Vec<Course>> {
        let filter = if active_only {
            " WHERE is_published IS DISTINCT FROM FALSE"
        } else {
            ""
        };
        let query = format!("SELECT {COURSE_COLUMNS} FROM courses{filter} ORDER BY created_at DESC");
        sqlx::query_as::<_, Course>(&query).fetch_all(&self.pool).await
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        let query = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1");
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn course_code_taken(&self, code: &str, exclude: Option<Uuid>) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM courses WHERE course_code = $1 AND ($2::UUID IS NULL OR id <> $2))",
        )
        .bind(code)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
    }

    async fn create_course(&self, new: NewCourse) -> RepoResult<Course> {
        let query = format!(
            r#"
            INSERT INTO courses (id, course_name, course_code, course_duration, description,
                                 instructor_name, thumbnail_url, video_url, is_published, students,
                                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
            RETURNING {COURSE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(Uuid::new_v4())
            .bind(new.course_name)
            .bind(new.course_code)
            .bind(new.course_duration)
            .bind(new.description)
            .bind(new.instructor_name)
            .bind(new.thumbnail_url)
            .bind(new.video_url)
            .bind(new.is_published)
            .bind(new.students)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_course(&self, id: Uuid, changes: CourseChanges) -> RepoResult<Option<Course>> {
        let query = format!(
            r#"
            UPDATE courses
            SET course_name = COALESCE($2, course_name),
                course_code = COALESCE($3, course_code),
                course_duration = COALESCE($4, course_duration),
                description = COALESCE($5, description),
                instructor_name = COALESCE($6, instructor_name),
                thumbnail_url = COALESCE($7, thumbnail_url),
                video_url = COALESCE($8, video_url),
                is_published = COALESCE($9, is_published),
                students = COALESCE($10, students),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COURSE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .bind(changes.course_name)
            .bind(changes.course_code)
            .bind(changes.course_duration)
            .bind(changes.description)
            .bind(changes.instructor_name)
            .bind(changes.thumbnail_url)
            .bind(changes.video_url)
            .bind(changes.is_published)
            .bind(changes.students)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_course(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// enroll_student
    ///
    /// The `CASE` keeps the array unchanged when the id is already present, so
    /// re-enrolling is a no-op that still returns the course.
    async fn enroll_student(&self, course_id: Uuid, student_id: Uuid) -> RepoResult<Option<Course>> {
        let query = format!(
            r#"
            UPDATE courses
            SET students = CASE WHEN $2 = ANY(students) THEN students
                                ELSE array_append(students, $2) END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COURSE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(course_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn add_student_to_courses(&self, student_id: Uuid, course_ids: &[Uuid]) -> RepoResult<u64> {
        if course_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET students = array_append(students, $1), updated_at = NOW()
            WHERE id = ANY($2) AND NOT ($1 = ANY(students))
            "#,
        )
        .bind(student_id)
        .bind(course_ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn remove_student_from_courses(
        &self,
        student_id: Uuid,
        course_ids: &[Uuid],
    ) -> RepoResult<u64> {
        if course_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET students = array_remove(students, $1), updated_at = NOW()
            WHERE id = ANY($2) AND $1 = ANY(students)
            "#,
        )
        .bind(student_id)
        .bind(course_ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn purge_student(&self, student_id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET students = array_remove(students, $1), updated_at = NOW()
            WHERE $1 = ANY(students)
            "#,
        )
        .bind(student_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn courses_for_student(&self, student_id: Uuid) -> RepoResult<Vec<Course>> {
        let query = format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE $1 = ANY(students) ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn memberships_for_students(
        &self,
        student_ids: &[Uuid],
    ) -> RepoResult<Vec<CourseMembership>> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, CourseMembership>(
            r#"
            SELECT id, course_name, course_code, students
            FROM courses
            WHERE students && $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(student_ids)
        .fetch_all(&self.pool)
        .await
    }
}
