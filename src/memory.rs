use crate::models::{
    Course, CourseChanges, CourseMembership, NewCourse, NewPrincipal, Principal, PrincipalChanges,
    PrincipalKind, Role,
};
use crate::repository::{RepoResult, Repository};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<Principal>,
    experts: Vec<Principal>,
    courses: Vec<Course>,
}

impl Tables {
    fn principals(&self, kind: PrincipalKind) -> &Vec<Principal> {
        match kind {
            PrincipalKind::User => &self.users,
            PrincipalKind::Expert => &self.experts,
        }
    }

    fn principals_mut(&mut self, kind: PrincipalKind) -> &mut Vec<Principal> {
        match kind {
            PrincipalKind::User => &mut self.users,
            PrincipalKind::Expert => &mut self.experts,
        }
    }
}

/// MemoryRepository
///
/// An in-process `Repository` with the same observable semantics as the
/// Postgres one. Rows are kept newest first, so iteration order already
/// matches `ORDER BY created_at DESC`. Exported for the unit and integration
/// test suites; the server binary always runs on `PostgresRepository`.
///
/// Uniqueness of emails and course codes is not enforced here; the handlers
/// check it before every write.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_search(principal: &Principal, term: &str) -> bool {
    let term = term.to_lowercase();
    principal.name.to_lowercase().contains(&term) || principal.email.to_lowercase().contains(&term)
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn reconcile_schema(&self) {
        tracing::debug!("in-memory store needs no schema reconciliation");
    }

    async fn find_principal_by_email(
        &self,
        kind: PrincipalKind,
        email: &str,
    ) -> RepoResult<Option<Principal>> {
        let tables = self.tables.read().await;
        Ok(tables
            .principals(kind)
            .iter()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn email_taken(
        &self,
        kind: PrincipalKind,
        email: &str,
        exclude: Option<Uuid>,
    ) -> RepoResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .principals(kind)
            .iter()
            .any(|p| p.email == email && Some(p.id) != exclude))
    }

    async fn create_principal(&self, kind: PrincipalKind, new: NewPrincipal) -> RepoResult<Principal> {
        let now = Utc::now();
        let principal = Principal {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        let mut tables = self.tables.write().await;
        tables.principals_mut(kind).insert(0, principal.clone());
        Ok(principal)
    }

    async fn find_user(&self, id: Uuid) -> RepoResult<Option<Principal>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|p| p.id == id).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> RepoResult<Vec<Principal>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn update_user(
        &self,
        id: Uuid,
        changes: PrincipalChanges,
        only_role: Option<Role>,
    ) -> RepoResult<Option<Principal>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables
            .users
            .iter_mut()
            .find(|p| p.id == id && only_role.is_none_or(|role| p.role == role))
        else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid, role: Role) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.users.len();
        tables.users.retain(|p| !(p.id == id && p.role == role));
        Ok(tables.users.len() < before)
    }

    async fn list_students(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> RepoResult<(Vec<Principal>, i64)> {
        let tables = self.tables.read().await;
        let matching: Vec<&Principal> = tables
            .users
            .iter()
            .filter(|p| p.role == Role::Student)
            .filter(|p| search.is_none_or(|term| matches_search(p, term)))
            .collect();

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn count_users(&self, role: Option<Role>) -> RepoResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|p| role.is_none_or(|r| p.role == r))
            .count() as i64)
    }

    async fn list_courses(&self, active_only: bool) -> RepoResult<Vec<Course>> {
        let tables = self.tables.read().await;
        Ok(tables
            .courses
            .iter()
            .filter(|c| !active_only || c.is_active())
            .cloned()
            .collect())
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        let tables = self.tables.read().await;
        Ok(tables.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn course_code_taken(&self, code: &str, exclude: Option<Uuid>) -> RepoResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .courses
            .iter()
            .any(|c| c.course_code == code && Some(c.id) != exclude))
    }

    async fn create_course(&self, new: NewCourse) -> RepoResult<Course> {
        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            course_name: new.course_name,
            course_code: new.course_code,
            course_duration: new.course_duration,
            description: new.description,
            instructor_name: new.instructor_name,
            thumbnail_url: new.thumbnail_url,
            video_url: new.video_url,
            is_published: Some(new.is_published),
            students: new.students,
            created_at: now,
            updated_at: now,
        };
        let mut tables = self.tables.write().await;
        tables.courses.insert(0, course.clone());
        Ok(course)
    }

    async fn update_course(&self, id: Uuid, changes: CourseChanges) -> RepoResult<Option<Course>> {
        let mut tables = self.tables.write().await;
        let Some(course) = tables.courses.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };

        if let Some(v) = changes.course_name {
            course.course_name = v;
        }
        if let Some(v) = changes.course_code {
            course.course_code = v;
        }
        if let Some(v) = changes.course_duration {
            course.course_duration = v;
        }
        if let Some(v) = changes.description {
            course.description = v;
        }
        if let Some(v) = changes.instructor_name {
            course.instructor_name = v;
        }
        if let Some(v) = changes.thumbnail_url {
            course.thumbnail_url = v;
        }
        if let Some(v) = changes.video_url {
            course.video_url = v;
        }
        if let Some(v) = changes.is_published {
            course.is_published = Some(v);
        }
        if let Some(v) = changes.students {
            course.students = v;
        }
        course.updated_at = Utc::now();
        Ok(Some(course.clone()))
    }

    async fn delete_course(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.courses.len();
        tables.courses.retain(|c| c.id != id);
        Ok(tables.courses.len() < before)
    }

    async fn enroll_student(&self, course_id: Uuid, student_id: Uuid) -> RepoResult<Option<Course>> {
        let mut tables = self.tables.write().await;
        let Some(course) = tables.courses.iter_mut().find(|c| c.id == course_id) else {
            return Ok(None);
        };
        if !course.students.contains(&student_id) {
            course.students.push(student_id);
        }
        course.updated_at = Utc::now();
        Ok(Some(course.clone()))
    }

    async fn add_student_to_courses(&self, student_id: Uuid, course_ids: &[Uuid]) -> RepoResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for course in tables
            .courses
            .iter_mut()
            .filter(|c| course_ids.contains(&c.id) && !c.students.contains(&student_id))
        {
            course.students.push(student_id);
            course.updated_at = Utc::now();
            changed += 1;
        }
        Ok(changed)
    }

    async fn remove_student_from_courses(
        &self,
        student_id: Uuid,
        course_ids: &[Uuid],
    ) -> RepoResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for course in tables
            .courses
            .iter_mut()
            .filter(|c| course_ids.contains(&c.id) && c.students.contains(&student_id))
        {
            course.students.retain(|id| *id != student_id);
            course.updated_at = Utc::now();
            changed += 1;
        }
        Ok(changed)
    }

    async fn purge_student(&self, student_id: Uuid) -> RepoResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for course in tables
            .courses
            .iter_mut()
            .filter(|c| c.students.contains(&student_id))
        {
            course.students.retain(|id| *id != student_id);
            course.updated_at = Utc::now();
            changed += 1;
        }
        Ok(changed)
    }

    async fn courses_for_student(&self, student_id: Uuid) -> RepoResult<Vec<Course>> {
        let tables = self.tables.read().await;
        Ok(tables
            .courses
            .iter()
            .filter(|c| c.students.contains(&student_id))
            .cloned()
            .collect())
    }

    async fn memberships_for_students(
        &self,
        student_ids: &[Uuid],
    ) -> RepoResult<Vec<CourseMembership>> {
        let tables = self.tables.read().await;
        Ok(tables
            .courses
            .iter()
            .filter(|c| c.students.iter().any(|id| student_ids.contains(id)))
            .map(|c| CourseMembership {
                id: c.id,
                course_name: c.course_name.clone(),
                course_code: c.course_code.clone(),
                students: c.students.clone(),
            })
            .collect())
    }
}
