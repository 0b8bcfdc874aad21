use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::{CourseMembership, CourseRef};
use crate::repository::{RepoResult, Repository};

/// MembershipDiff
///
/// What has to change on the course side to move a student from the courses
/// that currently hold them to a requested set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    pub to_add: Vec<Uuid>,
    pub to_remove: Vec<Uuid>,
}

impl MembershipDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Drops repeated ids, keeping the first occurrence of each.
pub fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// diff_memberships
///
/// `to_add` is requested minus current, `to_remove` is current minus
/// requested. Order follows the input lists.
pub fn diff_memberships(current: &[Uuid], requested: &[Uuid]) -> MembershipDiff {
    let current_set: HashSet<Uuid> = current.iter().copied().collect();
    let requested_set: HashSet<Uuid> = requested.iter().copied().collect();

    MembershipDiff {
        to_add: dedup_ids(requested)
            .into_iter()
            .filter(|id| !current_set.contains(id))
            .collect(),
        to_remove: dedup_ids(current)
            .into_iter()
            .filter(|id| !requested_set.contains(id))
            .collect(),
    }
}

/// Regroups course rows by member, for attaching `courses` to each student in
/// a listing. Every course keeps the order it was fetched in.
pub fn group_by_student(memberships: &[CourseMembership]) -> HashMap<Uuid, Vec<CourseRef>> {
    let mut grouped: HashMap<Uuid, Vec<CourseRef>> = HashMap::new();
    for course in memberships {
        for student in dedup_ids(&course.students) {
            grouped.entry(student).or_default().push(course.reference());
        }
    }
    grouped
}

/// sync_student_courses
///
/// Makes the set of courses containing `student_id` equal to `requested`.
/// Ids naming no existing course simply match nothing. Each side of the diff
/// is a single bulk set-union or set-removal statement, so courses outside the
/// diff are never written.
pub async fn sync_student_courses(
    repo: &dyn Repository,
    student_id: Uuid,
    requested: &[Uuid],
) -> RepoResult<MembershipDiff> {
    let current: Vec<Uuid> = repo
        .courses_for_student(student_id)
        .await?
        .into_iter()
        .map(|course| course.id)
        .collect();

    let diff = diff_memberships(&current, requested);
    if diff.is_empty() {
        return Ok(diff);
    }

    repo.add_student_to_courses(student_id, &diff.to_add).await?;
    repo.remove_student_from_courses(student_id, &diff.to_remove)
        .await?;
    tracing::debug!(
        "synced courses for student {}: +{} -{}",
        student_id,
        diff.to_add.len(),
        diff.to_remove.len()
    );
    Ok(diff)
}
