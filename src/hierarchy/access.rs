//! Authorization predicate
//!
//! One rule decides both "view this student's portfolio" and "submit a
//! review for this student". A Lead Faculty's authority is institutional,
//! not strict tree descent: any of the three conditions below grants
//! access to a student, including bare college co-membership.

use bson::oid::ObjectId;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::schemas::{Role, UserDoc};
use crate::hierarchy::graph::HierarchyGraph;
use crate::store::{EntityStore, UserFilter};
use crate::types::{Result, ScribeError};

/// Decide whether `actor` may view or review `student`.
///
/// `student_faculty` is the student's assigned Faculty document when the
/// caller has it; it is only consulted for the Lead-Faculty
/// subordinate-faculty condition. Rule, in priority order:
///
/// 1. Super Admin: always.
/// 2. Faculty: only their directly assigned students.
/// 3. Lead Faculty: the student reports to them, or the student's Faculty
///    reports to them, or they share a college.
/// 4. Anyone else: never.
pub fn can_access_student(
    actor: &UserDoc,
    student: &UserDoc,
    student_faculty: Option<&UserDoc>,
) -> bool {
    let Some(actor_id) = actor.id else {
        return false;
    };

    match actor.role {
        Role::SuperAdmin => true,
        Role::Faculty => student.faculty == Some(actor_id),
        Role::LeadFaculty => {
            student.lead_faculty == Some(actor_id)
                || student_faculty.is_some_and(|f| f.lead_faculty == Some(actor_id))
                || (actor.college.is_some() && student.college == actor.college)
        }
        Role::Student => false,
    }
}

/// Store-backed access checks and the matching listing query
#[derive(Clone)]
pub struct AccessPolicy {
    store: Arc<dyn EntityStore>,
    graph: HierarchyGraph,
}

impl AccessPolicy {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let graph = HierarchyGraph::new(Arc::clone(&store));
        Self { store, graph }
    }

    /// Evaluate the predicate, fetching the student's Faculty document only
    /// when the Lead-Faculty condition needs it
    pub async fn check(&self, actor: &UserDoc, student: &UserDoc) -> Result<bool> {
        if can_access_student(actor, student, None) {
            return Ok(true);
        }
        if actor.role == Role::LeadFaculty {
            if let Some(faculty_id) = student.faculty {
                let faculty = self.store.user_by_id(&faculty_id).await?;
                return Ok(can_access_student(actor, student, faculty.as_ref()));
            }
        }
        Ok(false)
    }

    /// Like [`check`](Self::check) but failing with `Unauthorized`
    pub async fn authorize(&self, actor: &UserDoc, student: &UserDoc) -> Result<()> {
        if self.check(actor, student).await? {
            Ok(())
        } else {
            Err(ScribeError::Unauthorized(
                "not permitted to access this student's portfolio".into(),
            ))
        }
    }

    /// Every student the actor is authorized over.
    ///
    /// Runs the predicate's conditions as query filters for efficiency; the
    /// result set is identical to filtering all students through
    /// [`can_access_student`] (covered by tests).
    pub async fn assigned_students(&self, actor: &UserDoc) -> Result<Vec<UserDoc>> {
        let actor_id = actor.object_id()?;

        match actor.role {
            Role::SuperAdmin => {
                self.store
                    .find_users(UserFilter::default().role(Role::Student))
                    .await
            }
            Role::Faculty => {
                self.store
                    .find_users(UserFilter::default().role(Role::Student).faculty(actor_id))
                    .await
            }
            Role::LeadFaculty => {
                let mut seen: HashSet<ObjectId> = HashSet::new();
                let mut students = Vec::new();

                let mut batches = Vec::new();
                batches.push(
                    self.store
                        .find_users(
                            UserFilter::default()
                                .role(Role::Student)
                                .lead_faculty(actor_id),
                        )
                        .await?,
                );
                for faculty in self.graph.subordinate_faculties(&actor_id).await? {
                    let faculty_id = faculty.object_id()?;
                    batches.push(self.graph.subordinate_students(&faculty_id).await?);
                }
                if let Some(college) = actor.college {
                    batches.push(
                        self.store
                            .find_users(UserFilter::default().role(Role::Student).college(college))
                            .await?,
                    );
                }

                for student in batches.into_iter().flatten() {
                    let id = student.object_id()?;
                    if seen.insert(id) {
                        students.push(student);
                    }
                }
                Ok(students)
            }
            Role::Student => Err(ScribeError::Unauthorized(
                "students have no assigned students".into(),
            )),
        }
    }
}
