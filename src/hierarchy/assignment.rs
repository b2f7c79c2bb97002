//! Assignment policy
//!
//! Decides where new accounts attach in the hierarchy: a new Faculty binds
//! under a named Lead Faculty, a new Student goes to the least-loaded
//! Faculty of their college. Ties break on the first candidate in store
//! order, never randomly — test determinism depends on it.

use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::debug;

use crate::db::schemas::{CollegeDoc, Role, UserDoc};
use crate::store::{EntityStore, UserFilter};
use crate::types::{Result, ScribeError};

/// Binds new accounts into the reporting graph
#[derive(Clone)]
pub struct AssignmentPolicy {
    store: Arc<dyn EntityStore>,
}

impl AssignmentPolicy {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Resolve and validate the Lead Faculty a new Faculty will report to.
    ///
    /// The new Faculty inherits the lead's college.
    pub async fn bind_new_faculty(
        &self,
        user: &mut UserDoc,
        lead_faculty_id: &ObjectId,
    ) -> Result<UserDoc> {
        let lead = self
            .store
            .user_by_id(lead_faculty_id)
            .await?
            .filter(|u| u.role == Role::LeadFaculty)
            .ok_or_else(|| ScribeError::InvalidReference("invalid Lead Faculty id".into()))?;

        user.lead_faculty = lead.id;
        user.college = lead.college;
        Ok(lead)
    }

    /// Resolve the college a new Lead Faculty is bound to.
    ///
    /// Does not demote a prior holder — replacing a sitting lead is the
    /// succession engine's explicit-transfer operation.
    pub async fn bind_new_lead_faculty(
        &self,
        user: &mut UserDoc,
        college_id: &ObjectId,
    ) -> Result<CollegeDoc> {
        let college = self
            .store
            .college_by_id(college_id)
            .await?
            .ok_or_else(|| ScribeError::InvalidReference("invalid College id".into()))?;

        user.college = Some(*college_id);
        Ok(college)
    }

    /// Pick the Faculty a new Student is assigned to: the one in the
    /// college with the fewest current Students.
    pub async fn choose_faculty(&self, college_id: &ObjectId) -> Result<UserDoc> {
        let candidates = self
            .store
            .find_users(
                UserFilter::default()
                    .role(Role::Faculty)
                    .college(*college_id),
            )
            .await?;

        if candidates.is_empty() {
            return Err(ScribeError::NoCapacity(
                "no faculties available in this college, add faculties first".into(),
            ));
        }

        let mut chosen: Option<(UserDoc, u64)> = None;
        for candidate in candidates {
            let candidate_id = candidate.object_id()?;
            let load = self
                .store
                .count_users(
                    UserFilter::default()
                        .role(Role::Student)
                        .faculty(candidate_id),
                )
                .await?;

            // Strictly-less keeps the earliest candidate on ties
            match chosen {
                Some((_, best)) if load >= best => {}
                _ => chosen = Some((candidate, load)),
            }
        }

        let (faculty, load) = chosen.expect("candidates is non-empty");
        debug!(
            faculty = %faculty.email,
            students = load,
            "assignment policy selected faculty"
        );
        Ok(faculty)
    }

    /// Bind a new Student: assigned Faculty, its lead, and the college.
    pub async fn bind_new_student(
        &self,
        user: &mut UserDoc,
        college_id: &ObjectId,
    ) -> Result<UserDoc> {
        let faculty = self.choose_faculty(college_id).await?;
        user.faculty = faculty.id;
        user.lead_faculty = faculty.lead_faculty;
        user.college = Some(*college_id);
        Ok(faculty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::CollegeDoc;
    use crate::store::MemoryStore;

    fn user(name: &str, role: Role) -> UserDoc {
        UserDoc::new(
            name.into(),
            format!("{}@example.org", name.to_lowercase()),
            "$argon2id$stub".into(),
            role,
        )
    }

    async fn seed_student(store: &MemoryStore, college: ObjectId, faculty: ObjectId, n: usize) {
        for i in 0..n {
            let mut s = user(&format!("S{faculty}{i}"), Role::Student);
            s.email = format!("s-{}-{}@example.org", faculty, i);
            s.college = Some(college);
            s.faculty = Some(faculty);
            store.insert_user(s).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_least_loaded_faculty_wins() {
        let store = Arc::new(MemoryStore::new());
        let policy = AssignmentPolicy::new(store.clone() as Arc<dyn EntityStore>);

        let college = store
            .insert_college(CollegeDoc::new("College A".into(), None))
            .await
            .unwrap();

        let mut lead = user("Lena", Role::LeadFaculty);
        lead.college = Some(college);
        let lead_id = store.insert_user(lead).await.unwrap();

        let mut f1 = user("F1", Role::Faculty);
        f1.college = Some(college);
        f1.lead_faculty = Some(lead_id);
        let f1_id = store.insert_user(f1).await.unwrap();

        let mut f2 = user("F2", Role::Faculty);
        f2.college = Some(college);
        f2.lead_faculty = Some(lead_id);
        let f2_id = store.insert_user(f2).await.unwrap();

        seed_student(&store, college, f1_id, 2).await;

        let mut new_student = user("Nia", Role::Student);
        let faculty = policy
            .bind_new_student(&mut new_student, &college)
            .await
            .unwrap();

        assert!(faculty.is(&f2_id));
        assert_eq!(new_student.faculty, Some(f2_id));
        assert_eq!(new_student.lead_faculty, Some(lead_id));
        assert_eq!(new_student.college, Some(college));
    }

    #[tokio::test]
    async fn test_tie_break_is_first_encountered() {
        let store = Arc::new(MemoryStore::new());
        let policy = AssignmentPolicy::new(store.clone() as Arc<dyn EntityStore>);

        let college = store
            .insert_college(CollegeDoc::new("College B".into(), None))
            .await
            .unwrap();

        let mut f1 = user("Fa", Role::Faculty);
        f1.college = Some(college);
        let f1_id = store.insert_user(f1).await.unwrap();

        let mut f2 = user("Fb", Role::Faculty);
        f2.college = Some(college);
        store.insert_user(f2).await.unwrap();

        // Both have zero students; the earlier-inserted faculty must win,
        // and keep winning on repeated evaluation
        for _ in 0..3 {
            let chosen = policy.choose_faculty(&college).await.unwrap();
            assert!(chosen.is(&f1_id));
        }
    }

    #[tokio::test]
    async fn test_no_faculty_means_no_capacity() {
        let store = Arc::new(MemoryStore::new());
        let policy = AssignmentPolicy::new(store.clone() as Arc<dyn EntityStore>);

        let college = store
            .insert_college(CollegeDoc::new("Empty College".into(), None))
            .await
            .unwrap();

        let err = policy.choose_faculty(&college).await.unwrap_err();
        assert!(matches!(err, ScribeError::NoCapacity(_)));
    }

    #[tokio::test]
    async fn test_new_faculty_requires_lead_role() {
        let store = Arc::new(MemoryStore::new());
        let policy = AssignmentPolicy::new(store.clone() as Arc<dyn EntityStore>);

        let not_a_lead = store
            .insert_user(user("Farid", Role::Faculty))
            .await
            .unwrap();

        let mut new_faculty = user("Noor", Role::Faculty);
        let err = policy
            .bind_new_faculty(&mut new_faculty, &not_a_lead)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::InvalidReference(_)));

        let err = policy
            .bind_new_faculty(&mut new_faculty, &ObjectId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn test_new_faculty_inherits_college() {
        let store = Arc::new(MemoryStore::new());
        let policy = AssignmentPolicy::new(store.clone() as Arc<dyn EntityStore>);

        let college = store
            .insert_college(CollegeDoc::new("College C".into(), None))
            .await
            .unwrap();
        let mut lead = user("Lena", Role::LeadFaculty);
        lead.college = Some(college);
        let lead_id = store.insert_user(lead).await.unwrap();

        let mut new_faculty = user("Noor", Role::Faculty);
        policy
            .bind_new_faculty(&mut new_faculty, &lead_id)
            .await
            .unwrap();
        assert_eq!(new_faculty.college, Some(college));
        assert_eq!(new_faculty.lead_faculty, Some(lead_id));
    }
}
