//! Succession engine
//!
//! Repairs the reporting graph whenever a hierarchy node is deleted or
//! leadership is explicitly transferred, so that every Student and Faculty
//! keeps a well-defined chain up to exactly one Lead Faculty per college.
//!
//! Invariant enforced here: within one college, at most one user holds the
//! Lead Faculty role and is referenced by `college.lead_faculty`. Every
//! operation that installs a new primary lead demotes all other lead-role
//! users of that college.
//!
//! All multi-document mutations run under the per-college lock.

use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{CollegeDoc, Role, UserDoc};
use crate::hierarchy::locks::CollegeLocks;
use crate::store::{CollegeFilter, CollegeUpdate, EntityStore, UserFilter, UserUpdate};
use crate::types::{Result, ScribeError};

/// Graph repair on deletion and leadership transfer
#[derive(Clone)]
pub struct SuccessionEngine {
    store: Arc<dyn EntityStore>,
    locks: Arc<CollegeLocks>,
}

impl SuccessionEngine {
    pub fn new(store: Arc<dyn EntityStore>, locks: Arc<CollegeLocks>) -> Self {
        Self { store, locks }
    }

    /// Explicitly transfer a college's leadership to `new_lead_id`.
    ///
    /// The new lead is promoted, every other lead-role user of the college
    /// is demoted under them, and students the new lead carried as ordinary
    /// Faculty are handed back down to the demoted former primary. Finally
    /// the whole college is repointed at the new lead.
    pub async fn transfer_leadership(
        &self,
        college_id: &ObjectId,
        new_lead_id: &ObjectId,
    ) -> Result<CollegeDoc> {
        let _guard = self.locks.acquire(*college_id).await;

        let college = self
            .store
            .college_by_id(college_id)
            .await?
            .ok_or_else(|| ScribeError::NotFound("College".into()))?;

        let new_lead = self
            .store
            .user_by_id(new_lead_id)
            .await?
            .ok_or_else(|| ScribeError::InvalidReference("invalid new lead user id".into()))?;

        let old_primary = match college.lead_faculty {
            Some(id) => self.store.user_by_id(&id).await?,
            None => None,
        };

        // 1. Promote the new lead; it reports to nobody
        self.store
            .update_user(
                new_lead_id,
                UserUpdate::default()
                    .role(Role::LeadFaculty)
                    .lead_faculty(None),
            )
            .await?;

        // 2. Update the college root reference
        self.store
            .update_college(
                college_id,
                CollegeUpdate::default().lead_faculty(Some(*new_lead_id)),
            )
            .await?;

        // 3. Demote anyone else holding the Lead Faculty role in this
        //    college — exclusivity is enforced, not assumed
        self.store
            .update_users(
                UserFilter::default()
                    .role(Role::LeadFaculty)
                    .college(*college_id)
                    .exclude(*new_lead_id),
                UserUpdate::default()
                    .role(Role::Faculty)
                    .lead_faculty(Some(*new_lead_id)),
            )
            .await?;

        // 4. Hand the new lead's former students down to the demoted
        //    primary, who continues as ordinary Faculty under the new lead
        if let Some(old_primary) = old_primary {
            let old_primary_id = old_primary.object_id()?;
            if old_primary_id != *new_lead_id {
                self.store
                    .update_users(
                        UserFilter::default()
                            .role(Role::Student)
                            .college(*college_id)
                            .faculty_or_assigned_by(*new_lead_id),
                        UserUpdate::default()
                            .faculty(Some(old_primary_id))
                            .assigned_by(Some(old_primary_id))
                            .lead_faculty(Some(*new_lead_id)),
                    )
                    .await?;

                self.store
                    .update_user(
                        &old_primary_id,
                        UserUpdate::default()
                            .role(Role::Faculty)
                            .lead_faculty(Some(*new_lead_id)),
                    )
                    .await?;
            }
        }

        // 5. Repoint everyone else in the college at the new lead
        self.store
            .update_users(
                UserFilter::default()
                    .college(*college_id)
                    .exclude(*new_lead_id),
                UserUpdate::default().lead_faculty(Some(*new_lead_id)),
            )
            .await?;

        info!(
            college = %college.name,
            new_lead = %new_lead.email,
            "leadership transferred"
        );

        self.store
            .college_by_id(college_id)
            .await?
            .ok_or_else(|| ScribeError::NotFound("College".into()))
    }

    /// Move one Faculty under a different Lead Faculty, cascading the new
    /// lead to that Faculty's Students (the denormalized edge would go
    /// stale otherwise).
    pub async fn reassign_faculty_lead(
        &self,
        faculty_id: &ObjectId,
        new_lead_id: &ObjectId,
    ) -> Result<()> {
        let faculty = self
            .store
            .user_by_id(faculty_id)
            .await?
            .filter(|u| u.role == Role::Faculty)
            .ok_or_else(|| ScribeError::NotFound("Faculty".into()))?;

        let _guard = match faculty.college {
            Some(college) => Some(self.locks.acquire(college).await),
            None => None,
        };

        let new_lead = self
            .store
            .user_by_id(new_lead_id)
            .await?
            .filter(|u| u.role == Role::LeadFaculty)
            .ok_or_else(|| ScribeError::InvalidReference("invalid Lead Faculty id".into()))?;

        self.store
            .update_user(
                faculty_id,
                UserUpdate::default().lead_faculty(Some(*new_lead_id)),
            )
            .await?;
        self.repoint_students(faculty_id, Some(*new_lead_id)).await?;

        info!(
            faculty = %faculty.email,
            new_lead = %new_lead.email,
            "faculty reassigned to new lead"
        );
        Ok(())
    }

    /// Delete a user, repairing the graph first.
    ///
    /// Lead Faculty: promote a successor from the same college if one
    /// exists, else leave the college leaderless. Faculty: students become
    /// unassigned. Returns the deleted user's role.
    pub async fn delete_user(&self, user_id: &ObjectId) -> Result<Role> {
        let user = self
            .store
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| ScribeError::NotFound("User".into()))?;

        let _guard = match (user.role, user.college) {
            (Role::LeadFaculty, Some(college)) => Some(self.locks.acquire(college).await),
            _ => None,
        };

        match user.role {
            Role::LeadFaculty => self.remove_lead_faculty(&user).await?,
            Role::Faculty => {
                // Students become unassigned rather than auto-reassigned
                self.repoint_faculty_refs(user_id, None).await?;
            }
            Role::Student | Role::SuperAdmin => {}
        }

        self.store.delete_user(user_id).await?;
        info!(role = %user.role, email = %user.email, "user deleted, references cleared");
        Ok(user.role)
    }

    /// Delete a college: every member keeps their reporting edges but loses
    /// the college membership.
    pub async fn delete_college(&self, college_id: &ObjectId) -> Result<()> {
        let _guard = self.locks.acquire(*college_id).await;

        let college = self
            .store
            .college_by_id(college_id)
            .await?
            .ok_or_else(|| ScribeError::NotFound("College".into()))?;

        self.store
            .update_users(
                UserFilter::default().college(*college_id),
                UserUpdate::default().college(None),
            )
            .await?;
        self.store.delete_college(college_id).await?;

        info!(college = %college.name, "college deleted, member references cleared");
        Ok(())
    }

    /// The repoint-subtree cascade: point every Student of `faculty_id` at
    /// a new lead (or detach them when the lead is gone)
    async fn repoint_students(
        &self,
        faculty_id: &ObjectId,
        new_lead: Option<ObjectId>,
    ) -> Result<u64> {
        self.store
            .update_users(
                UserFilter::default().faculty(*faculty_id),
                UserUpdate::default().lead_faculty(new_lead),
            )
            .await
    }

    /// Point (or null) the `faculty` edge of everyone assigned to a faculty
    async fn repoint_faculty_refs(
        &self,
        faculty_id: &ObjectId,
        replacement: Option<ObjectId>,
    ) -> Result<u64> {
        self.store
            .update_users(
                UserFilter::default().faculty(*faculty_id),
                UserUpdate::default().faculty(replacement),
            )
            .await
    }

    async fn remove_lead_faculty(&self, lead: &UserDoc) -> Result<()> {
        let lead_id = lead.object_id()?;

        // A successor is any ordinary Faculty left in the same college
        let successor = match lead.college {
            Some(college) => self
                .store
                .find_users(
                    UserFilter::default()
                        .role(Role::Faculty)
                        .college(college)
                        .exclude(lead_id),
                )
                .await?
                .into_iter()
                .next(),
            None => None,
        };

        match successor {
            Some(successor) => {
                let successor_id = successor.object_id()?;

                // Promote
                self.store
                    .update_user(
                        &successor_id,
                        UserUpdate::default()
                            .role(Role::LeadFaculty)
                            .lead_faculty(None),
                    )
                    .await?;

                // College root points at the successor
                self.store
                    .update_colleges(
                        CollegeFilter::default().lead_faculty(lead_id),
                        CollegeUpdate::default().lead_faculty(Some(successor_id)),
                    )
                    .await?;

                // Everyone who reported to the deleted lead reports to the
                // successor now
                self.store
                    .update_users(
                        UserFilter::default()
                            .lead_faculty(lead_id)
                            .exclude(successor_id),
                        UserUpdate::default().lead_faculty(Some(successor_id)),
                    )
                    .await?;

                // Students the lead mentored directly move to the successor
                self.repoint_faculty_refs(&lead_id, Some(successor_id))
                    .await?;

                info!(
                    deleted = %lead.email,
                    successor = %successor.email,
                    "lead faculty deleted, successor promoted"
                );
            }
            None => {
                // Leaderless college rather than a fabricated lead; no
                // dangling references may survive the deletion
                self.store
                    .update_colleges(
                        CollegeFilter::default().lead_faculty(lead_id),
                        CollegeUpdate::default().lead_faculty(None),
                    )
                    .await?;
                self.store
                    .update_users(
                        UserFilter::default().lead_faculty(lead_id),
                        UserUpdate::default().lead_faculty(None),
                    )
                    .await?;
                self.repoint_faculty_refs(&lead_id, None).await?;

                info!(deleted = %lead.email, "lead faculty deleted, college left leaderless");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::CollegeDoc;
    use crate::store::MemoryStore;

    struct Harness {
        store: Arc<MemoryStore>,
        engine: SuccessionEngine,
        college: ObjectId,
    }

    async fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let engine = SuccessionEngine::new(
            store.clone() as Arc<dyn EntityStore>,
            Arc::new(CollegeLocks::new()),
        );
        let college = store
            .insert_college(CollegeDoc::new("College A".into(), None))
            .await
            .unwrap();
        Harness {
            store,
            engine,
            college,
        }
    }

    impl Harness {
        async fn add_user(
            &self,
            name: &str,
            role: Role,
            faculty: Option<ObjectId>,
            lead: Option<ObjectId>,
        ) -> ObjectId {
            let mut user = UserDoc::new(
                name.into(),
                format!("{}@example.org", name.to_lowercase()),
                "$argon2id$stub".into(),
                role,
            );
            user.college = Some(self.college);
            user.faculty = faculty;
            user.lead_faculty = lead;
            self.store.insert_user(user).await.unwrap()
        }

        async fn set_primary_lead(&self, lead: ObjectId) {
            self.store
                .update_college(
                    &self.college,
                    CollegeUpdate::default().lead_faculty(Some(lead)),
                )
                .await
                .unwrap();
        }

        async fn user(&self, id: ObjectId) -> UserDoc {
            self.store.user_by_id(&id).await.unwrap().unwrap()
        }

        async fn college_doc(&self) -> CollegeDoc {
            self.store.college_by_id(&self.college).await.unwrap().unwrap()
        }

        /// The exclusivity invariant: at most one lead-role member, and the
        /// college reference agrees with it
        async fn assert_single_lead(&self, expected: Option<ObjectId>) {
            let leads = self
                .store
                .find_users(
                    UserFilter::default()
                        .role(Role::LeadFaculty)
                        .college(self.college),
                )
                .await
                .unwrap();
            match expected {
                Some(id) => {
                    assert_eq!(leads.len(), 1, "exactly one lead-role member expected");
                    assert!(leads[0].is(&id));
                    assert_eq!(self.college_doc().await.lead_faculty, Some(id));
                }
                None => {
                    assert!(leads.is_empty());
                    assert_eq!(self.college_doc().await.lead_faculty, None);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_transfer_promotes_and_hands_students_back() {
        let h = harness().await;
        let lead = h.add_user("Lena", Role::LeadFaculty, None, None).await;
        h.set_primary_lead(lead).await;
        let f1 = h.add_user("F1", Role::Faculty, None, Some(lead)).await;
        let s1 = h.add_user("S1", Role::Student, Some(f1), Some(lead)).await;
        let s2 = h.add_user("S2", Role::Student, Some(f1), Some(lead)).await;

        h.engine.transfer_leadership(&h.college, &f1).await.unwrap();

        // F1 leads the college; the former lead is ordinary Faculty under F1
        h.assert_single_lead(Some(f1)).await;
        let new_lead = h.user(f1).await;
        assert_eq!(new_lead.role, Role::LeadFaculty);
        assert_eq!(new_lead.lead_faculty, None);
        let old_lead = h.user(lead).await;
        assert_eq!(old_lead.role, Role::Faculty);
        assert_eq!(old_lead.lead_faculty, Some(f1));

        // F1's former students were handed to the demoted primary, with the
        // lead cache pointing at F1
        for sid in [s1, s2] {
            let s = h.user(sid).await;
            assert_eq!(s.faculty, Some(lead));
            assert_eq!(s.assigned_by, Some(lead));
            assert_eq!(s.lead_faculty, Some(f1));
        }
    }

    #[tokio::test]
    async fn test_transfer_demotes_every_other_lead() {
        let h = harness().await;
        // Two lead-role users attached to the same college (a state the
        // bootstrap path can produce before an explicit transfer)
        let lead_a = h.add_user("LeadA", Role::LeadFaculty, None, None).await;
        let lead_b = h.add_user("LeadB", Role::LeadFaculty, None, None).await;
        h.set_primary_lead(lead_a).await;
        let f1 = h.add_user("F1", Role::Faculty, None, Some(lead_a)).await;

        h.engine
            .transfer_leadership(&h.college, &lead_b)
            .await
            .unwrap();

        h.assert_single_lead(Some(lead_b)).await;
        for demoted in [lead_a, f1] {
            let u = h.user(demoted).await;
            assert_eq!(u.role, Role::Faculty);
            assert_eq!(u.lead_faculty, Some(lead_b));
        }
    }

    #[tokio::test]
    async fn test_transfer_to_sitting_primary_is_idempotent() {
        let h = harness().await;
        let lead = h.add_user("Lena", Role::LeadFaculty, None, None).await;
        h.set_primary_lead(lead).await;
        let f1 = h.add_user("F1", Role::Faculty, None, Some(lead)).await;
        let s1 = h.add_user("S1", Role::Student, Some(f1), Some(lead)).await;

        h.engine
            .transfer_leadership(&h.college, &lead)
            .await
            .unwrap();

        h.assert_single_lead(Some(lead)).await;
        let f = h.user(f1).await;
        assert_eq!(f.role, Role::Faculty);
        assert_eq!(f.lead_faculty, Some(lead));
        let s = h.user(s1).await;
        assert_eq!(s.faculty, Some(f1));
        assert_eq!(s.lead_faculty, Some(lead));
    }

    #[tokio::test]
    async fn test_transfer_rejects_unknown_targets() {
        let h = harness().await;
        let lead = h.add_user("Lena", Role::LeadFaculty, None, None).await;
        h.set_primary_lead(lead).await;

        let err = h
            .engine
            .transfer_leadership(&ObjectId::new(), &lead)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::NotFound(_)));

        let err = h
            .engine
            .transfer_leadership(&h.college, &ObjectId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn test_delete_lead_promotes_successor() {
        let h = harness().await;
        let lead = h.add_user("Lena", Role::LeadFaculty, None, None).await;
        h.set_primary_lead(lead).await;
        let f1 = h.add_user("F1", Role::Faculty, None, Some(lead)).await;
        let f2 = h.add_user("F2", Role::Faculty, None, Some(lead)).await;
        let s1 = h.add_user("S1", Role::Student, Some(f2), Some(lead)).await;
        // A student the lead mentored directly
        let s2 = h.add_user("S2", Role::Student, Some(lead), Some(lead)).await;

        let deleted_role = h.engine.delete_user(&lead).await.unwrap();
        assert_eq!(deleted_role, Role::LeadFaculty);
        assert!(h.store.user_by_id(&lead).await.unwrap().is_none());

        // First faculty in store order is the successor
        h.assert_single_lead(Some(f1)).await;
        let successor = h.user(f1).await;
        assert_eq!(successor.lead_faculty, None);

        // Everyone else reports to the successor; the directly-mentored
        // student moved under them as faculty too
        let f2_doc = h.user(f2).await;
        assert_eq!(f2_doc.lead_faculty, Some(f1));
        let s1_doc = h.user(s1).await;
        assert_eq!(s1_doc.lead_faculty, Some(f1));
        assert_eq!(s1_doc.faculty, Some(f2));
        let s2_doc = h.user(s2).await;
        assert_eq!(s2_doc.faculty, Some(f1));
        assert_eq!(s2_doc.lead_faculty, Some(f1));
    }

    #[tokio::test]
    async fn test_delete_last_lead_leaves_college_leaderless() {
        let h = harness().await;
        let lead = h.add_user("Lena", Role::LeadFaculty, None, None).await;
        h.set_primary_lead(lead).await;
        let s1 = h.add_user("S1", Role::Student, Some(lead), Some(lead)).await;

        h.engine.delete_user(&lead).await.unwrap();

        h.assert_single_lead(None).await;
        // No dangling references at the deleted lead
        let s = h.user(s1).await;
        assert_eq!(s.lead_faculty, None);
        assert_eq!(s.faculty, None);
    }

    #[tokio::test]
    async fn test_delete_plain_faculty_unassigns_students() {
        let h = harness().await;
        let lead = h.add_user("Lena", Role::LeadFaculty, None, None).await;
        h.set_primary_lead(lead).await;
        let f1 = h.add_user("F1", Role::Faculty, None, Some(lead)).await;
        let mut students = Vec::new();
        for i in 0..3 {
            students.push(
                h.add_user(&format!("S{i}"), Role::Student, Some(f1), Some(lead))
                    .await,
            );
        }

        let deleted_role = h.engine.delete_user(&f1).await.unwrap();
        assert_eq!(deleted_role, Role::Faculty);

        // All three end unassigned; college membership and lead cache stay
        for sid in students {
            let s = h.user(sid).await;
            assert_eq!(s.faculty, None);
            assert_eq!(s.college, Some(h.college));
            assert_eq!(s.lead_faculty, Some(lead));
            assert_eq!(s.points, 0);
        }
        // The college's lead is untouched
        h.assert_single_lead(Some(lead)).await;
    }

    #[tokio::test]
    async fn test_delete_college_clears_membership_only() {
        let h = harness().await;
        let lead = h.add_user("Lena", Role::LeadFaculty, None, None).await;
        h.set_primary_lead(lead).await;
        let f1 = h.add_user("F1", Role::Faculty, None, Some(lead)).await;
        let s1 = h.add_user("S1", Role::Student, Some(f1), Some(lead)).await;

        h.engine.delete_college(&h.college).await.unwrap();

        assert!(h.store.college_by_id(&h.college).await.unwrap().is_none());
        for uid in [lead, f1, s1] {
            let u = h.user(uid).await;
            assert_eq!(u.college, None);
        }
        // Reporting edges are not touched by college deletion
        let s = h.user(s1).await;
        assert_eq!(s.faculty, Some(f1));
        assert_eq!(s.lead_faculty, Some(lead));
    }

    #[tokio::test]
    async fn test_reassign_faculty_cascades_to_students() {
        let h = harness().await;
        let lead_a = h.add_user("LeadA", Role::LeadFaculty, None, None).await;
        h.set_primary_lead(lead_a).await;
        let lead_b = h.add_user("LeadB", Role::LeadFaculty, None, None).await;
        let f1 = h.add_user("F1", Role::Faculty, None, Some(lead_a)).await;
        let s1 = h.add_user("S1", Role::Student, Some(f1), Some(lead_a)).await;

        h.engine.reassign_faculty_lead(&f1, &lead_b).await.unwrap();

        assert_eq!(h.user(f1).await.lead_faculty, Some(lead_b));
        // The denormalized lead edge on the student follows the faculty
        assert_eq!(h.user(s1).await.lead_faculty, Some(lead_b));
    }

    #[tokio::test]
    async fn test_reassign_rejects_wrong_roles() {
        let h = harness().await;
        let lead = h.add_user("Lena", Role::LeadFaculty, None, None).await;
        let f1 = h.add_user("F1", Role::Faculty, None, Some(lead)).await;

        let err = h
            .engine
            .reassign_faculty_lead(&lead, &lead)
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::NotFound(_)));

        let err = h.engine.reassign_faculty_lead(&f1, &f1).await.unwrap_err();
        assert!(matches!(err, ScribeError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn test_exclusivity_survives_operation_sequences() {
        let h = harness().await;
        let lead = h.add_user("Lena", Role::LeadFaculty, None, None).await;
        h.set_primary_lead(lead).await;
        let f1 = h.add_user("F1", Role::Faculty, None, Some(lead)).await;
        let f2 = h.add_user("F2", Role::Faculty, None, Some(lead)).await;
        h.add_user("S1", Role::Student, Some(f1), Some(lead)).await;

        // Transfer to F1, then to F2, then delete F2
        h.engine.transfer_leadership(&h.college, &f1).await.unwrap();
        h.assert_single_lead(Some(f1)).await;
        h.engine.transfer_leadership(&h.college, &f2).await.unwrap();
        h.assert_single_lead(Some(f2)).await;
        h.engine.delete_user(&f2).await.unwrap();

        // Somebody from the remaining faculty pool took over
        let college = h.college_doc().await;
        let new_lead = college.lead_faculty.expect("college must not be leaderless");
        h.assert_single_lead(Some(new_lead)).await;
    }
}
