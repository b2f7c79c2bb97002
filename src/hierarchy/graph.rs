//! Read-only view over the reporting graph
//!
//! Traversal helpers only — every mutation of reporting edges goes through
//! the assignment policy or the succession engine so the invariants stay in
//! one place.

use bson::oid::ObjectId;
use std::sync::Arc;

use crate::db::schemas::{CollegeDoc, Role, UserDoc};
use crate::store::{EntityStore, UserFilter};
use crate::types::Result;

/// Resolved reporting edges of one user
#[derive(Debug, Default)]
pub struct Reporting {
    pub faculty: Option<UserDoc>,
    pub lead_faculty: Option<UserDoc>,
    pub college: Option<CollegeDoc>,
}

/// Read-only traversals over the hierarchy
#[derive(Clone)]
pub struct HierarchyGraph {
    store: Arc<dyn EntityStore>,
}

impl HierarchyGraph {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Resolve who a user reports to
    pub async fn reports_to(&self, user: &UserDoc) -> Result<Reporting> {
        let mut reporting = Reporting::default();
        if let Some(id) = user.faculty {
            reporting.faculty = self.store.user_by_id(&id).await?;
        }
        if let Some(id) = user.lead_faculty {
            reporting.lead_faculty = self.store.user_by_id(&id).await?;
        }
        if let Some(id) = user.college {
            reporting.college = self.store.college_by_id(&id).await?;
        }
        Ok(reporting)
    }

    /// All Faculty reporting to the given Lead Faculty
    pub async fn subordinate_faculties(&self, lead_faculty_id: &ObjectId) -> Result<Vec<UserDoc>> {
        self.store
            .find_users(
                UserFilter::default()
                    .role(Role::Faculty)
                    .lead_faculty(*lead_faculty_id),
            )
            .await
    }

    /// All Students assigned to the given Faculty
    pub async fn subordinate_students(&self, faculty_id: &ObjectId) -> Result<Vec<UserDoc>> {
        self.store
            .find_users(UserFilter::default().role(Role::Student).faculty(*faculty_id))
            .await
    }

    /// How many Students a Faculty currently carries
    pub async fn student_count(&self, faculty_id: &ObjectId) -> Result<u64> {
        self.store
            .count_users(UserFilter::default().role(Role::Student).faculty(*faculty_id))
            .await
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

    #[tokio::test]
    async fn test_traversals() {
        let store = Arc::new(MemoryStore::new());
        let graph = HierarchyGraph::new(store.clone());

        let college = store
            .insert_college(CollegeDoc::new("Meridian Medical College".into(), None))
            .await
            .unwrap();

        let mut lead = user("Lena", Role::LeadFaculty);
        lead.college = Some(college);
        let lead_id = store.insert_user(lead).await.unwrap();

        let mut fac = user("Farid", Role::Faculty);
        fac.college = Some(college);
        fac.lead_faculty = Some(lead_id);
        let fac_id = store.insert_user(fac).await.unwrap();

        let mut student = user("Sana", Role::Student);
        student.college = Some(college);
        student.faculty = Some(fac_id);
        student.lead_faculty = Some(lead_id);
        let student_id = store.insert_user(student).await.unwrap();

        let faculties = graph.subordinate_faculties(&lead_id).await.unwrap();
        assert_eq!(faculties.len(), 1);
        assert!(faculties[0].is(&fac_id));

        let students = graph.subordinate_students(&fac_id).await.unwrap();
        assert_eq!(students.len(), 1);
        assert!(students[0].is(&student_id));
        assert_eq!(graph.student_count(&fac_id).await.unwrap(), 1);

        let student = store.user_by_id(&student_id).await.unwrap().unwrap();
        let reporting = graph.reports_to(&student).await.unwrap();
        assert!(reporting.faculty.unwrap().is(&fac_id));
        assert!(reporting.lead_faculty.unwrap().is(&lead_id));
        assert_eq!(
            reporting.college.unwrap().name,
            "Meridian Medical College"
        );
    }
}
