//! Review operation
//!
//! A reviewer sets status + feedback on one portfolio item (or on the
//! profile pseudo-section) of one student: authorize via the access
//! predicate, validate the section/status pair, write the review fields,
//! apply the scoring delta, persist the student document once.

use bson::oid::ObjectId;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{ReviewStatus, UserDoc};
use crate::hierarchy::AccessPolicy;
use crate::portfolio::scoring::apply_transition;
use crate::portfolio::section::{review_state_mut, Section};
use crate::store::EntityStore;
use crate::types::{Result, ScribeError};

/// Wire shape of a review request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub student_id: String,
    /// Section wire tag; `"profile"` reviews the profile itself
    pub section: String,
    /// Required for every section except `"profile"`
    #[serde(default)]
    pub item_id: Option<String>,
    pub status: ReviewStatus,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Applies reviews on behalf of authorized actors
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn EntityStore>,
    access: AccessPolicy,
}

impl ReviewService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let access = AccessPolicy::new(Arc::clone(&store));
        Self { store, access }
    }

    /// Review one item (or the profile) of one student; returns the
    /// updated student document
    pub async fn review(&self, actor: &UserDoc, request: ReviewRequest) -> Result<UserDoc> {
        let student_id = ObjectId::parse_str(&request.student_id)
            .map_err(|_| ScribeError::InvalidReference("invalid student id".into()))?;

        let mut student = self
            .store
            .user_by_id(&student_id)
            .await?
            .ok_or_else(|| ScribeError::NotFound("Student".into()))?;

        self.access.authorize(actor, &student).await?;

        let section = Section::from_wire(&request.section)
            .ok_or_else(|| ScribeError::InvalidReference("invalid section".into()))?;
        if !section.allows_status(request.status) {
            return Err(ScribeError::InvalidReference(format!(
                "status {} is not valid for section {}",
                request.status,
                section.wire_name()
            )));
        }

        let reviewer = actor.object_id()?;
        let old_status = match section {
            Section::Profile => {
                let old = student.profile.review.status;
                student
                    .profile
                    .review
                    .record(request.status, request.feedback, reviewer);
                old
            }
            _ => {
                let raw_id = request
                    .item_id
                    .as_deref()
                    .ok_or_else(|| ScribeError::InvalidReference("itemId is required".into()))?;
                let item_id = ObjectId::parse_str(raw_id)
                    .map_err(|_| ScribeError::InvalidReference("invalid item id".into()))?;

                let review = review_state_mut(&mut student, section, &item_id)
                    .ok_or_else(|| ScribeError::NotFound("portfolio item".into()))?;
                let old = review.status;
                review.record(request.status, request.feedback, reviewer);
                old
            }
        };

        student.points = apply_transition(student.points, old_status, request.status);
        self.store.replace_user(&student_id, &student).await?;

        info!(
            student = %student.email,
            section = section.wire_name(),
            old = %old_status,
            new = %request.status,
            points = student.points,
            "review recorded"
        );

        Ok(student)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{BeTheChange, CollegeDoc, PortfolioItem, Role};
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: ReviewService,
        faculty: ObjectId,
        student: ObjectId,
        item: ObjectId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let service = ReviewService::new(store.clone() as Arc<dyn EntityStore>);

        let college = store
            .insert_college(CollegeDoc::new("College A".into(), None))
            .await
            .unwrap();

        let mut faculty = UserDoc::new(
            "Farid".into(),
            "farid@example.org".into(),
            "$argon2id$stub".into(),
            Role::Faculty,
        );
        faculty.college = Some(college);
        let faculty = store.insert_user(faculty).await.unwrap();

        let mut student = UserDoc::new(
            "Sana".into(),
            "sana@example.org".into(),
            "$argon2id$stub".into(),
            Role::Student,
        );
        student.college = Some(college);
        student.faculty = Some(faculty);
        let item = PortfolioItem::new(BeTheChange {
            year: "2025".into(),
            reflect_on_impact: "Community screening day".into(),
        });
        let item_id = item.id;
        student.be_the_change.push(item);
        let student = store.insert_user(student).await.unwrap();

        Fixture {
            store,
            service,
            faculty,
            student,
            item: item_id,
        }
    }

    impl Fixture {
        async fn actor(&self) -> UserDoc {
            self.store.user_by_id(&self.faculty).await.unwrap().unwrap()
        }

        fn request(&self, section: &str, status: ReviewStatus) -> ReviewRequest {
            ReviewRequest {
                student_id: self.student.to_hex(),
                section: section.into(),
                item_id: (section != "profile").then(|| self.item.to_hex()),
                status,
                feedback: Some("Reviewed".into()),
            }
        }
    }

    #[tokio::test]
    async fn test_approve_then_reject_then_delete_settles_points() {
        let f = fixture().await;
        let actor = f.actor().await;

        // Approve a Pending item: +1
        let student = f
            .service
            .review(&actor, f.request("beTheChange", ReviewStatus::Approved))
            .await
            .unwrap();
        assert_eq!(student.points, 1);
        let review = &student.be_the_change[0].review;
        assert_eq!(review.status, ReviewStatus::Approved);
        assert_eq!(review.reviewed_by, Some(f.faculty));
        assert!(review.reviewed_at.is_some());

        // Re-reject the same item: -1, floored at zero afterwards
        let student = f
            .service
            .review(&actor, f.request("beTheChange", ReviewStatus::Rejected))
            .await
            .unwrap();
        assert_eq!(student.points, 0);

        let student = f
            .service
            .review(&actor, f.request("beTheChange", ReviewStatus::Rejected))
            .await
            .unwrap();
        assert_eq!(student.points, 0);
    }

    #[tokio::test]
    async fn test_profile_pseudo_section() {
        let f = fixture().await;
        let actor = f.actor().await;

        let student = f
            .service
            .review(&actor, f.request("profile", ReviewStatus::Approved))
            .await
            .unwrap();
        assert_eq!(student.profile.review.status, ReviewStatus::Approved);
        assert_eq!(student.points, 1);
    }

    #[tokio::test]
    async fn test_unknown_section_and_missing_item() {
        let f = fixture().await;
        let actor = f.actor().await;

        let err = f
            .service
            .review(&actor, f.request("nonsense", ReviewStatus::Approved))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::InvalidReference(_)));

        let mut request = f.request("beTheChange", ReviewStatus::Approved);
        request.item_id = Some(ObjectId::new().to_hex());
        let err = f.service.review(&actor, request).await.unwrap_err();
        assert!(matches!(err, ScribeError::NotFound(_)));

        let mut request = f.request("beTheChange", ReviewStatus::Approved);
        request.item_id = None;
        let err = f.service.review(&actor, request).await.unwrap_err();
        assert!(matches!(err, ScribeError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn test_status_must_fit_section() {
        let f = fixture().await;
        let actor = f.actor().await;

        let err = f
            .service
            .review(&actor, f.request("beTheChange", ReviewStatus::Achieved))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn test_unrelated_faculty_is_unauthorized() {
        let f = fixture().await;

        let mut outsider = UserDoc::new(
            "Omar".into(),
            "omar@example.org".into(),
            "$argon2id$stub".into(),
            Role::Faculty,
        );
        outsider.id = Some(ObjectId::new());

        let err = f
            .service
            .review(&outsider, f.request("beTheChange", ReviewStatus::Approved))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::Unauthorized(_)));
    }
}
