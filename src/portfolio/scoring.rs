//! Scoring rule
//!
//! One point per approved portfolio item, plus one for an approved profile.
//! The live `points` field is a cache of that sum: every status transition
//! applies the delta below, and the reconciliation job recomputes the sum
//! from scratch as a consistency backstop. The cache and the recomputation
//! must always agree — that equivalence is the core testable invariant.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::db::schemas::{ReviewStatus, Role, UserDoc};
use crate::portfolio::section::approved_item_count;
use crate::store::{EntityStore, UserFilter, UserUpdate};
use crate::types::Result;

/// Points delta for a review status transition
pub fn transition_delta(old: ReviewStatus, new: ReviewStatus) -> i32 {
    if new == ReviewStatus::Approved && old != ReviewStatus::Approved {
        1
    } else if new != ReviewStatus::Approved && old == ReviewStatus::Approved {
        -1
    } else {
        0
    }
}

/// Apply a transition to the cached counter, floored at zero
pub fn apply_transition(points: i32, old: ReviewStatus, new: ReviewStatus) -> i32 {
    (points + transition_delta(old, new)).max(0)
}

/// Deleting an approved item costs its point, floored at zero
pub fn apply_removal(points: i32, removed_status: ReviewStatus) -> i32 {
    if removed_status == ReviewStatus::Approved {
        (points - 1).max(0)
    } else {
        points
    }
}

/// The pure recomputation: approved profile plus approved items
pub fn recompute_points(user: &UserDoc) -> i32 {
    let profile = i32::from(user.profile.review.status == ReviewStatus::Approved);
    profile + approved_item_count(user)
}

/// Recompute every student's counter and overwrite divergent values.
///
/// Returns the number of repaired documents.
pub async fn reconcile(store: &dyn EntityStore) -> Result<u64> {
    let students = store
        .find_users(UserFilter::default().role(Role::Student))
        .await?;

    let mut repaired = 0;
    for student in &students {
        let expected = recompute_points(student);
        if student.points != expected {
            warn!(
                student = %student.email,
                cached = student.points,
                expected,
                "points counter diverged, overwriting"
            );
            store
                .update_user(
                    &student.object_id()?,
                    UserUpdate::default().points(expected),
                )
                .await?;
            repaired += 1;
        }
    }

    if repaired > 0 {
        info!(repaired, total = students.len(), "points reconciliation complete");
    }
    Ok(repaired)
}

/// Spawn the periodic reconciliation task
pub fn spawn_reconcile_task(
    store: Arc<dyn EntityStore>,
    interval_seconds: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
        // The first tick fires immediately; skip it so startup stays quiet
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = reconcile(store.as_ref()).await {
                warn!("points reconciliation failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{BeTheChange, PortfolioItem, WorkshopTraining};
    use crate::store::MemoryStore;

    fn student() -> UserDoc {
        UserDoc::new(
            "Sana".into(),
            "sana@example.org".into(),
            "$argon2id$stub".into(),
            Role::Student,
        )
    }

    fn approved_item() -> PortfolioItem<BeTheChange> {
        let mut item = PortfolioItem::new(BeTheChange {
            year: "2025".into(),
            reflect_on_impact: "Led a campus recycling drive".into(),
        });
        item.review.status = ReviewStatus::Approved;
        item
    }

    #[test]
    fn test_transition_deltas() {
        use ReviewStatus::*;
        assert_eq!(transition_delta(Pending, Approved), 1);
        assert_eq!(transition_delta(Resubmitted, Approved), 1);
        assert_eq!(transition_delta(Approved, Rejected), -1);
        assert_eq!(transition_delta(Approved, Pending), -1);
        assert_eq!(transition_delta(Approved, Approved), 0);
        assert_eq!(transition_delta(Pending, Rejected), 0);
        assert_eq!(transition_delta(Rejected, Resubmitted), 0);
        assert_eq!(transition_delta(InProgress, Achieved), 0);
    }

    #[test]
    fn test_floor_at_zero() {
        assert_eq!(
            apply_transition(0, ReviewStatus::Approved, ReviewStatus::Rejected),
            0
        );
        assert_eq!(apply_removal(0, ReviewStatus::Approved), 0);
        assert_eq!(apply_removal(2, ReviewStatus::Approved), 1);
        assert_eq!(apply_removal(2, ReviewStatus::Pending), 2);
    }

    #[test]
    fn test_recompute_counts_profile_and_items() {
        let mut user = student();
        assert_eq!(recompute_points(&user), 0);

        user.profile.review.status = ReviewStatus::Approved;
        user.be_the_change.push(approved_item());
        let mut workshop = PortfolioItem::new(WorkshopTraining {
            name_of_workshop: "Suture basics".into(),
            conducted_by: "Skills lab".into(),
            mode: "Offline".into(),
            skills_acquired: "Basic suturing".into(),
        });
        workshop.review.status = ReviewStatus::Rejected;
        user.workshops_training.push(workshop);

        assert_eq!(recompute_points(&user), 2);
    }

    #[test]
    fn test_incremental_matches_recompute_over_a_review_sequence() {
        use ReviewStatus::*;
        let mut user = student();
        let item = PortfolioItem::new(BeTheChange {
            year: "2025".into(),
            reflect_on_impact: "Peer mentoring".into(),
        });
        let id = item.id;
        user.be_the_change.push(item);

        for (old, new) in [
            (Pending, Approved),
            (Approved, Rejected),
            (Rejected, Resubmitted),
            (Resubmitted, Approved),
        ] {
            user.points = apply_transition(user.points, old, new);
            let review = user
                .be_the_change
                .iter_mut()
                .find(|i| i.id == id)
                .map(|i| &mut i.review)
                .unwrap();
            review.status = new;
            assert_eq!(user.points, recompute_points(&user));
        }
    }

    #[tokio::test]
    async fn test_reconcile_repairs_corrupted_counter() {
        let store = MemoryStore::new();
        let mut user = student();
        user.be_the_change.push(approved_item());
        user.points = 7; // corrupted cache
        let id = store.insert_user(user).await.unwrap();

        let repaired = reconcile(&store).await.unwrap();
        assert_eq!(repaired, 1);
        assert_eq!(store.user_by_id(&id).await.unwrap().unwrap().points, 1);

        // A second pass is a no-op
        assert_eq!(reconcile(&store).await.unwrap(), 0);
    }
}
