//! Portfolio section dispatch
//!
//! The twelve portfolio categories plus the profile pseudo-section as an
//! explicit enum. Every request that names a section goes through
//! [`Section::from_wire`]; unknown tags are rejected at the boundary
//! instead of ever reaching a field lookup.

use bson::oid::ObjectId;

use crate::db::schemas::{ReviewState, ReviewStatus, UserDoc};

/// A portfolio section tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    /// The profile pseudo-section: reviewable, but not an item array
    Profile,
    AcademicAchievements,
    CourseReflections,
    BeTheChange,
    ResearchPublications,
    InterdisciplinaryCollaboration,
    ConferenceParticipation,
    CompetitionsAwards,
    WorkshopsTraining,
    ClinicalExperiences,
    VoluntaryParticipation,
    EthicsThroughArt,
    ThoughtsToActions,
}

/// The twelve item-carrying sections (everything but the profile)
pub const ITEM_SECTIONS: [Section; 12] = [
    Section::AcademicAchievements,
    Section::CourseReflections,
    Section::BeTheChange,
    Section::ResearchPublications,
    Section::InterdisciplinaryCollaboration,
    Section::ConferenceParticipation,
    Section::CompetitionsAwards,
    Section::WorkshopsTraining,
    Section::ClinicalExperiences,
    Section::VoluntaryParticipation,
    Section::EthicsThroughArt,
    Section::ThoughtsToActions,
];

impl Section {
    /// Parse a wire tag; `None` for anything unknown
    pub fn from_wire(tag: &str) -> Option<Self> {
        Some(match tag {
            "profile" => Section::Profile,
            "academicAchievements" => Section::AcademicAchievements,
            "courseReflections" => Section::CourseReflections,
            "beTheChange" => Section::BeTheChange,
            "researchPublications" => Section::ResearchPublications,
            "interdisciplinaryCollaboration" => Section::InterdisciplinaryCollaboration,
            "conferenceParticipation" => Section::ConferenceParticipation,
            "competitionsAwards" => Section::CompetitionsAwards,
            "workshopsTraining" => Section::WorkshopsTraining,
            "clinicalExperiences" => Section::ClinicalExperiences,
            "voluntaryParticipation" => Section::VoluntaryParticipation,
            "ethicsThroughArt" => Section::EthicsThroughArt,
            "thoughtsToActions" => Section::ThoughtsToActions,
            _ => return None,
        })
    }

    /// The tag used in request paths and stored documents
    pub fn wire_name(&self) -> &'static str {
        match self {
            Section::Profile => "profile",
            Section::AcademicAchievements => "academicAchievements",
            Section::CourseReflections => "courseReflections",
            Section::BeTheChange => "beTheChange",
            Section::ResearchPublications => "researchPublications",
            Section::InterdisciplinaryCollaboration => "interdisciplinaryCollaboration",
            Section::ConferenceParticipation => "conferenceParticipation",
            Section::CompetitionsAwards => "competitionsAwards",
            Section::WorkshopsTraining => "workshopsTraining",
            Section::ClinicalExperiences => "clinicalExperiences",
            Section::VoluntaryParticipation => "voluntaryParticipation",
            Section::EthicsThroughArt => "ethicsThroughArt",
            Section::ThoughtsToActions => "thoughtsToActions",
        }
    }

    /// Whether a review may carry this status in this section.
    ///
    /// Thoughts-to-actions additionally tracks execution of the plan
    /// (`In Progress`, `Achieved`); no other section accepts those.
    pub fn allows_status(&self, status: ReviewStatus) -> bool {
        match status {
            ReviewStatus::Pending
            | ReviewStatus::Resubmitted
            | ReviewStatus::Approved
            | ReviewStatus::Rejected => true,
            ReviewStatus::InProgress | ReviewStatus::Achieved => {
                matches!(self, Section::ThoughtsToActions)
            }
        }
    }

    /// Status a Rejected item moves to when its owner edits the content.
    ///
    /// Ethics-through-art and thoughts-to-actions restart at `Pending`; the
    /// other ten sections flag the edit as a re-review request.
    pub fn resubmit_target(&self) -> ReviewStatus {
        match self {
            Section::EthicsThroughArt | Section::ThoughtsToActions => ReviewStatus::Pending,
            _ => ReviewStatus::Resubmitted,
        }
    }
}

/// Mutable review state of one item, located by section and id
pub fn review_state_mut<'a>(
    user: &'a mut UserDoc,
    section: Section,
    item_id: &ObjectId,
) -> Option<&'a mut ReviewState> {
    fn find<'a, C>(
        items: &'a mut [crate::db::schemas::PortfolioItem<C>],
        id: &ObjectId,
    ) -> Option<&'a mut ReviewState> {
        items.iter_mut().find(|i| i.id == *id).map(|i| &mut i.review)
    }

    match section {
        Section::Profile => None,
        Section::AcademicAchievements => find(&mut user.academic_achievements, item_id),
        Section::CourseReflections => find(&mut user.course_reflections, item_id),
        Section::BeTheChange => find(&mut user.be_the_change, item_id),
        Section::ResearchPublications => find(&mut user.research_publications, item_id),
        Section::InterdisciplinaryCollaboration => {
            find(&mut user.interdisciplinary_collaboration, item_id)
        }
        Section::ConferenceParticipation => find(&mut user.conference_participation, item_id),
        Section::CompetitionsAwards => find(&mut user.competitions_awards, item_id),
        Section::WorkshopsTraining => find(&mut user.workshops_training, item_id),
        Section::ClinicalExperiences => find(&mut user.clinical_experiences, item_id),
        Section::VoluntaryParticipation => find(&mut user.voluntary_participation, item_id),
        Section::EthicsThroughArt => find(&mut user.ethics_through_art, item_id),
        Section::ThoughtsToActions => find(&mut user.thoughts_to_actions, item_id),
    }
}

/// Remove an item, returning its review state (the caller settles points
/// before the removal is persisted)
pub fn remove_item(user: &mut UserDoc, section: Section, item_id: &ObjectId) -> Option<ReviewState> {
    fn take<C>(
        items: &mut Vec<crate::db::schemas::PortfolioItem<C>>,
        id: &ObjectId,
    ) -> Option<ReviewState> {
        let position = items.iter().position(|i| i.id == *id)?;
        Some(items.remove(position).review)
    }

    match section {
        Section::Profile => None,
        Section::AcademicAchievements => take(&mut user.academic_achievements, item_id),
        Section::CourseReflections => take(&mut user.course_reflections, item_id),
        Section::BeTheChange => take(&mut user.be_the_change, item_id),
        Section::ResearchPublications => take(&mut user.research_publications, item_id),
        Section::InterdisciplinaryCollaboration => {
            take(&mut user.interdisciplinary_collaboration, item_id)
        }
        Section::ConferenceParticipation => take(&mut user.conference_participation, item_id),
        Section::CompetitionsAwards => take(&mut user.competitions_awards, item_id),
        Section::WorkshopsTraining => take(&mut user.workshops_training, item_id),
        Section::ClinicalExperiences => take(&mut user.clinical_experiences, item_id),
        Section::VoluntaryParticipation => take(&mut user.voluntary_participation, item_id),
        Section::EthicsThroughArt => take(&mut user.ethics_through_art, item_id),
        Section::ThoughtsToActions => take(&mut user.thoughts_to_actions, item_id),
    }
}

/// Count of Approved items across the twelve sections
pub fn approved_item_count(user: &UserDoc) -> i32 {
    fn approved<C>(items: &[crate::db::schemas::PortfolioItem<C>]) -> i32 {
        items
            .iter()
            .filter(|i| i.review.status == ReviewStatus::Approved)
            .count() as i32
    }

    approved(&user.academic_achievements)
        + approved(&user.course_reflections)
        + approved(&user.be_the_change)
        + approved(&user.research_publications)
        + approved(&user.interdisciplinary_collaboration)
        + approved(&user.conference_participation)
        + approved(&user.competitions_awards)
        + approved(&user.workshops_training)
        + approved(&user.clinical_experiences)
        + approved(&user.voluntary_participation)
        + approved(&user.ethics_through_art)
        + approved(&user.thoughts_to_actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{BeTheChange, PortfolioItem, Role};

    #[test]
    fn test_wire_round_trip() {
        for section in ITEM_SECTIONS {
            assert_eq!(Section::from_wire(section.wire_name()), Some(section));
        }
        assert_eq!(Section::from_wire("profile"), Some(Section::Profile));
    }

    #[test]
    fn test_unknown_tags_rejected() {
        assert_eq!(Section::from_wire("discussions"), None);
        assert_eq!(Section::from_wire("AcademicAchievements"), None);
        assert_eq!(Section::from_wire(""), None);
    }

    #[test]
    fn test_status_validity_per_section() {
        assert!(Section::ThoughtsToActions.allows_status(ReviewStatus::InProgress));
        assert!(Section::ThoughtsToActions.allows_status(ReviewStatus::Achieved));
        assert!(!Section::BeTheChange.allows_status(ReviewStatus::InProgress));
        assert!(!Section::Profile.allows_status(ReviewStatus::Achieved));
        assert!(Section::Profile.allows_status(ReviewStatus::Approved));
    }

    #[test]
    fn test_resubmit_policy_split() {
        assert_eq!(
            Section::EthicsThroughArt.resubmit_target(),
            ReviewStatus::Pending
        );
        assert_eq!(
            Section::ThoughtsToActions.resubmit_target(),
            ReviewStatus::Pending
        );
        for section in ITEM_SECTIONS {
            if !matches!(
                section,
                Section::EthicsThroughArt | Section::ThoughtsToActions
            ) {
                assert_eq!(section.resubmit_target(), ReviewStatus::Resubmitted);
            }
        }
    }

    #[test]
    fn test_item_lookup_and_removal() {
        let mut user = UserDoc::new(
            "Sana".into(),
            "sana@example.org".into(),
            "$argon2id$stub".into(),
            Role::Student,
        );
        let item = PortfolioItem::new(BeTheChange {
            year: "2025".into(),
            reflect_on_impact: "Organized a blood-donation camp".into(),
        });
        let item_id = item.id;
        user.be_the_change.push(item);

        let review = review_state_mut(&mut user, Section::BeTheChange, &item_id).unwrap();
        review.status = ReviewStatus::Approved;
        assert_eq!(approved_item_count(&user), 1);

        // Wrong section, wrong id, and the profile are all misses
        assert!(review_state_mut(&mut user, Section::CourseReflections, &item_id).is_none());
        assert!(review_state_mut(&mut user, Section::BeTheChange, &ObjectId::new()).is_none());
        assert!(review_state_mut(&mut user, Section::Profile, &item_id).is_none());

        let removed = remove_item(&mut user, Section::BeTheChange, &item_id).unwrap();
        assert_eq!(removed.status, ReviewStatus::Approved);
        assert!(user.be_the_change.is_empty());
        assert_eq!(approved_item_count(&user), 0);
    }
}
