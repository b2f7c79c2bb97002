//! Owner-side portfolio CRUD
//!
//! Students add, edit, and delete their own items. Payloads are typed per
//! section: creation deserializes the full content shape, edits go through
//! per-section patch types that only touch supplied fields.
//!
//! Editing a `Rejected` item is a re-review request: the status moves to
//! the section's resubmit target (`Resubmitted`, or `Pending` for the two
//! restart-style sections). Deleting an `Approved` item surrenders its
//! point before the item is removed.

use bson::oid::ObjectId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::schemas::{
    AcademicAchievement, BeTheChange, ClinicalExperience, Collaboration, CompetitionAward,
    ConferenceParticipation, CourseReflection, EthicsThroughArt, FuturePlan, PortfolioItem,
    ResearchPublication, ReviewStatus, UserDoc, VoluntaryParticipation, WorkshopTraining,
};
use crate::portfolio::scoring::apply_removal;
use crate::portfolio::section::{remove_item, Section};
use crate::types::{Result, ScribeError};

use chrono::{DateTime, Utc};

/// Per-section edit payload, applied field-by-field
trait SectionPatch: DeserializeOwned {
    type Content: Serialize;

    fn apply(self, content: &mut Self::Content);
}

fn bad_payload(section: Section, e: impl std::fmt::Display) -> ScribeError {
    ScribeError::InvalidReference(format!("invalid {} payload: {e}", section.wire_name()))
}

fn render(item: &impl Serialize) -> Result<Value> {
    serde_json::to_value(item).map_err(|e| ScribeError::Database(e.to_string()))
}

fn push_item<C>(items: &mut Vec<PortfolioItem<C>>, body: Value, section: Section) -> Result<Value>
where
    C: Serialize + DeserializeOwned,
{
    let content: C = serde_json::from_value(body).map_err(|e| bad_payload(section, e))?;
    let item = PortfolioItem::new(content);
    let rendered = render(&item)?;
    items.push(item);
    Ok(rendered)
}

fn patch_item<P>(
    items: &mut [PortfolioItem<P::Content>],
    item_id: &ObjectId,
    body: Value,
    section: Section,
) -> Result<Value>
where
    P: SectionPatch,
    P::Content: Serialize,
{
    let patch: P = serde_json::from_value(body).map_err(|e| bad_payload(section, e))?;
    let item = items
        .iter_mut()
        .find(|i| i.id == *item_id)
        .ok_or_else(|| ScribeError::NotFound("portfolio item".into()))?;

    patch.apply(&mut item.content);

    if item.review.status == ReviewStatus::Rejected {
        item.review.status = section.resubmit_target();
    }

    render(&*item)
}

/// Add an item to a section; returns the stored item
pub fn add_item(user: &mut UserDoc, section: Section, body: Value) -> Result<Value> {
    match section {
        Section::Profile => Err(ScribeError::InvalidReference(
            "profile is not an item section".into(),
        )),
        Section::AcademicAchievements => {
            push_item(&mut user.academic_achievements, body, section)
        }
        Section::CourseReflections => push_item(&mut user.course_reflections, body, section),
        Section::BeTheChange => push_item(&mut user.be_the_change, body, section),
        Section::ResearchPublications => push_item(&mut user.research_publications, body, section),
        Section::InterdisciplinaryCollaboration => {
            push_item(&mut user.interdisciplinary_collaboration, body, section)
        }
        Section::ConferenceParticipation => {
            push_item(&mut user.conference_participation, body, section)
        }
        Section::CompetitionsAwards => push_item(&mut user.competitions_awards, body, section),
        Section::WorkshopsTraining => push_item(&mut user.workshops_training, body, section),
        Section::ClinicalExperiences => push_item(&mut user.clinical_experiences, body, section),
        Section::VoluntaryParticipation => {
            push_item(&mut user.voluntary_participation, body, section)
        }
        Section::EthicsThroughArt => push_item(&mut user.ethics_through_art, body, section),
        Section::ThoughtsToActions => push_item(&mut user.thoughts_to_actions, body, section),
    }
}

/// Edit an item's content; returns the updated item
pub fn update_item(
    user: &mut UserDoc,
    section: Section,
    item_id: &ObjectId,
    body: Value,
) -> Result<Value> {
    match section {
        Section::Profile => Err(ScribeError::InvalidReference(
            "profile is not an item section".into(),
        )),
        Section::AcademicAchievements => patch_item::<AcademicAchievementPatch>(
            &mut user.academic_achievements,
            item_id,
            body,
            section,
        ),
        Section::CourseReflections => patch_item::<CourseReflectionPatch>(
            &mut user.course_reflections,
            item_id,
            body,
            section,
        ),
        Section::BeTheChange => {
            patch_item::<BeTheChangePatch>(&mut user.be_the_change, item_id, body, section)
        }
        Section::ResearchPublications => patch_item::<ResearchPublicationPatch>(
            &mut user.research_publications,
            item_id,
            body,
            section,
        ),
        Section::InterdisciplinaryCollaboration => patch_item::<CollaborationPatch>(
            &mut user.interdisciplinary_collaboration,
            item_id,
            body,
            section,
        ),
        Section::ConferenceParticipation => patch_item::<ConferenceParticipationPatch>(
            &mut user.conference_participation,
            item_id,
            body,
            section,
        ),
        Section::CompetitionsAwards => patch_item::<CompetitionAwardPatch>(
            &mut user.competitions_awards,
            item_id,
            body,
            section,
        ),
        Section::WorkshopsTraining => patch_item::<WorkshopTrainingPatch>(
            &mut user.workshops_training,
            item_id,
            body,
            section,
        ),
        Section::ClinicalExperiences => patch_item::<ClinicalExperiencePatch>(
            &mut user.clinical_experiences,
            item_id,
            body,
            section,
        ),
        Section::VoluntaryParticipation => patch_item::<VoluntaryParticipationPatch>(
            &mut user.voluntary_participation,
            item_id,
            body,
            section,
        ),
        Section::EthicsThroughArt => patch_item::<EthicsThroughArtPatch>(
            &mut user.ethics_through_art,
            item_id,
            body,
            section,
        ),
        Section::ThoughtsToActions => patch_item::<FuturePlanPatch>(
            &mut user.thoughts_to_actions,
            item_id,
            body,
            section,
        ),
    }
}

/// Delete an item, settling the points cache first
pub fn delete_item(user: &mut UserDoc, section: Section, item_id: &ObjectId) -> Result<()> {
    if section == Section::Profile {
        return Err(ScribeError::InvalidReference(
            "profile cannot be deleted".into(),
        ));
    }

    let removed = remove_item(user, section, item_id)
        .ok_or_else(|| ScribeError::NotFound("portfolio item".into()))?;
    user.points = apply_removal(user.points, removed.status);
    Ok(())
}

// ---------------------------------------------------------------------------
// Patch types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcademicAchievementPatch {
    course_name: Option<String>,
    offered_by: Option<String>,
    mode_of_study: Option<String>,
    duration: Option<String>,
    current_status: Option<String>,
}

impl SectionPatch for AcademicAchievementPatch {
    type Content = AcademicAchievement;

    fn apply(self, content: &mut AcademicAchievement) {
        if let Some(v) = self.course_name {
            content.course_name = v;
        }
        if let Some(v) = self.offered_by {
            content.offered_by = v;
        }
        if let Some(v) = self.mode_of_study {
            content.mode_of_study = v;
        }
        if let Some(v) = self.duration {
            content.duration = Some(v);
        }
        if let Some(v) = self.current_status {
            content.current_status = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseReflectionPatch {
    year: Option<String>,
    date: Option<DateTime<Utc>>,
    topic_of_session: Option<String>,
    rating: Option<i32>,
    what_was_good: Option<String>,
    what_can_be: Option<String>,
    what_did_i_learn: Option<String>,
}

impl SectionPatch for CourseReflectionPatch {
    type Content = CourseReflection;

    fn apply(self, content: &mut CourseReflection) {
        if let Some(v) = self.year {
            content.year = v;
        }
        if let Some(v) = self.date {
            content.date = v;
        }
        if let Some(v) = self.topic_of_session {
            content.topic_of_session = v;
        }
        if let Some(v) = self.rating {
            content.rating = v;
        }
        if let Some(v) = self.what_was_good {
            content.what_was_good = v;
        }
        if let Some(v) = self.what_can_be {
            content.what_can_be = v;
        }
        if let Some(v) = self.what_did_i_learn {
            content.what_did_i_learn = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BeTheChangePatch {
    year: Option<String>,
    reflect_on_impact: Option<String>,
}

impl SectionPatch for BeTheChangePatch {
    type Content = BeTheChange;

    fn apply(self, content: &mut BeTheChange) {
        if let Some(v) = self.year {
            content.year = v;
        }
        if let Some(v) = self.reflect_on_impact {
            content.reflect_on_impact = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResearchPublicationPatch {
    project_title: Option<String>,
    type_of_article: Option<String>,
    authors: Option<String>,
    journal: Option<String>,
    doi: Option<String>,
    citation: Option<String>,
    impact_factor: Option<String>,
}

impl SectionPatch for ResearchPublicationPatch {
    type Content = ResearchPublication;

    fn apply(self, content: &mut ResearchPublication) {
        if let Some(v) = self.project_title {
            content.project_title = v;
        }
        if let Some(v) = self.type_of_article {
            content.type_of_article = v;
        }
        if let Some(v) = self.authors {
            content.authors = v;
        }
        if let Some(v) = self.journal {
            content.journal = v;
        }
        if let Some(v) = self.doi {
            content.doi = Some(v);
        }
        if let Some(v) = self.citation {
            content.citation = Some(v);
        }
        if let Some(v) = self.impact_factor {
            content.impact_factor = Some(v);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollaborationPatch {
    project_title: Option<String>,
    topic: Option<String>,
    disciplines_involved: Option<String>,
    anticipated_duration: Option<String>,
    significance: Option<String>,
    team_experience: Option<String>,
    what_went_well: Option<String>,
    what_can_be_improved: Option<String>,
}

impl SectionPatch for CollaborationPatch {
    type Content = Collaboration;

    fn apply(self, content: &mut Collaboration) {
        if let Some(v) = self.project_title {
            content.project_title = v;
        }
        if let Some(v) = self.topic {
            content.topic = v;
        }
        if let Some(v) = self.disciplines_involved {
            content.disciplines_involved = v;
        }
        if let Some(v) = self.anticipated_duration {
            content.anticipated_duration = v;
        }
        if let Some(v) = self.significance {
            content.significance = v;
        }
        if let Some(v) = self.team_experience {
            content.team_experience = v;
        }
        if let Some(v) = self.what_went_well {
            content.what_went_well = v;
        }
        if let Some(v) = self.what_can_be_improved {
            content.what_can_be_improved = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceParticipationPatch {
    conference_name: Option<String>,
    attendee_presenter: Option<String>,
    summary_of_work: Option<String>,
    date_of_conference: Option<DateTime<Utc>>,
    venue: Option<String>,
    national_international: Option<String>,
    mode: Option<String>,
}

impl SectionPatch for ConferenceParticipationPatch {
    type Content = ConferenceParticipation;

    fn apply(self, content: &mut ConferenceParticipation) {
        if let Some(v) = self.conference_name {
            content.conference_name = v;
        }
        if let Some(v) = self.attendee_presenter {
            content.attendee_presenter = v;
        }
        if let Some(v) = self.summary_of_work {
            content.summary_of_work = v;
        }
        if let Some(v) = self.date_of_conference {
            content.date_of_conference = v;
        }
        if let Some(v) = self.venue {
            content.venue = v;
        }
        if let Some(v) = self.national_international {
            content.national_international = v;
        }
        if let Some(v) = self.mode {
            content.mode = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompetitionAwardPatch {
    competition: Option<String>,
    venue: Option<String>,
    date: Option<DateTime<Utc>>,
    mode: Option<String>,
    summary_of_work: Option<String>,
    awards_received: Option<String>,
}

impl SectionPatch for CompetitionAwardPatch {
    type Content = CompetitionAward;

    fn apply(self, content: &mut CompetitionAward) {
        if let Some(v) = self.competition {
            content.competition = v;
        }
        if let Some(v) = self.venue {
            content.venue = v;
        }
        if let Some(v) = self.date {
            content.date = v;
        }
        if let Some(v) = self.mode {
            content.mode = v;
        }
        if let Some(v) = self.summary_of_work {
            content.summary_of_work = v;
        }
        if let Some(v) = self.awards_received {
            content.awards_received = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkshopTrainingPatch {
    name_of_workshop: Option<String>,
    conducted_by: Option<String>,
    mode: Option<String>,
    skills_acquired: Option<String>,
}

impl SectionPatch for WorkshopTrainingPatch {
    type Content = WorkshopTraining;

    fn apply(self, content: &mut WorkshopTraining) {
        if let Some(v) = self.name_of_workshop {
            content.name_of_workshop = v;
        }
        if let Some(v) = self.conducted_by {
            content.conducted_by = v;
        }
        if let Some(v) = self.mode {
            content.mode = v;
        }
        if let Some(v) = self.skills_acquired {
            content.skills_acquired = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClinicalExperiencePatch {
    ethical_dilemma: Option<String>,
    bioethics_principle: Option<String>,
    what_was_done: Option<String>,
    your_perspective: Option<String>,
    how_to_manage: Option<String>,
}

impl SectionPatch for ClinicalExperiencePatch {
    type Content = ClinicalExperience;

    fn apply(self, content: &mut ClinicalExperience) {
        if let Some(v) = self.ethical_dilemma {
            content.ethical_dilemma = v;
        }
        if let Some(v) = self.bioethics_principle {
            content.bioethics_principle = v;
        }
        if let Some(v) = self.what_was_done {
            content.what_was_done = v;
        }
        if let Some(v) = self.your_perspective {
            content.your_perspective = v;
        }
        if let Some(v) = self.how_to_manage {
            content.how_to_manage = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoluntaryParticipationPatch {
    name_of_organisation: Option<String>,
    your_role: Option<String>,
    what_did_you_learn: Option<String>,
    positive_influence: Option<String>,
}

impl SectionPatch for VoluntaryParticipationPatch {
    type Content = VoluntaryParticipation;

    fn apply(self, content: &mut VoluntaryParticipation) {
        if let Some(v) = self.name_of_organisation {
            content.name_of_organisation = v;
        }
        if let Some(v) = self.your_role {
            content.your_role = v;
        }
        if let Some(v) = self.what_did_you_learn {
            content.what_did_you_learn = v;
        }
        if let Some(v) = self.positive_influence {
            content.positive_influence = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EthicsThroughArtPatch {
    work_about: Option<String>,
    why_this_topic: Option<String>,
    how_expressed: Option<String>,
    why_this_format: Option<String>,
}

impl SectionPatch for EthicsThroughArtPatch {
    type Content = EthicsThroughArt;

    fn apply(self, content: &mut EthicsThroughArt) {
        if let Some(v) = self.work_about {
            content.work_about = v;
        }
        if let Some(v) = self.why_this_topic {
            content.why_this_topic = v;
        }
        if let Some(v) = self.how_expressed {
            content.how_expressed = v;
        }
        if let Some(v) = self.why_this_format {
            content.why_this_format = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FuturePlanPatch {
    future_plan: Option<String>,
    target_date: Option<DateTime<Utc>>,
}

impl SectionPatch for FuturePlanPatch {
    type Content = FuturePlan;

    fn apply(self, content: &mut FuturePlan) {
        if let Some(v) = self.future_plan {
            content.future_plan = v;
        }
        if let Some(v) = self.target_date {
            content.target_date = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Role;
    use serde_json::json;

    fn student() -> UserDoc {
        UserDoc::new(
            "Sana".into(),
            "sana@example.org".into(),
            "$argon2id$stub".into(),
            Role::Student,
        )
    }

    fn item_id(value: &Value) -> ObjectId {
        // ObjectId serializes as extended JSON under serde_json
        ObjectId::parse_str(value["_id"]["$oid"].as_str().unwrap()).unwrap()
    }

    #[test]
    fn test_add_then_update_merges_fields() {
        let mut user = student();
        let added = add_item(
            &mut user,
            Section::WorkshopsTraining,
            json!({
                "nameOfWorkshop": "Airway workshop",
                "conductedBy": "Sim lab",
                "mode": "Offline",
                "skillsAcquired": "Bag-mask ventilation"
            }),
        )
        .unwrap();
        let id = item_id(&added);

        update_item(
            &mut user,
            Section::WorkshopsTraining,
            &id,
            json!({ "mode": "Hybrid" }),
        )
        .unwrap();

        let item = &user.workshops_training[0];
        assert_eq!(item.content.mode, "Hybrid");
        assert_eq!(item.content.name_of_workshop, "Airway workshop");
        assert_eq!(item.review.status, ReviewStatus::Pending);
    }

    #[test]
    fn test_add_rejects_missing_required_fields() {
        let mut user = student();
        let err = add_item(
            &mut user,
            Section::BeTheChange,
            json!({ "year": "2025" }),
        )
        .unwrap_err();
        assert!(matches!(err, ScribeError::InvalidReference(_)));
        assert!(user.be_the_change.is_empty());
    }

    #[test]
    fn test_editing_rejected_item_requests_rereview() {
        let mut user = student();
        let added = add_item(
            &mut user,
            Section::BeTheChange,
            json!({ "year": "2025", "reflectOnImpact": "First draft" }),
        )
        .unwrap();
        let id = item_id(&added);
        user.be_the_change[0].review.status = ReviewStatus::Rejected;

        update_item(
            &mut user,
            Section::BeTheChange,
            &id,
            json!({ "reflectOnImpact": "Revised draft" }),
        )
        .unwrap();
        assert_eq!(user.be_the_change[0].review.status, ReviewStatus::Resubmitted);
    }

    #[test]
    fn test_restart_sections_go_back_to_pending() {
        let mut user = student();
        let added = add_item(
            &mut user,
            Section::ThoughtsToActions,
            json!({ "futurePlan": "Publish a case report" }),
        )
        .unwrap();
        let id = item_id(&added);
        user.thoughts_to_actions[0].review.status = ReviewStatus::Rejected;

        update_item(
            &mut user,
            Section::ThoughtsToActions,
            &id,
            json!({ "futurePlan": "Publish two case reports" }),
        )
        .unwrap();
        assert_eq!(user.thoughts_to_actions[0].review.status, ReviewStatus::Pending);

        let added = add_item(
            &mut user,
            Section::EthicsThroughArt,
            json!({
                "workAbout": "Consent",
                "whyThisTopic": "Ward experience",
                "howExpressed": "Charcoal sketch",
                "whyThisFormat": "Immediacy"
            }),
        )
        .unwrap();
        let id = item_id(&added);
        user.ethics_through_art[0].review.status = ReviewStatus::Rejected;
        update_item(
            &mut user,
            Section::EthicsThroughArt,
            &id,
            json!({ "workAbout": "Informed consent" }),
        )
        .unwrap();
        assert_eq!(user.ethics_through_art[0].review.status, ReviewStatus::Pending);
    }

    #[test]
    fn test_edit_without_rejection_keeps_status() {
        let mut user = student();
        let added = add_item(
            &mut user,
            Section::BeTheChange,
            json!({ "year": "2025", "reflectOnImpact": "Draft" }),
        )
        .unwrap();
        let id = item_id(&added);
        user.be_the_change[0].review.status = ReviewStatus::Approved;

        update_item(
            &mut user,
            Section::BeTheChange,
            &id,
            json!({ "year": "2026" }),
        )
        .unwrap();
        assert_eq!(user.be_the_change[0].review.status, ReviewStatus::Approved);
    }

    #[test]
    fn test_delete_approved_item_surrenders_point() {
        let mut user = student();
        let added = add_item(
            &mut user,
            Section::BeTheChange,
            json!({ "year": "2025", "reflectOnImpact": "Camp" }),
        )
        .unwrap();
        let id = item_id(&added);
        user.be_the_change[0].review.status = ReviewStatus::Approved;
        user.points = 1;

        delete_item(&mut user, Section::BeTheChange, &id).unwrap();
        assert_eq!(user.points, 0);
        assert!(user.be_the_change.is_empty());

        // Deleting a missing item is NotFound
        let err = delete_item(&mut user, Section::BeTheChange, &id).unwrap_err();
        assert!(matches!(err, ScribeError::NotFound(_)));
    }

    #[test]
    fn test_profile_is_not_an_item_section() {
        let mut user = student();
        assert!(matches!(
            add_item(&mut user, Section::Profile, json!({})),
            Err(ScribeError::InvalidReference(_))
        ));
        assert!(matches!(
            delete_item(&mut user, Section::Profile, &ObjectId::new()),
            Err(ScribeError::InvalidReference(_))
        ));
    }
}
