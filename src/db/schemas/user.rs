//! User document schema
//!
//! One document per account, across all four roles. Students additionally
//! carry the profile review state, the twelve portfolio section arrays and
//! the cached `points` counter.
//!
//! Reporting edges (`college`, `lead_faculty`, `faculty`) are denormalized
//! onto the user at assignment time for query speed; the succession engine
//! owns every write that can move them.

use std::fmt;

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// The four-tier role hierarchy
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Role {
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    #[serde(rename = "Lead Faculty")]
    LeadFaculty,
    Faculty,
    #[default]
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::SuperAdmin => write!(f, "Super Admin"),
            Role::LeadFaculty => write!(f, "Lead Faculty"),
            Role::Faculty => write!(f, "Faculty"),
            Role::Student => write!(f, "Student"),
        }
    }
}

/// Review lifecycle of a portfolio item or the profile section
///
/// `InProgress` and `Achieved` are accepted only by the thoughts-to-actions
/// section; every other section uses the first four states.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReviewStatus {
    #[default]
    Pending,
    Resubmitted,
    Approved,
    Rejected,
    #[serde(rename = "In Progress")]
    InProgress,
    Achieved,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Pending => write!(f, "Pending"),
            ReviewStatus::Resubmitted => write!(f, "Resubmitted"),
            ReviewStatus::Approved => write!(f, "Approved"),
            ReviewStatus::Rejected => write!(f, "Rejected"),
            ReviewStatus::InProgress => write!(f, "In Progress"),
            ReviewStatus::Achieved => write!(f, "Achieved"),
        }
    }
}

/// Shared review fields embedded in the profile and in every portfolio item
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    #[serde(default)]
    pub status: ReviewStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<ObjectId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewState {
    /// Record a reviewer's decision
    pub fn record(&mut self, status: ReviewStatus, feedback: Option<String>, reviewer: ObjectId) {
        self.status = status;
        self.feedback = feedback;
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(Utc::now());
    }
}

/// A single submission in one portfolio section
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PortfolioItem<C> {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(flatten)]
    pub content: C,

    #[serde(flatten)]
    pub review: ReviewState,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl<C> PortfolioItem<C> {
    /// Wrap freshly submitted content; starts life `Pending`
    pub fn new(content: C) -> Self {
        Self {
            id: ObjectId::new(),
            content,
            review: ReviewState::default(),
            created_at: Utc::now(),
        }
    }
}

/// Student profile: identity fields plus its own review state
/// (the "thirteenth section" — reviewable, never deletable)
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_of_education: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_of_study: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,

    #[serde(flatten)]
    pub review: ReviewState,
}

// ---------------------------------------------------------------------------
// Section content types (one per portfolio category)
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AcademicAchievement {
    pub course_name: String,
    pub offered_by: String,
    pub mode_of_study: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub current_status: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CourseReflection {
    pub year: String,
    pub date: DateTime<Utc>,
    pub topic_of_session: String,
    /// 1-5 session rating
    pub rating: i32,
    pub what_was_good: String,
    pub what_can_be: String,
    pub what_did_i_learn: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BeTheChange {
    pub year: String,
    pub reflect_on_impact: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPublication {
    pub project_title: String,
    pub type_of_article: String,
    pub authors: String,
    pub journal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_factor: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Collaboration {
    pub project_title: String,
    pub topic: String,
    pub disciplines_involved: String,
    pub anticipated_duration: String,
    pub significance: String,
    pub team_experience: String,
    pub what_went_well: String,
    pub what_can_be_improved: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceParticipation {
    pub conference_name: String,
    pub attendee_presenter: String,
    pub summary_of_work: String,
    pub date_of_conference: DateTime<Utc>,
    pub venue: String,
    pub national_international: String,
    pub mode: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionAward {
    pub competition: String,
    pub venue: String,
    pub date: DateTime<Utc>,
    pub mode: String,
    pub summary_of_work: String,
    pub awards_received: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopTraining {
    pub name_of_workshop: String,
    pub conducted_by: String,
    pub mode: String,
    pub skills_acquired: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalExperience {
    pub ethical_dilemma: String,
    pub bioethics_principle: String,
    pub what_was_done: String,
    pub your_perspective: String,
    pub how_to_manage: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoluntaryParticipation {
    pub name_of_organisation: String,
    pub your_role: String,
    pub what_did_you_learn: String,
    pub positive_influence: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EthicsThroughArt {
    pub work_about: String,
    pub why_this_topic: String,
    pub how_expressed: String,
    pub why_this_format: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FuturePlan {
    pub future_plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// User document
// ---------------------------------------------------------------------------

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Display name
    pub name: String,

    /// Login identifier (unique)
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Position in the hierarchy
    pub role: Role,

    /// College membership
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<ObjectId>,

    /// The account that created this one (audit only, never consulted by
    /// the authorization predicate)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_by: Option<ObjectId>,

    /// The Lead Faculty this user's chain ultimately reports to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_faculty: Option<ObjectId>,

    /// Direct reviewer; set only for Students
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty: Option<ObjectId>,

    /// Forces a password change on first login
    #[serde(default = "default_true")]
    pub is_first_login: bool,

    /// Cached approval count; recomputable from the sections + profile
    #[serde(default)]
    pub points: i32,

    /// SHA-256 hex of the active password-reset code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_otp: Option<String>,

    /// When the reset code stops being accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_otp_expire: Option<DateTime<Utc>>,

    /// Profile fields plus the profile review state
    #[serde(default)]
    pub profile: Profile,

    #[serde(default)]
    pub academic_achievements: Vec<PortfolioItem<AcademicAchievement>>,
    #[serde(default)]
    pub course_reflections: Vec<PortfolioItem<CourseReflection>>,
    #[serde(default)]
    pub be_the_change: Vec<PortfolioItem<BeTheChange>>,
    #[serde(default)]
    pub research_publications: Vec<PortfolioItem<ResearchPublication>>,
    #[serde(default)]
    pub interdisciplinary_collaboration: Vec<PortfolioItem<Collaboration>>,
    #[serde(default)]
    pub conference_participation: Vec<PortfolioItem<ConferenceParticipation>>,
    #[serde(default)]
    pub competitions_awards: Vec<PortfolioItem<CompetitionAward>>,
    #[serde(default)]
    pub workshops_training: Vec<PortfolioItem<WorkshopTraining>>,
    #[serde(default)]
    pub clinical_experiences: Vec<PortfolioItem<ClinicalExperience>>,
    #[serde(default)]
    pub voluntary_participation: Vec<PortfolioItem<VoluntaryParticipation>>,
    #[serde(default)]
    pub ethics_through_art: Vec<PortfolioItem<EthicsThroughArt>>,
    #[serde(default)]
    pub thoughts_to_actions: Vec<PortfolioItem<FuturePlan>>,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a new user document with empty portfolio
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        Self {
            id: None,
            metadata: Metadata::new(),
            name,
            email,
            password_hash,
            role,
            is_first_login: true,
            ..Default::default()
        }
    }

    /// Whether this document carries the given id
    pub fn is(&self, id: &ObjectId) -> bool {
        self.id.as_ref() == Some(id)
    }

    /// The document id, or a `Database` error for documents that were never
    /// persisted (stores always return documents with ids)
    pub fn object_id(&self) -> crate::types::Result<ObjectId> {
        self.id
            .ok_or_else(|| crate::types::ScribeError::Database("user document missing _id".into()))
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on email
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Hierarchy traversals filter on these edges constantly
            (
                doc! { "role": 1, "college": 1 },
                Some(
                    IndexOptions::builder()
                        .name("role_college_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "faculty": 1 },
                Some(
                    IndexOptions::builder()
                        .name("faculty_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "leadFaculty": 1 },
                Some(
                    IndexOptions::builder()
                        .name("lead_faculty_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
