//! Database schemas for the Scribe backend

pub mod college;
pub mod metadata;
pub mod user;

pub use college::{CollegeDoc, COLLEGE_COLLECTION};
pub use metadata::Metadata;
pub use user::{
    AcademicAchievement, BeTheChange, ClinicalExperience, Collaboration, CompetitionAward,
    ConferenceParticipation, CourseReflection, EthicsThroughArt, FuturePlan, PortfolioItem,
    Profile, ResearchPublication, ReviewState, ReviewStatus, Role, UserDoc, VoluntaryParticipation,
    WorkshopTraining, USER_COLLECTION,
};
