//! Entity store abstraction
//!
//! The hierarchy engine mutates Users and Colleges exclusively through this
//! trait so that succession and assignment logic can be exercised against
//! the in-memory store in tests and in dev mode, and against MongoDB in
//! production.
//!
//! Update structs use `Option<Option<_>>` for nullable reference fields:
//! the outer `None` means "leave untouched", `Some(None)` means "set to
//! null". This is what lets succession express "detach this edge" without a
//! second vocabulary of operations.

pub mod memory;
pub mod mongo_store;

pub use memory::MemoryStore;
pub use mongo_store::MongoStore;

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::schemas::{CollegeDoc, Role, UserDoc};
use crate::types::Result;

/// Conjunctive filter over user documents
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub college: Option<ObjectId>,
    pub faculty: Option<ObjectId>,
    pub lead_faculty: Option<ObjectId>,
    pub email: Option<String>,
    pub exclude_id: Option<ObjectId>,
    /// Matches users whose `faculty` OR `assigned_by` equals the id
    /// (the leadership-transfer student-handback condition)
    pub faculty_or_assigned_by: Option<ObjectId>,
}

impl UserFilter {
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn college(mut self, college: ObjectId) -> Self {
        self.college = Some(college);
        self
    }

    pub fn faculty(mut self, faculty: ObjectId) -> Self {
        self.faculty = Some(faculty);
        self
    }

    pub fn lead_faculty(mut self, lead_faculty: ObjectId) -> Self {
        self.lead_faculty = Some(lead_faculty);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn exclude(mut self, id: ObjectId) -> Self {
        self.exclude_id = Some(id);
        self
    }

    pub fn faculty_or_assigned_by(mut self, id: ObjectId) -> Self {
        self.faculty_or_assigned_by = Some(id);
        self
    }

    /// Whether a document matches this filter
    pub fn matches(&self, user: &UserDoc) -> bool {
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        if let Some(college) = self.college {
            if user.college != Some(college) {
                return false;
            }
        }
        if let Some(faculty) = self.faculty {
            if user.faculty != Some(faculty) {
                return false;
            }
        }
        if let Some(lead) = self.lead_faculty {
            if user.lead_faculty != Some(lead) {
                return false;
            }
        }
        if let Some(ref email) = self.email {
            if user.email != *email {
                return false;
            }
        }
        if let Some(excluded) = self.exclude_id {
            if user.is(&excluded) {
                return false;
            }
        }
        if let Some(id) = self.faculty_or_assigned_by {
            if user.faculty != Some(id) && user.assigned_by != Some(id) {
                return false;
            }
        }
        true
    }
}

/// Partial update of a user document's hierarchy fields
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub role: Option<Role>,
    pub college: Option<Option<ObjectId>>,
    pub faculty: Option<Option<ObjectId>>,
    pub lead_faculty: Option<Option<ObjectId>>,
    pub assigned_by: Option<Option<ObjectId>>,
    pub points: Option<i32>,
}

impl UserUpdate {
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn college(mut self, college: Option<ObjectId>) -> Self {
        self.college = Some(college);
        self
    }

    pub fn faculty(mut self, faculty: Option<ObjectId>) -> Self {
        self.faculty = Some(faculty);
        self
    }

    pub fn lead_faculty(mut self, lead_faculty: Option<ObjectId>) -> Self {
        self.lead_faculty = Some(lead_faculty);
        self
    }

    pub fn assigned_by(mut self, assigned_by: Option<ObjectId>) -> Self {
        self.assigned_by = Some(assigned_by);
        self
    }

    pub fn points(mut self, points: i32) -> Self {
        self.points = Some(points);
        self
    }

    /// Apply this update to an in-memory document
    pub fn apply(&self, user: &mut UserDoc) {
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(college) = self.college {
            user.college = college;
        }
        if let Some(faculty) = self.faculty {
            user.faculty = faculty;
        }
        if let Some(lead) = self.lead_faculty {
            user.lead_faculty = lead;
        }
        if let Some(assigned_by) = self.assigned_by {
            user.assigned_by = assigned_by;
        }
        if let Some(points) = self.points {
            user.points = points;
        }
    }
}

/// Filter over college documents
#[derive(Debug, Clone, Default)]
pub struct CollegeFilter {
    pub lead_faculty: Option<ObjectId>,
}

impl CollegeFilter {
    pub fn lead_faculty(mut self, lead_faculty: ObjectId) -> Self {
        self.lead_faculty = Some(lead_faculty);
        self
    }

    pub fn matches(&self, college: &CollegeDoc) -> bool {
        match self.lead_faculty {
            Some(lead) => college.lead_faculty == Some(lead),
            None => true,
        }
    }
}

/// Partial update of a college document
#[derive(Debug, Clone, Default)]
pub struct CollegeUpdate {
    pub lead_faculty: Option<Option<ObjectId>>,
}

impl CollegeUpdate {
    pub fn lead_faculty(mut self, lead_faculty: Option<ObjectId>) -> Self {
        self.lead_faculty = Some(lead_faculty);
        self
    }

    pub fn apply(&self, college: &mut CollegeDoc) {
        if let Some(lead) = self.lead_faculty {
            college.lead_faculty = lead;
        }
    }
}

/// Transactional-ish access to Users and Colleges
///
/// Find/update operations never return soft state: a deleted document is
/// simply absent. Multi-document consistency (succession, transfer) is the
/// caller's responsibility, via the per-college locks in `hierarchy`.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn insert_user(&self, user: UserDoc) -> Result<ObjectId>;
    async fn user_by_id(&self, id: &ObjectId) -> Result<Option<UserDoc>>;
    async fn user_by_email(&self, email: &str) -> Result<Option<UserDoc>>;
    async fn find_users(&self, filter: UserFilter) -> Result<Vec<UserDoc>>;
    async fn count_users(&self, filter: UserFilter) -> Result<u64>;
    /// Returns true if a document matched
    async fn update_user(&self, id: &ObjectId, update: UserUpdate) -> Result<bool>;
    /// Returns the number of documents matched
    async fn update_users(&self, filter: UserFilter, update: UserUpdate) -> Result<u64>;
    /// Replace the whole document (single-document read-modify-write)
    async fn replace_user(&self, id: &ObjectId, user: &UserDoc) -> Result<bool>;
    async fn delete_user(&self, id: &ObjectId) -> Result<bool>;

    async fn insert_college(&self, college: CollegeDoc) -> Result<ObjectId>;
    async fn college_by_id(&self, id: &ObjectId) -> Result<Option<CollegeDoc>>;
    async fn find_colleges(&self) -> Result<Vec<CollegeDoc>>;
    async fn update_college(&self, id: &ObjectId, update: CollegeUpdate) -> Result<bool>;
    async fn update_colleges(&self, filter: CollegeFilter, update: CollegeUpdate) -> Result<u64>;
    async fn delete_college(&self, id: &ObjectId) -> Result<bool>;
}
