//! MongoDB-backed entity store
//!
//! Translates the domain filters/updates into BSON documents and runs them
//! through the typed collection wrapper. Field names follow the camelCase
//! wire shape of the documents.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, DateTime, Document};

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{CollegeDoc, UserDoc, COLLEGE_COLLECTION, USER_COLLECTION};
use crate::store::{CollegeFilter, CollegeUpdate, EntityStore, UserFilter, UserUpdate};
use crate::types::{Result, ScribeError};

/// Production store over MongoDB
#[derive(Clone)]
pub struct MongoStore {
    users: MongoCollection<UserDoc>,
    colleges: MongoCollection<CollegeDoc>,
}

impl MongoStore {
    /// Open (and index) the user and college collections
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: client.collection::<UserDoc>(USER_COLLECTION).await?,
            colleges: client.collection::<CollegeDoc>(COLLEGE_COLLECTION).await?,
        })
    }
}

fn opt_oid(value: Option<ObjectId>) -> Bson {
    match value {
        Some(id) => Bson::ObjectId(id),
        None => Bson::Null,
    }
}

fn user_filter_doc(filter: &UserFilter) -> Document {
    let mut d = doc! {};
    if let Some(role) = filter.role {
        d.insert("role", role.to_string());
    }
    if let Some(college) = filter.college {
        d.insert("college", college);
    }
    if let Some(faculty) = filter.faculty {
        d.insert("faculty", faculty);
    }
    if let Some(lead) = filter.lead_faculty {
        d.insert("leadFaculty", lead);
    }
    if let Some(ref email) = filter.email {
        d.insert("email", email.clone());
    }
    if let Some(excluded) = filter.exclude_id {
        d.insert("_id", doc! { "$ne": excluded });
    }
    if let Some(id) = filter.faculty_or_assigned_by {
        d.insert(
            "$or",
            vec![doc! { "faculty": id }, doc! { "assignedBy": id }],
        );
    }
    d
}

fn user_update_doc(update: &UserUpdate) -> Document {
    let mut set = doc! { "metadata.updated_at": DateTime::now() };
    if let Some(role) = update.role {
        set.insert("role", role.to_string());
    }
    if let Some(college) = update.college {
        set.insert("college", opt_oid(college));
    }
    if let Some(faculty) = update.faculty {
        set.insert("faculty", opt_oid(faculty));
    }
    if let Some(lead) = update.lead_faculty {
        set.insert("leadFaculty", opt_oid(lead));
    }
    if let Some(assigned_by) = update.assigned_by {
        set.insert("assignedBy", opt_oid(assigned_by));
    }
    if let Some(points) = update.points {
        set.insert("points", points);
    }
    doc! { "$set": set }
}

fn college_filter_doc(filter: &CollegeFilter) -> Document {
    let mut d = doc! {};
    if let Some(lead) = filter.lead_faculty {
        d.insert("leadFaculty", lead);
    }
    d
}

fn college_update_doc(update: &CollegeUpdate) -> Document {
    let mut set = doc! { "metadata.updated_at": DateTime::now() };
    if let Some(lead) = update.lead_faculty {
        set.insert("leadFaculty", opt_oid(lead));
    }
    doc! { "$set": set }
}

/// Map a driver duplicate-key failure onto the Conflict kind
fn map_insert_err(e: ScribeError) -> ScribeError {
    match e {
        ScribeError::Database(msg) if msg.contains("E11000") => {
            ScribeError::Conflict("user with this email already exists".into())
        }
        other => other,
    }
}

#[async_trait]
impl EntityStore for MongoStore {
    async fn insert_user(&self, user: UserDoc) -> Result<ObjectId> {
        self.users.insert_one(user).await.map_err(map_insert_err)
    }

    async fn user_by_id(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "_id": id }).await
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "email": email }).await
    }

    async fn find_users(&self, filter: UserFilter) -> Result<Vec<UserDoc>> {
        self.users.find_many(user_filter_doc(&filter)).await
    }

    async fn count_users(&self, filter: UserFilter) -> Result<u64> {
        self.users.count(user_filter_doc(&filter)).await
    }

    async fn update_user(&self, id: &ObjectId, update: UserUpdate) -> Result<bool> {
        let result = self
            .users
            .update_one(doc! { "_id": id }, user_update_doc(&update))
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn update_users(&self, filter: UserFilter, update: UserUpdate) -> Result<u64> {
        let result = self
            .users
            .update_many(user_filter_doc(&filter), user_update_doc(&update))
            .await?;
        Ok(result.matched_count)
    }

    async fn replace_user(&self, id: &ObjectId, user: &UserDoc) -> Result<bool> {
        let mut replacement = user.clone();
        replacement.id = Some(*id);
        let result = self
            .users
            .replace_one(doc! { "_id": id }, replacement)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_user(&self, id: &ObjectId) -> Result<bool> {
        let result = self.users.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn insert_college(&self, college: CollegeDoc) -> Result<ObjectId> {
        self.colleges.insert_one(college).await
    }

    async fn college_by_id(&self, id: &ObjectId) -> Result<Option<CollegeDoc>> {
        self.colleges.find_one(doc! { "_id": id }).await
    }

    async fn find_colleges(&self) -> Result<Vec<CollegeDoc>> {
        self.colleges.find_many(doc! {}).await
    }

    async fn update_college(&self, id: &ObjectId, update: CollegeUpdate) -> Result<bool> {
        let result = self
            .colleges
            .update_one(doc! { "_id": id }, college_update_doc(&update))
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn update_colleges(&self, filter: CollegeFilter, update: CollegeUpdate) -> Result<u64> {
        let result = self
            .colleges
            .update_many(college_filter_doc(&filter), college_update_doc(&update))
            .await?;
        Ok(result.matched_count)
    }

    async fn delete_college(&self, id: &ObjectId) -> Result<bool> {
        let result = self.colleges.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Role;

    #[test]
    fn test_filter_doc_shape() {
        let id = ObjectId::new();
        let filter = UserFilter::default()
            .role(Role::Student)
            .college(id)
            .faculty_or_assigned_by(id);
        let d = user_filter_doc(&filter);
        assert_eq!(d.get_str("role").unwrap(), "Student");
        assert_eq!(d.get_object_id("college").unwrap(), id);
        assert!(d.get_array("$or").unwrap().len() == 2);
    }

    #[test]
    fn test_update_doc_set_null() {
        let update = UserUpdate::default()
            .role(Role::Faculty)
            .lead_faculty(None);
        let d = user_update_doc(&update);
        let set = d.get_document("$set").unwrap();
        assert_eq!(set.get_str("role").unwrap(), "Faculty");
        assert!(matches!(set.get("leadFaculty"), Some(Bson::Null)));
        // Untouched fields never appear in the $set
        assert!(set.get("faculty").is_none());
    }
}
