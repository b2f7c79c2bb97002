//! In-memory entity store
//!
//! Backs the engine in tests and in dev mode when MongoDB is unreachable.
//! Documents are kept in insertion order, which is what makes the
//! assignment policy's first-encountered tie-break deterministic.

use bson::oid::ObjectId;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::db::schemas::{CollegeDoc, UserDoc};
use crate::store::{CollegeFilter, CollegeUpdate, EntityStore, UserFilter, UserUpdate};
use crate::types::{Result, ScribeError};

/// In-memory store with interior mutability
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<UserDoc>>,
    colleges: RwLock<Vec<CollegeDoc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users_read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<UserDoc>>> {
        self.users
            .read()
            .map_err(|_| ScribeError::Database("user store lock poisoned".into()))
    }

    fn users_write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<UserDoc>>> {
        self.users
            .write()
            .map_err(|_| ScribeError::Database("user store lock poisoned".into()))
    }

    fn colleges_read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<CollegeDoc>>> {
        self.colleges
            .read()
            .map_err(|_| ScribeError::Database("college store lock poisoned".into()))
    }

    fn colleges_write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<CollegeDoc>>> {
        self.colleges
            .write()
            .map_err(|_| ScribeError::Database("college store lock poisoned".into()))
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert_user(&self, mut user: UserDoc) -> Result<ObjectId> {
        let mut users = self.users_write()?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(ScribeError::Conflict(format!(
                "user with email {} already exists",
                user.email
            )));
        }
        let id = user.id.unwrap_or_else(ObjectId::new);
        user.id = Some(id);
        users.push(user);
        Ok(id)
    }

    async fn user_by_id(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        Ok(self.users_read()?.iter().find(|u| u.is(id)).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        Ok(self
            .users_read()?
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_users(&self, filter: UserFilter) -> Result<Vec<UserDoc>> {
        Ok(self
            .users_read()?
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect())
    }

    async fn count_users(&self, filter: UserFilter) -> Result<u64> {
        Ok(self.users_read()?.iter().filter(|u| filter.matches(u)).count() as u64)
    }

    async fn update_user(&self, id: &ObjectId, update: UserUpdate) -> Result<bool> {
        let mut users = self.users_write()?;
        match users.iter_mut().find(|u| u.is(id)) {
            Some(user) => {
                update.apply(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_users(&self, filter: UserFilter, update: UserUpdate) -> Result<u64> {
        let mut users = self.users_write()?;
        let mut matched = 0;
        for user in users.iter_mut().filter(|u| filter.matches(u)) {
            update.apply(user);
            matched += 1;
        }
        Ok(matched)
    }

    async fn replace_user(&self, id: &ObjectId, replacement: &UserDoc) -> Result<bool> {
        let mut users = self.users_write()?;
        match users.iter_mut().find(|u| u.is(id)) {
            Some(user) => {
                let mut replacement = replacement.clone();
                replacement.id = Some(*id);
                *user = replacement;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: &ObjectId) -> Result<bool> {
        let mut users = self.users_write()?;
        let before = users.len();
        users.retain(|u| !u.is(id));
        Ok(users.len() < before)
    }

    async fn insert_college(&self, mut college: CollegeDoc) -> Result<ObjectId> {
        let mut colleges = self.colleges_write()?;
        let id = college.id.unwrap_or_else(ObjectId::new);
        college.id = Some(id);
        colleges.push(college);
        Ok(id)
    }

    async fn college_by_id(&self, id: &ObjectId) -> Result<Option<CollegeDoc>> {
        Ok(self
            .colleges_read()?
            .iter()
            .find(|c| c.id.as_ref() == Some(id))
            .cloned())
    }

    async fn find_colleges(&self) -> Result<Vec<CollegeDoc>> {
        Ok(self.colleges_read()?.clone())
    }

    async fn update_college(&self, id: &ObjectId, update: CollegeUpdate) -> Result<bool> {
        let mut colleges = self.colleges_write()?;
        match colleges.iter_mut().find(|c| c.id.as_ref() == Some(id)) {
            Some(college) => {
                update.apply(college);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_colleges(&self, filter: CollegeFilter, update: CollegeUpdate) -> Result<u64> {
        let mut colleges = self.colleges_write()?;
        let mut matched = 0;
        for college in colleges.iter_mut().filter(|c| filter.matches(c)) {
            update.apply(college);
            matched += 1;
        }
        Ok(matched)
    }

    async fn delete_college(&self, id: &ObjectId) -> Result<bool> {
        let mut colleges = self.colleges_write()?;
        let before = colleges.len();
        colleges.retain(|c| c.id.as_ref() != Some(id));
        Ok(colleges.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Role;

    fn user(name: &str, email: &str, role: Role) -> UserDoc {
        UserDoc::new(name.into(), email.into(), "$argon2id$stub".into(), role)
    }

    #[tokio::test]
    async fn test_insert_preserves_order_and_ids() {
        let store = MemoryStore::new();
        let a = store
            .insert_user(user("A", "a@example.org", Role::Faculty))
            .await
            .unwrap();
        let b = store
            .insert_user(user("B", "b@example.org", Role::Faculty))
            .await
            .unwrap();
        assert_ne!(a, b);

        let all = store
            .find_users(UserFilter::default().role(Role::Faculty))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "A");
        assert_eq!(all[1].name, "B");
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store
            .insert_user(user("A", "a@example.org", Role::Student))
            .await
            .unwrap();
        let err = store
            .insert_user(user("A2", "a@example.org", Role::Student))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_many_with_null_assignment() {
        let store = MemoryStore::new();
        let faculty = store
            .insert_user(user("F", "f@example.org", Role::Faculty))
            .await
            .unwrap();
        for i in 0..3 {
            let mut s = user(&format!("S{i}"), &format!("s{i}@example.org"), Role::Student);
            s.faculty = Some(faculty);
            store.insert_user(s).await.unwrap();
        }

        let matched = store
            .update_users(
                UserFilter::default().faculty(faculty),
                UserUpdate::default().faculty(None),
            )
            .await
            .unwrap();
        assert_eq!(matched, 3);
        assert_eq!(
            store
                .count_users(UserFilter::default().faculty(faculty))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_delete_user() {
        let store = MemoryStore::new();
        let id = store
            .insert_user(user("A", "a@example.org", Role::Student))
            .await
            .unwrap();
        assert!(store.delete_user(&id).await.unwrap());
        assert!(!store.delete_user(&id).await.unwrap());
        assert!(store.user_by_id(&id).await.unwrap().is_none());
    }
}
