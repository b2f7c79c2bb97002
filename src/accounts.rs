//! Account lifecycle
//!
//! Admin-triggered account bootstrap (college, lead faculty, faculty,
//! student) with generated temporary passwords, plus login, password
//! change, and the forgot/reset-code flow.
//!
//! Credential emails are best-effort: the account mutation commits either
//! way and the caller receives an `email_sent` flag.

use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{
    generate_reset_code, generate_temp_password, hash_password, hash_reset_code, verify_password,
    JwtValidator,
};
use crate::db::schemas::{CollegeDoc, Role, UserDoc};
use crate::hierarchy::{AssignmentPolicy, CollegeLocks};
use crate::notify::Notifier;
use crate::store::{CollegeUpdate, EntityStore};
use crate::types::{Result, ScribeError};

/// A freshly bootstrapped account
#[derive(Debug)]
pub struct CreatedAccount {
    pub user: UserDoc,
    pub email_sent: bool,
    pub email_error: Option<String>,
    /// For students: the faculty the assignment policy picked
    pub assigned_faculty: Option<UserDoc>,
}

/// An authenticated session
#[derive(Debug)]
pub struct LoginSession {
    pub token: String,
    pub expires_at: u64,
    pub user: UserDoc,
}

/// Account bootstrap and credential flows
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn EntityStore>,
    notifier: Arc<dyn Notifier>,
    assignment: AssignmentPolicy,
    locks: Arc<CollegeLocks>,
    jwt: JwtValidator,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        notifier: Arc<dyn Notifier>,
        locks: Arc<CollegeLocks>,
        jwt: JwtValidator,
    ) -> Self {
        let assignment = AssignmentPolicy::new(Arc::clone(&store));
        Self {
            store,
            notifier,
            assignment,
            locks,
            jwt,
        }
    }

    /// Seed the first Super Admin if that email is not taken yet
    pub async fn ensure_super_admin(&self, email: &str, password: &str) -> Result<()> {
        if self.store.user_by_email(email).await?.is_some() {
            info!(email, "super admin already exists, seed skipped");
            return Ok(());
        }

        let user = UserDoc::new(
            "Super Admin".into(),
            email.to_string(),
            hash_password(password)?,
            Role::SuperAdmin,
        );
        self.store.insert_user(user).await?;
        info!(email, "super admin seeded");
        Ok(())
    }

    /// Create a college
    pub async fn create_college(
        &self,
        name: String,
        location: Option<String>,
    ) -> Result<CollegeDoc> {
        let college = CollegeDoc::new(name, location);
        let id = self.store.insert_college(college).await?;
        self.store
            .college_by_id(&id)
            .await?
            .ok_or_else(|| ScribeError::Database("college vanished after insert".into()))
    }

    /// Create a Lead Faculty bound to a college.
    ///
    /// The college's `lead_faculty` reference is set to the new user; a
    /// sitting lead is NOT demoted here — replacing one is the succession
    /// engine's explicit transfer.
    pub async fn create_lead_faculty(
        &self,
        actor: &UserDoc,
        name: String,
        email: String,
        college_id: &ObjectId,
    ) -> Result<CreatedAccount> {
        self.ensure_email_free(&email).await?;

        let password = generate_temp_password();
        let mut user = UserDoc::new(
            name.clone(),
            email.clone(),
            hash_password(&password)?,
            Role::LeadFaculty,
        );
        user.assigned_by = actor.id;
        apply_name_parts(&mut user, &name);

        let college = self.assignment.bind_new_lead_faculty(&mut user, college_id).await?;
        user.profile.institution = Some(college.name.clone());

        let user_id = self.store.insert_user(user).await?;
        self.store
            .update_college(
                college_id,
                CollegeUpdate::default().lead_faculty(Some(user_id)),
            )
            .await?;

        self.finish_bootstrap(user_id, &name, &email, &password, Role::LeadFaculty, None)
            .await
    }

    /// Create a Faculty reporting to an existing Lead Faculty
    pub async fn create_faculty(
        &self,
        actor: &UserDoc,
        name: String,
        email: String,
        lead_faculty_id: &ObjectId,
    ) -> Result<CreatedAccount> {
        self.ensure_email_free(&email).await?;

        let password = generate_temp_password();
        let mut user = UserDoc::new(
            name.clone(),
            email.clone(),
            hash_password(&password)?,
            Role::Faculty,
        );
        user.assigned_by = actor.id;
        apply_name_parts(&mut user, &name);

        self.assignment.bind_new_faculty(&mut user, lead_faculty_id).await?;
        if let Some(college_id) = user.college {
            if let Some(college) = self.store.college_by_id(&college_id).await? {
                user.profile.institution = Some(college.name);
            }
        }

        let user_id = self.store.insert_user(user).await?;
        self.finish_bootstrap(user_id, &name, &email, &password, Role::Faculty, None)
            .await
    }

    /// Create a Student in a college; the assignment policy picks the
    /// least-loaded faculty
    pub async fn create_student(
        &self,
        actor: &UserDoc,
        name: String,
        email: String,
        college_id: &ObjectId,
    ) -> Result<CreatedAccount> {
        self.ensure_email_free(&email).await?;

        let college = self
            .store
            .college_by_id(college_id)
            .await?
            .ok_or_else(|| ScribeError::InvalidReference("invalid College id".into()))?;

        // Serialize with other assignments/successions in this college so
        // concurrent student creations observe each other's load
        let _guard = self.locks.acquire(*college_id).await;

        let password = generate_temp_password();
        let mut user = UserDoc::new(
            name.clone(),
            email.clone(),
            hash_password(&password)?,
            Role::Student,
        );
        user.assigned_by = actor.id;
        apply_name_parts(&mut user, &name);
        user.profile.institution = Some(college.name.clone());

        let faculty = self.assignment.bind_new_student(&mut user, college_id).await?;

        let user_id = self.store.insert_user(user).await?;
        self.finish_bootstrap(
            user_id,
            &name,
            &email,
            &password,
            Role::Student,
            Some(faculty),
        )
        .await
    }

    /// Verify credentials and issue a session token
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession> {
        let user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or_else(|| ScribeError::Auth("invalid email or password".into()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(ScribeError::Auth("invalid email or password".into()));
        }

        let user_id = user.object_id()?;
        let (token, expires_at) = self
            .jwt
            .generate_token(&user_id.to_hex(), &user.email, user.role)?;

        info!(email = %user.email, role = %user.role, "login");
        Ok(LoginSession {
            token,
            expires_at,
            user,
        })
    }

    /// Change the caller's own password
    pub async fn change_password(
        &self,
        actor: &UserDoc,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let actor_id = actor.object_id()?;
        let mut user = self
            .store
            .user_by_id(&actor_id)
            .await?
            .ok_or_else(|| ScribeError::NotFound("User".into()))?;

        if !verify_password(current_password, &user.password_hash)? {
            return Err(ScribeError::InvalidReference(
                "current password is incorrect".into(),
            ));
        }

        user.password_hash = hash_password(new_password)?;
        user.is_first_login = false;
        self.store.replace_user(&actor_id, &user).await?;
        info!(email = %user.email, "password changed");
        Ok(())
    }

    /// Start the reset flow: store a hashed 6-digit code (10-minute
    /// expiry) and mail it
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let mut user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or_else(|| ScribeError::NotFound("no user with that email".into()))?;

        let (code, digest) = generate_reset_code();
        user.reset_password_otp = Some(digest);
        user.reset_password_otp_expire = Some(Utc::now() + Duration::minutes(10));
        let user_id = user.object_id()?;
        self.store.replace_user(&user_id, &user).await?;

        let outcome = self
            .notifier
            .send_password_reset_code(email, &user.name, &code)
            .await;
        if !outcome.success {
            // Roll the code back so a failed delivery leaves no live code
            user.reset_password_otp = None;
            user.reset_password_otp_expire = None;
            self.store.replace_user(&user_id, &user).await?;
            return Err(ScribeError::NotificationFailed(
                outcome.error.unwrap_or_else(|| "email could not be sent".into()),
            ));
        }

        Ok(())
    }

    /// Finish the reset flow: verify the code, set the new password,
    /// return a fresh session
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<LoginSession> {
        let mut user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or_else(|| ScribeError::InvalidReference("invalid or expired reset code".into()))?;

        let valid = matches!(
            (&user.reset_password_otp, user.reset_password_otp_expire),
            (Some(stored), Some(expiry))
                if *stored == hash_reset_code(code) && expiry > Utc::now()
        );
        if !valid {
            return Err(ScribeError::InvalidReference(
                "invalid or expired reset code".into(),
            ));
        }

        user.password_hash = hash_password(new_password)?;
        user.reset_password_otp = None;
        user.reset_password_otp_expire = None;
        user.is_first_login = false;

        let user_id = user.object_id()?;
        self.store.replace_user(&user_id, &user).await?;

        let (token, expires_at) = self
            .jwt
            .generate_token(&user_id.to_hex(), &user.email, user.role)?;
        info!(email = %user.email, "password reset");
        Ok(LoginSession {
            token,
            expires_at,
            user,
        })
    }

    async fn ensure_email_free(&self, email: &str) -> Result<()> {
        if self.store.user_by_email(email).await?.is_some() {
            return Err(ScribeError::Conflict(
                "user with this email already exists".into(),
            ));
        }
        Ok(())
    }

    /// Reload the stored document and send credentials; delivery failure
    /// never rolls the account back
    async fn finish_bootstrap(
        &self,
        user_id: ObjectId,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
        assigned_faculty: Option<UserDoc>,
    ) -> Result<CreatedAccount> {
        let user = self
            .store
            .user_by_id(&user_id)
            .await?
            .ok_or_else(|| ScribeError::Database("user vanished after insert".into()))?;

        let outcome = self
            .notifier
            .send_credentials(email, name, password, role)
            .await;
        if !outcome.success {
            warn!(
                email,
                role = %role,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "credential email failed; account was still created"
            );
        }

        info!(email, role = %role, email_sent = outcome.success, "account created");
        Ok(CreatedAccount {
            user,
            email_sent: outcome.success,
            email_error: outcome.error,
            assigned_faculty,
        })
    }
}

/// Split a display name into profile name parts (first / middle / last)
fn apply_name_parts(user: &mut UserDoc, name: &str) {
    let parts: Vec<&str> = name.split_whitespace().collect();
    user.profile.first_name = parts.first().map(|s| s.to_string());
    user.profile.last_name = (parts.len() > 1).then(|| parts[parts.len() - 1].to_string());
    user.profile.middle_name =
        (parts.len() > 2).then(|| parts[1..parts.len() - 1].join(" "));
}
