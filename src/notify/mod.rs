//! Credential and reset-code notifications
//!
//! Account mutations never block on email: a failed send is logged and
//! surfaced as `success: false`, and the caller decides whether that is
//! fatal (password reset) or merely reported (account bootstrap).

pub mod smtp;

pub use smtp::SmtpNotifier;

use async_trait::async_trait;
use tracing::info;

use crate::db::schemas::Role;

/// Outcome of one delivery attempt
#[derive(Debug, Clone)]
pub struct NotifyOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl NotifyOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Delivery channel for account credentials and reset codes
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Mail the temporary password of a freshly created account
    async fn send_credentials(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> NotifyOutcome;

    /// Mail a password-reset code
    async fn send_password_reset_code(&self, email: &str, name: &str, code: &str)
        -> NotifyOutcome;
}

/// Fallback notifier: writes the would-be email to the log.
///
/// Used when SMTP is not configured, so operators can still hand out the
/// generated credentials during local runs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_credentials(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> NotifyOutcome {
        info!(
            to = email,
            name,
            role = %role,
            password,
            "SMTP not configured; credentials logged instead of mailed"
        );
        NotifyOutcome::failed("SMTP is not configured")
    }

    async fn send_password_reset_code(
        &self,
        email: &str,
        name: &str,
        code: &str,
    ) -> NotifyOutcome {
        info!(
            to = email,
            name,
            code,
            "SMTP not configured; reset code logged instead of mailed"
        );
        NotifyOutcome::failed("SMTP is not configured")
    }
}
