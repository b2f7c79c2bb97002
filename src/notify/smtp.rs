//! SMTP notifier
//!
//! Sends credential and reset-code emails through an SMTP relay over TLS.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::db::schemas::Role;
use crate::notify::{Notifier, NotifyOutcome};
use crate::types::{Result, ScribeError};

/// SMTP-backed notifier
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl SmtpNotifier {
    /// Build a TLS transport against the given relay
    pub fn new(host: &str, user: &str, pass: &str) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| ScribeError::Config(format!("invalid SMTP relay {host}: {e}")))?
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .build();

        Ok(Self {
            transport,
            sender: user.to_string(),
        })
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> NotifyOutcome {
        let message = Message::builder()
            .from(match self.sender.parse() {
                Ok(m) => m,
                Err(e) => return NotifyOutcome::failed(format!("invalid sender address: {e}")),
            })
            .to(match to.parse() {
                Ok(m) => m,
                Err(e) => return NotifyOutcome::failed(format!("invalid recipient address: {e}")),
            })
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html);

        let message = match message {
            Ok(m) => m,
            Err(e) => return NotifyOutcome::failed(format!("failed to build email: {e}")),
        };

        match self.transport.send(message).await {
            Ok(_) => {
                info!(to, subject, "email sent");
                NotifyOutcome::ok()
            }
            Err(e) => {
                warn!(to, subject, error = %e, "email delivery failed");
                NotifyOutcome::failed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_credentials(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> NotifyOutcome {
        let html = format!(
            "<p>Hello <strong>{name}</strong>,</p>\
             <p>You have been registered as a <strong>{role}</strong>.</p>\
             <p>Your temporary login credentials:</p>\
             <p>Email: <strong>{email}</strong><br>Password: <strong>{password}</strong></p>\
             <p>Please log in and change your password immediately.</p>"
        );
        self.send(email, "Welcome - Your Account Credentials", html)
            .await
    }

    async fn send_password_reset_code(
        &self,
        email: &str,
        name: &str,
        code: &str,
    ) -> NotifyOutcome {
        let html = format!(
            "<p>Hello <strong>{name}</strong>,</p>\
             <p>Your password reset code is <strong>{code}</strong>.</p>\
             <p>It expires in 10 minutes. If you did not request a reset,\
             you can ignore this email.</p>"
        );
        self.send(email, "Your Password Reset Code", html).await
    }
}
