//! Configuration for the Scribe backend
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::types::{Result, ScribeError};

/// Scribe - portfolio management backend
#[derive(Parser, Debug, Clone)]
#[command(name = "scribe")]
#[command(about = "Role-hierarchical portfolio management backend")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "scribe")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (default 30 days)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "2592000")]
    pub jwt_expiry_seconds: u64,

    /// SMTP relay host for credential emails (unset = log-only notifier)
    #[arg(long, env = "SMTP_HOST")]
    pub smtp_host: Option<String>,

    /// SMTP username / sender address
    #[arg(long, env = "SMTP_USER")]
    pub smtp_user: Option<String>,

    /// SMTP password
    #[arg(long, env = "SMTP_PASS")]
    pub smtp_pass: Option<String>,

    /// Interval for the points reconciliation job in seconds (0 = disabled)
    #[arg(long, env = "RECONCILE_INTERVAL_SECONDS", default_value = "3600")]
    pub reconcile_interval_seconds: u64,

    /// Seed a Super Admin with this email at startup if none exists
    #[arg(long, env = "SEED_ADMIN_EMAIL")]
    pub seed_admin_email: Option<String>,

    /// Password for the seeded Super Admin
    #[arg(long, env = "SEED_ADMIN_PASSWORD")]
    pub seed_admin_password: Option<String>,

    /// Enable development mode (in-memory store allowed, relaxed JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false", action = clap::ArgAction::Set)]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration before startup
    pub fn validate(&self) -> Result<()> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err(ScribeError::Config(
                "JWT_SECRET is required outside dev mode".to_string(),
            ));
        }
        if let Some(secret) = &self.jwt_secret {
            if secret.len() < 16 {
                return Err(ScribeError::Config(
                    "JWT_SECRET must be at least 16 characters".to_string(),
                ));
            }
        }
        if self.smtp_host.is_some() && (self.smtp_user.is_none() || self.smtp_pass.is_none()) {
            return Err(ScribeError::Config(
                "SMTP_HOST requires SMTP_USER and SMTP_PASS".to_string(),
            ));
        }
        if self.seed_admin_email.is_some() != self.seed_admin_password.is_some() {
            return Err(ScribeError::Config(
                "SEED_ADMIN_EMAIL and SEED_ADMIN_PASSWORD must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_mode_needs_no_secret() {
        let args = Args::parse_from(["scribe", "--dev-mode", "true"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let args = Args::parse_from(["scribe"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let args = Args::parse_from(["scribe", "--jwt-secret", "short"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_smtp_requires_credentials() {
        let args = Args::parse_from([
            "scribe",
            "--dev-mode",
            "true",
            "--smtp-host",
            "smtp.example.org",
        ]);
        assert!(args.validate().is_err());
    }
}
