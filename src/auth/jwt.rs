//! JWT token generation and validation
//!
//! HS256 bearer tokens carrying the user id, email and role. The user
//! document is still loaded on every protected request, so role changes
//! (promotion, demotion by succession) take effect without token churn.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::schemas::Role;
use crate::types::ScribeError;

/// Secret used when running in dev mode without JWT_SECRET
const DEV_SECRET: &str = "scribe-dev-secret-do-not-use-in-production";

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User document id (hex)
    pub sub: String,
    /// Login identifier at issue time
    pub email: String,
    /// Role at issue time (informational; the live document wins)
    pub role: Role,
    /// Issued-at (seconds since epoch)
    pub iat: u64,
    /// Expiry (seconds since epoch)
    pub exp: u64,
}

/// Result of token verification
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

/// Issues and validates bearer tokens
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a validator with the configured secret
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, ScribeError> {
        if secret.is_empty() {
            return Err(ScribeError::Config("JWT secret must not be empty".into()));
        }
        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Dev-mode validator with a fixed secret
    pub fn new_dev() -> Self {
        Self {
            secret: DEV_SECRET.to_string(),
            expiry_seconds: 86400,
        }
    }

    /// Issue a token for a user; returns the token and its expiry timestamp
    pub fn generate_token(
        &self,
        user_id: &str,
        email: &str,
        role: Role,
    ) -> Result<(String, u64), ScribeError> {
        let now = unix_now();
        let exp = now + self.expiry_seconds;
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            iat: now,
            exp,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ScribeError::Auth(format!("Failed to sign token: {e}")))?;

        Ok((token, exp))
    }

    /// Verify a token and return its claims
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => TokenValidationResult {
                valid: true,
                claims: Some(data.claims),
                error: None,
            },
            Err(e) => TokenValidationResult {
                valid: false,
                claims: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Extract the bearer token from an Authorization header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let jwt = JwtValidator::new_dev();
        let (token, exp) = jwt
            .generate_token("64f0c0ffee", "lead@example.org", Role::LeadFaculty)
            .unwrap();
        assert!(exp > unix_now());

        let result = jwt.verify_token(&token);
        assert!(result.valid);
        let claims = result.claims.unwrap();
        assert_eq!(claims.sub, "64f0c0ffee");
        assert_eq!(claims.role, Role::LeadFaculty);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtValidator::new("a-sufficiently-long-secret".into(), 3600).unwrap();
        let verifier = JwtValidator::new("a-different-long-secret!".into(), 3600).unwrap();

        let (token, _) = issuer
            .generate_token("abc", "s@example.org", Role::Student)
            .unwrap();
        let result = verifier.verify_token(&token);
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let jwt = JwtValidator::new_dev();
        assert!(!jwt.verify_token("not-a-token").valid);
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("Basic abc")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
