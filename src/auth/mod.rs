//! Authentication for the Scribe backend
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - Temporary passwords and hashed password-reset codes

pub mod jwt;
pub mod password;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use password::{
    generate_reset_code, generate_temp_password, hash_password, hash_reset_code, verify_password,
};
