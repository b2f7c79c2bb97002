//! HTTP routes for the Scribe backend

pub mod admin;
pub mod auth_routes;
pub mod faculty;
pub mod health;
pub mod profile;

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::auth::extract_token_from_header;
use crate::db::schemas::{CollegeDoc, Role, UserDoc};
use crate::server::AppState;
use crate::types::ScribeError;

pub type FullBody = Full<Bytes>;

/// Error payload shared by every route
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Simple success payload
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub fn error_response(status: StatusCode, error: &str, code: Option<&str>) -> Response<FullBody> {
    json_response(
        status,
        &ErrorResponse {
            error: error.to_string(),
            code: code.map(|c| c.to_string()),
        },
    )
}

/// Render a domain error with its stable kind and status
pub fn failure(err: &ScribeError) -> Response<FullBody> {
    if matches!(err, ScribeError::Database(_) | ScribeError::Config(_)) {
        warn!("request failed: {}", err);
    }
    error_response(err.status_code(), &err.to_string(), Some(err.code()))
}

pub fn not_found() -> Response<FullBody> {
    error_response(StatusCode::NOT_FOUND, "Not found", None)
}

/// Parse a path segment as an ObjectId
#[allow(clippy::result_large_err)]
pub fn parse_object_id(raw: &str) -> Result<ObjectId, Response<FullBody>> {
    ObjectId::parse_str(raw).map_err(|_| {
        error_response(StatusCode::BAD_REQUEST, "Invalid id", Some("INVALID_ID"))
    })
}

/// Collect and deserialize a JSON request body
pub async fn read_json<T: DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, Response<FullBody>> {
    let bytes = match req.into_body().collect().await {
        Ok(b) => b.to_bytes(),
        Err(_) => return Err(error_response(StatusCode::BAD_REQUEST, "Invalid body", None)),
    };
    serde_json::from_slice(&bytes).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid JSON: {e}"),
            None,
        )
    })
}

/// Collect a JSON request body without a fixed shape
pub async fn read_json_value(req: Request<Incoming>) -> Result<Value, Response<FullBody>> {
    read_json::<Value>(req).await
}

/// Validate the bearer token and load the live user document.
///
/// The document, not the claims, carries authority: a user demoted by
/// succession loses their old role immediately.
pub async fn authenticate(
    req: &Request<Incoming>,
    state: &AppState,
) -> Result<UserDoc, Response<FullBody>> {
    let auth_header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = extract_token_from_header(auth_header).ok_or_else(|| {
        error_response(
            StatusCode::UNAUTHORIZED,
            "Not authorized, no token",
            Some("NO_TOKEN"),
        )
    })?;

    let result = state.jwt.verify_token(token);
    if !result.valid {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            result.error.as_deref().unwrap_or("Not authorized, token failed"),
            Some("INVALID_TOKEN"),
        ));
    }
    let claims = result.claims.expect("valid token carries claims");

    let user_id = ObjectId::parse_str(&claims.sub).map_err(|_| {
        error_response(
            StatusCode::UNAUTHORIZED,
            "Not authorized, token failed",
            Some("INVALID_TOKEN"),
        )
    })?;

    match state.store.user_by_id(&user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "User no longer exists",
            Some("USER_GONE"),
        )),
        Err(e) => Err(failure(&e)),
    }
}

/// Reject actors whose role is not in the allow list
#[allow(clippy::result_large_err)]
pub fn require_role(user: &UserDoc, allowed: &[Role]) -> Result<(), Response<FullBody>> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(error_response(
            StatusCode::FORBIDDEN,
            &format!("User role {} is not authorized for this route", user.role),
            Some("FORBIDDEN"),
        ))
    }
}

/// Serialize a user for the wire: no credential material, plain hex ids
pub fn render_user(user: &UserDoc) -> Value {
    let mut value = serde_json::to_value(user).unwrap_or(Value::Null);
    if let Some(map) = value.as_object_mut() {
        map.remove("passwordHash");
        map.remove("resetPasswordOtp");
        map.remove("resetPasswordOtpExpire");
        map.remove("metadata");
    }
    normalize_ids(&mut value);
    value
}

/// Serialize a college for the wire
pub fn render_college(college: &CollegeDoc) -> Value {
    let mut value = serde_json::to_value(college).unwrap_or(Value::Null);
    if let Some(map) = value.as_object_mut() {
        map.remove("metadata");
    }
    normalize_ids(&mut value);
    value
}

/// Flatten extended-JSON ObjectIds (`{"$oid": "..."}`) into plain hex
/// strings, recursively
pub fn normalize_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(hex)) = map.get("$oid") {
                    *value = Value::String(hex.clone());
                    return;
                }
            }
            for v in map.values_mut() {
                normalize_ids(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                normalize_ids(v);
            }
        }
        _ => {}
    }
}
