//! Profile routes: own profile and portfolio section CRUD
//!
//! - `GET    /api/profile`                    - own document
//! - `PUT    /api/profile`                    - update profile fields
//! - `POST   /api/profile/{section}`          - add a portfolio item
//! - `PUT    /api/profile/{section}/{itemId}` - edit an item
//! - `DELETE /api/profile/{section}/{itemId}` - delete an item
//!
//! `{section}` is a wire tag from the twelve-section enum; anything else is
//! rejected with 400 before touching the document.

use chrono::{DateTime, Utc};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::schemas::{Profile, UserDoc};
use crate::portfolio::section::Section;
use crate::portfolio::submissions;
use crate::routes::{
    authenticate, error_response, failure, json_response, not_found, parse_object_id, read_json,
    read_json_value, render_user, FullBody, SuccessResponse,
};
use crate::server::AppState;
use crate::types::ScribeError;

/// Profile content patch; the review state is reviewer-owned and not
/// reachable from here
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub sex: Option<String>,
    pub phone_number: Option<String>,
    pub field_of_study: Option<String>,
    pub level_of_education: Option<String>,
    pub year_of_study: Option<String>,
    pub institution: Option<String>,
    pub country: Option<String>,
    pub about: Option<String>,
    pub vision: Option<String>,
    pub profile_picture: Option<String>,
}

impl ProfilePatch {
    fn apply(self, profile: &mut Profile) {
        if let Some(v) = self.first_name {
            profile.first_name = Some(v);
        }
        if let Some(v) = self.middle_name {
            profile.middle_name = Some(v);
        }
        if let Some(v) = self.last_name {
            profile.last_name = Some(v);
        }
        if let Some(v) = self.date_of_birth {
            profile.date_of_birth = Some(v);
        }
        if let Some(v) = self.sex {
            profile.sex = Some(v);
        }
        if let Some(v) = self.phone_number {
            profile.phone_number = Some(v);
        }
        if let Some(v) = self.field_of_study {
            profile.field_of_study = Some(v);
        }
        if let Some(v) = self.level_of_education {
            profile.level_of_education = Some(v);
        }
        if let Some(v) = self.year_of_study {
            profile.year_of_study = Some(v);
        }
        if let Some(v) = self.institution {
            profile.institution = Some(v);
        }
        if let Some(v) = self.country {
            profile.country = Some(v);
        }
        if let Some(v) = self.about {
            profile.about = Some(v);
        }
        if let Some(v) = self.vision {
            profile.vision = Some(v);
        }
        if let Some(v) = self.profile_picture {
            profile.profile_picture = Some(v);
        }
    }
}

/// Dispatch /api/profile/* requests
pub async fn handle_profile_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/profile").unwrap_or("").to_string();
    let segments: Vec<&str> = subpath.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        (Method::GET, []) => handle_get_profile(req, state).await,
        (Method::PUT, []) => handle_update_profile(req, state).await,
        (Method::POST, [section]) => {
            let section = section.to_string();
            handle_add_item(req, state, &section).await
        }
        (Method::PUT, [section, item_id]) => {
            let (section, item_id) = (section.to_string(), item_id.to_string());
            handle_update_item(req, state, &section, &item_id).await
        }
        (Method::DELETE, [section, item_id]) => {
            let (section, item_id) = (section.to_string(), item_id.to_string());
            handle_delete_item(req, state, &section, &item_id).await
        }
        _ => not_found(),
    }
}

/// Resolve a wire tag to an item section, rejecting `profile` and unknowns
#[allow(clippy::result_large_err)]
fn item_section(tag: &str) -> Result<Section, Response<FullBody>> {
    match Section::from_wire(tag) {
        Some(Section::Profile) | None => Err(error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid section {tag}"),
            Some("INVALID_REFERENCE"),
        )),
        Some(section) => Ok(section),
    }
}

async fn persist(
    state: &AppState,
    user: &UserDoc,
) -> Result<(), Response<FullBody>> {
    let user_id = match user.object_id() {
        Ok(id) => id,
        Err(e) => return Err(failure(&e)),
    };
    match state.store.replace_user(&user_id, user).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(failure(&ScribeError::NotFound("User".into()))),
        Err(e) => Err(failure(&e)),
    }
}

async fn handle_get_profile(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    match authenticate(&req, &state).await {
        Ok(user) => json_response(StatusCode::OK, &render_user(&user)),
        Err(resp) => resp,
    }
}

async fn handle_update_profile(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let mut user = match authenticate(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let patch: ProfilePatch = match read_json(req).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    patch.apply(&mut user.profile);
    if let Err(resp) = persist(&state, &user).await {
        return resp;
    }

    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "message": "Profile updated successfully",
            "user": render_user(&user),
        }),
    )
}

async fn handle_add_item(
    req: Request<Incoming>,
    state: Arc<AppState>,
    section_tag: &str,
) -> Response<FullBody> {
    let mut user = match authenticate(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let section = match item_section(section_tag) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let body = match read_json_value(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let mut item = match submissions::add_item(&mut user, section, body) {
        Ok(item) => item,
        Err(e) => return failure(&e),
    };
    if let Err(resp) = persist(&state, &user).await {
        return resp;
    }

    crate::routes::normalize_ids(&mut item);
    json_response(
        StatusCode::CREATED,
        &serde_json::json!({
            "message": "Item added successfully",
            "item": item,
        }),
    )
}

async fn handle_update_item(
    req: Request<Incoming>,
    state: Arc<AppState>,
    section_tag: &str,
    item_id: &str,
) -> Response<FullBody> {
    let mut user = match authenticate(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let section = match item_section(section_tag) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let item_id = match parse_object_id(item_id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };
    let body = match read_json_value(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let mut item = match submissions::update_item(&mut user, section, &item_id, body) {
        Ok(item) => item,
        Err(e) => return failure(&e),
    };
    if let Err(resp) = persist(&state, &user).await {
        return resp;
    }

    crate::routes::normalize_ids(&mut item);
    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "message": "Item updated successfully",
            "item": item,
        }),
    )
}

async fn handle_delete_item(
    req: Request<Incoming>,
    state: Arc<AppState>,
    section_tag: &str,
    item_id: &str,
) -> Response<FullBody> {
    let mut user = match authenticate(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let section = match item_section(section_tag) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let item_id = match parse_object_id(item_id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };

    if let Err(e) = submissions::delete_item(&mut user, section, &item_id) {
        return failure(&e);
    }
    if let Err(resp) = persist(&state, &user).await {
        return resp;
    }

    json_response(
        StatusCode::OK,
        &SuccessResponse {
            success: true,
            message: "Item deleted successfully".into(),
        },
    )
}
