//! Admin API endpoints for college and user management
//!
//! ## Endpoints
//!
//! - `POST   /api/admin/college`             - create a college
//! - `GET    /api/admin/colleges`            - list colleges
//! - `DELETE /api/admin/college/{id}`        - delete a college
//! - `PUT    /api/admin/college/{id}/lead`   - transfer leadership
//! - `POST   /api/admin/lead-faculty`        - bootstrap a Lead Faculty
//! - `POST   /api/admin/faculty`             - bootstrap a Faculty
//! - `POST   /api/admin/student`             - bootstrap a Student
//! - `GET    /api/admin/users`               - list users (role/edge filters)
//! - `GET    /api/admin/faculties/{leadId}`  - faculties under a lead
//! - `GET    /api/admin/students/{facId}`    - students under a faculty
//! - `DELETE /api/admin/user/{id}`           - delete a user (succession)
//! - `PUT    /api/admin/user/{id}/lead`      - move a faculty to a new lead
//! - `POST   /api/admin/recalculate-points`  - run the reconciliation job
//!
//! ## Authentication
//!
//! Super Admin only, except the two listing endpoints which also admit
//! Lead Faculty (they power the hierarchy browser).

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::db::schemas::{Role, UserDoc};
use crate::portfolio::scoring;
use crate::routes::{
    authenticate, error_response, failure, json_response, not_found, parse_object_id, read_json,
    render_college, render_user, require_role, FullBody, SuccessResponse,
};
use crate::server::AppState;
use crate::store::UserFilter;

#[derive(Debug, Deserialize)]
pub struct CreateCollegeRequest {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadFacultyRequest {
    pub name: String,
    pub email: String,
    pub college_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFacultyRequest {
    pub name: String,
    pub email: String,
    pub lead_faculty_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    pub name: String,
    pub email: String,
    pub college_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLeadRequest {
    pub lead_faculty_id: String,
}

/// Account-creation response; the temporary password travels only through
/// the notification channel, never through this body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAccountResponse {
    pub message: String,
    pub user: Value,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_faculty: Option<Value>,
}

/// Dispatch /api/admin/* requests
pub async fn handle_admin_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/admin").unwrap_or("").to_string();

    match (method, subpath.as_str()) {
        (Method::POST, "/college") => handle_create_college(req, state).await,
        (Method::GET, "/colleges") => handle_list_colleges(req, state).await,
        (Method::DELETE, p) if p.starts_with("/college/") => {
            let id = p.trim_start_matches("/college/").to_string();
            handle_delete_college(req, state, &id).await
        }
        (Method::PUT, p) if p.starts_with("/college/") && p.ends_with("/lead") => {
            let id = p
                .strip_prefix("/college/")
                .and_then(|s| s.strip_suffix("/lead"))
                .unwrap_or("")
                .to_string();
            handle_transfer_leadership(req, state, &id).await
        }
        (Method::POST, "/lead-faculty") => handle_create_lead_faculty(req, state).await,
        (Method::POST, "/faculty") => handle_create_faculty(req, state).await,
        (Method::POST, "/student") => handle_create_student(req, state).await,
        (Method::GET, "/users") => handle_list_users(req, state).await,
        (Method::GET, p) if p.starts_with("/faculties/") => {
            let id = p.trim_start_matches("/faculties/").to_string();
            handle_faculties_by_lead(req, state, &id).await
        }
        (Method::GET, p) if p.starts_with("/students/") => {
            let id = p.trim_start_matches("/students/").to_string();
            handle_students_by_faculty(req, state, &id).await
        }
        (Method::DELETE, p) if p.starts_with("/user/") => {
            let id = p.trim_start_matches("/user/").to_string();
            handle_delete_user(req, state, &id).await
        }
        (Method::PUT, p) if p.starts_with("/user/") && p.ends_with("/lead") => {
            let id = p
                .strip_prefix("/user/")
                .and_then(|s| s.strip_suffix("/lead"))
                .unwrap_or("")
                .to_string();
            handle_reassign_faculty_lead(req, state, &id).await
        }
        (Method::POST, "/recalculate-points") => handle_recalculate_points(req, state).await,
        _ => not_found(),
    }
}

async fn require_super_admin(
    req: &Request<Incoming>,
    state: &AppState,
) -> Result<UserDoc, Response<FullBody>> {
    let user = authenticate(req, state).await?;
    require_role(&user, &[Role::SuperAdmin])?;
    Ok(user)
}

fn created_response(
    message: String,
    account: &crate::accounts::CreatedAccount,
) -> Response<FullBody> {
    json_response(
        StatusCode::CREATED,
        &CreatedAccountResponse {
            message,
            user: render_user(&account.user),
            email_sent: account.email_sent,
            assigned_faculty: account.assigned_faculty.as_ref().map(render_user),
        },
    )
}

async fn handle_create_college(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    if let Err(resp) = require_super_admin(&req, &state).await {
        return resp;
    }
    let request: CreateCollegeRequest = match read_json(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match state
        .accounts
        .create_college(request.name, request.location)
        .await
    {
        Ok(college) => json_response(StatusCode::CREATED, &render_college(&college)),
        Err(e) => failure(&e),
    }
}

async fn handle_list_colleges(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    if let Err(resp) = require_super_admin(&req, &state).await {
        return resp;
    }

    match state.store.find_colleges().await {
        Ok(mut colleges) => {
            colleges.sort_by(|a, b| a.name.cmp(&b.name));
            let rendered: Vec<Value> = colleges.iter().map(render_college).collect();
            json_response(StatusCode::OK, &rendered)
        }
        Err(e) => failure(&e),
    }
}

async fn handle_delete_college(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<FullBody> {
    if let Err(resp) = require_super_admin(&req, &state).await {
        return resp;
    }
    let college_id = match parse_object_id(id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };

    match state.succession.delete_college(&college_id).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: "College deleted and user references cleared".into(),
            },
        ),
        Err(e) => failure(&e),
    }
}

async fn handle_transfer_leadership(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<FullBody> {
    if let Err(resp) = require_super_admin(&req, &state).await {
        return resp;
    }
    let college_id = match parse_object_id(id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };
    let request: SetLeadRequest = match read_json(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let new_lead_id = match parse_object_id(&request.lead_faculty_id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };

    match state
        .succession
        .transfer_leadership(&college_id, &new_lead_id)
        .await
    {
        Ok(college) => json_response(
            StatusCode::OK,
            &serde_json::json!({
                "message": "Leadership transferred; previous leads demoted to Faculty",
                "college": render_college(&college),
            }),
        ),
        Err(e) => failure(&e),
    }
}

async fn handle_create_lead_faculty(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let actor = match require_super_admin(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let request: CreateLeadFacultyRequest = match read_json(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let college_id = match parse_object_id(&request.college_id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };

    match state
        .accounts
        .create_lead_faculty(&actor, request.name, request.email, &college_id)
        .await
    {
        Ok(account) => {
            let message = if account.email_sent {
                "Lead Faculty added and email sent successfully".to_string()
            } else {
                format!(
                    "Lead Faculty added but email failed: {}",
                    account.email_error.as_deref().unwrap_or("unknown error")
                )
            };
            created_response(message, &account)
        }
        Err(e) => failure(&e),
    }
}

async fn handle_create_faculty(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let actor = match require_super_admin(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let request: CreateFacultyRequest = match read_json(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let lead_id = match parse_object_id(&request.lead_faculty_id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };

    match state
        .accounts
        .create_faculty(&actor, request.name, request.email, &lead_id)
        .await
    {
        Ok(account) => {
            let message = if account.email_sent {
                "Faculty added and email sent successfully".to_string()
            } else {
                format!(
                    "Faculty added but email failed: {}",
                    account.email_error.as_deref().unwrap_or("unknown error")
                )
            };
            created_response(message, &account)
        }
        Err(e) => failure(&e),
    }
}

async fn handle_create_student(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let actor = match require_super_admin(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let request: CreateStudentRequest = match read_json(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let college_id = match parse_object_id(&request.college_id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };

    match state
        .accounts
        .create_student(&actor, request.name, request.email, &college_id)
        .await
    {
        Ok(account) => {
            let faculty_name = account
                .assigned_faculty
                .as_ref()
                .map(|f| f.name.clone())
                .unwrap_or_default();
            let message = if account.email_sent {
                format!("Student added and assigned to {faculty_name}. Email sent successfully.")
            } else {
                format!(
                    "Student added and assigned to {faculty_name}, but email failed: {}",
                    account.email_error.as_deref().unwrap_or("unknown error")
                )
            };
            created_response(message, &account)
        }
        Err(e) => failure(&e),
    }
}

/// Parse ?role=&leadFacultyId=&facultyId= into a user filter
#[allow(clippy::result_large_err)]
fn parse_users_query(query: Option<&str>) -> Result<UserFilter, Response<FullBody>> {
    let mut filter = UserFilter::default();
    let Some(query) = query else {
        return Ok(filter);
    };

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value).unwrap_or_default().into_owned();
        match key {
            "role" => {
                let role: Role =
                    serde_json::from_value(Value::String(value.clone())).map_err(|_| {
                        error_response(
                            StatusCode::BAD_REQUEST,
                            &format!("Unknown role {value}"),
                            Some("INVALID_ROLE"),
                        )
                    })?;
                filter.role = Some(role);
            }
            "leadFacultyId" => filter.lead_faculty = Some(parse_object_id(&value)?),
            "facultyId" => filter.faculty = Some(parse_object_id(&value)?),
            _ => {}
        }
    }
    Ok(filter)
}

async fn handle_list_users(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    if let Err(resp) = require_super_admin(&req, &state).await {
        return resp;
    }
    let filter = match parse_users_query(req.uri().query()) {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match state.store.find_users(filter).await {
        Ok(users) => {
            let rendered: Vec<Value> = users.iter().map(render_user).collect();
            json_response(StatusCode::OK, &rendered)
        }
        Err(e) => failure(&e),
    }
}

async fn handle_faculties_by_lead(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<FullBody> {
    let actor = match authenticate(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&actor, &[Role::SuperAdmin, Role::LeadFaculty]) {
        return resp;
    }
    let lead_id = match parse_object_id(id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };

    match state.graph.subordinate_faculties(&lead_id).await {
        Ok(faculties) => {
            let rendered: Vec<Value> = faculties.iter().map(render_user).collect();
            json_response(StatusCode::OK, &rendered)
        }
        Err(e) => failure(&e),
    }
}

async fn handle_students_by_faculty(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<FullBody> {
    let actor = match authenticate(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&actor, &[Role::SuperAdmin, Role::LeadFaculty]) {
        return resp;
    }
    let faculty_id = match parse_object_id(id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };

    match state.graph.subordinate_students(&faculty_id).await {
        Ok(students) => {
            let rendered: Vec<Value> = students.iter().map(render_user).collect();
            json_response(StatusCode::OK, &rendered)
        }
        Err(e) => failure(&e),
    }
}

async fn handle_delete_user(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<FullBody> {
    if let Err(resp) = require_super_admin(&req, &state).await {
        return resp;
    }
    let user_id = match parse_object_id(id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };

    match state.succession.delete_user(&user_id).await {
        Ok(role) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: format!("{role} deleted and references cleared"),
            },
        ),
        Err(e) => failure(&e),
    }
}

async fn handle_reassign_faculty_lead(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<FullBody> {
    if let Err(resp) = require_super_admin(&req, &state).await {
        return resp;
    }
    let faculty_id = match parse_object_id(id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };
    let request: SetLeadRequest = match read_json(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let lead_id = match parse_object_id(&request.lead_faculty_id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };

    match state
        .succession
        .reassign_faculty_lead(&faculty_id, &lead_id)
        .await
    {
        Ok(()) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: "Lead Faculty reassigned for faculty and their students".into(),
            },
        ),
        Err(e) => failure(&e),
    }
}

async fn handle_recalculate_points(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    if let Err(resp) = require_super_admin(&req, &state).await {
        return resp;
    }

    match scoring::reconcile(state.store.as_ref()).await {
        Ok(repaired) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: format!("Point recalculation complete; {repaired} counter(s) repaired"),
            },
        ),
        Err(e) => failure(&e),
    }
}
