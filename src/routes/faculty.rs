//! Faculty routes: assigned students and reviews
//!
//! - `GET /api/faculty/students`     - students the actor is authorized over
//! - `GET /api/faculty/student/{id}` - one student's full portfolio
//! - `PUT /api/faculty/review`       - review an item or the profile

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;

use crate::db::schemas::Role;
use crate::portfolio::ReviewRequest;
use crate::routes::{
    authenticate, failure, json_response, not_found, parse_object_id, read_json, render_user,
    require_role, FullBody,
};
use crate::server::AppState;

const REVIEWER_ROLES: [Role; 3] = [Role::SuperAdmin, Role::LeadFaculty, Role::Faculty];

/// Dispatch /api/faculty/* requests
pub async fn handle_faculty_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/faculty").unwrap_or("").to_string();

    match (method, subpath.as_str()) {
        (Method::GET, "/students") => handle_assigned_students(req, state).await,
        (Method::GET, p) if p.starts_with("/student/") => {
            let id = p.trim_start_matches("/student/").to_string();
            handle_student_portfolio(req, state, &id).await
        }
        (Method::PUT, "/review") => handle_review(req, state).await,
        _ => not_found(),
    }
}

async fn handle_assigned_students(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let actor = match authenticate(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&actor, &REVIEWER_ROLES) {
        return resp;
    }

    match state.access.assigned_students(&actor).await {
        Ok(students) => {
            let rendered: Vec<Value> = students.iter().map(render_user).collect();
            json_response(StatusCode::OK, &rendered)
        }
        Err(e) => failure(&e),
    }
}

async fn handle_student_portfolio(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<FullBody> {
    let actor = match authenticate(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&actor, &REVIEWER_ROLES) {
        return resp;
    }
    let student_id = match parse_object_id(id) {
        Ok(oid) => oid,
        Err(resp) => return resp,
    };

    let student = match state.store.user_by_id(&student_id).await {
        Ok(Some(s)) => s,
        Ok(None) => return failure(&crate::types::ScribeError::NotFound("Student".into())),
        Err(e) => return failure(&e),
    };

    match state.access.authorize(&actor, &student).await {
        Ok(()) => json_response(StatusCode::OK, &render_user(&student)),
        Err(e) => failure(&e),
    }
}

async fn handle_review(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let actor = match authenticate(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&actor, &REVIEWER_ROLES) {
        return resp;
    }
    let request: ReviewRequest = match read_json(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match state.review.review(&actor, request).await {
        Ok(student) => json_response(
            StatusCode::OK,
            &serde_json::json!({
                "message": "Review updated successfully",
                "student": render_user(&student),
            }),
        ),
        Err(e) => failure(&e),
    }
}
