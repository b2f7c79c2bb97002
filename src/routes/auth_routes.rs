//! Authentication routes
//!
//! - `POST /api/auth/login`           - authenticate, get a bearer token
//! - `PUT  /api/auth/change-password` - change own password
//! - `POST /api/auth/forgot-password` - mail a reset code
//! - `POST /api/auth/reset-password`  - redeem a reset code
//! - `GET  /api/auth/me`              - current user from the token

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::routes::{
    authenticate, failure, json_response, not_found, read_json, render_user, FullBody,
    SuccessResponse,
};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: u64,
    pub user: Value,
}

/// Dispatch /api/auth/* requests
pub async fn handle_auth_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/auth").unwrap_or("");

    match (method, subpath) {
        (Method::POST, "/login") => handle_login(req, state).await,
        (Method::PUT, "/change-password") => handle_change_password(req, state).await,
        (Method::POST, "/forgot-password") => handle_forgot_password(req, state).await,
        (Method::POST, "/reset-password") => handle_reset_password(req, state).await,
        (Method::GET, "/me") => handle_me(req, state).await,
        _ => not_found(),
    }
}

async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let request: LoginRequest = match read_json(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match state.accounts.login(&request.email, &request.password).await {
        Ok(session) => json_response(
            StatusCode::OK,
            &SessionResponse {
                token: session.token,
                expires_at: session.expires_at,
                user: render_user(&session.user),
            },
        ),
        Err(e) => failure(&e),
    }
}

async fn handle_change_password(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let actor = match authenticate(&req, &state).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let request: ChangePasswordRequest = match read_json(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match state
        .accounts
        .change_password(&actor, &request.current_password, &request.new_password)
        .await
    {
        Ok(()) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: "Password updated successfully".into(),
            },
        ),
        Err(e) => failure(&e),
    }
}

async fn handle_forgot_password(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let request: ForgotPasswordRequest = match read_json(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match state.accounts.forgot_password(&request.email).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: "Reset code sent to email".into(),
            },
        ),
        Err(e) => failure(&e),
    }
}

async fn handle_reset_password(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let request: ResetPasswordRequest = match read_json(req).await {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match state
        .accounts
        .reset_password(&request.email, &request.code, &request.password)
        .await
    {
        Ok(session) => json_response(
            StatusCode::OK,
            &SessionResponse {
                token: session.token,
                expires_at: session.expires_at,
                user: render_user(&session.user),
            },
        ),
        Err(e) => failure(&e),
    }
}

async fn handle_me(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    match authenticate(&req, &state).await {
        Ok(user) => json_response(StatusCode::OK, &render_user(&user)),
        Err(resp) => resp,
    }
}
