//! Health check endpoint

use hyper::StatusCode;
use serde::Serialize;

use crate::routes::{json_response, FullBody};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    commit: &'static str,
    built_at: &'static str,
}

/// GET /health - liveness probe with build info
pub fn health_check() -> hyper::Response<FullBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("GIT_COMMIT"),
            built_at: env!("BUILD_TIMESTAMP"),
        },
    )
}
