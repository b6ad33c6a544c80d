//! 관리자 endpoint (admin, superadmin).
//!
//! - `GET /api/admin/dashboard`
//! - `GET /api/admin/settings`
//! - `GET /api/admin/status`

use axum::{extract::State, middleware, routing::get, Extension, Json, Router};
use market_auth::{require_access, AccessGuard, AccessPolicy, AuthUser};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// 역할 게이트를 통과한 사용자에게 보내는 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct AreaResponse {
    pub message: String,
    pub user: AuthUser,
}

pub async fn dashboard(Extension(user): Extension<AuthUser>) -> Json<AreaResponse> {
    Json(AreaResponse {
        message: "welcome to the admin dashboard".to_string(),
        user,
    })
}

pub async fn settings(Extension(user): Extension<AuthUser>) -> Json<AreaResponse> {
    Json(AreaResponse {
        message: "admin settings".to_string(),
        user,
    })
}

/// 서비스 상태 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
    pub database: String,
    pub rate_limiter: bool,
}

/// GET /api/admin/status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let database = match &state.db_pool {
        None => "in-memory",
        Some(_) if state.is_db_healthy().await => "up",
        Some(_) => "down",
    };

    Json(StatusResponse {
        status: "OK".to_string(),
        version: state.version.to_string(),
        uptime_secs: state.uptime_secs(),
        database: database.to_string(),
        rate_limiter: state.login_limiter.is_some(),
    })
}

/// 관리자 라우터 생성.
pub fn admin_router(state: &AppState) -> Router<AppState> {
    let guard = AccessGuard::new(state.verifier.clone(), AccessPolicy::staff());

    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/settings", get(settings))
        .route("/status", get(status))
        .route_layer(middleware::from_fn_with_state(guard, require_access))
}
