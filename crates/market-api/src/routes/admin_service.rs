//! admin-service endpoint (admin, superadmin).
//!
//! 계정/상점 관리 요청을 피어 서비스로 전달하고 피어의 JSON 응답을 그대로 돌려줍니다.
//!
//! - `GET /api/admins/dashboard`
//! - `GET /api/admins/metrics` - 가동 시간과 피어 작업 누적 횟수
//! - `PATCH /api/admins/user/{id}/block`, `PATCH /api/admins/user/{id}/approve`
//! - `POST /api/admins/user/{id}/reset-password`
//! - `DELETE /api/admins/user/{id}`
//! - `PATCH /api/admins/shop/{id}/approve`, `PATCH /api/admins/shop/{id}/block`

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::HeaderMap,
    middleware,
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use market_auth::{bearer_token, require_access, AccessGuard, AccessPolicy, AuthUser};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::admin::AreaResponse;
use crate::error::ApiResult;
use crate::services::PeerError;
use crate::state::AdminState;

/// 피어 작업 결과 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct PeerActionResponse {
    pub operation: String,
    pub target_id: i64,
    /// 피어 서비스 응답 본문
    pub result: Value,
}

/// 관리 대상 작업.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdminAction {
    BlockUser,
    ApproveUser,
    ResetPassword,
    DeleteUser,
    ApproveShop,
    BlockShop,
}

impl AdminAction {
    fn name(self) -> &'static str {
        match self {
            AdminAction::BlockUser => "block_user",
            AdminAction::ApproveUser => "approve_user",
            AdminAction::ResetPassword => "reset_password",
            AdminAction::DeleteUser => "delete_user",
            AdminAction::ApproveShop => "approve_shop",
            AdminAction::BlockShop => "block_shop",
        }
    }

    async fn execute(self, state: &AdminState, id: i64, bearer: &str) -> Result<Value, PeerError> {
        let peers = &state.peers;
        match self {
            AdminAction::BlockUser => peers.block_user(id, bearer).await,
            AdminAction::ApproveUser => peers.approve_user(id, bearer).await,
            AdminAction::ResetPassword => peers.reset_password(id, bearer).await,
            AdminAction::DeleteUser => peers.delete_user(id, bearer).await,
            AdminAction::ApproveShop => peers.approve_shop(id, bearer).await,
            AdminAction::BlockShop => peers.block_shop(id, bearer).await,
        }
    }
}

async fn forward(
    action: AdminAction,
    state: &AdminState,
    actor: &AuthUser,
    headers: &HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PeerActionResponse>> {
    let Path(id) = path?;
    let bearer = bearer_token(headers)?;

    let outcome = action.execute(state, id, bearer).await;
    state.stats.record(outcome.is_ok());
    let result = outcome?;
    tracing::info!(
        actor_id = actor.id,
        operation = action.name(),
        target_id = id,
        "Admin action forwarded"
    );

    Ok(Json(PeerActionResponse {
        operation: action.name().to_string(),
        target_id: id,
        result,
    }))
}

/// GET /api/admins/dashboard
pub async fn dashboard(Extension(user): Extension<AuthUser>) -> Json<AreaResponse> {
    Json(AreaResponse {
        message: "welcome to the admin service".to_string(),
        user,
    })
}

/// admin-service 지표 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceMetricsResponse {
    pub version: String,
    pub uptime_secs: i64,
    pub forwarded_actions: u64,
    pub failed_actions: u64,
    pub peer_max_retries: u8,
}

/// GET /api/admins/metrics
pub async fn service_metrics(State(state): State<AdminState>) -> Json<ServiceMetricsResponse> {
    Json(ServiceMetricsResponse {
        version: state.version.to_string(),
        uptime_secs: state.uptime_secs(),
        forwarded_actions: state.stats.forwarded(),
        failed_actions: state.stats.failed(),
        peer_max_retries: state.peers.max_retries(),
    })
}

/// PATCH /api/admins/user/{id}/block
pub async fn block_user(
    State(state): State<AdminState>,
    Extension(actor): Extension<AuthUser>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PeerActionResponse>> {
    forward(AdminAction::BlockUser, &state, &actor, &headers, path).await
}

/// PATCH /api/admins/user/{id}/approve
pub async fn approve_user(
    State(state): State<AdminState>,
    Extension(actor): Extension<AuthUser>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PeerActionResponse>> {
    forward(AdminAction::ApproveUser, &state, &actor, &headers, path).await
}

/// POST /api/admins/user/{id}/reset-password
pub async fn reset_password(
    State(state): State<AdminState>,
    Extension(actor): Extension<AuthUser>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PeerActionResponse>> {
    forward(AdminAction::ResetPassword, &state, &actor, &headers, path).await
}

/// DELETE /api/admins/user/{id}
pub async fn delete_user(
    State(state): State<AdminState>,
    Extension(actor): Extension<AuthUser>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PeerActionResponse>> {
    forward(AdminAction::DeleteUser, &state, &actor, &headers, path).await
}

/// PATCH /api/admins/shop/{id}/approve
pub async fn approve_shop(
    State(state): State<AdminState>,
    Extension(actor): Extension<AuthUser>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PeerActionResponse>> {
    forward(AdminAction::ApproveShop, &state, &actor, &headers, path).await
}

/// PATCH /api/admins/shop/{id}/block
pub async fn block_shop(
    State(state): State<AdminState>,
    Extension(actor): Extension<AuthUser>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PeerActionResponse>> {
    forward(AdminAction::BlockShop, &state, &actor, &headers, path).await
}

/// admin-service API 라우터 생성.
pub fn admin_service_api_router(state: &AdminState) -> Router<AdminState> {
    let guard = AccessGuard::new(state.verifier.clone(), AccessPolicy::staff());

    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/metrics", get(service_metrics))
        .route("/user/{id}/block", patch(block_user))
        .route("/user/{id}/approve", patch(approve_user))
        .route("/user/{id}/reset-password", post(reset_password))
        .route("/user/{id}", delete(delete_user))
        .route("/shop/{id}/approve", patch(approve_shop))
        .route("/shop/{id}/block", patch(block_shop))
        .route_layer(middleware::from_fn_with_state(guard, require_access))
}
