//! 계정 관리 endpoint (admin, superadmin).
//!
//! admin-service가 피어 호출로 사용하는 수신 측입니다.
//!
//! - `PATCH /api/users/{id}/block` - 차단 (Refresh Token 전부 폐기)
//! - `PATCH /api/users/{id}/approve` - 승인 (active로 전환)
//! - `POST /api/users/{id}/reset-password` - 임시 비밀번호 발급
//! - `DELETE /api/users/{id}` - 삭제
//!
//! 상태 변경과 삭제는 같은 요청을 반복해도 결과가 같습니다.
//! admin/superadmin 계정은 superadmin만 변경할 수 있습니다 (그 외 403).

use axum::{
    extract::{rejection::PathRejection, Path, State},
    middleware,
    routing::{delete, patch, post},
    Extension, Json, Router,
};
use market_auth::{require_access, AccessGuard, AccessPolicy, AccountStatus, AuthUser, Principal};
use serde::{Deserialize, Serialize};

use super::auth::MessageResponse;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 상태 변경 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserStatusResponse {
    pub message: String,
    pub user: Principal,
}

/// 비밀번호 초기화 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetPasswordResponse {
    pub message: String,
    pub temporary_password: String,
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("user not found: {id}"))
}

async fn change_status(
    state: &AppState,
    actor: &AuthUser,
    id: i64,
    status: AccountStatus,
) -> ApiResult<Json<UserStatusResponse>> {
    let user = state
        .sessions
        .set_status(&actor.roles, id, status)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(actor_id = actor.id, user_id = id, status = %status, "Account status updated");
    Ok(Json(UserStatusResponse {
        message: format!("user {status}"),
        user,
    }))
}

/// PATCH /api/users/{id}/block
pub async fn block_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<UserStatusResponse>> {
    let Path(id) = path?;
    change_status(&state, &actor, id, AccountStatus::Blocked).await
}

/// PATCH /api/users/{id}/approve
pub async fn approve_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<UserStatusResponse>> {
    let Path(id) = path?;
    change_status(&state, &actor, id, AccountStatus::Active).await
}

/// POST /api/users/{id}/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ResetPasswordResponse>> {
    let Path(id) = path?;
    let temporary_password = state
        .sessions
        .reset_password(&actor.roles, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(actor_id = actor.id, user_id = id, "Temporary password issued");
    Ok(Json(ResetPasswordResponse {
        message: "password reset".to_string(),
        temporary_password,
    }))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(id) = path?;
    if !state.sessions.delete_principal(&actor.roles, id).await? {
        return Err(not_found(id));
    }

    tracing::info!(actor_id = actor.id, user_id = id, "Account deleted by operator");
    Ok(Json(MessageResponse::new("user deleted")))
}

/// 계정 관리 라우터 생성.
pub fn users_router(state: &AppState) -> Router<AppState> {
    let guard = AccessGuard::new(state.verifier.clone(), AccessPolicy::staff());

    Router::new()
        .route("/{id}/block", patch(block_user))
        .route("/{id}/approve", patch(approve_user))
        .route("/{id}/reset-password", post(reset_password))
        .route("/{id}", delete(delete_user))
        .route_layer(middleware::from_fn_with_state(guard, require_access))
}
