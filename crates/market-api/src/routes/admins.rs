//! 관리자 계정 관리 endpoint (superadmin 전용).
//!
//! - `GET /api/admins` - admin 목록
//! - `GET /api/admins/{id}` - admin 조회
//! - `POST /api/admins/register` - admin 생성 (역할은 admin으로 고정)
//! - `PUT /api/admins/{id}` - 프로필/상태 수정
//! - `DELETE /api/admins/{id}` - 삭제
//!
//! admin 역할이 없는 주체의 id는 404로 처리합니다.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use market_auth::{
    require_access, AccessGuard, AccessPolicy, AdminUpdate, AuthUser, NewAccount, Principal, Role,
};
use serde::{Deserialize, Serialize};

use super::auth::{MessageResponse, RegisterResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// admin 목록 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminListResponse {
    pub data: Vec<Principal>,
    pub total: usize,
}

/// admin 단건 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminResponse {
    pub data: Principal,
}

fn admin_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("admin not found: {id}"))
}

/// GET /api/admins
pub async fn list_admins(
    State(state): State<AppState>,
    Extension(requester): Extension<AuthUser>,
) -> ApiResult<Json<AdminListResponse>> {
    let data = state.sessions.list_admins(&requester.roles).await?;
    Ok(Json(AdminListResponse {
        total: data.len(),
        data,
    }))
}

/// GET /api/admins/{id}
pub async fn get_admin(
    State(state): State<AppState>,
    Extension(requester): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<AdminResponse>> {
    let Path(id) = path?;
    let data = state
        .sessions
        .get_admin(&requester.roles, id)
        .await?
        .ok_or_else(|| admin_not_found(id))?;
    Ok(Json(AdminResponse { data }))
}

/// POST /api/admins/register
pub async fn register_admin(
    State(state): State<AppState>,
    Extension(requester): Extension<AuthUser>,
    payload: Result<Json<NewAccount>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(account) = payload?;
    let admin = state.sessions.create_admin(&requester.roles, account).await?;

    tracing::info!(requester_id = requester.id, admin_id = admin.id, "Admin account created");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "admin registered successfully".to_string(),
            id: admin.id,
        }),
    ))
}

/// PUT /api/admins/{id}
pub async fn update_admin(
    State(state): State<AppState>,
    Extension(requester): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AdminUpdate>, JsonRejection>,
) -> ApiResult<Json<AdminResponse>> {
    let Path(id) = path?;
    let Json(update) = payload?;
    let data = state
        .sessions
        .update_admin(&requester.roles, id, update)
        .await?
        .ok_or_else(|| admin_not_found(id))?;

    tracing::info!(requester_id = requester.id, admin_id = id, "Admin account updated");
    Ok(Json(AdminResponse { data }))
}

/// DELETE /api/admins/{id}
pub async fn delete_admin(
    State(state): State<AppState>,
    Extension(requester): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(id) = path?;
    if !state.sessions.delete_admin(&requester.roles, id).await? {
        return Err(admin_not_found(id));
    }

    tracing::info!(requester_id = requester.id, admin_id = id, "Admin account deleted");
    Ok(Json(MessageResponse::new("admin deleted")))
}

/// 관리자 계정 관리 라우터.
pub fn admins_router(state: &AppState) -> Router<AppState> {
    let guard = AccessGuard::new(state.verifier.clone(), AccessPolicy::single(Role::SuperAdmin));

    Router::new()
        .route("/", get(list_admins))
        .route("/register", post(register_admin))
        .route("/{id}", get(get_admin).put(update_admin).delete(delete_admin))
        .route_layer(middleware::from_fn_with_state(guard, require_access))
}
