//! 사용자 프로필 endpoint.
//!
//! - `GET /api/user/profile` - 로그인한 사용자 정보 (모든 역할)

use axum::{extract::State, middleware, routing::get, Extension, Json, Router};
use market_auth::{require_access, AccessGuard, AccessPolicy, AuthUser, Principal};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 프로필 조회.
///
/// 토큰 발급 이후 계정이 삭제되었으면 404입니다.
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Principal>> {
    let principal = state
        .sessions
        .credentials()
        .find_by_id(user.id)
        .await
        .map_err(|e| ApiError::Auth(e.into()))?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {}", user.id)))?;

    Ok(Json(principal))
}

/// 사용자 라우터 생성.
pub fn user_router(state: &AppState) -> Router<AppState> {
    let guard = AccessGuard::new(state.verifier.clone(), AccessPolicy::Authenticated);

    Router::new()
        .route("/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(guard, require_access))
}
