//! 판매자 endpoint.
//!
//! - `GET /api/seller/dashboard` (seller)

use axum::{middleware, routing::get, Extension, Json, Router};
use market_auth::{require_access, AccessGuard, AccessPolicy, AuthUser, Role};

use super::admin::AreaResponse;
use crate::state::AppState;

pub async fn dashboard(Extension(user): Extension<AuthUser>) -> Json<AreaResponse> {
    Json(AreaResponse {
        message: "welcome to the seller dashboard".to_string(),
        user,
    })
}

/// 판매자 라우터 생성.
pub fn seller_router(state: &AppState) -> Router<AppState> {
    let guard = AccessGuard::new(state.verifier.clone(), AccessPolicy::single(Role::Seller));

    Router::new()
        .route("/dashboard", get(dashboard))
        .route_layer(middleware::from_fn_with_state(guard, require_access))
}
