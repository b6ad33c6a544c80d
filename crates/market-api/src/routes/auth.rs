//! 인증 endpoint.
//!
//! - `POST /api/auth/register` - 회원가입 (buyer/seller)
//! - `POST /api/auth/login` - 로그인 (IP별 시도 제한)
//! - `POST /api/auth/refresh` - 토큰 갱신 (Refresh Token 회전)
//! - `POST /api/auth/logout` - 로그아웃
//! - `GET /api/auth/validate` - Access Token 검증 (피어 서비스용)

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use market_auth::{AuthError, AuthUser, NewAccount, TokenPair};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_login;
use crate::middleware::login_rate_limit;
use crate::state::AppState;

/// 로그인 요청. `identifier`는 이메일 또는 휴대폰 번호입니다.
#[derive(Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "identifier is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// Refresh Token 요청 (갱신/로그아웃 공용).
#[derive(Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "refresh_token is required"))]
    pub refresh_token: String,
}

/// 회원가입 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub id: i64,
}

/// 단순 메시지 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn check<T: Validate>(request: &T) -> ApiResult<()> {
    request
        .validate()
        .map_err(|e| ApiError::Auth(AuthError::Validation(e.to_string())))
}

fn login_outcome(error: &AuthError) -> &'static str {
    match error {
        AuthError::InvalidCredentials => "invalid_credentials",
        AuthError::AccountBlocked | AuthError::AccountInactive => "forbidden",
        AuthError::Validation(_) => "invalid_request",
        _ => "error",
    }
}

/// 회원가입.
///
/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewAccount>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(account) = payload?;
    let principal = state.sessions.register(account).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "registered successfully".to_string(),
            id: principal.id,
        }),
    ))
}

/// 로그인.
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<TokenPair>> {
    let Json(request) = payload?;
    check(&request)?;

    match state.sessions.login(&request.identifier, &request.password).await {
        Ok(tokens) => {
            record_login("success");
            Ok(Json(tokens))
        }
        Err(e) => {
            record_login(login_outcome(&e));
            Err(e.into())
        }
    }
}

/// 토큰 갱신. 제시된 Refresh Token은 소비되고 새 페어가 발급됩니다.
///
/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<TokenPair>> {
    let Json(request) = payload?;
    check(&request)?;

    let tokens = state.sessions.refresh(&request.refresh_token).await?;
    Ok(Json(tokens))
}

/// 로그아웃. 알 수 없는 토큰도 성공으로 응답합니다.
///
/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    check(&request)?;

    state.sessions.logout(&request.refresh_token).await?;
    Ok(Json(MessageResponse::new("logged out successfully")))
}

/// Access Token 검증.
///
/// GET /api/auth/validate
pub async fn validate(user: AuthUser) -> Json<AuthUser> {
    Json(user)
}

/// 인증 라우터 생성.
///
/// 로그인 라우트에만 시도 제한 미들웨어가 적용됩니다.
pub fn auth_router(state: &AppState) -> Router<AppState> {
    let login_route = Router::new()
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(state.clone(), login_rate_limit));

    Router::new()
        .route("/register", post(register))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/validate", get(validate))
        .merge(login_route)
}
