//! Axum용 Bearer 토큰 인증 추출기 및 미들웨어.
//!
//! 두 가지 방식으로 사용할 수 있습니다:
//!
//! ```rust,ignore
//! // 1. 핸들러 추출기 (상태에서 TokenVerifier를 FromRef로 얻음)
//! async fn profile(user: AuthUser) -> Json<AuthUser> { Json(user) }
//!
//! // 2. 라우트 그룹 미들웨어 (AuthUser를 request extensions에 삽입)
//! let guard = AccessGuard::new(verifier, AccessPolicy::single(Role::Seller));
//! Router::new()
//!     .route("/dashboard", get(dashboard))
//!     .route_layer(middleware::from_fn_with_state(guard, require_access));
//! ```

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AuthError, TokenRejection};
use crate::jwt::{AccessClaims, TokenVerifier};
use crate::roles::{AccessPolicy, RoleSet};

/// 인증된 요청의 신원 정보.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    pub roles: RoleSet,
}

impl From<AccessClaims> for AuthUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            mobile: claims.mobile,
            roles: claims.roles,
        }
    }
}

impl AuthUser {
    /// 접근 정책 검사. 실패 시 403.
    pub fn require(&self, policy: &AccessPolicy) -> Result<(), AuthError> {
        policy.check(&self.roles)
    }
}

/// `Authorization: Bearer <token>` 헤더에서 토큰을 꺼냅니다.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::Unauthenticated(TokenRejection::MissingHeader))?
        .to_str()
        .map_err(|_| AuthError::Unauthenticated(TokenRejection::MalformedHeader))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Unauthenticated(TokenRejection::MalformedHeader))?;

    Ok(token)
}

/// 헤더를 검증하여 신원을 얻습니다.
pub fn authenticate(verifier: &TokenVerifier, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
    let token = bearer_token(headers)?;
    verifier.verify(token).map(AuthUser::from)
}

impl<S> FromRequestParts<S> for AuthUser
where
    TokenVerifier: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 미들웨어가 이미 검증했다면 재사용
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let verifier = TokenVerifier::from_ref(state);
        let user = authenticate(&verifier, &parts.headers)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// [`require_access`] 미들웨어 상태.
#[derive(Clone)]
pub struct AccessGuard {
    verifier: TokenVerifier,
    policy: Arc<AccessPolicy>,
}

impl AccessGuard {
    pub fn new(verifier: TokenVerifier, policy: AccessPolicy) -> Self {
        Self {
            verifier,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }
}

/// 라우트 그룹 인증/인가 미들웨어.
///
/// 검증에 성공하면 [`AuthUser`]를 request extensions에 넣고 다음 핸들러로 진행합니다.
pub async fn require_access(
    State(guard): State<AccessGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate(&guard.verifier, request.headers())?;

    if let Err(e) = user.require(&guard.policy) {
        tracing::debug!(
            user_id = user.id,
            roles = ?user.roles,
            path = %request.uri().path(),
            "Insufficient role"
        );
        return Err(e);
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
