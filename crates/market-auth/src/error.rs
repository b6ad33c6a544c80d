//! 인증 에러 타입.
//!
//! 모든 인증/인가 실패는 [`AuthError`]로 표현되며 `{"error", "code"}` 형식의
//! JSON 응답으로 변환됩니다. 토큰 검증 실패(401)는 원인과 무관하게 동일한 본문을
//! 반환하고, 구체적인 원인은 `debug` 레벨로만 기록합니다.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::password::PasswordError;
use crate::store::StoreError;

/// 토큰 인증 실패 원인 (로그 전용, 응답에 노출하지 않음).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// Authorization 헤더 없음
    MissingHeader,
    /// `Bearer <token>` 형식이 아님
    MalformedHeader,
    /// 서명 불일치
    BadSignature,
    /// HS256 이외의 알고리즘
    WrongAlgorithm,
    /// 만료됨
    Expired,
    /// 필수 클레임 누락 또는 형식 오류
    InvalidClaims,
    /// JWT 구조 자체가 잘못됨
    Malformed,
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TokenRejection::MissingHeader => "missing authorization header",
            TokenRejection::MalformedHeader => "malformed authorization header",
            TokenRejection::BadSignature => "bad signature",
            TokenRejection::WrongAlgorithm => "unexpected algorithm",
            TokenRejection::Expired => "token expired",
            TokenRejection::InvalidClaims => "missing or malformed claims",
            TokenRejection::Malformed => "malformed token",
        };
        f.write_str(reason)
    }
}

/// 인증 에러.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication required")]
    Unauthenticated(TokenRejection),

    #[error("insufficient role")]
    InsufficientRole,

    #[error("account is blocked")]
    AccountBlocked,

    #[error("account is not active")]
    AccountInactive,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("already registered")]
    AlreadyRegistered,

    #[error("{0}")]
    Validation(String),

    #[error("too many login attempts")]
    RateLimited { retry_after: u64 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated(_)
            | AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole | AuthError::AccountBlocked | AuthError::AccountInactive => {
                StatusCode::FORBIDDEN
            }
            AuthError::AlreadyRegistered => StatusCode::CONFLICT,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Store(_) | AuthError::Password(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated(_) => "UNAUTHENTICATED",
            AuthError::InsufficientRole => "FORBIDDEN",
            AuthError::AccountBlocked => "ACCOUNT_BLOCKED",
            AuthError::AccountInactive => "ACCOUNT_INACTIVE",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AuthError::AlreadyRegistered => "ALREADY_REGISTERED",
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::RateLimited { .. } => "RATE_LIMITED",
            AuthError::Store(_) | AuthError::Password(_) | AuthError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// 클라이언트에 노출할 메시지. 내부 에러의 상세 내용은 숨깁니다.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Store(_) | AuthError::Password(_) | AuthError::Internal(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// 응답 본문 JSON.
    pub fn body(&self) -> serde_json::Value {
        match self {
            AuthError::RateLimited { retry_after } => json!({
                "error": self.public_message(),
                "code": self.code(),
                "retry_after": retry_after,
            }),
            _ => json!({
                "error": self.public_message(),
                "code": self.code(),
            }),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::Unauthenticated(reason) => {
                tracing::debug!(%reason, "Rejected bearer token");
            }
            AuthError::Store(_) | AuthError::Password(_) | AuthError::Internal(_) => {
                tracing::error!(error = %self, "Authentication infrastructure failure");
            }
            _ => {}
        }

        let mut response = (self.status_code(), Json(self.body())).into_response();

        if let AuthError::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(error: AuthError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_unauthenticated_bodies_are_uniform() {
        let (s1, b1) = body_json(AuthError::Unauthenticated(TokenRejection::Expired)).await;
        let (s2, b2) = body_json(AuthError::Unauthenticated(TokenRejection::BadSignature)).await;
        let (s3, b3) = body_json(AuthError::Unauthenticated(TokenRejection::MissingHeader)).await;

        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s1, s2);
        assert_eq!(s2, s3);
        assert_eq!(b1, b2);
        assert_eq!(b2, b3);
        assert_eq!(b1["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = AuthError::RateLimited { retry_after: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "42");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["retry_after"], 42);
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) =
            body_json(AuthError::Internal("connection refused at 10.0.0.3".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::InsufficientRole.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::AccountBlocked.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::AlreadyRegistered.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Validation("bad email".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
