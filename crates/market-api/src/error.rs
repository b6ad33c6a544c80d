//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트는 `{"error": "<message>", "code": "<CODE>"}` 형식으로 실패를 응답합니다.
//! 인증 에러는 [`AuthError`]의 응답 변환을 그대로 사용합니다 (429의 `Retry-After` 포함).

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use market_auth::AuthError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::peer::PeerError;

/// 통합 API 에러 응답 본문.
///
/// ```json
/// { "error": "user not found: 42", "code": "NOT_FOUND" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 사람이 읽을 수 있는 에러 메시지
    pub error: String,
    /// 에러 코드 (예: "NOT_FOUND", "VALIDATION_ERROR")
    pub code: String,
    /// 추가 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// API 핸들러 에러.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

/// API 핸들러 결과 타입.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Auth(e) => return e.into_response(),
            ApiError::Peer(e) => {
                tracing::warn!(error = %e, "Peer service call failed");
                let status = match &e {
                    PeerError::Status { status, .. } if *status == 404 => StatusCode::NOT_FOUND,
                    PeerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (
                    status,
                    ApiErrorResponse::new("PEER_ERROR", "upstream service request failed")
                        .with_details(serde_json::json!({ "operation": e.operation() })),
                )
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, ApiErrorResponse::new("NOT_FOUND", message))
            }
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("VALIDATION_ERROR", message),
            ),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("INTERNAL_ERROR", "internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
