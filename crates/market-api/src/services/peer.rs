//! 피어 서비스 HTTP 클라이언트.
//!
//! admin-service가 auth-service와 shop-service에 계정/상점 관리 요청을 전달할 때 사용합니다.
//!
//! - 모든 호출은 타임아웃을 가집니다 (`peers.timeout_secs`).
//! - 호출마다 `Idempotency-Key`(UUID v4)를 붙이며, 재시도 시 같은 키를 다시 보냅니다.
//! - 재시도는 최대 1회이며 전송 실패, 타임아웃, 5xx 응답에만 적용됩니다.
//! - 비밀번호 재설정은 재시도하지 않습니다. auth-service는 `Idempotency-Key`로 중복을
//!   걸러내지 않으므로, 재전송하면 임시 비밀번호가 두 번 발급될 수 있습니다.
//! - 호출자의 Bearer 토큰을 그대로 전달합니다.

use market_core::PeerConfig;
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::metrics::record_peer_request;

/// 멱등성 키 헤더 이름.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// 피어 호출 에러.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("{operation}: peer responded with status {status}")]
    Status { operation: &'static str, status: u16 },

    #[error("{operation}: peer request timed out")]
    Timeout { operation: &'static str },

    #[error("{operation}: peer request failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    #[error("invalid peer url: {0}")]
    InvalidUrl(String),
}

impl PeerError {
    /// 실패한 피어 작업 이름.
    pub fn operation(&self) -> &'static str {
        match self {
            PeerError::Status { operation, .. }
            | PeerError::Timeout { operation }
            | PeerError::Transport { operation, .. } => operation,
            PeerError::InvalidUrl(_) => "configure",
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            PeerError::Status { status, .. } => *status >= 500,
            PeerError::Timeout { .. } | PeerError::Transport { .. } => true,
            PeerError::InvalidUrl(_) => false,
        }
    }

    fn from_reqwest(operation: &'static str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            PeerError::Timeout { operation }
        } else {
            PeerError::Transport {
                operation,
                message: error.to_string(),
            }
        }
    }
}

/// 대상 피어 서비스.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Peer {
    Auth,
    Shop,
}

/// 작업별 재시도 허용 여부.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    /// 같은 요청을 다시 보내도 결과가 같은 작업
    Allowed,
    Never,
}

/// 피어 서비스 클라이언트.
#[derive(Debug, Clone)]
pub struct PeerClient {
    client: reqwest::Client,
    auth_base: Url,
    shop_base: Url,
    max_retries: u8,
}

fn parse_base(url: &str) -> Result<Url, PeerError> {
    let trimmed = url.trim_end_matches('/');
    Url::parse(trimmed).map_err(|e| PeerError::InvalidUrl(format!("{url}: {e}")))
}

impl PeerClient {
    /// 설정으로 클라이언트를 생성합니다. 재시도 횟수는 1로 제한됩니다.
    pub fn new(config: &PeerConfig) -> Result<Self, PeerError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| PeerError::Transport {
                operation: "configure",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            auth_base: parse_base(&config.auth_service_url)?,
            shop_base: parse_base(&config.shop_service_url)?,
            max_retries: config.max_retries.min(1),
        })
    }

    pub fn max_retries(&self) -> u8 {
        self.max_retries
    }

    // ========================================
    // auth-service
    // ========================================

    /// 사용자 차단.
    pub async fn block_user(&self, id: i64, bearer: &str) -> Result<Value, PeerError> {
        let path = format!("/api/users/{id}/block");
        self.call("block_user", Method::PATCH, Peer::Auth, &path, bearer, Retry::Allowed)
            .await
    }

    /// 사용자 승인.
    pub async fn approve_user(&self, id: i64, bearer: &str) -> Result<Value, PeerError> {
        let path = format!("/api/users/{id}/approve");
        self.call("approve_user", Method::PATCH, Peer::Auth, &path, bearer, Retry::Allowed)
            .await
    }

    /// 사용자 비밀번호 재설정. 호출마다 새 임시 비밀번호가 발급되므로 한 번만 전송합니다.
    pub async fn reset_password(&self, id: i64, bearer: &str) -> Result<Value, PeerError> {
        let path = format!("/api/users/{id}/reset-password");
        self.call("reset_password", Method::POST, Peer::Auth, &path, bearer, Retry::Never)
            .await
    }

    /// 사용자 삭제.
    pub async fn delete_user(&self, id: i64, bearer: &str) -> Result<Value, PeerError> {
        let path = format!("/api/users/{id}");
        self.call("delete_user", Method::DELETE, Peer::Auth, &path, bearer, Retry::Allowed)
            .await
    }

    // ========================================
    // shop-service
    // ========================================

    /// 상점 승인.
    pub async fn approve_shop(&self, id: i64, bearer: &str) -> Result<Value, PeerError> {
        let path = format!("/api/shops/{id}/approve");
        self.call("approve_shop", Method::PATCH, Peer::Shop, &path, bearer, Retry::Allowed)
            .await
    }

    /// 상점 차단.
    pub async fn block_shop(&self, id: i64, bearer: &str) -> Result<Value, PeerError> {
        let path = format!("/api/shops/{id}/block");
        self.call("block_shop", Method::PATCH, Peer::Shop, &path, bearer, Retry::Allowed)
            .await
    }

    fn url(&self, peer: Peer, path: &str) -> Result<Url, PeerError> {
        let base = match peer {
            Peer::Auth => &self.auth_base,
            Peer::Shop => &self.shop_base,
        };
        base.join(path)
            .map_err(|e| PeerError::InvalidUrl(format!("{base}{path}: {e}")))
    }

    async fn call(
        &self,
        operation: &'static str,
        method: Method,
        peer: Peer,
        path: &str,
        bearer: &str,
        retry: Retry,
    ) -> Result<Value, PeerError> {
        let url = self.url(peer, path)?;
        let idempotency_key = uuid::Uuid::new_v4().to_string();
        let attempts = match retry {
            Retry::Allowed => 1 + u32::from(self.max_retries),
            Retry::Never => 1,
        };

        let mut attempt = 1;
        loop {
            let result = self
                .send_once(operation, method.clone(), url.clone(), bearer, &idempotency_key)
                .await;

            match result {
                Ok(body) => {
                    record_peer_request(operation, "success");
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(
                        operation,
                        attempt,
                        error = %e,
                        "Peer call failed, retrying with same idempotency key"
                    );
                    record_peer_request(operation, "retry");
                    attempt += 1;
                }
                Err(e) => {
                    record_peer_request(operation, "failure");
                    return Err(e);
                }
            }
        }
    }

    async fn send_once(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        bearer: &str,
        idempotency_key: &str,
    ) -> Result<Value, PeerError> {
        debug!(operation, %method, %url, "Calling peer service");

        let response = self
            .client
            .request(method, url)
            .bearer_auth(bearer)
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key)
            .send()
            .await
            .map_err(|e| PeerError::from_reqwest(operation, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PeerError::from_reqwest(operation, e))?;

        if !status.is_success() {
            debug!(operation, status = status.as_u16(), body = %body, "Peer returned error status");
            return Err(PeerError::Status {
                operation,
                status: status.as_u16(),
            });
        }

        if body.trim().is_empty() || status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(auth: &str, retries: u8) -> PeerConfig {
        PeerConfig {
            auth_service_url: auth.to_string(),
            shop_service_url: "http://shop.local/".to_string(),
            timeout_secs: 5,
            max_retries: retries,
        }
    }

    #[test]
    fn test_retries_clamped() {
        let client = PeerClient::new(&config("http://auth.local", 3)).unwrap();
        assert_eq!(client.max_retries(), 1);
    }

    #[test]
    fn test_invalid_url() {
        let err = PeerClient::new(&config("not a url", 0)).unwrap_err();
        assert!(matches!(err, PeerError::InvalidUrl(_)));
        assert_eq!(err.operation(), "configure");
    }

    #[test]
    fn test_url_join() {
        let client = PeerClient::new(&config("http://auth.local/", 0)).unwrap();
        let url = client.url(Peer::Auth, "/api/users/7/block").unwrap();
        assert_eq!(url.as_str(), "http://auth.local/api/users/7/block");

        let url = client.url(Peer::Shop, "/api/shops/3/approve").unwrap();
        assert_eq!(url.as_str(), "http://shop.local/api/shops/3/approve");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PeerError::Status { operation: "x", status: 503 }.is_retryable());
        assert!(!PeerError::Status { operation: "x", status: 404 }.is_retryable());
        assert!(PeerError::Timeout { operation: "x" }.is_retryable());
    }
}
