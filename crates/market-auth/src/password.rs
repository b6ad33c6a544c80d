//! 비밀번호 해싱 유틸리티.
//!
//! Argon2id 기반 해싱 및 검증. 비용 파라미터는 설정에서 명시적으로 지정하며,
//! 비동기 경로에서는 `spawn_blocking`으로 워커 스레드를 막지 않습니다.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use market_core::AuthConfig;
use std::sync::Arc;

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
    #[error("잘못된 해시 형식")]
    InvalidHashFormat,
    #[error("잘못된 Argon2 파라미터: {0}")]
    InvalidParams(String),
    #[error("해싱 작업 실패: {0}")]
    TaskFailed(String),
}

/// Argon2id 비밀번호 해셔.
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    /// 존재하지 않는 계정 로그인 시 검증에 사용하는 해시
    dummy_hash: Arc<str>,
}

impl std::fmt::Debug for PasswordService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordService")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .finish()
    }
}

impl PasswordService {
    /// 메모리 비용(KiB)과 반복 횟수로 생성합니다. 병렬도는 1로 고정됩니다.
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        let mut service = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        let dummy = service.hash_blocking("dummy-password-for-timing")?;
        service.dummy_hash = Arc::from(dummy);
        Ok(service)
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, PasswordError> {
        Self::new(config.password_memory_kib, config.password_iterations)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// 비밀번호 해싱 (동기).
    ///
    /// PHC 형식 문자열을 반환합니다. 솔트는 OS 난수로 생성됩니다.
    pub fn hash_blocking(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| PasswordError::HashingFailed)
    }

    /// 비밀번호 검증 (동기).
    ///
    /// 불일치는 에러가 아니라 `Ok(false)`입니다. 검증 비용은 해시에 기록된 파라미터를 따릅니다.
    pub fn verify_blocking(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;
        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    pub async fn hash(&self, password: String) -> Result<String, PasswordError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash_blocking(&password))
            .await
            .map_err(|e| PasswordError::TaskFailed(e.to_string()))?
    }

    pub async fn verify(&self, password: String, hash: String) -> Result<bool, PasswordError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify_blocking(&password, &hash))
            .await
            .map_err(|e| PasswordError::TaskFailed(e.to_string()))?
    }

    /// 계정이 없을 때도 동일한 비용의 검증을 수행합니다. 결과는 항상 버려집니다.
    pub async fn verify_dummy(&self, password: String) {
        let hash = self.dummy_hash.to_string();
        let _ = self.verify(password, hash).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PasswordService {
        PasswordService::new(8, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let service = service();
        let hash = service.hash_blocking("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify_blocking("correct horse", &hash).unwrap());
        assert!(!service.verify_blocking("battery staple", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_hash() {
        let service = service();
        let h1 = service.hash_blocking("password").unwrap();
        let h2 = service.hash_blocking("password").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = service().verify_blocking("password", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_invalid_params() {
        assert!(matches!(
            PasswordService::new(0, 0),
            Err(PasswordError::InvalidParams(_))
        ));
    }

    #[tokio::test]
    async fn test_async_verify() {
        let service = service();
        let hash = service.hash("secret1".to_string()).await.unwrap();
        assert!(service.verify("secret1".to_string(), hash).await.unwrap());
        service.verify_dummy("whatever".to_string()).await;
    }
}
