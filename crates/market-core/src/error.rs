//! 설정 및 기동 단계 에러 타입.
//!
//! 요청 단위 에러가 아니라 프로세스 기동을 중단시키는 치명적 에러입니다.

use thiserror::Error;

/// 설정 에러.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 설정 소스 로드/역직렬화 실패
    #[error("설정 로드 실패: {0}")]
    Load(#[from] config::ConfigError),

    /// 서명 키 누락 또는 빈 값
    #[error("JWT 서명 키가 설정되지 않았습니다 (JWT_SECRET)")]
    MissingSecret,

    /// 잘못된 설정 값
    #[error("잘못된 설정: {0}")]
    Invalid(String),
}

/// 설정 작업을 위한 Result 타입.
pub type ConfigResult<T> = Result<T, ConfigError>;
