//! PostgreSQL 저장소 구현.
//!
//! `market-auth`의 [`CredentialStore`](market_auth::CredentialStore)와
//! [`RefreshTokenStore`](market_auth::RefreshTokenStore) 트레이트를 구현합니다.
//! 스키마는 `migrations/0001_auth.sql`을 참고하세요 (자동 마이그레이션 없음).

pub mod principals;
pub mod refresh_tokens;

pub use principals::PgCredentialStore;
pub use refresh_tokens::PgRefreshTokenStore;

use market_auth::StoreError;

/// sqlx 에러를 저장소 에러로 변환합니다.
pub(crate) fn store_error(error: sqlx::Error) -> StoreError {
    StoreError::Unavailable(error.to_string())
}
