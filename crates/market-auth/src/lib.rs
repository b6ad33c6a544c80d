//! # Market Auth
//!
//! 마켓플레이스 서비스가 공유하는 인증 라이브러리입니다.
//!
//! - [`jwt`]: Access Token 발급/검증, Refresh Token 생성
//! - [`extractor`]: axum 추출기([`AuthUser`])와 라우트 그룹 미들웨어([`require_access`])
//! - [`roles`]: 역할, 역할 집합, 역할 게이트
//! - [`password`]: Argon2id 비밀번호 해싱
//! - [`store`]: 자격 증명 / Refresh Token 저장소 트레이트
//! - [`session`]: 회원가입, 로그인, 갱신, 로그아웃
//! - [`rate_limit`]: 로그인 시도 제한 (프로세스 내 / Redis)

pub mod error;
pub mod extractor;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod rate_limit;
pub mod roles;
pub mod session;
pub mod store;

pub use error::{AuthError, AuthResult, TokenRejection};
pub use extractor::{authenticate, bearer_token, require_access, AccessGuard, AuthUser};
pub use jwt::{
    generate_refresh_token, AccessClaims, IssuedRefreshToken, IssuedToken, TokenIssuer, TokenPair,
    TokenVerifier,
};
pub use password::{PasswordError, PasswordService};
pub use principal::{AccountStatus, NewPrincipal, Principal, ProfileUpdate, StoredPrincipal};
pub use rate_limit::{
    AttemptLimiter, LimiterError, LoginRateLimiter, MemoryAttemptLimiter, RateDecision,
    RedisAttemptLimiter,
};
pub use roles::{AccessPolicy, EmptyAllowList, EmptyRoleSet, Role, RoleGate, RoleSet};
pub use session::{AdminUpdate, NewAccount, SessionService};
pub use store::{
    CredentialStore, MemoryCredentialStore, MemoryRefreshTokenStore, RefreshTokenRecord,
    RefreshTokenStore, StoreError,
};
