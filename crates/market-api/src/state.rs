//! 애플리케이션 공유 상태.
//!
//! 핸들러와 미들웨어가 공유하는 세션 서비스, 토큰 검증기, 로그인 제한기를 보관합니다.
//! 데이터베이스 URL이 없으면 프로세스 내 저장소로 동작합니다 (로컬 실행/테스트용).

use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use market_auth::{
    CredentialStore, LimiterError, LoginRateLimiter, MemoryAttemptLimiter,
    MemoryCredentialStore, MemoryRefreshTokenStore, PasswordError, PasswordService,
    RedisAttemptLimiter, RefreshTokenStore, SessionService, TokenIssuer, TokenVerifier,
};
use market_core::{AppConfig, AuthConfig, ConfigError, RateLimitBackend, RateLimitConfig};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::repository::{PgCredentialStore, PgRefreshTokenStore};
use crate::services::{PeerClient, PeerError};

/// 기동 단계 에러.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("password hasher error: {0}")]
    Password(#[from] PasswordError),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("rate limiter backend unavailable: {0}")]
    RateLimiter(#[from] LimiterError),

    #[error("peer client error: {0}")]
    Peer(#[from] PeerError),
}

/// auth-service 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 회원가입/로그인/갱신/계정 관리
    pub sessions: SessionService,
    /// Access Token 검증기
    pub verifier: TokenVerifier,
    /// 로그인 시도 제한기 (비활성화 시 None)
    pub login_limiter: Option<LoginRateLimiter>,
    /// 프록시 헤더로 클라이언트 IP를 판단할지 여부
    pub trust_proxy_headers: bool,
    /// PostgreSQL 연결 풀 (헬스 체크용)
    pub db_pool: Option<PgPool>,
    /// 서비스 버전
    pub version: &'static str,
    /// 기동 시각
    pub started_at: DateTime<Utc>,
}

impl FromRef<AppState> for TokenVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}

impl AppState {
    pub fn new(sessions: SessionService, verifier: TokenVerifier) -> Self {
        Self {
            sessions,
            verifier,
            login_limiter: None,
            trust_proxy_headers: false,
            db_pool: None,
            version: env!("CARGO_PKG_VERSION"),
            started_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_login_limiter(mut self, limiter: LoginRateLimiter) -> Self {
        self.login_limiter = Some(limiter);
        self
    }

    #[must_use]
    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    #[must_use]
    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 지정된 저장소로 상태를 구성합니다.
    pub fn with_stores(
        auth: &AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
    ) -> Result<Self, StartupError> {
        let issuer = TokenIssuer::new(auth)?;
        let verifier = TokenVerifier::new(auth)?;
        let passwords = PasswordService::from_config(auth)?;
        let sessions = SessionService::new(credentials, refresh_tokens, issuer, passwords);
        Ok(Self::new(sessions, verifier))
    }

    /// 프로세스 내 저장소와 프로세스 내 로그인 제한기로 구성합니다.
    ///
    /// 정리 태스크는 시작하지 않습니다.
    pub fn in_memory(auth: &AuthConfig, rate_limit: &RateLimitConfig) -> Result<Self, StartupError> {
        let state = Self::with_stores(
            auth,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryRefreshTokenStore::new()),
        )?
        .with_trust_proxy_headers(rate_limit.trust_proxy_headers);

        if !rate_limit.enabled {
            return Ok(state);
        }
        let limiter = Arc::new(MemoryAttemptLimiter::from_config(rate_limit));
        Ok(state.with_login_limiter(LoginRateLimiter::new(limiter, rate_limit.failure_policy)))
    }

    /// 설정에 따라 저장소와 제한기를 연결합니다.
    ///
    /// 프로세스 내 제한기를 사용하면 `shutdown`에 묶인 정리 태스크를 시작합니다.
    pub async fn connect(
        config: &AppConfig,
        shutdown: &CancellationToken,
    ) -> Result<Self, StartupError> {
        let mut state = match config.database.url.as_deref() {
            Some(url) => {
                tracing::info!("Connecting to PostgreSQL...");
                let pool = PgPoolOptions::new()
                    .max_connections(config.database.max_connections)
                    .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
                    .connect(url)
                    .await?;
                tracing::info!("PostgreSQL connection established");

                Self::with_stores(
                    &config.auth,
                    Arc::new(PgCredentialStore::new(pool.clone())),
                    Arc::new(PgRefreshTokenStore::new(pool.clone())),
                )?
                .with_db_pool(pool)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory credential store");
                Self::with_stores(
                    &config.auth,
                    Arc::new(MemoryCredentialStore::new()),
                    Arc::new(MemoryRefreshTokenStore::new()),
                )?
            }
        };

        let rate_limit = &config.rate_limit;
        state.trust_proxy_headers = rate_limit.trust_proxy_headers;

        if !rate_limit.enabled {
            tracing::warn!("Login rate limiting DISABLED");
            return Ok(state);
        }

        let limiter = match (rate_limit.backend, config.redis.url.as_deref()) {
            (RateLimitBackend::Redis, Some(url)) => {
                let timeout = Duration::from_millis(config.redis.command_timeout_ms);
                let redis = RedisAttemptLimiter::connect(url, rate_limit, timeout).await?;
                LoginRateLimiter::new(Arc::new(redis), rate_limit.failure_policy)
            }
            _ => {
                let memory = Arc::new(MemoryAttemptLimiter::from_config(rate_limit));
                memory
                    .clone()
                    .spawn_sweeper(rate_limit.sweep_interval(), shutdown.child_token());
                LoginRateLimiter::new(memory, rate_limit.failure_policy)
            }
        };

        tracing::info!(
            backend = ?rate_limit.backend,
            max_attempts = rate_limit.max_attempts,
            window_secs = rate_limit.window_secs,
            failure_policy = ?rate_limit.failure_policy,
            "Login rate limiting configured"
        );
        Ok(state.with_login_limiter(limiter))
    }

    /// 데이터베이스 연결 확인.
    pub async fn is_db_healthy(&self) -> bool {
        match &self.db_pool {
            Some(pool) => sqlx::query("SELECT 1").execute(pool).await.is_ok(),
            None => false,
        }
    }

    /// 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

/// 피어 작업 누적 카운터.
#[derive(Debug, Default)]
pub struct ActionStats {
    forwarded: AtomicU64,
    failed: AtomicU64,
}

impl ActionStats {
    pub fn record(&self, success: bool) {
        let counter = if success { &self.forwarded } else { &self.failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// admin-service 공유 상태.
///
/// 토큰은 로컬에서 검증하며 계정/상점 변경은 피어 서비스에 위임합니다.
#[derive(Clone)]
pub struct AdminState {
    pub verifier: TokenVerifier,
    pub peers: PeerClient,
    pub stats: Arc<ActionStats>,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
}

impl FromRef<AdminState> for TokenVerifier {
    fn from_ref(state: &AdminState) -> Self {
        state.verifier.clone()
    }
}

impl AdminState {
    pub fn new(verifier: TokenVerifier, peers: PeerClient) -> Self {
        Self {
            verifier,
            peers,
            stats: Arc::new(ActionStats::default()),
            version: env!("CARGO_PKG_VERSION"),
            started_at: Utc::now(),
        }
    }

    /// 설정으로 상태를 구성합니다.
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let verifier = TokenVerifier::new(&config.auth)?;
        let peers = PeerClient::new(&config.peers)?;
        tracing::info!(
            auth_service = %config.peers.auth_service_url,
            shop_service = %config.peers.shop_service_url,
            max_retries = peers.max_retries(),
            "Peer client configured"
        );
        Ok(Self::new(verifier, peers))
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
