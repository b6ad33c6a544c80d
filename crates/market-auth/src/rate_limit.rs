//! 로그인 시도 제한.
//!
//! 클라이언트 키(IP)별로 고정 윈도우 안의 로그인 시도 횟수를 제한합니다.
//! 윈도우는 첫 시도 시점에 시작하며, 임계값을 넘는 시도는 윈도우가 끝날 때까지 거부됩니다.
//! 로그인 성공 여부와 무관하게 모든 시도가 집계되고, 카운터는 윈도우 만료로만 초기화됩니다.
//!
//! - [`MemoryAttemptLimiter`]: 프로세스 내 맵 + 주기적 정리 태스크 (단일 인스턴스)
//! - [`RedisAttemptLimiter`]: Lua 스크립트로 `INCR` + 첫 시도 시 `EXPIRE`를 원자적으로 수행
//!
//! 저장소 장애 시 동작은 [`LoginRateLimiter`]의 [`FailurePolicy`]로 결정합니다.

use async_trait::async_trait;
use market_core::{FailurePolicy, RateLimitConfig};
use redis::aio::ConnectionManager;
use redis::Script;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AuthError;

/// Redis 키 접두사
const REDIS_KEY_PREFIX: &str = "login_attempts:";

/// INCR 후 첫 시도이면 EXPIRE. TTL이 없는 키(이전 장애 잔재)도 만료를 다시 설정합니다.
const INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('TTL', KEYS[1])
if ttl < 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

/// 시도 판정 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// 허용됨 (윈도우 내 누적 시도 수 포함)
    Allowed { attempts: u32 },
    /// 제한됨
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// 저장소 에러.
#[derive(Debug, thiserror::Error)]
pub enum LimiterError {
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),
    #[error("rate limit store timed out")]
    Timeout,
}

/// 시도 횟수 저장소.
#[async_trait]
pub trait AttemptLimiter: Send + Sync {
    /// 시도 1회를 기록하고 허용 여부를 판정합니다.
    async fn hit(&self, key: &str) -> Result<RateDecision, LimiterError>;
}

/// 재시도 대기 시간을 초 단위로 올림 (최소 1초).
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

#[derive(Debug)]
struct AttemptEntry {
    attempts: u32,
    window_started: Instant,
    last_seen: Instant,
}

/// 프로세스 내 시도 제한기.
#[derive(Debug)]
pub struct MemoryAttemptLimiter {
    max_attempts: u32,
    window: Duration,
    entries: Mutex<HashMap<String, AttemptEntry>>,
}

impl MemoryAttemptLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_attempts, config.window())
    }

    /// 윈도우보다 오래 활동이 없는 항목을 제거합니다.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.last_seen) < self.window);
        before - entries.len()
    }

    /// 추적 중인 키 수.
    pub async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// 주기적 정리 태스크를 시작합니다. `cancel`이 취소되면 종료합니다.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 첫 tick은 즉시 완료됨
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Rate limit sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = self.sweep().await;
                        if removed > 0 {
                            tracing::debug!(removed, "Swept idle rate limit entries");
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl AttemptLimiter for MemoryAttemptLimiter {
    async fn hit(&self, key: &str) -> Result<RateDecision, LimiterError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let entry = entries.entry(key.to_string()).or_insert(AttemptEntry {
            attempts: 0,
            window_started: now,
            last_seen: now,
        });

        let elapsed = now.duration_since(entry.window_started);
        if elapsed >= self.window {
            entry.attempts = 0;
            entry.window_started = now;
        }
        entry.last_seen = now;

        if entry.attempts >= self.max_attempts {
            let remaining = self.window.saturating_sub(now.duration_since(entry.window_started));
            return Ok(RateDecision::Limited {
                retry_after: remaining,
            });
        }

        entry.attempts += 1;
        Ok(RateDecision::Allowed {
            attempts: entry.attempts,
        })
    }
}

/// 스크립트 결과(누적 횟수, 남은 TTL 초)를 판정으로 변환합니다.
///
/// 임계값까지는 허용, 그 다음 시도부터 남은 TTL(최소 1초) 동안 제한합니다.
fn decide(count: i64, ttl_secs: i64, max_attempts: u32) -> RateDecision {
    if count > i64::from(max_attempts) {
        let retry_after = u64::try_from(ttl_secs).unwrap_or(0).max(1);
        return RateDecision::Limited {
            retry_after: Duration::from_secs(retry_after),
        };
    }

    RateDecision::Allowed {
        attempts: u32::try_from(count).unwrap_or(0),
    }
}

/// Redis 기반 시도 제한기.
///
/// 여러 인스턴스가 같은 카운터를 공유합니다.
#[derive(Clone)]
pub struct RedisAttemptLimiter {
    connection: ConnectionManager,
    script: Script,
    max_attempts: u32,
    window: Duration,
    command_timeout: Duration,
}

impl RedisAttemptLimiter {
    pub fn new(
        connection: ConnectionManager,
        max_attempts: u32,
        window: Duration,
        command_timeout: Duration,
    ) -> Self {
        Self {
            connection,
            script: Script::new(INCREMENT_SCRIPT),
            max_attempts,
            window,
            command_timeout,
        }
    }

    /// URL로 연결하여 생성합니다.
    pub async fn connect(
        url: &str,
        config: &RateLimitConfig,
        command_timeout: Duration,
    ) -> Result<Self, LimiterError> {
        tracing::info!("Connecting to Redis for login rate limiting...");
        let client =
            redis::Client::open(url).map_err(|e| LimiterError::Unavailable(e.to_string()))?;
        let connection = tokio::time::timeout(command_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| LimiterError::Timeout)?
            .map_err(|e| LimiterError::Unavailable(e.to_string()))?;
        tracing::info!("Redis connection established");

        Ok(Self::new(
            connection,
            config.max_attempts,
            config.window(),
            command_timeout,
        ))
    }

    fn key(ip: &str) -> String {
        format!("{REDIS_KEY_PREFIX}{ip}")
    }
}

#[async_trait]
impl AttemptLimiter for RedisAttemptLimiter {
    async fn hit(&self, key: &str) -> Result<RateDecision, LimiterError> {
        let mut connection = self.connection.clone();
        let mut invocation = self.script.key(Self::key(key));
        invocation.arg(self.window.as_secs().max(1));

        let (count, ttl): (i64, i64) =
            tokio::time::timeout(self.command_timeout, invocation.invoke_async(&mut connection))
                .await
                .map_err(|_| LimiterError::Timeout)?
                .map_err(|e| LimiterError::Unavailable(e.to_string()))?;

        Ok(decide(count, ttl, self.max_attempts))
    }
}

/// 로그인 경로용 제한기 래퍼.
///
/// 저장소 장애 시 `open`이면 경고 후 허용, `closed`이면 500으로 거부합니다.
#[derive(Clone)]
pub struct LoginRateLimiter {
    limiter: Arc<dyn AttemptLimiter>,
    policy: FailurePolicy,
}

impl LoginRateLimiter {
    pub fn new(limiter: Arc<dyn AttemptLimiter>, policy: FailurePolicy) -> Self {
        Self { limiter, policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// 시도 1회를 기록하고, 제한되면 [`AuthError::RateLimited`]를 반환합니다.
    pub async fn check(&self, key: &str) -> Result<RateDecision, AuthError> {
        match self.limiter.hit(key).await {
            Ok(RateDecision::Limited { retry_after }) => {
                let retry_after = retry_after_secs(retry_after);
                tracing::warn!(client = %key, retry_after, "Login rate limit exceeded");
                Err(AuthError::RateLimited { retry_after })
            }
            Ok(decision) => Ok(decision),
            Err(e) => match self.policy {
                FailurePolicy::Open => {
                    tracing::warn!(error = %e, "Rate limit store failed, allowing request");
                    Ok(RateDecision::Allowed { attempts: 0 })
                }
                FailurePolicy::Closed => {
                    tracing::error!(error = %e, "Rate limit store failed, rejecting request");
                    Err(AuthError::Internal(format!("rate limiter: {e}")))
                }
            },
        }
    }
}

impl std::fmt::Debug for LoginRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRateLimiter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
