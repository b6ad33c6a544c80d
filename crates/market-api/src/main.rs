//! auth-service 진입점.
//!
//! 설정 로드 → 로깅 → 메트릭 → 저장소/제한기 연결 → superadmin 부트스트랩 → 서버 실행 순서로 기동합니다.
//! 설정 검증(서명 키 누락 등)에 실패하면 서비스를 시작하지 않습니다.

use anyhow::Context;
use market_api::{
    auth_service_router, serve, setup_metrics_recorder, start_token_cleanup, AppState,
};
use market_core::{init_logging, AppConfig, LogConfig};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 만료 Refresh Token 정리 주기
const TOKEN_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("failed to load configuration")?;

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;
    info!("Starting auth-service...");

    let metrics_handle = setup_metrics_recorder().context("failed to install metrics recorder")?;
    info!("Prometheus metrics recorder initialized");

    // 전역 종료 토큰 (graceful shutdown용, 백그라운드 태스크에서 사용)
    let shutdown = CancellationToken::new();

    let state = AppState::connect(&config, &shutdown)
        .await
        .context("failed to initialize application state")?;
    info!(
        version = state.version,
        has_db = state.db_pool.is_some(),
        rate_limited = state.login_limiter.is_some(),
        "Application state initialized"
    );

    match &config.superadmin {
        Some(superadmin) => {
            if let Some(created) = state
                .sessions
                .bootstrap_superadmin(superadmin)
                .await
                .context("failed to bootstrap superadmin")?
            {
                info!(user_id = created.id, "Superadmin account bootstrapped");
            }
        }
        None => warn!("No superadmin configured; admin accounts cannot be created"),
    }

    start_token_cleanup(state.sessions.clone(), TOKEN_CLEANUP_INTERVAL, shutdown.child_token());

    let app = auth_service_router(
        state,
        Some(metrics_handle),
        Duration::from_secs(config.server.request_timeout_secs),
    );

    serve(app, &config.server, shutdown).await?;
    Ok(())
}
