//! admin-service 진입점.
//!
//! 토큰은 공유 라이브러리로 로컬 검증하고, 계정/상점 변경은 피어 서비스에 전달합니다.

use anyhow::Context;
use market_api::{admin_service_router, serve, setup_metrics_recorder, AdminState};
use market_core::{init_logging, AppConfig, LogConfig};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("failed to load configuration")?;

    init_logging(LogConfig::from(&config.logging))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;
    info!("Starting admin-service...");

    let metrics_handle = setup_metrics_recorder().context("failed to install metrics recorder")?;

    let state = AdminState::from_config(&config).context("failed to initialize admin state")?;
    info!(version = state.version, "Admin state initialized");

    let app = admin_service_router(
        state,
        Some(metrics_handle),
        Duration::from_secs(config.server.request_timeout_secs),
    );

    serve(app, &config.server, CancellationToken::new()).await?;
    Ok(())
}
