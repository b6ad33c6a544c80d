//! 만료된 Refresh Token 정리 태스크.

use market_auth::SessionService;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 주기적으로 만료된 Refresh Token을 삭제하는 백그라운드 태스크를 시작합니다.
///
/// `shutdown`이 취소되면 종료됩니다.
pub fn start_token_cleanup(
    sessions: SessionService,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = sessions.purge_expired_tokens().await {
                        tracing::warn!(error = %e, "Refresh token cleanup failed");
                    }
                }

                _ = shutdown.cancelled() => {
                    tracing::info!("Refresh token cleanup stopped");
                    break;
                }
            }
        }
    })
}
