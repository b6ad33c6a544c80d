//! HTTP 서버 실행 및 graceful shutdown.

use axum::Router;
use market_core::ServerConfig;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 라우터를 바인딩하고 종료 시그널까지 요청을 처리합니다.
///
/// 소켓 주소는 [`axum::extract::ConnectInfo`]로 핸들러에 전달됩니다 (로그인 시도 제한 키).
/// 서버가 멈추면 `shutdown`을 취소하여 백그라운드 태스크에 종료를 전파합니다.
pub async fn serve(
    router: Router,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "Server listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    shutdown.cancel();
    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C, SIGTERM 또는 `shutdown` 취소 중 먼저 발생한 것을 기다린 뒤
/// 종료 토큰을 취소합니다.
pub async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
        _ = shutdown.cancelled() => {
            info!("Shutdown requested");
        }
    }

    // 모든 백그라운드 태스크에 종료 시그널 전파
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use std::time::Duration;

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        };
        let router = Router::new().route("/", get(|| async { "OK" }));
        let shutdown = CancellationToken::new();
        let child = shutdown.child_token();

        let server = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { serve(router, &config, shutdown).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(child.is_cancelled());
    }
}
