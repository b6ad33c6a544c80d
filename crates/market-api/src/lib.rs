//! 마켓플레이스 인증/관리 HTTP 서비스.
//!
//! 이 크레이트는 두 개의 바이너리를 제공합니다:
//! - `auth-service`: 회원가입, 로그인, 토큰 갱신, 역할별 화면, 계정 관리 수신 측
//! - `admin-service`: 관리자 대시보드와 피어 서비스 관리 요청 전달
//!
//! # 모듈 구성
//!
//! - [`state`]: 서비스별 공유 상태 (AppState, AdminState)
//! - [`routes`]: REST API 엔드포인트
//! - [`repository`]: PostgreSQL 저장소
//! - [`services`]: 피어 서비스 클라이언트, 백그라운드 정리 태스크
//! - [`middleware`]: 로그인 시도 제한, HTTP 메트릭
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`server`]: 서버 실행 및 graceful shutdown

pub mod error;
pub mod metrics;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod server;
pub mod services;
pub mod state;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use middleware::{client_ip, login_rate_limit, metrics_layer};
pub use repository::{PgCredentialStore, PgRefreshTokenStore};
pub use routes::{admin_service_router, auth_service_router};
pub use server::{serve, shutdown_signal};
pub use services::{start_token_cleanup, PeerClient, PeerError};
pub use state::{ActionStats, AdminState, AppState, StartupError};
