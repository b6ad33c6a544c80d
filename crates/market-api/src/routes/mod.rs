//! API 라우트.
//!
//! # auth-service 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness / readiness)
//! - `/metrics` - Prometheus 메트릭
//! - `/api/auth` - 회원가입, 로그인, 갱신, 로그아웃, 토큰 검증
//! - `/api/user` - 프로필 (모든 역할)
//! - `/api/admin` - 관리자 화면 (admin, superadmin)
//! - `/api/seller` - 판매자 화면 (seller)
//! - `/api/users` - 계정 관리 수신 측 (admin, superadmin)
//! - `/api/admins` - 관리자 계정 관리 (superadmin)
//!
//! # admin-service 라우트 구조
//!
//! - `/health`, `/metrics`
//! - `/api/admins` - 대시보드, 지표, 피어 서비스 관리 요청

pub mod admin;
pub mod admin_service;
pub mod admins;
pub mod auth;
pub mod health;
pub mod seller;
pub mod user;
pub mod users;

pub use admin::{admin_router, AreaResponse, StatusResponse};
pub use admin_service::{admin_service_api_router, PeerActionResponse, ServiceMetricsResponse};
pub use admins::{admins_router, AdminListResponse, AdminResponse};
pub use auth::{auth_router, LoginRequest, MessageResponse, RefreshRequest, RegisterResponse};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use seller::seller_router;
pub use user::user_router;
pub use users::{users_router, ResetPasswordResponse, UserStatusResponse};

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::middleware::metrics_layer;
use crate::state::{AdminState, AppState};

/// auth-service 라우터 생성.
pub fn auth_service_router(
    state: AppState,
    metrics_handle: Option<PrometheusHandle>,
    request_timeout: Duration,
) -> Router {
    let api = Router::new()
        .nest("/health", health_router())
        .nest("/api/auth", auth_router(&state))
        .nest("/api/user", user_router(&state))
        .nest("/api/admin", admin_router(&state))
        .nest("/api/seller", seller_router(&state))
        .nest("/api/users", users_router(&state))
        .nest("/api/admins", admins_router(&state))
        .with_state(state);

    with_common_layers(api, metrics_handle, request_timeout)
}

/// admin-service 라우터 생성.
pub fn admin_service_router(
    state: AdminState,
    metrics_handle: Option<PrometheusHandle>,
    request_timeout: Duration,
) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/admins", admin_service_api_router(&state))
        .with_state(state);

    with_common_layers(api, metrics_handle, request_timeout)
}

fn with_common_layers(
    api: Router,
    metrics_handle: Option<PrometheusHandle>,
    request_timeout: Duration,
) -> Router {
    let router = match metrics_handle {
        Some(handle) => {
            let metrics_router = Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(handle);
            api.merge(metrics_router)
        }
        None => api,
    };

    router
        // 메트릭 미들웨어 (모든 요청에 적용)
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(cors_layer())
}

/// Prometheus 메트릭 핸들러.
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// CORS 레이어.
///
/// `CORS_ORIGINS`(쉼표 구분)가 설정되면 해당 origin만 허용합니다.
fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = std::env::var("CORS_ORIGINS")
        .map(|v| {
            v.split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        warn!("CORS_ORIGINS not set or empty, allowing any origin (development mode)");
        return layer.allow_origin(AllowOrigin::any());
    }

    info!("CORS configured with {} allowed origins", origins.len());
    // 자격 증명 허용은 origin 목록이 명시된 경우에만
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}
