//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 인증 관련 카운터를 수집하고 `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설치하고 핸들을 반환합니다.
///
/// 레코더는 프로세스당 한 번만 설치할 수 있습니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 인증 메트릭
// ============================================================================

/// 로그인 결과 카운터 (`success`, `invalid_credentials`, `forbidden`, `error`).
pub fn record_login(outcome: &'static str) {
    counter!("auth_login_total", "outcome" => outcome).increment(1);
}

/// 로그인 rate limit 판정 카운터 (`allowed`, `limited`, `error`).
pub fn record_rate_limit(status: &'static str) {
    counter!("rate_limit_requests_total", "status" => status).increment(1);
}

/// 피어 서비스 호출 카운터.
pub fn record_peer_request(operation: &'static str, outcome: &'static str) {
    counter!("peer_requests_total", "op" => operation, "outcome" => outcome).increment(1);
}

// ============================================================================
// 경로 정규화
// ============================================================================

/// 경로의 동적 파라미터를 정규화하여 라벨 카디널리티를 제한합니다.
///
/// 예: `/api/users/42/block` → `/api/users/:id/block`
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let is_uuid = segment.len() == 36 && segment.chars().filter(|c| *c == '-').count() == 4;
            let is_numeric = !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit());
            if is_uuid || is_numeric {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_numeric_id() {
        assert_eq!(normalize_path("/api/users/42/block"), "/api/users/:id/block");
        assert_eq!(normalize_path("/api/admins/shop/7/approve"), "/api/admins/shop/:id/approve");
    }

    #[test]
    fn test_normalize_uuid() {
        assert_eq!(
            normalize_path("/api/orders/123e4567-e89b-12d3-a456-426614174000"),
            "/api/orders/:id"
        );
    }

    #[test]
    fn test_normalize_static_path() {
        assert_eq!(normalize_path("/api/auth/login"), "/api/auth/login");
        assert_eq!(normalize_path("/"), "/");
    }
}
