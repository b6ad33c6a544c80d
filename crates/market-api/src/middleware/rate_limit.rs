//! 로그인 rate limiting middleware.
//!
//! 클라이언트 IP별 로그인 시도를 제한합니다. 성공한 로그인도 시도로 집계되며
//! 카운터는 윈도우가 끝나야 초기화됩니다.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use market_auth::AuthError;
use std::net::SocketAddr;

use crate::metrics::record_rate_limit;
use crate::state::AppState;

/// 요청의 클라이언트 IP를 결정합니다.
///
/// 프록시 헤더(`X-Forwarded-For`, `X-Real-IP`)는 `trust_proxy_headers`가 켜져 있을 때만
/// 사용하며, 그렇지 않으면 소켓 주소를 사용합니다.
pub fn client_ip(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        let headers = request.headers();

        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 로그인 시도 제한 미들웨어.
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(limiter) = state.login_limiter.clone() else {
        return next.run(request).await;
    };

    let key = client_ip(&request, state.trust_proxy_headers);

    if let Err(e) = limiter.check(&key).await {
        let status = match e {
            AuthError::RateLimited { .. } => "limited",
            _ => "error",
        };
        record_rate_limit(status);
        return e.into_response();
    }
    record_rate_limit("allowed");

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(headers: &[(&str, &str)], peer: Option<SocketAddr>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/auth/login");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(addr) = peer {
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    #[test]
    fn test_proxy_headers_ignored_by_default() {
        let peer: SocketAddr = "192.168.1.10:50000".parse().unwrap();
        let request = request_with(&[("x-forwarded-for", "1.2.3.4")], Some(peer));
        assert_eq!(client_ip(&request, false), "192.168.1.10");
    }

    #[test]
    fn test_proxy_headers_when_trusted() {
        let peer: SocketAddr = "10.0.0.1:50000".parse().unwrap();
        let forwarded = request_with(&[("x-forwarded-for", "1.2.3.4, 10.0.0.1")], Some(peer));
        assert_eq!(client_ip(&forwarded, true), "1.2.3.4");

        let real_ip = request_with(&[("x-real-ip", "5.6.7.8")], Some(peer));
        assert_eq!(client_ip(&real_ip, true), "5.6.7.8");

        let none = request_with(&[], Some(peer));
        assert_eq!(client_ip(&none, true), "10.0.0.1");
    }

    #[test]
    fn test_unknown_without_peer() {
        let request = request_with(&[], None);
        assert_eq!(client_ip(&request, false), "unknown");
    }
}
