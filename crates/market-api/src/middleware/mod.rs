//! HTTP 미들웨어.
//!
//! - [`metrics`]: 요청 수/지속 시간 메트릭 수집
//! - [`rate_limit`]: 로그인 엔드포인트 IP별 시도 제한

pub mod metrics;
pub mod rate_limit;

pub use metrics::metrics_layer;
pub use rate_limit::{client_ip, login_rate_limit};
