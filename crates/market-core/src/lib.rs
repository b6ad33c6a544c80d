//! # Market Core
//!
//! 마켓플레이스 서비스 전반에서 공유하는 기반 타입을 제공합니다:
//! - 설정 관리 ([`config`])
//! - 로깅 인프라 ([`logging`])
//! - 기동 단계 에러 ([`error`])

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;
