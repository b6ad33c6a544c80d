//! 외부 서비스 연동 및 백그라운드 서비스.

pub mod peer;
pub mod token_cleanup;

pub use peer::{PeerClient, PeerError, IDEMPOTENCY_KEY_HEADER};
pub use token_cleanup::start_token_cleanup;
