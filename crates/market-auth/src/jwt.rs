//! JWT 토큰 처리.
//!
//! Access Token 발급([`TokenIssuer`])과 검증([`TokenVerifier`]), 그리고
//! 서버 측에 저장되는 불투명 Refresh Token 생성을 담당합니다.
//!
//! Access Token은 HS256으로만 서명/검증하며 만료 허용 오차(leeway)는 0입니다.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use market_core::{AuthConfig, ConfigError};
use rand::{rngs::OsRng, RngCore};
use secrecy::ExposeSecret;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::error::{AuthError, TokenRejection};
use crate::principal::Principal;
use crate::roles::RoleSet;

/// 권장 최소 서명 키 길이 (바이트)
const MIN_SECRET_LEN: usize = 32;

/// Refresh Token 원본 바이트 수
const REFRESH_TOKEN_BYTES: usize = 32;

/// JWT Access Token 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// 사용자 ID. 과거 토큰의 숫자 문자열도 허용합니다.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: i64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    /// 역할 목록 (비어 있으면 역직렬화 실패)
    pub roles: RoleSet,
    /// Issued At (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_blocked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom("id must be numeric")),
    }
}

impl AccessClaims {
    /// 주체 정보로 Claims 생성.
    pub fn for_principal(principal: &Principal, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        Self {
            id: principal.id,
            email: principal.email.clone(),
            mobile: principal.mobile.clone(),
            roles: principal.roles.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            jti: Some(uuid::Uuid::new_v4().to_string()),
            is_blocked: None,
            is_active: None,
        }
    }
}

/// 발급된 Access Token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// 만료까지 남은 시간 (초)
    pub expires_in: u64,
}

/// 발급된 Refresh Token (저장 전).
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Access Token + Refresh Token 페어.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access Token 만료 시간 (초)
    pub expires_in: u64,
    /// 토큰 타입 (항상 "Bearer")
    pub token_type: String,
}

impl TokenPair {
    pub fn bearer(access: IssuedToken, refresh: IssuedRefreshToken) -> Self {
        Self {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: access.expires_in,
            token_type: "Bearer".to_string(),
        }
    }
}

/// 불투명 Refresh Token 생성.
///
/// OS CSPRNG에서 32바이트를 읽어 패딩 없는 URL-safe base64로 인코딩합니다.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn check_secret(config: &AuthConfig) -> Result<&[u8], ConfigError> {
    let secret = config.jwt_secret.expose_secret();
    if secret.trim().is_empty() {
        return Err(ConfigError::MissingSecret);
    }
    if secret.len() < MIN_SECRET_LEN {
        tracing::warn!(
            length = secret.len(),
            minimum = MIN_SECRET_LEN,
            "JWT secret is shorter than recommended"
        );
    }
    Ok(secret.as_bytes())
}

/// Access Token 발급기.
///
/// 수명은 신뢰 등급별로 구분됩니다: buyer/seller는 `standard`,
/// admin/superadmin이 하나라도 포함되면 `privileged`.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    standard_ttl: Duration,
    privileged_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        let secret = check_secret(config)?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            standard_ttl: config.access_token_ttl(),
            privileged_ttl: config.privileged_access_token_ttl(),
            refresh_ttl: config.refresh_token_ttl(),
        })
    }

    /// 역할 집합에 적용되는 Access Token 수명.
    pub fn access_ttl_for(&self, roles: &RoleSet) -> Duration {
        if roles.is_privileged() {
            self.privileged_ttl
        } else {
            self.standard_ttl
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Claims를 HS256으로 서명합니다.
    pub fn sign(&self, claims: &AccessClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("token encoding failed: {e}")))
    }

    pub fn issue_access_token(&self, principal: &Principal) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let ttl = self.access_ttl_for(&principal.roles);
        let claims = AccessClaims::for_principal(principal, now, ttl);
        let token = self.sign(&claims)?;

        Ok(IssuedToken {
            token,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(now),
            expires_in: ttl.as_secs(),
        })
    }

    pub fn issue_refresh_token(&self) -> IssuedRefreshToken {
        let ttl = chrono::Duration::from_std(self.refresh_ttl).unwrap_or(chrono::Duration::zero());
        IssuedRefreshToken {
            token: generate_refresh_token(),
            expires_at: Utc::now() + ttl,
        }
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("standard_ttl", &self.standard_ttl)
            .field("privileged_ttl", &self.privileged_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

/// Access Token 검증기.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        let secret = check_secret(config)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            decoding: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// 토큰 서명, 알고리즘, 만료, 클레임 형식을 검증합니다.
    ///
    /// 차단(`is_blocked == true`) 또는 비활성(`is_active == false`) 클레임은 403입니다.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| AuthError::Unauthenticated(classify(e.kind())))?;
        let claims = data.claims;

        if claims.is_blocked == Some(true) {
            return Err(AuthError::AccountBlocked);
        }
        if claims.is_active == Some(false) {
            return Err(AuthError::AccountInactive);
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

fn classify(kind: &ErrorKind) -> TokenRejection {
    match kind {
        ErrorKind::ExpiredSignature => TokenRejection::Expired,
        ErrorKind::InvalidSignature => TokenRejection::BadSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenRejection::WrongAlgorithm
        }
        ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => TokenRejection::InvalidClaims,
        _ => TokenRejection::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::AccountStatus;
    use crate::roles::Role;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

    fn config() -> AuthConfig {
        AuthConfig::with_secret(TEST_SECRET)
    }

    fn principal(roles: RoleSet) -> Principal {
        Principal {
            id: 42,
            name: "Karim".into(),
            email: "karim@example.com".into(),
            mobile: Some("01712345678".into()),
            roles,
            status: AccountStatus::Active,
        }
    }

    fn reject_reason(result: Result<AccessClaims, AuthError>) -> TokenRejection {
        match result {
            Err(AuthError::Unauthenticated(reason)) => reason,
            other => panic!("expected unauthenticated, got {other:?}"),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new(&config()).unwrap();
        let verifier = TokenVerifier::new(&config()).unwrap();

        let issued = issuer
            .issue_access_token(&principal(RoleSet::single(Role::Seller)))
            .unwrap();
        let claims = verifier.verify(&issued.token).unwrap();

        assert_eq!(claims.id, 42);
        assert_eq!(claims.email, "karim@example.com");
        assert_eq!(claims.mobile.as_deref(), Some("01712345678"));
        assert!(claims.roles.contains(Role::Seller));
        assert!(claims.jti.is_some());
        assert_eq!(issued.expires_in, 900);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = AuthConfig::with_secret("");
        assert!(matches!(
            TokenIssuer::new(&config),
            Err(ConfigError::MissingSecret)
        ));
        assert!(matches!(
            TokenVerifier::new(&config),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn test_privileged_ttl() {
        let mut config = config();
        config.access_token_ttl_secs = 600;
        config.privileged_access_token_ttl_secs = 300;
        let issuer = TokenIssuer::new(&config).unwrap();

        assert_eq!(
            issuer.access_ttl_for(&RoleSet::single(Role::Buyer)),
            Duration::from_secs(600)
        );
        assert_eq!(
            issuer.access_ttl_for(&RoleSet::new([Role::Buyer, Role::Admin]).unwrap()),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new(&config()).unwrap();
        let verifier = TokenVerifier::new(&config()).unwrap();

        let mut claims = AccessClaims::for_principal(
            &principal(RoleSet::single(Role::Buyer)),
            Utc::now(),
            Duration::from_secs(60),
        );
        claims.exp = Utc::now().timestamp() - 1;
        let token = issuer.sign(&claims).unwrap();

        assert_eq!(reject_reason(verifier.verify(&token)), TokenRejection::Expired);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = TokenIssuer::new(&AuthConfig::with_secret(
            "another-secret-key-that-is-also-32-chars-long",
        ))
        .unwrap();
        let verifier = TokenVerifier::new(&config()).unwrap();

        let issued = issuer
            .issue_access_token(&principal(RoleSet::single(Role::Buyer)))
            .unwrap();
        assert_eq!(
            reject_reason(verifier.verify(&issued.token)),
            TokenRejection::BadSignature
        );
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let verifier = TokenVerifier::new(&config()).unwrap();
        let claims = AccessClaims::for_principal(
            &principal(RoleSet::single(Role::Admin)),
            Utc::now(),
            Duration::from_secs(60),
        );
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            reject_reason(verifier.verify(&token)),
            TokenRejection::WrongAlgorithm
        );
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let verifier = TokenVerifier::new(&config()).unwrap();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let exp = Utc::now().timestamp() + 600;
        let payload = URL_SAFE_NO_PAD.encode(format!(
            r#"{{"id":1,"email":"a@b.com","roles":["superadmin"],"exp":{exp}}}"#
        ));
        let token = format!("{header}.{payload}.");

        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    fn sign_raw(payload: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_or_empty_roles_rejected() {
        let verifier = TokenVerifier::new(&config()).unwrap();
        let exp = Utc::now().timestamp() + 600;

        let no_roles = sign_raw(serde_json::json!({"id": 1, "email": "a@b.com", "exp": exp}));
        let empty_roles =
            sign_raw(serde_json::json!({"id": 1, "email": "a@b.com", "roles": [], "exp": exp}));
        let no_exp = sign_raw(serde_json::json!({"id": 1, "email": "a@b.com", "roles": ["buyer"]}));

        assert_eq!(
            reject_reason(verifier.verify(&no_roles)),
            TokenRejection::InvalidClaims
        );
        assert_eq!(
            reject_reason(verifier.verify(&empty_roles)),
            TokenRejection::InvalidClaims
        );
        assert_eq!(
            reject_reason(verifier.verify(&no_exp)),
            TokenRejection::InvalidClaims
        );
    }

    #[test]
    fn test_legacy_string_id_accepted() {
        let verifier = TokenVerifier::new(&config()).unwrap();
        let exp = Utc::now().timestamp() + 600;
        let token = sign_raw(serde_json::json!({
            "id": "17", "email": "a@b.com", "roles": ["buyer"], "exp": exp
        }));
        assert_eq!(verifier.verify(&token).unwrap().id, 17);

        let bad = sign_raw(serde_json::json!({
            "id": "abc", "email": "a@b.com", "roles": ["buyer"], "exp": exp
        }));
        assert!(verifier.verify(&bad).is_err());
    }

    #[test]
    fn test_blocked_and_inactive_claims_forbidden() {
        let verifier = TokenVerifier::new(&config()).unwrap();
        let exp = Utc::now().timestamp() + 600;

        let blocked = sign_raw(serde_json::json!({
            "id": 1, "email": "a@b.com", "roles": ["buyer"], "exp": exp, "is_blocked": true
        }));
        let inactive = sign_raw(serde_json::json!({
            "id": 1, "email": "a@b.com", "roles": ["buyer"], "exp": exp, "is_active": false
        }));

        assert!(matches!(
            verifier.verify(&blocked),
            Err(AuthError::AccountBlocked)
        ));
        assert!(matches!(
            verifier.verify(&inactive),
            Err(AuthError::AccountInactive)
        ));
    }

    #[test]
    fn test_refresh_token_shape() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();

        assert_ne!(a, b);
        // 32바이트 → 패딩 없는 base64 43자
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let verifier = TokenVerifier::new(&config()).unwrap();
        assert!(matches!(
            verifier.verify("not.a.jwt"),
            Err(AuthError::Unauthenticated(_))
        ));
    }
}
