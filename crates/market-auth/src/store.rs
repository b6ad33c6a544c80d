//! 자격 증명 및 Refresh Token 저장소 추상화.
//!
//! 서비스는 [`CredentialStore`]와 [`RefreshTokenStore`] 트레이트에만 의존합니다.
//! PostgreSQL 구현은 `market-api`의 repository 모듈에, 프로세스 내 구현은
//! 이 모듈에 있습니다 (단일 인스턴스 실행 및 테스트용).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::principal::{AccountStatus, NewPrincipal, Principal, ProfileUpdate, StoredPrincipal};
use crate::roles::Role;

/// 저장소 에러.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 유일성 제약 위반 (이메일/휴대폰 중복)
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    /// 저장된 데이터 형식 오류
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// 백엔드 연결/쿼리 실패
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// 저장된 Refresh Token.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub principal_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(token: String, principal_id: i64, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            token,
            principal_id,
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl std::fmt::Debug for RefreshTokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenRecord")
            .field("principal_id", &self.principal_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// 인증 주체 저장소.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 이메일 또는 휴대폰 번호로 조회.
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<StoredPrincipal>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Principal>, StoreError>;

    /// 이메일 또는 휴대폰 번호가 이미 사용 중인지 확인.
    async fn exists(&self, email: &str, mobile: Option<&str>) -> Result<bool, StoreError>;

    /// 신규 주체 저장. 유일성 위반은 [`StoreError::Duplicate`].
    async fn insert(&self, principal: NewPrincipal) -> Result<Principal, StoreError>;

    /// 역할을 가진 주체 목록 (id 오름차순).
    async fn list_by_role(&self, role: Role) -> Result<Vec<Principal>, StoreError>;

    /// 프로필 수정. 대상이 없으면 `None`, 유일성 위반은 [`StoreError::Duplicate`].
    async fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<Principal>, StoreError>;

    /// 상태 변경. 대상이 없으면 `None`.
    async fn set_status(
        &self,
        id: i64,
        status: AccountStatus,
    ) -> Result<Option<Principal>, StoreError>;

    /// 비밀번호 해시 교체. 대상이 없으면 `false`.
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, StoreError>;

    /// 삭제. 대상이 없으면 `false`.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

/// Refresh Token 저장소.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn save(&self, record: RefreshTokenRecord) -> Result<(), StoreError>;

    /// 토큰을 원자적으로 소비(삭제 후 반환)합니다.
    ///
    /// 동시에 같은 토큰으로 호출되어도 최대 한 호출만 `Some`을 받습니다.
    async fn take(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// 토큰 폐기. 없는 토큰이어도 에러가 아닙니다.
    async fn revoke(&self, token: &str) -> Result<bool, StoreError>;

    /// 주체의 모든 토큰 폐기.
    async fn revoke_all_for(&self, principal_id: i64) -> Result<u64, StoreError>;

    /// 만료된 토큰 정리.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// 프로세스 내 자격 증명 저장소.
#[derive(Debug)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<i64, StoredPrincipal>>,
    next_id: AtomicI64,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_identifier(record: &StoredPrincipal, identifier: &str) -> bool {
    let principal = &record.principal;
    principal.email.eq_ignore_ascii_case(identifier)
        || principal.mobile.as_deref() == Some(identifier)
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<StoredPrincipal>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| matches_identifier(r, identifier))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Principal>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(&id)
            .map(|r| r.principal.clone()))
    }

    async fn exists(&self, email: &str, mobile: Option<&str>) -> Result<bool, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().any(|r| {
            r.principal.email.eq_ignore_ascii_case(email)
                || (mobile.is_some() && r.principal.mobile.as_deref() == mobile)
        }))
    }

    async fn insert(&self, new: NewPrincipal) -> Result<Principal, StoreError> {
        // 중복 검사와 삽입은 같은 쓰기 잠금 안에서 수행
        let mut records = self.records.write().await;

        if records
            .values()
            .any(|r| r.principal.email.eq_ignore_ascii_case(&new.email))
        {
            return Err(StoreError::Duplicate("email"));
        }
        if let Some(mobile) = new.mobile.as_deref() {
            if records
                .values()
                .any(|r| r.principal.mobile.as_deref() == Some(mobile))
            {
                return Err(StoreError::Duplicate("mobile"));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let principal = Principal {
            id,
            name: new.name,
            email: new.email,
            mobile: new.mobile,
            roles: new.roles,
            status: new.status,
        };
        records.insert(
            id,
            StoredPrincipal {
                principal: principal.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(principal)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Principal>, StoreError> {
        let records = self.records.read().await;
        let mut principals: Vec<Principal> = records
            .values()
            .filter(|r| r.principal.roles.contains(role))
            .map(|r| r.principal.clone())
            .collect();
        principals.sort_by_key(|p| p.id);
        Ok(principals)
    }

    async fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<Principal>, StoreError> {
        let mut records = self.records.write().await;
        if !records.contains_key(&id) {
            return Ok(None);
        }

        let others = || records.iter().filter(|(other, _)| **other != id);
        if let Some(email) = update.email.as_deref() {
            if others().any(|(_, r)| r.principal.email.eq_ignore_ascii_case(email)) {
                return Err(StoreError::Duplicate("email"));
            }
        }
        if let Some(mobile) = update.mobile.as_deref() {
            if others().any(|(_, r)| r.principal.mobile.as_deref() == Some(mobile)) {
                return Err(StoreError::Duplicate("mobile"));
            }
        }

        Ok(records.get_mut(&id).map(|record| {
            let principal = &mut record.principal;
            if let Some(name) = update.name {
                principal.name = name;
            }
            if let Some(email) = update.email {
                principal.email = email;
            }
            if let Some(mobile) = update.mobile {
                principal.mobile = Some(mobile);
            }
            principal.clone()
        }))
    }

    async fn set_status(
        &self,
        id: i64,
        status: AccountStatus,
    ) -> Result<Option<Principal>, StoreError> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(&id).map(|r| {
            r.principal.status = status;
            r.principal.clone()
        }))
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(record) => {
                record.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(&id).is_some())
    }
}

/// 프로세스 내 Refresh Token 저장소.
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStore {
    tokens: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn save(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        self.tokens
            .write()
            .await
            .insert(record.token.clone(), record);
        Ok(())
    }

    async fn take(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.tokens.write().await.remove(token))
    }

    async fn revoke(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.tokens.write().await.remove(token).is_some())
    }

    async fn revoke_all_for(&self, principal_id: i64) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, r| r.principal_id != principal_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, r| !r.is_expired_at(now));
        Ok((before - tokens.len()) as u64)
    }
}
