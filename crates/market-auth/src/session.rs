//! 세션 흐름: 회원가입, 로그인, 토큰 갱신, 로그아웃.
//!
//! 계정 관리(상태 변경, 삭제, 비밀번호 초기화)와 관리자 계정 생성도 여기서 처리합니다.
//! 저장소는 트레이트 객체로 주입되므로 PostgreSQL과 프로세스 내 구현을 모두 사용할 수 있습니다.

use chrono::Utc;
use market_core::SuperAdminConfig;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::error::{AuthError, AuthResult};
use crate::jwt::{TokenIssuer, TokenPair};
use crate::password::PasswordService;
use crate::principal::{AccountStatus, NewPrincipal, Principal, ProfileUpdate};
use crate::roles::{Role, RoleSet};
use crate::store::{CredentialStore, RefreshTokenRecord, RefreshTokenStore, StoreError};

/// 초기화 비밀번호 길이
const TEMPORARY_PASSWORD_LEN: usize = 12;

/// 방글라데시 휴대폰 번호 형식 검증 (`01[3-9]` + 8자리).
fn validate_mobile(mobile: &str) -> Result<(), ValidationError> {
    let bytes = mobile.as_bytes();
    let valid = bytes.len() == 11
        && bytes.iter().all(u8::is_ascii_digit)
        && bytes[0] == b'0'
        && bytes[1] == b'1'
        && (b'3'..=b'9').contains(&bytes[2]);

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_mobile")
            .with_message("mobile must match 01[3-9]XXXXXXXX".into()))
    }
}

/// 계정 생성 요청.
#[derive(Clone, Deserialize, Validate)]
pub struct NewAccount {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "invalid email"))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "validate_mobile"))]
    pub mobile: Option<String>,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("mobile", &self.mobile)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

impl NewAccount {
    fn check(&self) -> AuthResult<()> {
        self.validate()
            .map_err(|errors| AuthError::Validation(errors.to_string()))
    }
}

fn map_insert_error(error: StoreError) -> AuthError {
    match error {
        StoreError::Duplicate(_) => AuthError::AlreadyRegistered,
        other => AuthError::Store(other),
    }
}

fn require_superadmin(requester: &RoleSet) -> AuthResult<()> {
    if requester.contains(Role::SuperAdmin) {
        Ok(())
    } else {
        Err(AuthError::InsufficientRole)
    }
}

/// admin 계정 수정 요청. 생략된 필드는 유지됩니다.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AdminUpdate {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "invalid email"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_mobile"))]
    pub mobile: Option<String>,
    pub status: Option<AccountStatus>,
}

impl AdminUpdate {
    fn check(&self) -> AuthResult<()> {
        self.validate()
            .map_err(|errors| AuthError::Validation(errors.to_string()))
    }

    fn profile(&self) -> ProfileUpdate {
        ProfileUpdate {
            name: self.name.clone(),
            email: self.email.clone(),
            mobile: self.mobile.clone(),
        }
    }
}

/// 세션 서비스.
#[derive(Clone)]
pub struct SessionService {
    credentials: Arc<dyn CredentialStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    issuer: TokenIssuer,
    passwords: PasswordService,
}

impl SessionService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        issuer: TokenIssuer,
        passwords: PasswordService,
    ) -> Self {
        Self {
            credentials,
            refresh_tokens,
            issuer,
            passwords,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// 회원가입.
    ///
    /// 스스로 가입할 수 있는 역할은 buyer/seller뿐입니다.
    pub async fn register(&self, account: NewAccount) -> AuthResult<Principal> {
        account.check()?;

        if account.roles.is_empty() {
            return Err(AuthError::Validation("roles must not be empty".to_string()));
        }
        if let Some(role) = account.roles.iter().find(|r| !r.is_self_assignable()) {
            return Err(AuthError::Validation(format!(
                "role '{role}' cannot be self-assigned"
            )));
        }
        let roles = RoleSet::new(account.roles.iter().copied())
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let principal = self.create(account, roles).await?;
        tracing::info!(user_id = principal.id, roles = ?principal.roles, "User registered");
        Ok(principal)
    }

    /// 관리자 계정 생성. superadmin만 호출할 수 있으며 역할은 admin으로 고정됩니다.
    pub async fn create_admin(
        &self,
        requester: &RoleSet,
        account: NewAccount,
    ) -> AuthResult<Principal> {
        require_superadmin(requester)?;
        account.check()?;

        let principal = self.create(account, RoleSet::single(Role::Admin)).await?;
        tracing::info!(user_id = principal.id, "Admin account created");
        Ok(principal)
    }

    /// 설정된 superadmin 계정이 없으면 생성합니다.
    ///
    /// 같은 이메일/휴대폰 번호의 주체가 이미 있으면 `None`.
    pub async fn bootstrap_superadmin(
        &self,
        config: &SuperAdminConfig,
    ) -> AuthResult<Option<Principal>> {
        if self
            .credentials
            .exists(&config.email, config.mobile.as_deref())
            .await?
        {
            tracing::debug!(email = %config.email, "Superadmin already exists, skipping bootstrap");
            return Ok(None);
        }

        let account = NewAccount {
            name: config.name.clone(),
            email: config.email.clone(),
            mobile: config.mobile.clone(),
            password: config.password.expose_secret().to_string(),
            roles: vec![Role::SuperAdmin],
        };
        account.check()?;

        let principal = self
            .create(account, RoleSet::single(Role::SuperAdmin))
            .await?;
        tracing::info!(user_id = principal.id, "Superadmin created on first launch");
        Ok(Some(principal))
    }

    async fn create(&self, account: NewAccount, roles: RoleSet) -> AuthResult<Principal> {
        if self
            .credentials
            .exists(&account.email, account.mobile.as_deref())
            .await?
        {
            return Err(AuthError::AlreadyRegistered);
        }

        let password_hash = self.passwords.hash(account.password).await?;
        self.credentials
            .insert(NewPrincipal {
                name: account.name,
                email: account.email,
                mobile: account.mobile,
                roles,
                status: AccountStatus::Active,
                password_hash,
            })
            .await
            .map_err(map_insert_error)
    }

    /// 로그인.
    ///
    /// 존재하지 않는 식별자와 잘못된 비밀번호는 구분되지 않습니다.
    pub async fn login(&self, identifier: &str, password: &str) -> AuthResult<TokenPair> {
        let Some(record) = self.credentials.find_by_identifier(identifier.trim()).await? else {
            self.passwords.verify_dummy(password.to_string()).await;
            return Err(AuthError::InvalidCredentials);
        };

        let matches = self
            .passwords
            .verify(password.to_string(), record.password_hash)
            .await?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let principal = record.principal;
        match principal.status {
            AccountStatus::Blocked => return Err(AuthError::AccountBlocked),
            AccountStatus::Pending => return Err(AuthError::AccountInactive),
            AccountStatus::Active => {}
        }

        let tokens = self.issue_pair(&principal).await?;
        tracing::info!(user_id = principal.id, "User logged in");
        Ok(tokens)
    }

    /// Refresh Token으로 새 토큰 쌍을 발급합니다.
    ///
    /// 제시된 토큰은 성공 여부와 관계없이 소비됩니다.
    pub async fn refresh(&self, token: &str) -> AuthResult<TokenPair> {
        let record = self
            .refresh_tokens
            .take(token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if record.is_expired_at(Utc::now()) {
            tracing::debug!(user_id = record.principal_id, "Expired refresh token presented");
            return Err(AuthError::InvalidRefreshToken);
        }

        let principal = self
            .credentials
            .find_by_id(record.principal_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        match principal.status {
            AccountStatus::Blocked => return Err(AuthError::AccountBlocked),
            AccountStatus::Pending => return Err(AuthError::AccountInactive),
            AccountStatus::Active => {}
        }

        let tokens = self.issue_pair(&principal).await?;
        tracing::debug!(user_id = principal.id, "Refresh token rotated");
        Ok(tokens)
    }

    /// 로그아웃. 존재하지 않는 토큰이어도 성공합니다.
    pub async fn logout(&self, token: &str) -> AuthResult<()> {
        let revoked = self.refresh_tokens.revoke(token).await?;
        tracing::debug!(revoked, "Logout processed");
        Ok(())
    }

    async fn issue_pair(&self, principal: &Principal) -> AuthResult<TokenPair> {
        let access = self.issuer.issue_access_token(principal)?;
        let refresh = self.issuer.issue_refresh_token();

        self.refresh_tokens
            .save(RefreshTokenRecord::new(
                refresh.token.clone(),
                principal.id,
                refresh.expires_at,
            ))
            .await?;

        Ok(TokenPair::bearer(access, refresh))
    }

    /// 계정 상태 변경. 차단 시 발급된 Refresh Token을 모두 폐기합니다.
    ///
    /// admin/superadmin 계정은 superadmin만 변경할 수 있습니다.
    pub async fn set_status(
        &self,
        requester: &RoleSet,
        id: i64,
        status: AccountStatus,
    ) -> AuthResult<Option<Principal>> {
        if self.managed_target(requester, id).await?.is_none() {
            return Ok(None);
        }
        self.apply_status(id, status).await
    }

    async fn apply_status(&self, id: i64, status: AccountStatus) -> AuthResult<Option<Principal>> {
        let updated = self.credentials.set_status(id, status).await?;

        if updated.is_some() && status == AccountStatus::Blocked {
            let revoked = self.refresh_tokens.revoke_all_for(id).await?;
            tracing::info!(user_id = id, revoked, "User blocked");
        } else if updated.is_some() {
            tracing::info!(user_id = id, status = %status, "User status changed");
        }
        Ok(updated)
    }

    /// 계정 삭제. 대상이 없으면 `false`.
    pub async fn delete_principal(&self, requester: &RoleSet, id: i64) -> AuthResult<bool> {
        if self.managed_target(requester, id).await?.is_none() {
            return Ok(false);
        }
        self.remove(id).await
    }

    async fn remove(&self, id: i64) -> AuthResult<bool> {
        self.refresh_tokens.revoke_all_for(id).await?;
        let deleted = self.credentials.delete(id).await?;
        if deleted {
            tracing::info!(user_id = id, "User deleted");
        }
        Ok(deleted)
    }

    /// 관리 대상 조회.
    ///
    /// 대상이 admin/superadmin 역할을 가지면 요청자는 superadmin이어야 합니다.
    async fn managed_target(&self, requester: &RoleSet, id: i64) -> AuthResult<Option<Principal>> {
        let Some(target) = self.credentials.find_by_id(id).await? else {
            return Ok(None);
        };
        if target.roles.is_privileged() && !requester.contains(Role::SuperAdmin) {
            tracing::warn!(target_id = id, "Privileged account change denied");
            return Err(AuthError::InsufficientRole);
        }
        Ok(Some(target))
    }

    /// admin 역할을 가진 주체 목록. superadmin 전용.
    pub async fn list_admins(&self, requester: &RoleSet) -> AuthResult<Vec<Principal>> {
        require_superadmin(requester)?;
        Ok(self.credentials.list_by_role(Role::Admin).await?)
    }

    /// admin 계정 조회. admin 역할이 없는 주체는 `None`.
    pub async fn get_admin(&self, requester: &RoleSet, id: i64) -> AuthResult<Option<Principal>> {
        require_superadmin(requester)?;
        Ok(self
            .credentials
            .find_by_id(id)
            .await?
            .filter(|p| p.roles.contains(Role::Admin)))
    }

    /// admin 계정 수정 (프로필, 상태).
    pub async fn update_admin(
        &self,
        requester: &RoleSet,
        id: i64,
        update: AdminUpdate,
    ) -> AuthResult<Option<Principal>> {
        if self.get_admin(requester, id).await?.is_none() {
            return Ok(None);
        }
        update.check()?;

        let profile = update.profile();
        let mut updated = if profile.is_empty() {
            self.credentials.find_by_id(id).await?
        } else {
            self.credentials
                .update_profile(id, profile)
                .await
                .map_err(map_insert_error)?
        };
        if let Some(status) = update.status {
            updated = self.apply_status(id, status).await?;
        }

        tracing::info!(user_id = id, "Admin account updated");
        Ok(updated)
    }

    /// admin 계정 삭제. admin 역할이 없는 주체는 `false`.
    pub async fn delete_admin(&self, requester: &RoleSet, id: i64) -> AuthResult<bool> {
        if self.get_admin(requester, id).await?.is_none() {
            return Ok(false);
        }
        self.remove(id).await
    }

    /// 만료된 Refresh Token을 정리합니다.
    pub async fn purge_expired_tokens(&self) -> AuthResult<u64> {
        let purged = self.refresh_tokens.purge_expired(Utc::now()).await?;
        if purged > 0 {
            tracing::debug!(purged, "Expired refresh tokens purged");
        }
        Ok(purged)
    }

    /// 임시 비밀번호로 초기화하고 기존 세션을 폐기합니다.
    ///
    /// 대상이 없으면 `None`, 있으면 새 임시 비밀번호를 반환합니다.
    pub async fn reset_password(&self, requester: &RoleSet, id: i64) -> AuthResult<Option<String>> {
        if self.managed_target(requester, id).await?.is_none() {
            return Ok(None);
        }

        let temporary: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(TEMPORARY_PASSWORD_LEN)
            .map(char::from)
            .collect();
        let hash = self.passwords.hash(temporary.clone()).await?;

        if !self.credentials.update_password(id, &hash).await? {
            return Ok(None);
        }
        self.refresh_tokens.revoke_all_for(id).await?;

        tracing::info!(user_id = id, "Password reset");
        Ok(Some(temporary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::TokenVerifier;
    use crate::store::{MemoryCredentialStore, MemoryRefreshTokenStore};
    use market_core::AuthConfig;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

    fn service() -> (SessionService, Arc<MemoryRefreshTokenStore>) {
        let config = AuthConfig::with_secret(TEST_SECRET).with_password_cost(8, 1);
        let refresh = Arc::new(MemoryRefreshTokenStore::new());
        let service = SessionService::new(
            Arc::new(MemoryCredentialStore::new()),
            refresh.clone(),
            TokenIssuer::new(&config).unwrap(),
            PasswordService::from_config(&config).unwrap(),
        );
        (service, refresh)
    }

    fn staff() -> RoleSet {
        RoleSet::single(Role::Admin)
    }

    fn root() -> RoleSet {
        RoleSet::single(Role::SuperAdmin)
    }

    fn account(email: &str, mobile: &str, roles: Vec<Role>) -> NewAccount {
        NewAccount {
            name: "Nadia".into(),
            email: email.into(),
            mobile: Some(mobile.into()),
            password: "secret123".into(),
            roles,
        }
    }

    #[test]
    fn test_validate_mobile() {
        assert!(validate_mobile("01712345678").is_ok());
        assert!(validate_mobile("01312345678").is_ok());
        assert!(validate_mobile("01212345678").is_err());
        assert!(validate_mobile("0171234567").is_err());
        assert!(validate_mobile("0171234567a").is_err());
        assert!(validate_mobile("+8801712345678").is_err());
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let (service, _) = service();
        let principal = service
            .register(account("nadia@example.com", "01712345678", vec![Role::Buyer]))
            .await
            .unwrap();
        assert_eq!(principal.status, AccountStatus::Active);

        let tokens = service.login("nadia@example.com", "secret123").await.unwrap();
        assert!(!tokens.access_token.is_empty());
        assert!(!tokens.refresh_token.is_empty());
        assert_eq!(tokens.token_type, "Bearer");

        // 휴대폰 번호로도 로그인 가능
        assert!(service.login("01712345678", "secret123").await.is_ok());
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let (service, _) = service();
        service
            .register(account("dup@example.com", "01712345678", vec![Role::Buyer]))
            .await
            .unwrap();

        let same_email = service
            .register(account("dup@example.com", "01812345678", vec![Role::Buyer]))
            .await;
        let same_mobile = service
            .register(account("other@example.com", "01712345678", vec![Role::Seller]))
            .await;

        assert!(matches!(same_email, Err(AuthError::AlreadyRegistered)));
        assert!(matches!(same_mobile, Err(AuthError::AlreadyRegistered)));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (service, _) = service();

        let mut short = account("a@example.com", "01712345678", vec![Role::Buyer]);
        short.password = "12345".into();
        assert!(matches!(
            service.register(short).await,
            Err(AuthError::Validation(_))
        ));

        let bad_email = account("not-an-email", "01712345678", vec![Role::Buyer]);
        assert!(matches!(
            service.register(bad_email).await,
            Err(AuthError::Validation(_))
        ));

        let no_roles = account("b@example.com", "01712345678", vec![]);
        assert!(matches!(
            service.register(no_roles).await,
            Err(AuthError::Validation(_))
        ));

        let escalation = account("c@example.com", "01712345678", vec![Role::Admin]);
        assert!(matches!(
            service.register(escalation).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, _) = service();
        service
            .register(account("x@example.com", "01712345678", vec![Role::Buyer]))
            .await
            .unwrap();

        let wrong_password = service.login("x@example.com", "wrongpass").await.unwrap_err();
        let unknown = service.login("ghost@example.com", "secret123").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_blocked_and_pending_login_forbidden() {
        let (service, _) = service();
        let p = service
            .register(account("b@example.com", "01712345678", vec![Role::Seller]))
            .await
            .unwrap();

        service.set_status(&staff(), p.id, AccountStatus::Blocked).await.unwrap();
        assert!(matches!(
            service.login("b@example.com", "secret123").await,
            Err(AuthError::AccountBlocked)
        ));

        service.set_status(&staff(), p.id, AccountStatus::Pending).await.unwrap();
        assert!(matches!(
            service.login("b@example.com", "secret123").await,
            Err(AuthError::AccountInactive)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotation() {
        let (service, _) = service();
        service
            .register(account("r@example.com", "01712345678", vec![Role::Buyer]))
            .await
            .unwrap();
        let first = service.login("r@example.com", "secret123").await.unwrap();

        let second = service.refresh(&first.refresh_token).await.unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);
        assert!(!second.access_token.is_empty());

        assert!(matches!(
            service.refresh(&first.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        ));
        assert!(service.refresh(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_refresh_rejected() {
        let (service, refresh) = service();
        let p = service
            .register(account("e@example.com", "01712345678", vec![Role::Buyer]))
            .await
            .unwrap();

        refresh
            .save(RefreshTokenRecord::new(
                "stale".into(),
                p.id,
                Utc::now() - chrono::Duration::seconds(1),
            ))
            .await
            .unwrap();

        assert!(matches!(
            service.refresh("stale").await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[tokio::test]
    async fn test_purge_expired_tokens() {
        let (service, refresh) = service();
        let p = service
            .register(account("purge@example.com", "01712345678", vec![Role::Buyer]))
            .await
            .unwrap();
        service.login("purge@example.com", "secret123").await.unwrap();
        refresh
            .save(RefreshTokenRecord::new(
                "old".into(),
                p.id,
                Utc::now() - chrono::Duration::seconds(5),
            ))
            .await
            .unwrap();

        assert_eq!(service.purge_expired_tokens().await.unwrap(), 1);
        assert_eq!(refresh.len().await, 1);
    }

    #[tokio::test]
    async fn test_logout_then_refresh_fails() {
        let (service, _) = service();
        service
            .register(account("l@example.com", "01712345678", vec![Role::Buyer]))
            .await
            .unwrap();
        let tokens = service.login("l@example.com", "secret123").await.unwrap();

        service.logout(&tokens.refresh_token).await.unwrap();
        // 두 번째 로그아웃도 성공 (멱등)
        service.logout(&tokens.refresh_token).await.unwrap();

        assert!(matches!(
            service.refresh(&tokens.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[tokio::test]
    async fn test_block_revokes_sessions() {
        let (service, refresh) = service();
        let p = service
            .register(account("k@example.com", "01712345678", vec![Role::Buyer]))
            .await
            .unwrap();
        let tokens = service.login("k@example.com", "secret123").await.unwrap();

        service.set_status(&staff(), p.id, AccountStatus::Blocked).await.unwrap();
        assert_eq!(refresh.len().await, 0);
        assert!(service.refresh(&tokens.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_create_admin_requires_superadmin() {
        let (service, _) = service();
        let admin_only = RoleSet::single(Role::Admin);
        let superadmin = RoleSet::single(Role::SuperAdmin);

        let denied = service
            .create_admin(&admin_only, account("adm@example.com", "01712345678", vec![]))
            .await;
        assert!(matches!(denied, Err(AuthError::InsufficientRole)));

        let created = service
            .create_admin(
                &superadmin,
                account("adm@example.com", "01712345678", vec![Role::SuperAdmin]),
            )
            .await
            .unwrap();
        assert_eq!(created.roles, RoleSet::single(Role::Admin));
    }

    #[tokio::test]
    async fn test_bootstrap_superadmin_once() {
        let (service, _) = service();
        let config = SuperAdminConfig {
            name: "Root".into(),
            email: "root@example.com".into(),
            mobile: Some("01999999999".into()),
            password: "rootpass".to_string().into(),
        };

        let first = service.bootstrap_superadmin(&config).await.unwrap();
        assert!(first.unwrap().roles.contains(Role::SuperAdmin));
        assert!(service.bootstrap_superadmin(&config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_password() {
        let (service, _) = service();
        let p = service
            .register(account("p@example.com", "01712345678", vec![Role::Buyer]))
            .await
            .unwrap();

        let temporary = service.reset_password(&staff(), p.id).await.unwrap().unwrap();
        assert_eq!(temporary.len(), TEMPORARY_PASSWORD_LEN);
        assert!(service.login("p@example.com", "secret123").await.is_err());
        assert!(service.login("p@example.com", &temporary).await.is_ok());
        assert!(service.reset_password(&staff(), 9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_privileged_targets_need_superadmin() {
        let (service, _) = service();
        let admin = service
            .create_admin(&root(), account("adm@example.com", "01712345678", vec![]))
            .await
            .unwrap();
        let buyer = service
            .register(account("buyer@example.com", "01812345678", vec![Role::Buyer]))
            .await
            .unwrap();

        assert!(matches!(
            service.reset_password(&staff(), admin.id).await,
            Err(AuthError::InsufficientRole)
        ));
        assert!(matches!(
            service.set_status(&staff(), admin.id, AccountStatus::Blocked).await,
            Err(AuthError::InsufficientRole)
        ));
        assert!(matches!(
            service.delete_principal(&staff(), admin.id).await,
            Err(AuthError::InsufficientRole)
        ));
        // 대상 계정은 그대로
        assert!(service.login("adm@example.com", "secret123").await.is_ok());

        // 일반 계정은 admin이 관리 가능
        assert!(service
            .set_status(&staff(), buyer.id, AccountStatus::Blocked)
            .await
            .unwrap()
            .is_some());

        // superadmin은 admin 계정도 관리 가능
        assert!(service.reset_password(&root(), admin.id).await.unwrap().is_some());
        assert!(service.delete_principal(&root(), admin.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_admin_management() {
        let (service, _) = service();
        let admin = service
            .create_admin(&root(), account("adm@example.com", "01712345678", vec![]))
            .await
            .unwrap();
        let buyer = service
            .register(account("buyer@example.com", "01812345678", vec![Role::Buyer]))
            .await
            .unwrap();

        assert!(matches!(
            service.list_admins(&staff()).await,
            Err(AuthError::InsufficientRole)
        ));
        let admins = service.list_admins(&root()).await.unwrap();
        assert_eq!(admins.iter().map(|p| p.id).collect::<Vec<_>>(), vec![admin.id]);

        assert!(service.get_admin(&root(), admin.id).await.unwrap().is_some());
        assert!(service.get_admin(&root(), buyer.id).await.unwrap().is_none());

        let update = AdminUpdate {
            name: Some("Karim".into()),
            status: Some(AccountStatus::Blocked),
            ..Default::default()
        };
        let updated = service
            .update_admin(&root(), admin.id, update)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Karim");
        assert_eq!(updated.status, AccountStatus::Blocked);

        let bad_mobile = AdminUpdate {
            mobile: Some("0121234".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_admin(&root(), admin.id, bad_mobile).await,
            Err(AuthError::Validation(_))
        ));
        let taken_email = AdminUpdate {
            email: Some("buyer@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_admin(&root(), admin.id, taken_email).await,
            Err(AuthError::AlreadyRegistered)
        ));

        // admin이 아닌 주체는 admin 관리 경로로 삭제되지 않음
        assert!(!service.delete_admin(&root(), buyer.id).await.unwrap());
        assert!(service.delete_admin(&root(), admin.id).await.unwrap());
        assert!(service.list_admins(&root()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_issued_token_verifies() {
        let (service, _) = service();
        let p = service
            .register(account("v@example.com", "01712345678", vec![Role::Seller]))
            .await
            .unwrap();
        let tokens = service.login("v@example.com", "secret123").await.unwrap();

        let verifier = TokenVerifier::new(&AuthConfig::with_secret(TEST_SECRET)).unwrap();
        let claims = verifier.verify(&tokens.access_token).unwrap();
        assert_eq!(claims.id, p.id);
        assert_eq!(claims.roles, RoleSet::single(Role::Seller));
    }
}
