//! Principal Repository
//!
//! 인증 주체(이메일/휴대폰/비밀번호 해시/역할/상태) 저장.

use async_trait::async_trait;
use market_auth::{
    AccountStatus, CredentialStore, NewPrincipal, Principal, ProfileUpdate, Role, RoleSet,
    StoreError, StoredPrincipal,
};
use sqlx::{FromRow, PgPool};

use super::store_error;

const PRINCIPAL_COLUMNS: &str = "id, name, email, mobile, password_hash, roles, status";

/// principals 테이블 레코드
#[derive(Debug, Clone, FromRow)]
struct PrincipalRow {
    id: i64,
    name: String,
    email: String,
    mobile: Option<String>,
    password_hash: String,
    roles: Vec<String>,
    status: String,
}

impl PrincipalRow {
    fn into_stored(self) -> Result<StoredPrincipal, StoreError> {
        let roles = RoleSet::parse_all(&self.roles).ok_or_else(|| {
            StoreError::Corrupt(format!("principal {} has invalid roles {:?}", self.id, self.roles))
        })?;
        let status = AccountStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("principal {} has invalid status '{}'", self.id, self.status))
        })?;

        Ok(StoredPrincipal {
            principal: Principal {
                id: self.id,
                name: self.name,
                email: self.email,
                mobile: self.mobile,
                roles,
                status,
            },
            password_hash: self.password_hash,
        })
    }
}

fn insert_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            let field = match db.constraint() {
                Some(name) if name.contains("mobile") => "mobile",
                _ => "email",
            };
            return StoreError::Duplicate(field);
        }
    }
    store_error(error)
}

/// PostgreSQL 자격 증명 저장소.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<StoredPrincipal>, StoreError> {
        let query = format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals \
             WHERE lower(email) = lower($1) OR mobile = $1 \
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&query)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        row.map(PrincipalRow::into_stored).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Principal>, StoreError> {
        let query = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1");
        let row = sqlx::query_as::<_, PrincipalRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(row
            .map(PrincipalRow::into_stored)
            .transpose()?
            .map(|stored| stored.principal))
    }

    async fn exists(&self, email: &str, mobile: Option<&str>) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM principals
                WHERE lower(email) = lower($1)
                   OR ($2::text IS NOT NULL AND mobile = $2)
            )
            "#,
        )
        .bind(email)
        .bind(mobile)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)
    }

    async fn insert(&self, new: NewPrincipal) -> Result<Principal, StoreError> {
        let query = format!(
            "INSERT INTO principals (name, email, mobile, password_hash, roles, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PRINCIPAL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&query)
            .bind(&new.name)
            .bind(&new.email)
            .bind(new.mobile.as_deref())
            .bind(&new.password_hash)
            .bind(new.roles.to_strings())
            .bind(new.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(insert_error)?;

        Ok(row.into_stored()?.principal)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Principal>, StoreError> {
        let query = format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE $1 = ANY(roles) ORDER BY id"
        );
        let rows = sqlx::query_as::<_, PrincipalRow>(&query)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        rows.into_iter()
            .map(|row| row.into_stored().map(|stored| stored.principal))
            .collect()
    }

    async fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<Principal>, StoreError> {
        let query = format!(
            "UPDATE principals SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                mobile = COALESCE($4, mobile), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PRINCIPAL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&query)
            .bind(id)
            .bind(update.name.as_deref())
            .bind(update.email.as_deref())
            .bind(update.mobile.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(insert_error)?;

        Ok(row
            .map(PrincipalRow::into_stored)
            .transpose()?
            .map(|stored| stored.principal))
    }

    async fn set_status(
        &self,
        id: i64,
        status: AccountStatus,
    ) -> Result<Option<Principal>, StoreError> {
        let query = format!(
            "UPDATE principals SET status = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PRINCIPAL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PrincipalRow>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(row
            .map(PrincipalRow::into_stored)
            .transpose()?
            .map(|stored| stored.principal))
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE principals SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM principals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected() > 0)
    }
}
