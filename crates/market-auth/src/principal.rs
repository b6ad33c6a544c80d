//! 인증 주체(Principal) 모델.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::roles::RoleSet;

/// 계정 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// 정상
    Active,
    /// 관리자 승인 대기
    Pending,
    /// 차단됨
    Blocked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Pending => "pending",
            AccountStatus::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccountStatus::Active),
            "pending" => Some(AccountStatus::Pending),
            "blocked" => Some(AccountStatus::Blocked),
            _ => None,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 인증 주체.
///
/// 이메일과 휴대폰 번호는 저장소 전체에서 유일합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    pub roles: RoleSet,
    pub status: AccountStatus,
}

impl Principal {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn is_blocked(&self) -> bool {
        self.status == AccountStatus::Blocked
    }
}

/// 비밀번호 해시를 포함한 저장 레코드.
///
/// Debug 출력에서 해시는 생략됩니다.
#[derive(Clone)]
pub struct StoredPrincipal {
    pub principal: Principal,
    pub password_hash: String,
}

impl fmt::Debug for StoredPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredPrincipal")
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

/// 신규 주체 생성 요청 (해시 완료 상태).
#[derive(Clone)]
pub struct NewPrincipal {
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub roles: RoleSet,
    pub status: AccountStatus,
    pub password_hash: String,
}

impl fmt::Debug for NewPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewPrincipal")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("mobile", &self.mobile)
            .field("roles", &self.roles)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// 프로필 부분 수정. `None`인 필드는 유지됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.mobile.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;

    #[test]
    fn test_status_parse_round() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Pending,
            AccountStatus::Blocked,
        ] {
            assert_eq!(AccountStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AccountStatus::parse("deleted"), None);
    }

    #[test]
    fn test_debug_hides_password_hash() {
        let record = StoredPrincipal {
            principal: Principal {
                id: 1,
                name: "Rahim".into(),
                email: "rahim@example.com".into(),
                mobile: None,
                roles: RoleSet::single(Role::Buyer),
                status: AccountStatus::Active,
            },
            password_hash: "$argon2id$v=19$secret".into(),
        };
        assert!(!format!("{record:?}").contains("argon2id"));
    }
}
