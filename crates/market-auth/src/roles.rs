//! 역할 기반 접근 제어 (RBAC).
//!
//! 사용자 역할, 비어 있지 않은 역할 집합, 엔드포인트별 허용 역할 게이트를 정의합니다.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuthError;

/// 사용자 역할.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 구매자
    Buyer,
    /// 판매자 - 상점/상품 관리
    Seller,
    /// 관리자 - 사용자/상점 승인 및 차단
    Admin,
    /// 최고 관리자 - 관리자 계정 생성
    #[serde(rename = "superadmin")]
    SuperAdmin,
}

impl Role {
    /// 문자열에서 역할 파싱 (대소문자 무시).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "buyer" => Some(Role::Buyer),
            "seller" => Some(Role::Seller),
            "admin" => Some(Role::Admin),
            "superadmin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    /// 관리 권한 역할인지 확인.
    ///
    /// 권한 있는 역할은 별도 Access Token 수명 정책을 따릅니다.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    /// 회원가입으로 스스로 획득할 수 있는 역할인지 확인.
    pub fn is_self_assignable(&self) -> bool {
        matches!(self, Role::Buyer | Role::Seller)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 역할 집합 생성 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("role set must not be empty")]
pub struct EmptyRoleSet;

/// 비어 있지 않은 역할 집합.
///
/// 발급되는 모든 토큰은 최소 하나의 역할을 가집니다. 중복은 제거되고 정렬됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Result<Self, EmptyRoleSet> {
        let mut roles: Vec<Role> = roles.into_iter().collect();
        roles.sort();
        roles.dedup();
        if roles.is_empty() {
            Err(EmptyRoleSet)
        } else {
            Ok(Self(roles))
        }
    }

    /// 단일 역할 집합.
    pub fn single(role: Role) -> Self {
        Self(vec![role])
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Role] {
        &self.0
    }

    pub fn is_privileged(&self) -> bool {
        self.0.iter().any(Role::is_privileged)
    }

    /// 문자열 목록으로 변환 (DB 저장용).
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|r| r.as_str().to_string()).collect()
    }

    /// 문자열 목록에서 파싱. 알 수 없는 역할이 있으면 `None`.
    pub fn parse_all<S: AsRef<str>>(values: &[S]) -> Option<Self> {
        let roles = values
            .iter()
            .map(|v| Role::parse(v.as_ref()))
            .collect::<Option<Vec<_>>>()?;
        Self::new(roles).ok()
    }
}

impl TryFrom<Vec<Role>> for RoleSet {
    type Error = EmptyRoleSet;

    fn try_from(roles: Vec<Role>) -> Result<Self, Self::Error> {
        Self::new(roles)
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(set: RoleSet) -> Self {
        set.0
    }
}

/// 허용 역할 목록이 비어 있는 게이트 설정 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("role gate requires at least one allowed role")]
pub struct EmptyAllowList;

/// 엔드포인트별 허용 역할 게이트.
///
/// 호출자의 역할 집합과 허용 목록의 교집합이 비어 있으면 403으로 거부합니다.
/// 빈 허용 목록은 생성 시점에 설정 에러이며 "모두 허용"으로 해석되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    allowed: Vec<Role>,
}

impl RoleGate {
    /// N개 역할 중 하나를 요구하는 게이트.
    pub fn any_of(roles: impl IntoIterator<Item = Role>) -> Result<Self, EmptyAllowList> {
        let mut allowed: Vec<Role> = roles.into_iter().collect();
        allowed.sort();
        allowed.dedup();
        if allowed.is_empty() {
            return Err(EmptyAllowList);
        }
        Ok(Self { allowed })
    }

    /// 단일 역할을 요구하는 게이트.
    pub fn single(role: Role) -> Self {
        Self {
            allowed: vec![role],
        }
    }

    /// 운영자(admin, superadmin) 게이트.
    pub fn staff() -> Self {
        Self {
            allowed: vec![Role::Admin, Role::SuperAdmin],
        }
    }

    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }

    pub fn permits(&self, roles: &RoleSet) -> bool {
        roles.iter().any(|r| self.allowed.contains(r))
    }

    pub fn check(&self, roles: &RoleSet) -> Result<(), AuthError> {
        if self.permits(roles) {
            Ok(())
        } else {
            Err(AuthError::InsufficientRole)
        }
    }
}

/// 보호된 라우트의 접근 정책.
///
/// 유효한 토큰만 요구하는 라우트도 명시적으로 [`AccessPolicy::Authenticated`]를 선언합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// 유효한 토큰이면 역할과 무관하게 허용
    Authenticated,
    /// 역할 게이트 통과 필요
    Roles(RoleGate),
}

impl AccessPolicy {
    pub fn any_of(roles: impl IntoIterator<Item = Role>) -> Result<Self, EmptyAllowList> {
        RoleGate::any_of(roles).map(AccessPolicy::Roles)
    }

    pub fn single(role: Role) -> Self {
        AccessPolicy::Roles(RoleGate::single(role))
    }

    pub fn staff() -> Self {
        AccessPolicy::Roles(RoleGate::staff())
    }

    pub fn check(&self, roles: &RoleSet) -> Result<(), AuthError> {
        match self {
            AccessPolicy::Authenticated => Ok(()),
            AccessPolicy::Roles(gate) => gate.check(roles),
        }
    }
}
