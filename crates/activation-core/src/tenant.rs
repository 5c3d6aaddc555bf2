//! Tenant Model
//!
//! The organizational account whose `onboarding_completed` flag the
//! reconciler flips.

use serde::{Deserialize, Serialize};

/// Opaque tenant identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Id of the synthetic system tenant handed to super admins without a workspace
    pub const SYSTEM: &'static str = "00000000-0000-0000-0000-000000000000";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of organization
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantType {
    School,
    Independent,
}

/// The caller's effective role inside a tenant
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Director,
    Admin,
    #[default]
    Teacher,
    IndependentTeacher,
    Tutor,
    #[serde(untagged)]
    Other(String),
}

/// A tenant as loaded by the shell
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub tenant_type: TenantType,

    /// Gate criterion. Set to `true` only by the reconciler or the
    /// non-payment wizard completion step.
    pub onboarding_completed: bool,

    #[serde(default)]
    pub role: Role,
}

impl Tenant {
    /// The system tenant used for super admins with no workspace
    pub fn system() -> Self {
        Self {
            id: TenantId::new(TenantId::SYSTEM),
            name: "SYSTEM CONTROL".into(),
            tenant_type: TenantType::School,
            onboarding_completed: true,
            role: Role::SuperAdmin,
        }
    }

    /// Apply the role override for independent workspaces
    #[must_use]
    pub fn with_effective_role(mut self, membership_role: Role) -> Self {
        self.role = match self.tenant_type {
            TenantType::Independent => Role::IndependentTeacher,
            TenantType::School => membership_role,
        };
        self
    }
}

/// The authenticated user, as returned by the identity accessor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,
}
