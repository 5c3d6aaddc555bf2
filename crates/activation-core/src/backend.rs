//! Backend Accessors
//!
//! The managed database is consumed through two narrow interfaces. The
//! write is a blind set, never read-modify-write, so duplicate runs from
//! other tabs converge on the same row state.

use async_trait::async_trait;

use crate::error::Result;
use crate::tenant::{Tenant, TenantId, UserIdentity};

/// Authenticated identity accessor
#[async_trait(?Send)]
pub trait IdentityProvider {
    /// The signed-in user, if any
    async fn current_user(&self) -> Result<Option<UserIdentity>>;

    /// Tenant id stored on the user's profile row
    async fn profile_tenant_id(&self, user_id: &str) -> Result<Option<TenantId>>;
}

/// Tenant record accessor
#[async_trait(?Send)]
pub trait TenantStore {
    /// `set onboarding_completed = true` for one tenant. Idempotent.
    async fn mark_onboarding_completed(&self, id: &TenantId) -> Result<()>;

    /// Read a tenant. May observe a pre-write value shortly after a write.
    async fn fetch_tenant(&self, id: &TenantId) -> Result<Option<Tenant>>;
}
