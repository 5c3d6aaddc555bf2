//! In-Memory Collaborators
//!
//! For native hosts without a browser and for testing. `MemoryBackend` can
//! simulate read-after-write lag, failing writes and hung writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{IdentityProvider, TenantStore};
use crate::error::{ActivationError, Result};
use crate::platform::{Navigator, QueryCache, Timer};
use crate::tenant::{Tenant, TenantId, UserIdentity};

/// Tenants, profiles and the signed-in user, held in memory
#[derive(Default)]
pub struct MemoryBackend {
    tenants: RwLock<HashMap<TenantId, Tenant>>,
    user: RwLock<Option<UserIdentity>>,
    profiles: RwLock<HashMap<String, TenantId>>,
    stale_reads: AtomicU32,
    write_error: RwLock<Option<String>>,
    hang_writes: AtomicBool,
    writes: AtomicU32,
    profile_lookups: AtomicU32,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign in a user whose profile points at `tenant_id`
    #[must_use]
    pub fn with_user(self, user_id: &str, tenant_id: Option<&str>) -> Self {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(UserIdentity {
            id: user_id.to_string(),
            email: Some(format!("{user_id}@example.com")),
        });
        if let Some(tenant_id) = tenant_id {
            self.profiles
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(user_id.to_string(), TenantId::new(tenant_id));
        }
        self
    }

    #[must_use]
    pub fn with_tenant(self, tenant: Tenant) -> Self {
        self.insert_tenant(tenant);
        self
    }

    /// The next `count` reads still observe `onboarding_completed = false`
    #[must_use]
    pub fn with_stale_reads(self, count: u32) -> Self {
        self.stale_reads.store(count, Ordering::SeqCst);
        self
    }

    /// Every write fails with `message`
    #[must_use]
    pub fn with_write_error(self, message: &str) -> Self {
        *self.write_error.write().unwrap_or_else(PoisonError::into_inner) = Some(message.to_string());
        self
    }

    /// Writes never complete
    #[must_use]
    pub fn with_hung_writes(self) -> Self {
        self.hang_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn insert_tenant(&self, tenant: Tenant) {
        self.tenants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant.id.clone(), tenant);
    }

    /// Committed state, ignoring simulated lag
    pub fn committed(&self, id: &TenantId) -> Option<Tenant> {
        self.tenants.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn profile_lookups(&self) -> u32 {
        self.profile_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait(?Send)]
impl IdentityProvider for MemoryBackend {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        let user = self.user.read().map_err(|e| ActivationError::Identity(e.to_string()))?;
        Ok(user.clone())
    }

    async fn profile_tenant_id(&self, user_id: &str) -> Result<Option<TenantId>> {
        self.profile_lookups.fetch_add(1, Ordering::SeqCst);
        let profiles = self.profiles.read().map_err(|e| ActivationError::Identity(e.to_string()))?;
        Ok(profiles.get(user_id).cloned())
    }
}

#[async_trait(?Send)]
impl TenantStore for MemoryBackend {
    async fn mark_onboarding_completed(&self, id: &TenantId) -> Result<()> {
        if self.hang_writes.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }

        let failure = self
            .write_error
            .read()
            .map_err(|e| ActivationError::TenantWrite(e.to_string()))?
            .clone();
        if let Some(message) = failure {
            return Err(ActivationError::TenantWrite(message));
        }

        let mut tenants = self.tenants.write().map_err(|e| ActivationError::TenantWrite(e.to_string()))?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        // PostgREST semantics: updating zero rows is not an error
        if let Some(tenant) = tenants.get_mut(id) {
            tenant.onboarding_completed = true;
        }
        Ok(())
    }

    async fn fetch_tenant(&self, id: &TenantId) -> Result<Option<Tenant>> {
        let tenants = self.tenants.read().map_err(|e| ActivationError::TenantRead(e.to_string()))?;
        let mut tenant = tenants.get(id).cloned();

        let lagging = self
            .stale_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lagging {
            if let Some(ref mut t) = tenant {
                t.onboarding_completed = false;
            }
        }
        Ok(tenant)
    }
}

/// Navigator that records instead of navigating
#[derive(Default)]
pub struct RecordingNavigator {
    strips: AtomicU32,
    navigations: RwLock<Vec<String>>,
    external: RwLock<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strips(&self) -> u32 {
        self.strips.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn external(&self) -> Vec<String> {
        self.external.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn strip_callback_params(&self) {
        self.strips.fetch_add(1, Ordering::SeqCst);
    }

    fn hard_navigate(&self, path: &str) {
        self.navigations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }

    fn open_external(&self, url: &str) -> Result<()> {
        self.external
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        Ok(())
    }
}

/// Keyed JSON cache
#[derive(Default)]
pub struct MemoryQueryCache {
    entries: RwLock<HashMap<String, serde_json::Value>>,
    clears: AtomicU32,
}

impl MemoryQueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: serde_json::Value) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clears(&self) -> u32 {
        self.clears.load(Ordering::SeqCst)
    }
}

impl QueryCache for MemoryQueryCache {
    fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Timer that returns immediately and remembers what was asked of it
#[derive(Default)]
pub struct InstantTimer {
    sleeps: RwLock<Vec<Duration>>,
}

impl InstantTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait(?Send)]
impl Timer for InstantTimer {
    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::{Role, TenantType};

    fn tenant(id: &str) -> Tenant {
        Tenant {
            id: TenantId::new(id),
            name: "ESCUELA".into(),
            tenant_type: TenantType::School,
            onboarding_completed: false,
            role: Role::Director,
        }
    }

    #[tokio::test]
    async fn test_write_is_idempotent() {
        let backend = MemoryBackend::new().with_tenant(tenant("T1"));
        let id = TenantId::new("T1");

        backend.mark_onboarding_completed(&id).await.unwrap();
        let after_first = backend.committed(&id).unwrap();
        backend.mark_onboarding_completed(&id).await.unwrap();
        let after_second = backend.committed(&id).unwrap();

        assert!(after_first.onboarding_completed);
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_stale_reads_then_fresh() {
        let backend = MemoryBackend::new().with_tenant(tenant("T1")).with_stale_reads(1);
        let id = TenantId::new("T1");

        backend.mark_onboarding_completed(&id).await.unwrap();
        assert!(!backend.fetch_tenant(&id).await.unwrap().unwrap().onboarding_completed);
        assert!(backend.fetch_tenant(&id).await.unwrap().unwrap().onboarding_completed);
    }

    #[test]
    fn test_cache_clear() {
        let cache = MemoryQueryCache::new();
        cache.insert("tenant", serde_json::json!({"id": "T1"}));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.clears(), 1);
    }
}
