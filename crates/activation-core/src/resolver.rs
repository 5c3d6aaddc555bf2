//! Tenant Resolver
//!
//! Picks the tenant to activate, most explicit hint first:
//!
//! 1. `tenantId` inside a JSON `external_reference`
//! 2. a bare `external_reference` longer than the configured threshold
//! 3. the tenant already loaded by the shell
//! 4. the tenant on the signed-in user's profile
//!
//! Nothing past step 4. Guessing would activate the wrong account.

use serde::{Deserialize, Serialize};

use crate::backend::IdentityProvider;
use crate::callback::CallbackContext;
use crate::config::ActivationConfig;
use crate::error::{ActivationError, Result};
use crate::reference::UNKNOWN_ID;
use crate::tenant::TenantId;

/// Where a resolved tenant id came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    ReferencePayload,
    ReferenceIdentifier,
    LoadedTenant,
    Profile,
}

/// Resolution result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTenant {
    pub id: TenantId,
    pub source: ResolutionSource,
}

pub struct TenantResolver<'a> {
    identity: &'a dyn IdentityProvider,
    min_reference_len: usize,
}

impl<'a> TenantResolver<'a> {
    pub fn new(identity: &'a dyn IdentityProvider, config: &ActivationConfig) -> Self {
        Self {
            identity,
            min_reference_len: config.reference_min_len,
        }
    }

    /// Steps 1 and 2: hints carried by the reference alone
    pub fn from_reference(&self, reference: &str) -> Option<ResolvedTenant> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        match serde_json::from_str::<serde_json::Value>(reference) {
            Ok(serde_json::Value::Object(payload)) => {
                let id = match payload.get("tenantId")? {
                    serde_json::Value::String(id) => id.clone(),
                    serde_json::Value::Number(id) => id.to_string(),
                    _ => return None,
                };
                if id.is_empty() || id == UNKNOWN_ID {
                    return None;
                }
                Some(ResolvedTenant {
                    id: TenantId::new(id),
                    source: ResolutionSource::ReferencePayload,
                })
            }
            _ if reference.len() > self.min_reference_len => Some(ResolvedTenant {
                id: TenantId::new(reference),
                source: ResolutionSource::ReferenceIdentifier,
            }),
            _ => None,
        }
    }

    /// Run the full chain
    pub async fn resolve(
        &self,
        callback: Option<&CallbackContext>,
        loaded: Option<&TenantId>,
    ) -> Result<ResolvedTenant> {
        let hinted = callback
            .and_then(|c| c.external_reference.as_deref())
            .and_then(|r| self.from_reference(r));

        if let Some(resolved) = hinted {
            tracing::debug!(tenant_id = %resolved.id, source = ?resolved.source, "Tenant from external reference");
            return Ok(resolved);
        }

        if let Some(id) = loaded {
            return Ok(ResolvedTenant {
                id: id.clone(),
                source: ResolutionSource::LoadedTenant,
            });
        }

        let Some(user) = self.identity.current_user().await? else {
            tracing::warn!("No signed-in user to fall back on");
            return Err(ActivationError::UnresolvedTenant);
        };

        match self.identity.profile_tenant_id(&user.id).await? {
            Some(id) => {
                tracing::debug!(tenant_id = %id, user_id = %user.id, "Tenant from profile");
                Ok(ResolvedTenant {
                    id,
                    source: ResolutionSource::Profile,
                })
            }
            None => Err(ActivationError::UnresolvedTenant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::Transport;
    use crate::memory::MemoryBackend;

    fn approved_with(reference: Option<&str>) -> CallbackContext {
        CallbackContext {
            status: Some(crate::callback::PaymentStatus::Approved),
            payment_id: None,
            external_reference: reference.map(str::to_string),
            transport: Transport::Web,
        }
    }

    #[tokio::test]
    async fn test_json_hint_beats_profile() {
        let backend = MemoryBackend::new().with_user("user-b", Some("B"));
        let config = ActivationConfig::default();
        let resolver = TenantResolver::new(&backend, &config);

        let resolved = resolver
            .resolve(Some(&approved_with(Some(r#"{"tenantId":"A"}"#))), None)
            .await
            .unwrap();

        assert_eq!(resolved.id, TenantId::new("A"));
        assert_eq!(resolved.source, ResolutionSource::ReferencePayload);
        assert_eq!(backend.profile_lookups(), 0);
    }

    #[test]
    fn test_numeric_tenant_id_in_payload() {
        let backend = MemoryBackend::new();
        let config = ActivationConfig::default();
        let resolver = TenantResolver::new(&backend, &config);

        let resolved = resolver.from_reference(r#"{"tenantId":42}"#).unwrap();

        assert_eq!(resolved.id, TenantId::new("42"));
        assert_eq!(resolved.source, ResolutionSource::ReferencePayload);
        assert!(resolver.from_reference(r#"{"tenantId":null}"#).is_none());
    }

    #[tokio::test]
    async fn test_bare_identifier_skips_profile() {
        let backend = MemoryBackend::new().with_user("user-b", Some("B"));
        let config = ActivationConfig::default();
        let resolver = TenantResolver::new(&backend, &config);
        let uuid = "11111111-1111-1111-1111-111111111111";

        let resolved = resolver.resolve(Some(&approved_with(Some(uuid))), None).await.unwrap();

        assert_eq!(resolved.id, TenantId::new(uuid));
        assert_eq!(resolved.source, ResolutionSource::ReferenceIdentifier);
        assert_eq!(backend.profile_lookups(), 0);
    }

    #[tokio::test]
    async fn test_short_code_falls_through() {
        let backend = MemoryBackend::new().with_user("user-b", Some("B"));
        let config = ActivationConfig::default();
        let resolver = TenantResolver::new(&backend, &config);

        let resolved = resolver.resolve(Some(&approved_with(Some("PROMO10"))), None).await.unwrap();

        assert_eq!(resolved.id, TenantId::new("B"));
        assert_eq!(resolved.source, ResolutionSource::Profile);
        assert_eq!(backend.profile_lookups(), 1);
    }

    #[tokio::test]
    async fn test_unknown_placeholder_is_ignored() {
        let backend = MemoryBackend::new().with_user("user-b", Some("B"));
        let config = ActivationConfig::default();
        let resolver = TenantResolver::new(&backend, &config);
        let reference = r#"{"userId":"user-b","tenantId":"unknown","planType":"pro"}"#;

        let resolved = resolver
            .resolve(Some(&approved_with(Some(reference))), Some(&TenantId::new("loaded")))
            .await
            .unwrap();

        assert_eq!(resolved.id, TenantId::new("loaded"));
        assert_eq!(resolved.source, ResolutionSource::LoadedTenant);
    }

    #[tokio::test]
    async fn test_unresolvable_without_profile_tenant() {
        let backend = MemoryBackend::new().with_user("user-c", None);
        let config = ActivationConfig::default();
        let resolver = TenantResolver::new(&backend, &config);

        let err = resolver.resolve(Some(&approved_with(None)), None).await.unwrap_err();
        assert!(matches!(err, ActivationError::UnresolvedTenant));
    }

    #[tokio::test]
    async fn test_unresolvable_when_signed_out() {
        let backend = MemoryBackend::new();
        let config = ActivationConfig::default();
        let resolver = TenantResolver::new(&backend, &config);

        let err = resolver.resolve(None, None).await.unwrap_err();
        assert!(matches!(err, ActivationError::UnresolvedTenant));
    }
}
