//! REST Backend
//!
//! Implementation of `IdentityProvider` and `TenantStore` over the managed
//! database's HTTP surface: PostgREST tables under `/rest/v1` and the auth
//! user endpoint under `/auth/v1`.

use std::sync::RwLock;

use activation_core::{
    backend::{IdentityProvider, TenantStore},
    error::{ActivationError, Result},
    tenant::{Role, Tenant, TenantId, UserIdentity},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{config::BackendConfig, error::BackendError};

/// `profiles` row, projected to what tenant loading needs
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub tenant_id: Option<TenantId>,

    #[serde(default)]
    pub role: Option<Role>,
}

/// `profile_tenants` row with the embedded tenant
#[derive(Clone, Debug, Deserialize)]
pub struct MembershipRow {
    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub tenants: Option<Tenant>,
}

/// Error body returned by PostgREST and the auth endpoints
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "msg", alias = "error_description")]
    message: Option<String>,
}

/// REST backend
pub struct RestBackend {
    client: Client,
    config: BackendConfig,
    session: RwLock<Option<String>>,
}

impl RestBackend {
    /// Create a new backend with an explicit URL and anon key
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self::from_config(BackendConfig::new(url, anon_key))
    }

    /// Create from configuration
    pub fn from_config(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            session: RwLock::new(None),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_config(BackendConfig::from_env()?))
    }

    /// Replace the signed-in user's access token
    pub fn set_session(&self, access_token: Option<String>) {
        match self.session.write() {
            Ok(mut guard) => *guard = access_token,
            Err(_) => tracing::warn!("Session lock poisoned; keeping previous token"),
        }
    }

    fn access_token(&self) -> Option<String> {
        self.session.read().ok().and_then(|guard| guard.clone())
    }

    /// Attach `apikey` and the bearer; falls back to the anon key when signed out
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token().unwrap_or_else(|| self.config.anon_key.clone());
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    /// `PATCH tenants?id=eq.<id>` setting `onboarding_completed`
    fn mark_completed_request(&self, id: &TenantId) -> reqwest::Result<reqwest::Request> {
        self.authorize(self.client.patch(self.config.rest("tenants")))
            .query(&[("id", eq(id.as_str()))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "onboarding_completed": true }))
            .build()
    }

    async fn check(response: reqwest::Response) -> std::result::Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or(text);

        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<Vec<T>, BackendError> {
        let request = self.authorize(self.client.get(self.config.rest(table))).query(query);
        let response = Self::check(request.send().await?).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn profile(&self, user_id: &str) -> std::result::Result<Option<ProfileRow>, BackendError> {
        let rows: Vec<ProfileRow> = self
            .select(
                "profiles",
                &[("id", eq(user_id)), ("select", "tenant_id,role".into())],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn membership(
        &self,
        user_id: &str,
        tenant_id: &TenantId,
    ) -> std::result::Result<Option<MembershipRow>, BackendError> {
        let rows: Vec<MembershipRow> = self
            .select(
                "profile_tenants",
                &[
                    ("profile_id", eq(user_id)),
                    ("tenant_id", eq(tenant_id.as_str())),
                    ("select", "role,tenants(*)".into()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Load the shell's active tenant.
    ///
    /// Reads the profile's tenant, then the membership row for the
    /// workspace-specific role. Super admins without a workspace get the
    /// system tenant.
    pub async fn load_active_tenant(&self) -> Result<Option<Tenant>> {
        let Some(user) = self.current_user().await? else {
            return Ok(None);
        };

        let profile = self
            .profile(&user.id)
            .await
            .map_err(|e| ActivationError::TenantRead(e.user_message()))?;
        let Some(profile) = profile else {
            return Ok(None);
        };

        let tenant_id = match (&profile.tenant_id, &profile.role) {
            (Some(id), _) => id.clone(),
            (None, Some(Role::SuperAdmin)) => return Ok(Some(Tenant::system())),
            (None, _) => return Ok(None),
        };

        let membership = match self.membership(&user.id, &tenant_id).await {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Membership lookup failed");
                None
            }
        };

        if let Some(tenant) = membership.and_then(effective_tenant) {
            return Ok(Some(tenant));
        }

        // Membership rows can lag behind the profile for brand-new workspaces
        tracing::debug!(tenant_id = %tenant_id, "No membership row; reading tenant directly");
        Ok(self
            .fetch_tenant(&tenant_id)
            .await?
            .map(|tenant| tenant.with_effective_role(Role::Teacher)))
    }
}

/// PostgREST equality filter
fn eq(value: &str) -> String {
    format!("eq.{value}")
}

/// Tenant carried by a membership row, with the role override applied
fn effective_tenant(row: MembershipRow) -> Option<Tenant> {
    let role = row.role;
    row.tenants.map(|tenant| tenant.with_effective_role(role))
}

#[async_trait(?Send)]
impl IdentityProvider for RestBackend {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        if self.access_token().is_none() {
            return Ok(None);
        }

        let response = self
            .authorize(self.client.get(self.config.auth_user()))
            .send()
            .await
            .map_err(|e| ActivationError::Identity(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("Access token rejected; treating as signed out");
            return Ok(None);
        }

        let response = Self::check(response)
            .await
            .map_err(|e| ActivationError::Identity(e.user_message()))?;
        let user = response
            .json::<UserIdentity>()
            .await
            .map_err(|e| ActivationError::Identity(e.to_string()))?;
        Ok(Some(user))
    }

    async fn profile_tenant_id(&self, user_id: &str) -> Result<Option<TenantId>> {
        let profile = self
            .profile(user_id)
            .await
            .map_err(|e| ActivationError::Identity(e.user_message()))?;
        Ok(profile.and_then(|p| p.tenant_id))
    }
}

#[async_trait(?Send)]
impl TenantStore for RestBackend {
    async fn mark_onboarding_completed(&self, id: &TenantId) -> Result<()> {
        tracing::info!(tenant_id = %id, "Marking onboarding completed");

        let request = self
            .mark_completed_request(id)
            .map_err(|e| ActivationError::TenantWrite(e.to_string()))?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| ActivationError::TenantWrite(e.to_string()))?;
        Self::check(response)
            .await
            .map_err(|e| ActivationError::TenantWrite(e.user_message()))?;
        Ok(())
    }

    async fn fetch_tenant(&self, id: &TenantId) -> Result<Option<Tenant>> {
        let rows: Vec<Tenant> = self
            .select(
                "tenants",
                &[
                    ("id", eq(id.as_str())),
                    ("select", "id,name,type,onboarding_completed".into()),
                ],
            )
            .await
            .map_err(|e| ActivationError::TenantRead(e.user_message()))?;
        Ok(rows.into_iter().next())
    }
}
