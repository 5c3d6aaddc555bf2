//! Trial and Subscription Initiators
//!
//! Both entry points ask the preference endpoint for a hosted checkout and
//! send the user there. The checkout's return URL carries the callback
//! context the rest of the pipeline consumes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::IdentityProvider;
use crate::config::ActivationConfig;
use crate::context::ActivationContext;
use crate::error::{ActivationError, Result, Stage};
use crate::platform::{bounded, Navigator, Timer};
use crate::reference::PlanType;
use crate::tenant::{Tenant, TenantId};

/// Length of the free trial
pub const TRIAL_DAYS: u32 = 30;

/// Client platform; decides web vs deep-link return URLs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Web,
    Ios,
    Android,
}

impl Platform {
    pub const fn is_native(&self) -> bool {
        matches!(self, Self::Ios | Self::Android)
    }
}

/// Body sent to the preference endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRequest {
    pub tenant_id: TenantId,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub plan_type: PlanType,
    #[serde(default)]
    pub is_trial: bool,
    #[serde(default)]
    pub trial_days: u32,
    #[serde(default)]
    pub platform: Platform,
}

/// Hosted checkout handle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceResponse {
    #[serde(rename = "preferenceId")]
    pub preference_id: String,

    /// URL of the hosted checkout
    pub init_point: String,
}

/// Preference endpoint client
#[async_trait(?Send)]
pub trait PreferenceGateway {
    async fn create_preference(&self, request: &PreferenceRequest) -> Result<PreferenceResponse>;
}

pub struct Initiator {
    gateway: Arc<dyn PreferenceGateway>,
    identity: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    timer: Arc<dyn Timer>,
    config: ActivationConfig,
    platform: Platform,
}

impl Initiator {
    pub fn new(
        gateway: Arc<dyn PreferenceGateway>,
        identity: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        timer: Arc<dyn Timer>,
        config: ActivationConfig,
        platform: Platform,
    ) -> Self {
        Self {
            gateway,
            identity,
            navigator,
            timer,
            config,
            platform,
        }
    }

    /// Start the free trial.
    ///
    /// The intent flag is set before the redirect so the return trip
    /// reconciles even without query parameters. It is rolled back if no
    /// checkout could be created.
    pub async fn start_free_trial(&self, tenant: &Tenant, context: &ActivationContext) -> Result<PreferenceResponse> {
        context.set_intent(true);

        let request = self.request(tenant, PlanType::Basic, Some(TRIAL_DAYS)).await;
        match self.checkout(request).await {
            Ok(preference) => Ok(preference),
            Err(e) => {
                context.set_intent(false);
                Err(e)
            }
        }
    }

    /// Start the paid subscription checkout
    pub async fn start_subscription(&self, tenant: &Tenant) -> Result<PreferenceResponse> {
        let request = self.request(tenant, PlanType::Pro, None).await;
        self.checkout(request).await
    }

    async fn request(&self, tenant: &Tenant, plan_type: PlanType, trial_days: Option<u32>) -> PreferenceRequest {
        // The checkout still works without the user; the reference then carries "unknown"
        let user = match self.identity.current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read current user for checkout");
                None
            }
        };

        PreferenceRequest {
            tenant_id: tenant.id.clone(),
            user_id: user.as_ref().map(|u| u.id.clone()),
            email: user.and_then(|u| u.email),
            plan_type,
            is_trial: trial_days.is_some(),
            trial_days: trial_days.unwrap_or(0),
            platform: self.platform,
        }
    }

    async fn checkout(&self, request: PreferenceRequest) -> Result<PreferenceResponse> {
        tracing::info!(
            tenant_id = %request.tenant_id,
            plan = request.plan_type.as_str(),
            trial = request.is_trial,
            "Creating checkout preference"
        );

        let preference = bounded(
            self.timer.as_ref(),
            self.config.network_timeout,
            Stage::Initiating,
            self.gateway.create_preference(&request),
        )
        .await?;

        if preference.init_point.is_empty() {
            return Err(ActivationError::Gateway("No checkout URL returned".into()));
        }

        self.navigator.open_external(&preference.init_point)?;
        Ok(preference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::RwLock;

    use crate::intent::{read_flag, IntentStore, MemoryIntentStore};
    use crate::memory::{InstantTimer, MemoryBackend, RecordingNavigator};
    use crate::tenant::{Role, TenantType};

    #[derive(Default)]
    struct StubGateway {
        fail: bool,
        requests: RwLock<Vec<PreferenceRequest>>,
    }

    #[async_trait(?Send)]
    impl PreferenceGateway for StubGateway {
        async fn create_preference(&self, request: &PreferenceRequest) -> Result<PreferenceResponse> {
            self.requests.write().unwrap().push(request.clone());
            if self.fail {
                return Err(ActivationError::Gateway("503".into()));
            }
            Ok(PreferenceResponse {
                preference_id: "pref_1".into(),
                init_point: "https://checkout.test/pref_1".into(),
            })
        }
    }

    fn tenant() -> Tenant {
        Tenant {
            id: TenantId::new("T1"),
            name: "ESCUELA".into(),
            tenant_type: TenantType::School,
            onboarding_completed: false,
            role: Role::Director,
        }
    }

    fn initiator(gateway: Arc<StubGateway>, navigator: Arc<RecordingNavigator>, platform: Platform) -> Initiator {
        Initiator::new(
            gateway,
            Arc::new(MemoryBackend::new().with_user("u1", Some("T1"))),
            navigator,
            Arc::new(InstantTimer::new()),
            ActivationConfig::default(),
            platform,
        )
    }

    #[tokio::test]
    async fn test_free_trial_sets_flag_and_redirects() {
        let gateway = Arc::new(StubGateway::default());
        let navigator = Arc::new(RecordingNavigator::new());
        let store = Arc::new(MemoryIntentStore::new());
        let shared: Arc<dyn IntentStore> = store.clone();
        let context = ActivationContext::mount(shared, None);

        let preference = initiator(gateway.clone(), navigator.clone(), Platform::Android)
            .start_free_trial(&tenant(), &context)
            .await
            .unwrap();

        assert_eq!(preference.preference_id, "pref_1");
        assert!(read_flag(store.as_ref()));
        assert_eq!(navigator.external(), vec!["https://checkout.test/pref_1".to_string()]);

        let requests = gateway.requests.read().unwrap();
        assert_eq!(requests[0].plan_type, PlanType::Basic);
        assert!(requests[0].is_trial);
        assert_eq!(requests[0].trial_days, TRIAL_DAYS);
        assert_eq!(requests[0].user_id.as_deref(), Some("u1"));
        assert_eq!(requests[0].platform, Platform::Android);
    }

    #[tokio::test]
    async fn test_failed_trial_rolls_back_flag() {
        let gateway = Arc::new(StubGateway {
            fail: true,
            ..Default::default()
        });
        let navigator = Arc::new(RecordingNavigator::new());
        let store = Arc::new(MemoryIntentStore::new());
        let shared: Arc<dyn IntentStore> = store.clone();
        let context = ActivationContext::mount(shared, None);

        let err = initiator(gateway, navigator.clone(), Platform::Web)
            .start_free_trial(&tenant(), &context)
            .await
            .unwrap_err();

        assert!(matches!(err, ActivationError::Gateway(_)));
        assert!(!read_flag(store.as_ref()));
        assert!(navigator.external().is_empty());
    }

    #[tokio::test]
    async fn test_subscription_does_not_touch_flag() {
        let gateway = Arc::new(StubGateway::default());
        let navigator = Arc::new(RecordingNavigator::new());

        initiator(gateway.clone(), navigator.clone(), Platform::Web)
            .start_subscription(&tenant())
            .await
            .unwrap();

        let requests = gateway.requests.read().unwrap();
        assert_eq!(requests[0].plan_type, PlanType::Pro);
        assert!(!requests[0].is_trial);
        assert_eq!(navigator.external().len(), 1);
    }

    #[test]
    fn test_request_wire_shape() {
        let request = PreferenceRequest {
            tenant_id: TenantId::new("T1"),
            user_id: None,
            email: None,
            plan_type: PlanType::Pro,
            is_trial: false,
            trial_days: 0,
            platform: Platform::Ios,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["tenantId"], "T1");
        assert_eq!(value["planType"], "pro");
        assert_eq!(value["platform"], "ios");

        let response: PreferenceResponse =
            serde_json::from_str(r#"{"preferenceId":"p","init_point":"https://x"}"#).unwrap();
        assert_eq!(response.init_point, "https://x");
    }
}
