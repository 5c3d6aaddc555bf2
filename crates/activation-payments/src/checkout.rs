//! Stripe Checkout Integration
//!
//! Server half of the trial and subscription initiators: validates the
//! client's preference request, prices it, and opens a hosted checkout
//! session whose return URLs carry the callback context.

use std::collections::HashMap;

use activation_core::{
    ExternalReference, PlanType, PreferenceRequest, PreferenceResponse, TRIAL_DAYS,
};
use stripe::{
    CheckoutSession, CheckoutSessionMode, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionLineItemsPriceDataRecurring,
    CreateCheckoutSessionLineItemsPriceDataRecurringInterval, CreateCheckoutSessionSubscriptionData,
    Currency,
};

use crate::back_urls::BackUrls;
use crate::error::{PaymentError, Result};
use crate::plan::{pricing, BillingInterval};

/// Where return URLs point
#[derive(Clone, Debug)]
pub struct ReturnTargets {
    /// Public origin of the web app
    pub frontend_url: String,

    /// Custom URL scheme of the native app
    pub deep_link_scheme: String,
}

/// A request that passed validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedPreference {
    pub request: PreferenceRequest,
    pub reference: String,
    pub trial_days: Option<u32>,
}

/// Reject requests that could never be reconciled and encode the reference
pub fn validate(request: &PreferenceRequest) -> Result<ValidatedPreference> {
    if request.tenant_id.as_str().trim().is_empty() {
        return Err(PaymentError::InvalidRequest("tenantId is required".into()));
    }

    let trial_days = match (request.is_trial, request.plan_type) {
        (true, PlanType::Basic) => Some(if request.trial_days == 0 { TRIAL_DAYS } else { request.trial_days }),
        (true, PlanType::Pro) => {
            return Err(PaymentError::InvalidRequest("Trials are only offered on the basic plan".into()));
        }
        (false, _) => None,
    };

    let mut reference = ExternalReference::new(
        request.user_id.as_deref(),
        Some(request.tenant_id.as_str()),
        request.plan_type,
    );
    if let Some(days) = trial_days {
        reference = reference.with_trial(days);
    }

    Ok(ValidatedPreference {
        request: request.clone(),
        reference: reference.encode()?,
        trial_days,
    })
}

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    targets: ReturnTargets,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str, targets: ReturnTargets) -> Self {
        Self {
            client: Client::new(secret_key),
            targets,
        }
    }

    /// Create from environment variables
    pub fn from_env(targets: ReturnTargets) -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;

        Ok(Self::new(&secret_key, targets))
    }

    /// Create a hosted checkout session for a preference request
    ///
    /// Returns the session id and the URL to send the user to.
    pub async fn create_preference(&self, request: &PreferenceRequest) -> Result<PreferenceResponse> {
        let validated = validate(request)?;
        let urls = BackUrls::for_platform(
            request.platform,
            &self.targets.frontend_url,
            &self.targets.deep_link_scheme,
            &validated.reference,
        );
        let pricing = pricing(request.plan_type);

        let mut params = CreateCheckoutSession::new();
        params.success_url = Some(&urls.success);
        params.cancel_url = Some(&urls.cancel);
        params.mode = Some(CheckoutSessionMode::Subscription);
        params.client_reference_id = Some(request.tenant_id.as_str());
        params.customer_email = request.email.as_deref();

        let mut metadata = HashMap::new();
        metadata.insert("external_reference".to_string(), validated.reference.clone());
        metadata.insert("plan".to_string(), request.plan_type.as_str().to_string());
        metadata.insert("tenant_id".to_string(), request.tenant_id.to_string());
        params.metadata = Some(metadata);

        if let Some(days) = validated.trial_days {
            params.subscription_data = Some(CreateCheckoutSessionSubscriptionData {
                trial_period_days: Some(days),
                ..Default::default()
            });
        }

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Currency::MXN,
                unit_amount: Some(pricing.cents),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: pricing.name.clone(),
                    description: Some(pricing.description.clone()),
                    ..Default::default()
                }),
                recurring: Some(CreateCheckoutSessionLineItemsPriceDataRecurring {
                    interval: match pricing.interval {
                        BillingInterval::Monthly => CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Month,
                        BillingInterval::Yearly => CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Year,
                    },
                    interval_count: Some(1),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = CheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let init_point = session
            .url
            .ok_or_else(|| PaymentError::Stripe("No checkout URL returned".into()))?;

        tracing::info!(
            tenant_id = %request.tenant_id,
            plan = request.plan_type.as_str(),
            session_id = %session.id,
            "Checkout session created"
        );

        Ok(PreferenceResponse {
            preference_id: session.id.to_string(),
            init_point,
        })
    }

    /// Get the underlying Stripe client
    pub const fn inner(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use activation_core::{Platform, TenantId};

    fn request(plan_type: PlanType, is_trial: bool) -> PreferenceRequest {
        PreferenceRequest {
            tenant_id: TenantId::new("T1"),
            user_id: Some("u1".into()),
            email: None,
            plan_type,
            is_trial,
            trial_days: 0,
            platform: Platform::Web,
        }
    }

    #[test]
    fn test_trial_defaults_days() {
        let validated = validate(&request(PlanType::Basic, true)).unwrap();
        assert_eq!(validated.trial_days, Some(TRIAL_DAYS));

        let reference: ExternalReference = serde_json::from_str(&validated.reference).unwrap();
        assert_eq!(reference.tenant_id, "T1");
        assert!(reference.is_trial);
        assert_eq!(reference.trial_days, TRIAL_DAYS);
    }

    #[test]
    fn test_subscription_has_no_trial() {
        let validated = validate(&request(PlanType::Pro, false)).unwrap();
        assert_eq!(validated.trial_days, None);
    }

    #[test]
    fn test_missing_user_encodes_unknown() {
        let mut req = request(PlanType::Pro, false);
        req.user_id = None;
        let validated = validate(&req).unwrap();
        let reference: ExternalReference = serde_json::from_str(&validated.reference).unwrap();
        assert_eq!(reference.user_id, "unknown");
    }

    #[test]
    fn test_rejects_empty_tenant() {
        let mut req = request(PlanType::Pro, false);
        req.tenant_id = TenantId::new(" ");
        assert!(matches!(validate(&req), Err(PaymentError::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_pro_trial() {
        assert!(matches!(
            validate(&request(PlanType::Pro, true)),
            Err(PaymentError::InvalidRequest(_))
        ));
    }
}
