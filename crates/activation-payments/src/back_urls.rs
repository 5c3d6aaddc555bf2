//! Return URLs
//!
//! Where the hosted checkout sends the user afterwards. Every URL carries
//! the callback context (`status`, `payment_id`, `external_reference`) so
//! the client can reconcile without any server push.

use activation_core::{PaymentStatus, Platform};
use url::form_urlencoded;

/// Stripe substitutes the session id into this placeholder on redirect
const SESSION_ID_TEMPLATE: &str = "{CHECKOUT_SESSION_ID}";

/// Success and cancel targets for one checkout
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackUrls {
    pub success: String,
    pub cancel: String,
}

impl BackUrls {
    /// Web returns to `{frontend}/`; native apps to `{scheme}://onboarding`
    pub fn for_platform(platform: Platform, frontend_url: &str, deep_link_scheme: &str, reference: &str) -> Self {
        let base = if platform.is_native() {
            format!("{deep_link_scheme}://onboarding")
        } else {
            format!("{}/", frontend_url.trim_end_matches('/'))
        };

        Self {
            success: callback_url(&base, PaymentStatus::Approved, reference),
            cancel: callback_url(&base, PaymentStatus::Failure, reference),
        }
    }
}

fn callback_url(base: &str, status: PaymentStatus, reference: &str) -> String {
    let reference: String = form_urlencoded::byte_serialize(reference.as_bytes()).collect();
    let mut url = format!("{base}?status={}", status.as_str());

    // The placeholder must stay unencoded for Stripe to recognise it
    if status == PaymentStatus::Approved {
        url.push_str("&payment_id=");
        url.push_str(SESSION_ID_TEMPLATE);
    }
    url.push_str("&external_reference=");
    url.push_str(&reference);
    url
}
