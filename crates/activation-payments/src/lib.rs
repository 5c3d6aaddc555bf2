//! # activation-payments
//!
//! Hosted checkout for the trial and subscription initiators.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌──────────────────────────┐
//! │  Wizard     │────▶│  Stripe Hosted  │────▶│  /?status=approved&...   │
//! │ (initiator) │     │  Checkout Page  │     │  campus://onboarding?... │
//! └─────────────┘     └─────────────────┘     └──────────────────────────┘
//! ```
//!
//! The return URL is the only channel back to the client: it carries
//! `status`, `payment_id` and `external_reference`, which the activation
//! reconciler turns into a tenant write.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use activation_payments::{ReturnTargets, StripeClient};
//!
//! let client = StripeClient::new("sk_test_xxx", ReturnTargets {
//!     frontend_url: "https://app.example.com".into(),
//!     deep_link_scheme: "campus".into(),
//! });
//!
//! let preference = client.create_preference(&request).await?;
//! // Send the user to: preference.init_point
//! ```

mod back_urls;
mod checkout;
mod error;
mod plan;

pub use back_urls::BackUrls;
pub use checkout::{validate, ReturnTargets, StripeClient, ValidatedPreference};
pub use error::{PaymentError, Result};
pub use plan::{pricing, BillingInterval, PlanPricing};
