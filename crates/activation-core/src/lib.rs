//! # activation-core
//!
//! Reconciles a tenant's subscription state after the user comes back from
//! the hosted checkout.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ActivationContext                         │
//! │   callback params / deep link ──┐      intent flag ──┐      │
//! │                                 ▼                    ▼      │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌─────────────┐  │
//! │  │TenantResolver│──▶│    Reconciler    │──▶│ decide(view)│  │
//! │  └──────────────┘   │ (phase machine)  │   └─────────────┘  │
//! │                     └──────────────────┘                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Platform services (backend, cache, navigation, timers, storage) are
//! traits so the same pipeline runs in the browser, in a native shell, and
//! under tests against the in-memory doubles in [`memory`].

pub mod backend;
pub mod callback;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod initiator;
pub mod intent;
pub mod memory;
pub mod platform;
pub mod reconciler;
pub mod reference;
pub mod resolver;
pub mod tenant;

pub use backend::{IdentityProvider, TenantStore};
pub use callback::{strip_callback_params, CallbackContext, PaymentStatus, Transport};
pub use config::{ActivationConfig, SettleStrategy};
pub use context::ActivationContext;
pub use error::{ActivationError, Result, Stage};
pub use gate::{decide, should_reconcile, OverlayState, ShellView};
pub use initiator::{Initiator, Platform, PreferenceGateway, PreferenceRequest, PreferenceResponse, TRIAL_DAYS};
pub use intent::{IntentStore, MemoryIntentStore, WizardSnapshot};
pub use platform::{bounded, Navigator, QueryCache, Timer};
pub use reconciler::{ActivationPhase, CancelToken, Reconciler, RunOutcome};
pub use reference::{ExternalReference, PlanType};
pub use resolver::{ResolutionSource, ResolvedTenant, TenantResolver};
pub use tenant::{Role, Tenant, TenantId, TenantType, UserIdentity};

#[cfg(feature = "tokio-timer")]
pub use platform::TokioTimer;
