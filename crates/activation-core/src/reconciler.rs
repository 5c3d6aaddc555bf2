//! Activation Reconciler
//!
//! ```text
//! IDLE → DETECTED → RESOLVING → UPDATING → INVALIDATING → SETTLING → DONE
//!                       │           │
//!                       └───────────┴──▶ ERROR (terminal for the run)
//! ```
//!
//! Steps run strictly in sequence. A per-page guard keeps a second run from
//! starting; it is not a distributed lock; duplicate runs in other tabs
//! converge because the write is a blind idempotent set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::backend::{IdentityProvider, TenantStore};
use crate::config::{ActivationConfig, SettleStrategy};
use crate::context::ActivationContext;
use crate::error::{ActivationError, Stage};
use crate::platform::{bounded, Navigator, QueryCache, Timer};
use crate::resolver::TenantResolver;
use crate::tenant::{Tenant, TenantId};

/// Presentation state of the current run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ActivationPhase {
    #[default]
    Idle,
    Detected,
    Resolving,
    Updating,
    Invalidating,
    Settling,
    Done,
    Error(String),
    Cancelled,
}

impl ActivationPhase {
    /// `DETECTED` through `DONE`: the "finishing up" overlay
    pub const fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Detected
                | Self::Resolving
                | Self::Updating
                | Self::Invalidating
                | Self::Settling
                | Self::Done
        )
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

/// How a call to [`Reconciler::run`] ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Neither an approved callback nor the intent flag asked for a run
    NotRequested,

    /// Another run owns this page
    AlreadyActive,

    /// Tenant written and reload issued. `confirmed` is true when a read
    /// observed the write before reloading.
    Completed { tenant_id: TenantId, confirmed: bool },

    /// The run stopped in `ERROR`
    Failed(ActivationError),

    /// The caller cancelled after `reached` completed; `written` tells
    /// whether the write had landed
    Cancelled { reached: ActivationPhase, written: bool },
}

/// Cooperative cancellation, checked between stages. An in-flight write
/// is always allowed to finish.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Reconciler {
    identity: Arc<dyn IdentityProvider>,
    tenants: Arc<dyn TenantStore>,
    cache: Arc<dyn QueryCache>,
    navigator: Arc<dyn Navigator>,
    timer: Arc<dyn Timer>,
    config: ActivationConfig,
    phase: watch::Sender<ActivationPhase>,
    active: AtomicBool,
}

impl Reconciler {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        tenants: Arc<dyn TenantStore>,
        cache: Arc<dyn QueryCache>,
        navigator: Arc<dyn Navigator>,
        timer: Arc<dyn Timer>,
        config: ActivationConfig,
    ) -> Self {
        let (phase, _) = watch::channel(ActivationPhase::Idle);
        Self {
            identity,
            tenants,
            cache,
            navigator,
            timer,
            config,
            phase,
            active: AtomicBool::new(false),
        }
    }

    /// Phase change notifications
    pub fn subscribe(&self) -> watch::Receiver<ActivationPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> ActivationPhase {
        self.phase.borrow().clone()
    }

    pub const fn config(&self) -> &ActivationConfig {
        &self.config
    }

    /// Drive one run to completion.
    ///
    /// `loaded` is the tenant the shell currently shows, if any.
    pub async fn run(
        &self,
        context: &ActivationContext,
        loaded: Option<&Tenant>,
        cancel: &CancelToken,
    ) -> RunOutcome {
        if !context.activation_requested(loaded) {
            return RunOutcome::NotRequested;
        }

        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Activation run already active on this page");
            return RunOutcome::AlreadyActive;
        }

        self.transition(ActivationPhase::Detected);
        let callback = context.callback();

        // RESOLVING
        self.transition(ActivationPhase::Resolving);
        let resolver = TenantResolver::new(self.identity.as_ref(), &self.config);
        let resolved = match bounded(
            self.timer.as_ref(),
            self.config.network_timeout,
            Stage::Resolving,
            resolver.resolve(callback.as_ref(), loaded.map(|t| &t.id)),
        )
        .await
        {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        tracing::info!(tenant_id = %resolved.id, source = ?resolved.source, "Resolved tenant to activate");

        if cancel.is_cancelled() {
            return self.cancelled(ActivationPhase::Resolving, false);
        }

        // UPDATING
        self.transition(ActivationPhase::Updating);
        if let Err(e) = bounded(
            self.timer.as_ref(),
            self.config.network_timeout,
            Stage::Updating,
            self.tenants.mark_onboarding_completed(&resolved.id),
        )
        .await
        {
            return self.fail(e);
        }
        tracing::info!(tenant_id = %resolved.id, "Tenant marked as onboarded");

        // INVALIDATING
        self.transition(ActivationPhase::Invalidating);
        self.cache.clear();
        self.navigator.strip_callback_params();

        if cancel.is_cancelled() {
            return self.cancelled(ActivationPhase::Invalidating, true);
        }

        // SETTLING
        self.transition(ActivationPhase::Settling);
        let confirmed = self.settle(context, &resolved.id).await;

        if cancel.is_cancelled() {
            return self.cancelled(ActivationPhase::Settling, true);
        }

        // DONE
        self.transition(ActivationPhase::Done);
        self.navigator.hard_navigate(&self.config.root_path);

        RunOutcome::Completed {
            tenant_id: resolved.id,
            confirmed,
        }
    }

    /// Absorb read-after-write lag. Returns whether the write was seen.
    async fn settle(&self, context: &ActivationContext, id: &TenantId) -> bool {
        match self.config.settle {
            SettleStrategy::FixedDelay(delay) => {
                self.timer.sleep(delay).await;
                false
            }
            SettleStrategy::PollUntilConfirmed {
                interval,
                max_attempts,
            } => {
                for attempt in 1..=max_attempts {
                    self.timer.sleep(interval).await;
                    match bounded(
                        self.timer.as_ref(),
                        self.config.network_timeout,
                        Stage::Settling,
                        self.tenants.fetch_tenant(id),
                    )
                    .await
                    {
                        Ok(Some(tenant)) if tenant.onboarding_completed => {
                            context.observe_tenant(&tenant);
                            tracing::debug!(attempt, "Write visible to reads");
                            return true;
                        }
                        Ok(_) => tracing::debug!(attempt, "Read still stale"),
                        Err(e) => tracing::warn!(attempt, error = %e, "Confirmation read failed"),
                    }
                }
                tracing::warn!(max_attempts, "Write not confirmed, reloading anyway");
                false
            }
        }
    }

    fn transition(&self, next: ActivationPhase) {
        tracing::debug!(phase = ?next, "Activation phase");
        self.phase.send_replace(next);
    }

    /// ERROR keeps the guard latched; only a hard reload starts over
    fn fail(&self, err: ActivationError) -> RunOutcome {
        tracing::error!(error = %err, "Activation run failed");
        self.transition(ActivationPhase::Error(err.user_message()));
        RunOutcome::Failed(err)
    }

    fn cancelled(&self, reached: ActivationPhase, written: bool) -> RunOutcome {
        tracing::info!(reached = ?reached, written, "Activation run cancelled");
        self.transition(ActivationPhase::Cancelled);
        self.active.store(false, Ordering::SeqCst);
        RunOutcome::Cancelled { reached, written }
    }
}
