//! Onboarding Gate
//!
//! Evaluated on every render of the main shell. The activation overlay
//! always wins over the onboarding wizard, so a successful payment never
//! flashes "complete onboarding" while the write is in flight.

use crate::context::ActivationContext;
use crate::reconciler::ActivationPhase;
use crate::tenant::{Tenant, TenantType};

/// The two visual states of the activation overlay
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayState {
    /// Spinner, no action available
    FinishingUp,

    /// Message plus a single retry that hard-navigates to root
    SyncError(String),
}

/// What the shell renders
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellView {
    Loading,
    ActivationOverlay(OverlayState),
    OnboardingWizard {
        tenant_type: TenantType,
        /// The checkout came back declined; reopen the payment step
        payment_failed: bool,
    },
    Application,
}

/// Pure gate decision
pub fn decide(tenant: Option<&Tenant>, context: &ActivationContext, phase: &ActivationPhase) -> ShellView {
    if let Some(message) = phase.error_message() {
        return ShellView::ActivationOverlay(OverlayState::SyncError(message.to_string()));
    }

    if phase.is_in_flight() || context.activation_requested(tenant) {
        return ShellView::ActivationOverlay(OverlayState::FinishingUp);
    }

    match tenant {
        None => ShellView::Loading,
        Some(t) if !t.onboarding_completed => ShellView::OnboardingWizard {
            tenant_type: t.tenant_type,
            payment_failed: context.payment_failed(),
        },
        Some(_) => ShellView::Application,
    }
}

/// Whether the shell should start a reconciliation run now.
///
/// Without an approved callback the intent flag is only acted on once the
/// tenant query has settled, so a confirmed tenant can clear a stale flag
/// first. A query that settled with no tenant still starts the run; the
/// resolver then ends it in ERROR rather than leaving the overlay idle.
pub fn should_reconcile(tenant: Option<&Tenant>, load_settled: bool, context: &ActivationContext) -> bool {
    let approved = context.callback().is_some_and(|c| c.is_approved());
    if !approved && !load_settled {
        return false;
    }
    context.activation_requested(tenant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::callback::CallbackContext;
    use crate::intent::{write_flag, IntentStore, MemoryIntentStore};
    use crate::tenant::{Role, TenantId};

    fn tenant(kind: TenantType, completed: bool) -> Tenant {
        Tenant {
            id: TenantId::new("T1"),
            name: String::new(),
            tenant_type: kind,
            onboarding_completed: completed,
            role: Role::Director,
        }
    }

    fn mount(query: &str) -> ActivationContext {
        let store: Arc<dyn IntentStore> = Arc::new(MemoryIntentStore::new());
        ActivationContext::mount(store, CallbackContext::from_query(query))
    }

    #[test]
    fn test_overlay_beats_wizard_on_approved_callback() {
        let context = mount("status=approved");
        let view = decide(Some(&tenant(TenantType::School, false)), &context, &ActivationPhase::Idle);
        assert_eq!(view, ShellView::ActivationOverlay(OverlayState::FinishingUp));
    }

    #[test]
    fn test_overlay_while_tenant_loading() {
        let context = mount("status=approved");
        let view = decide(None, &context, &ActivationPhase::Resolving);
        assert_eq!(view, ShellView::ActivationOverlay(OverlayState::FinishingUp));
    }

    #[test]
    fn test_error_phase_shows_sync_error() {
        let context = mount("");
        let view = decide(
            Some(&tenant(TenantType::School, false)),
            &context,
            &ActivationPhase::Error("boom".into()),
        );
        assert_eq!(view, ShellView::ActivationOverlay(OverlayState::SyncError("boom".into())));
    }

    #[test]
    fn test_wizard_for_unonboarded_tenant() {
        let context = mount("");
        let view = decide(Some(&tenant(TenantType::Independent, false)), &context, &ActivationPhase::Idle);
        assert_eq!(
            view,
            ShellView::OnboardingWizard {
                tenant_type: TenantType::Independent,
                payment_failed: false,
            }
        );
    }

    #[test]
    fn test_declined_payment_reopens_wizard_payment_step() {
        let context = mount("status=rejected");
        let view = decide(Some(&tenant(TenantType::School, false)), &context, &ActivationPhase::Idle);
        assert_eq!(
            view,
            ShellView::OnboardingWizard {
                tenant_type: TenantType::School,
                payment_failed: true,
            }
        );
    }

    #[test]
    fn test_application_and_loading() {
        let context = mount("");
        assert_eq!(
            decide(Some(&tenant(TenantType::School, true)), &context, &ActivationPhase::Idle),
            ShellView::Application
        );
        assert_eq!(decide(None, &context, &ActivationPhase::Idle), ShellView::Loading);
    }

    #[test]
    fn test_stale_flag_with_confirmed_tenant_shows_application() {
        let store = Arc::new(MemoryIntentStore::new());
        write_flag(store.as_ref(), true).unwrap();
        let context = ActivationContext::mount(store, None);

        let view = decide(Some(&tenant(TenantType::School, true)), &context, &ActivationPhase::Idle);
        assert_eq!(view, ShellView::Application);
    }

    #[test]
    fn test_cancelled_run_falls_back_to_gate() {
        let context = mount("");
        let view = decide(Some(&tenant(TenantType::School, false)), &context, &ActivationPhase::Cancelled);
        assert!(matches!(view, ShellView::OnboardingWizard { .. }));
    }

    #[test]
    fn test_flag_waits_for_tenant_query() {
        let store = Arc::new(MemoryIntentStore::new());
        write_flag(store.as_ref(), true).unwrap();
        let context = ActivationContext::mount(store, None);

        assert!(!should_reconcile(None, false, &context));
        assert!(should_reconcile(Some(&tenant(TenantType::School, false)), true, &context));
    }

    #[test]
    fn test_approved_callback_runs_before_tenant_query() {
        let context = mount("status=approved");
        assert!(should_reconcile(None, false, &context));
    }

    #[tokio::test]
    async fn test_flag_with_no_tenant_ends_in_sync_error() {
        use crate::config::ActivationConfig;
        use crate::error::ActivationError;
        use crate::memory::{InstantTimer, MemoryBackend, MemoryQueryCache, RecordingNavigator};
        use crate::reconciler::{CancelToken, Reconciler, RunOutcome};

        let store = Arc::new(MemoryIntentStore::new());
        write_flag(store.as_ref(), true).unwrap();
        let context = ActivationContext::mount(store, None);

        // signed out: the tenant query settles with nothing
        assert!(should_reconcile(None, true, &context));

        let backend = Arc::new(MemoryBackend::new());
        let reconciler = Reconciler::new(
            backend.clone(),
            backend.clone(),
            Arc::new(MemoryQueryCache::new()),
            Arc::new(RecordingNavigator::new()),
            Arc::new(InstantTimer::new()),
            ActivationConfig::default(),
        );
        let outcome = reconciler.run(&context, None, &CancelToken::new()).await;
        assert!(matches!(outcome, RunOutcome::Failed(ActivationError::UnresolvedTenant)));

        let view = decide(None, &context, &reconciler.phase());
        assert_eq!(
            view,
            ShellView::ActivationOverlay(OverlayState::SyncError(
                "cannot automatically identify the school account".into()
            ))
        );
        assert_eq!(backend.writes(), 0);
    }
}
