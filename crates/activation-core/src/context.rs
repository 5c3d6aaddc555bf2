//! Activation Context
//!
//! Built once when the shell mounts and shared by the gate and the
//! reconciler, so both read the same intent value within one render.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::callback::CallbackContext;
use crate::intent::{self, IntentStore};
use crate::tenant::Tenant;

pub struct ActivationContext {
    store: Arc<dyn IntentStore>,
    callback: RwLock<Option<CallbackContext>>,
    intent: AtomicBool,
}

impl ActivationContext {
    /// Snapshot the persisted flag and absorb the mount-time callback
    pub fn mount(store: Arc<dyn IntentStore>, callback: Option<CallbackContext>) -> Self {
        let intent = intent::read_flag(store.as_ref());
        let context = Self {
            store,
            callback: RwLock::new(None),
            intent: AtomicBool::new(intent),
        };
        if let Some(callback) = callback {
            context.absorb_callback(callback);
        }
        context
    }

    /// Take in a callback that arrived after mount (deep link).
    /// An approved status persists the intent flag.
    pub fn absorb_callback(&self, callback: CallbackContext) {
        tracing::info!(
            status = ?callback.status,
            transport = %callback.transport,
            has_reference = callback.external_reference.is_some(),
            "Callback context received"
        );
        if callback.is_approved() {
            self.set_intent(true);
        }
        *self.callback.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub fn callback(&self) -> Option<CallbackContext> {
        self.callback.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn intent_active(&self) -> bool {
        self.intent.load(Ordering::SeqCst)
    }

    /// Update the in-memory value and persist it. Storage failures are
    /// logged; the in-memory value still applies for this page lifetime.
    pub fn set_intent(&self, active: bool) {
        self.intent.store(active, Ordering::SeqCst);
        if let Err(e) = intent::write_flag(self.store.as_ref(), active) {
            tracing::warn!(error = %e, active, "Could not persist activation flag");
        }
    }

    /// Whether a reconciliation run should be (or is being) shown
    pub fn activation_requested(&self, tenant: Option<&Tenant>) -> bool {
        if self.callback().is_some_and(|c| c.is_approved()) {
            return true;
        }
        self.intent_active() && !tenant.is_some_and(|t| t.onboarding_completed)
    }

    /// The returning checkout reported a declined payment
    pub fn payment_failed(&self) -> bool {
        self.callback().is_some_and(|c| c.is_failed())
    }

    /// Feed a freshly read tenant. The flag is cleared only when the
    /// server confirms `onboarding_completed`. Returns whether it cleared.
    pub fn observe_tenant(&self, tenant: &Tenant) -> bool {
        if tenant.onboarding_completed && self.intent_active() {
            tracing::info!(tenant_id = %tenant.id, "Activation confirmed, clearing intent flag");
            self.set_intent(false);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{PaymentStatus, Transport};
    use crate::intent::{read_flag, write_flag, MemoryIntentStore};
    use crate::tenant::{Role, TenantId, TenantType};

    fn tenant(completed: bool) -> Tenant {
        Tenant {
            id: TenantId::new("T1"),
            name: String::new(),
            tenant_type: TenantType::School,
            onboarding_completed: completed,
            role: Role::Director,
        }
    }

    fn callback(status: PaymentStatus) -> CallbackContext {
        CallbackContext {
            status: Some(status),
            payment_id: None,
            external_reference: None,
            transport: Transport::Web,
        }
    }

    #[test]
    fn test_approved_callback_sets_flag() {
        let store = Arc::new(MemoryIntentStore::new());
        let context = ActivationContext::mount(store.clone(), Some(callback(PaymentStatus::Approved)));
        assert!(context.intent_active());
        assert!(read_flag(store.as_ref()));
        assert!(context.activation_requested(Some(&tenant(false))));
    }

    #[test]
    fn test_failed_callback_does_not_set_flag() {
        let store = Arc::new(MemoryIntentStore::new());
        let context = ActivationContext::mount(store.clone(), Some(callback(PaymentStatus::Rejected)));
        assert!(!context.intent_active());
        assert!(context.payment_failed());
        assert!(!context.activation_requested(Some(&tenant(false))));
    }

    #[test]
    fn test_flag_survives_reload_without_params() {
        let store = Arc::new(MemoryIntentStore::new());
        write_flag(store.as_ref(), true).unwrap();

        let context = ActivationContext::mount(store, None);
        assert!(context.activation_requested(None));
        assert!(context.activation_requested(Some(&tenant(false))));
    }

    #[test]
    fn test_flag_clears_only_on_confirmed_state() {
        let store = Arc::new(MemoryIntentStore::new());
        write_flag(store.as_ref(), true).unwrap();
        let context = ActivationContext::mount(store.clone(), None);

        assert!(!context.observe_tenant(&tenant(false)));
        assert!(read_flag(store.as_ref()));

        assert!(context.observe_tenant(&tenant(true)));
        assert!(!read_flag(store.as_ref()));
        assert!(!context.activation_requested(Some(&tenant(true))));
    }

    #[test]
    fn test_late_deep_link_is_absorbed() {
        let store = Arc::new(MemoryIntentStore::new());
        let context = ActivationContext::mount(store, None);
        assert!(!context.activation_requested(Some(&tenant(false))));

        let mut link = callback(PaymentStatus::Approved);
        link.transport = Transport::DeepLink;
        context.absorb_callback(link);

        assert!(context.activation_requested(Some(&tenant(false))));
    }
}
