//! Main Shell
//!
//! Owns the per-mount services, loads the active tenant, runs the
//! reconciler when activation is requested and renders whatever the
//! onboarding gate decides.

use std::sync::Arc;

use activation_core::{
    decide, ActivationConfig, ActivationContext, ActivationPhase, CallbackContext, CancelToken,
    Initiator, Reconciler, ShellView, should_reconcile,
};
use activation_runtime::RestBackend;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_location;

use crate::api::{backend_config, HttpPreferenceGateway};
use crate::components::{ActivationOverlay, LoadingView};
use crate::pages::{HomePage, OnboardingPage};
use crate::platform::{
    current_href, detect_platform, stored_access_token, BrowserNavigator, BrowserTimer,
    SessionIntentStore, TenantCache,
};

/// Everything built once per shell mount
pub struct Services {
    pub backend: Arc<RestBackend>,
    pub context: Arc<ActivationContext>,
    pub reconciler: Arc<Reconciler>,
    pub initiator: Arc<Initiator>,
    pub store: Arc<SessionIntentStore>,
    pub cache: TenantCache,
}

impl Services {
    fn mount() -> Self {
        let config = ActivationConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid activation config, using defaults");
            ActivationConfig::default()
        });

        let store = Arc::new(SessionIntentStore);
        let callback = current_href().and_then(|href| CallbackContext::from_location(&href));
        let context = Arc::new(ActivationContext::mount(store.clone(), callback));

        let backend = Arc::new(RestBackend::from_config(backend_config()));
        backend.set_session(stored_access_token());

        let cache = TenantCache::new();
        let navigator = Arc::new(BrowserNavigator);
        let timer = Arc::new(BrowserTimer);

        let reconciler = Arc::new(Reconciler::new(
            backend.clone(),
            backend.clone(),
            Arc::new(cache),
            navigator.clone(),
            timer.clone(),
            config.clone(),
        ));
        let initiator = Arc::new(Initiator::new(
            Arc::new(HttpPreferenceGateway::new()),
            backend.clone(),
            navigator,
            timer,
            config,
            detect_platform(),
        ));

        Self {
            backend,
            context,
            reconciler,
            initiator,
            store,
            cache,
        }
    }
}

pub type ServicesHandle = StoredValue<Services, LocalStorage>;

pub fn use_services() -> ServicesHandle {
    expect_context::<ServicesHandle>()
}

#[component]
pub fn Shell() -> impl IntoView {
    let services: ServicesHandle = StoredValue::new_local(Services::mount());
    provide_context(services);

    let cache = services.with_value(|s| s.cache);
    let (phase, set_phase) = signal(ActivationPhase::Idle);
    let (callbacks, set_callbacks) = signal(0_u32);

    // Unmount cancels the run at its next stage boundary
    let cancel = CancelToken::new();
    on_cleanup({
        let cancel = cancel.clone();
        move || cancel.cancel()
    });

    // Phase broadcast -> signal
    let mut phases = services.with_value(|s| s.reconciler.subscribe());
    spawn_local(async move {
        while phases.changed().await.is_ok() {
            let next = phases.borrow_and_update().clone();
            set_phase.set(next);
        }
    });

    // Tenant query; refetched whenever the cache is cleared
    Effect::new(move |_| {
        cache.generation.track();
        let backend = services.with_value(|s| s.backend.clone());
        spawn_local(async move {
            match backend.load_active_tenant().await {
                Ok(tenant) => cache.tenant.set(tenant),
                Err(e) => tracing::error!(error = %e, "Failed to load tenant"),
            }
            cache.settled.set(true);
        });
    });

    // Late callbacks (deep links) arrive as router navigations
    let location = use_location();
    Effect::new(move |previous: Option<String>| {
        let search = location.search.get();
        if previous.is_some_and(|p| p != search) {
            if let Some(callback) = CallbackContext::from_query(&search) {
                services.with_value(|s| s.context.absorb_callback(callback));
                set_callbacks.update(|n| *n += 1);
            }
        }
        search
    });

    // Reconcile once activation is requested. Without an approved callback
    // the flag alone waits for the tenant query to settle.
    Effect::new(move |_| {
        callbacks.track();
        let tenant = cache.tenant.get();
        let settled = cache.settled.get();

        services.with_value(|s| {
            if let Some(ref loaded) = tenant {
                s.context.observe_tenant(loaded);
            }

            if !should_reconcile(tenant.as_ref(), settled, &s.context) {
                return;
            }

            let reconciler = s.reconciler.clone();
            let context = s.context.clone();
            let cancel = cancel.clone();
            spawn_local(async move {
                let outcome = reconciler.run(&context, tenant.as_ref(), &cancel).await;
                tracing::info!(?outcome, "Activation run finished");
            });
        });
    });

    let view_state = Memo::new(move |_| {
        callbacks.track();
        let tenant = cache.tenant.get();
        let phase = phase.get();
        services.with_value(|s| decide(tenant.as_ref(), &s.context, &phase))
    });

    move || match view_state.get() {
        ShellView::Loading => view! { <LoadingView /> }.into_any(),
        ShellView::ActivationOverlay(state) => view! { <ActivationOverlay state=state /> }.into_any(),
        ShellView::OnboardingWizard { tenant_type, payment_failed } => {
            view! { <OnboardingPage tenant_type=tenant_type payment_failed=payment_failed /> }.into_any()
        }
        ShellView::Application => view! { <HomePage /> }.into_any(),
    }
}
