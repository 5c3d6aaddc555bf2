//! Onboarding Wizard
//!
//! Two steps: a summary of the workspace, then the payment step. The step
//! is saved before leaving for checkout so a declined payment reopens it.

use activation_core::{PlanType, TenantType, WizardSnapshot};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::shell::use_services;

const SUMMARY_STEP: u8 = 0;
const PAYMENT_STEP: u8 = 1;

#[component]
pub fn OnboardingPage(tenant_type: TenantType, payment_failed: bool) -> impl IntoView {
    let services = use_services();
    let cache = services.with_value(|s| s.cache);

    let saved_step = services.with_value(|s| match WizardSnapshot::load(s.store.as_ref()) {
        Ok(snapshot) => snapshot.map(|snap| snap.step),
        Err(e) => {
            tracing::warn!(error = %e, "Wizard snapshot unreadable");
            None
        }
    });
    let initial_step = if payment_failed {
        PAYMENT_STEP
    } else {
        saved_step.unwrap_or(SUMMARY_STEP)
    };

    let (step, set_step) = signal(initial_step);
    let (busy, set_busy) = signal(false);
    let (error, set_error) = signal(
        payment_failed.then(|| "Your payment was not processed. Please try again or choose another method.".to_string()),
    );

    let (title, subtitle) = match tenant_type {
        TenantType::School => ("Set up your school", "Activate your campus for directors, staff and teachers."),
        TenantType::Independent => ("Set up your workspace", "Activate your independent teaching workspace."),
    };

    let start = move |plan: PlanType| {
        let Some(tenant) = cache.tenant.get_untracked() else {
            return;
        };
        set_busy.set(true);
        set_error.set(None);

        let (initiator, context, store) =
            services.with_value(|s| (s.initiator.clone(), s.context.clone(), s.store.clone()));
        spawn_local(async move {
            let snapshot = WizardSnapshot::new(
                PAYMENT_STEP,
                serde_json::json!({ "tenantType": tenant.tenant_type, "plan": plan.as_str() }),
            );
            if let Err(e) = snapshot.save(store.as_ref()) {
                tracing::warn!(error = %e, "Could not save wizard progress");
            }

            let started = match plan {
                PlanType::Basic => initiator.start_free_trial(&tenant, &context).await,
                PlanType::Pro => initiator.start_subscription(&tenant).await,
            };
            // Success leaves the page; only failures come back here
            if let Err(e) = started {
                tracing::error!(error = %e, "Checkout could not be started");
                set_error.set(Some(e.user_message()));
                set_busy.set(false);
            }
        });
    };

    view! {
        <div class="onboarding">
            <h1>{title}</h1>
            <p class="subtitle">{subtitle}</p>

            <Show
                when=move || step.get() == PAYMENT_STEP
                fallback=move || view! {
                    <section class="wizard-step">
                        <h2>{move || cache.tenant.get().map(|t| t.name).unwrap_or_default()}</h2>
                        <button class="btn btn-primary" on:click=move |_| set_step.set(PAYMENT_STEP)>
                            "Continue"
                        </button>
                    </section>
                }
            >
                <section class="wizard-step plans">
                    <Show when=move || error.get().is_some()>
                        <p class="error">{move || error.get().unwrap_or_default()}</p>
                    </Show>

                    <div class="plan">
                        <h2>"Basic"</h2>
                        <div class="price">"$0"<span>" / 30 days"</span></div>
                        <button class="btn" disabled=move || busy.get() on:click=move |_| start(PlanType::Basic)>
                            "Start free trial"
                        </button>
                    </div>

                    <div class="plan featured">
                        <h2>"PRO"</h2>
                        <div class="price">"$4,500 MXN"<span>" / year"</span></div>
                        <button class="btn btn-primary" disabled=move || busy.get() on:click=move |_| start(PlanType::Pro)>
                            "Subscribe"
                        </button>
                    </div>

                    <button class="btn btn-link" disabled=move || busy.get() on:click=move |_| set_step.set(SUMMARY_STEP)>
                        "Back"
                    </button>
                </section>
            </Show>
        </div>
    }
}
