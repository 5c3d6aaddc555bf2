//! Home Page

use activation_core::{Role, WizardSnapshot};
use leptos::prelude::*;

use crate::shell::use_services;

fn role_label(role: &Role) -> String {
    match role {
        Role::SuperAdmin => "Super admin".into(),
        Role::Director => "Director".into(),
        Role::Admin => "Administrator".into(),
        Role::Teacher => "Teacher".into(),
        Role::IndependentTeacher => "Independent teacher".into(),
        Role::Tutor => "Tutor".into(),
        Role::Other(other) => other.clone(),
    }
}

#[component]
pub fn HomePage() -> impl IntoView {
    let services = use_services();
    let cache = services.with_value(|s| s.cache);

    // Onboarding is behind us; the wizard's saved progress is stale now
    services.with_value(|s| {
        if let Err(e) = WizardSnapshot::clear(s.store.as_ref()) {
            tracing::warn!(error = %e, "Could not clear wizard snapshot");
        }
    });

    view! {
        <div class="home">
            {move || cache.tenant.get().map(|tenant| view! {
                <header class="hero">
                    <h1>{tenant.name.clone()}</h1>
                    <p class="tagline">{role_label(&tenant.role)}</p>
                </header>
            })}
        </div>
    }
}
