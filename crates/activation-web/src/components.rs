//! UI Components

use activation_core::{Navigator, OverlayState};
use leptos::prelude::*;

use crate::platform::BrowserNavigator;
use crate::shell::use_services;

/// Full-screen activation overlay. Rendered above everything else.
#[component]
pub fn ActivationOverlay(state: OverlayState) -> impl IntoView {
    let root_path = use_services().with_value(|s| s.reconciler.config().root_path.clone());

    match state {
        OverlayState::FinishingUp => view! {
            <div class="overlay">
                <div class="spinner"></div>
                <h2>"Success! Finishing up"</h2>
                <p>"We are activating your account. This only takes a moment."</p>
            </div>
        }
        .into_any(),
        OverlayState::SyncError(message) => view! {
            <div class="overlay overlay-error">
                <h2>"Sync error"</h2>
                <p class="error">{format!("Sync error: {message}")}</p>
                <button class="btn btn-primary" on:click=move |_| BrowserNavigator.hard_navigate(&root_path)>
                    "Retry"
                </button>
            </div>
        }
        .into_any(),
    }
}

#[component]
pub fn LoadingView() -> impl IntoView {
    view! {
        <div class="loading">
            <div class="spinner"></div>
        </div>
    }
}
