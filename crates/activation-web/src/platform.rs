//! Browser Adapters
//!
//! `web_sys` implementations of the seams the reconciler and the
//! initiators run against.

use std::time::Duration;

use activation_core::{
    strip_callback_params, ActivationConfig, ActivationError, CallbackContext, IntentStore,
    Navigator, Platform, QueryCache, Result, Tenant, Timer,
};
use async_trait::async_trait;
use leptos::prelude::*;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::Storage;

fn js_error(context: &str, value: &JsValue) -> String {
    format!("{context}: {}", value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

pub fn current_href() -> Option<String> {
    web_sys::window()?.location().href().ok()
}

// ============================================================================
// Intent store
// ============================================================================

/// Tab-scoped `sessionStorage`; survives the checkout redirect and reloads
pub struct SessionIntentStore;

impl SessionIntentStore {
    fn storage() -> Result<Storage> {
        let window = web_sys::window().ok_or_else(|| ActivationError::Storage("No window".into()))?;
        window
            .session_storage()
            .map_err(|e| ActivationError::Storage(js_error("sessionStorage", &e)))?
            .ok_or_else(|| ActivationError::Storage("sessionStorage unavailable".into()))
    }
}

impl IntentStore for SessionIntentStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| ActivationError::Storage(js_error("getItem", &e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| ActivationError::Storage(js_error("setItem", &e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| ActivationError::Storage(js_error("removeItem", &e)))
    }
}

/// Access token persisted by the backend's auth client under `*-auth-token`
pub fn stored_access_token() -> Option<String> {
    let storage = web_sys::window()?.local_storage().ok()??;
    let len = storage.length().ok()?;

    (0..len)
        .filter_map(|i| storage.key(i).ok().flatten())
        .filter(|key| key.ends_with("-auth-token"))
        .filter_map(|key| storage.get_item(&key).ok().flatten())
        .find_map(|raw| {
            let session: serde_json::Value = serde_json::from_str(&raw).ok()?;
            session.get("access_token")?.as_str().map(str::to_string)
        })
}

// ============================================================================
// Navigation
// ============================================================================

pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn strip_callback_params(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(stripped) = window.location().href().ok().and_then(|href| strip_callback_params(&href)) else {
            return;
        };

        let replaced = window
            .history()
            .and_then(|history| history.replace_state_with_url(&JsValue::NULL, "", Some(&stripped)));
        if let Err(e) = replaced {
            tracing::warn!(error = %js_error("replaceState", &e), "Could not strip callback parameters");
        }
    }

    fn hard_navigate(&self, path: &str) {
        tracing::info!(path, "Hard navigation");
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.location().set_href(path) {
                tracing::error!(error = %js_error("location.href", &e), "Navigation failed");
            }
        }
    }

    fn open_external(&self, url: &str) -> Result<()> {
        let window = web_sys::window().ok_or_else(|| ActivationError::Gateway("No window".into()))?;
        window
            .location()
            .set_href(url)
            .map_err(|e| ActivationError::Gateway(js_error("location.href", &e)))
    }
}

/// Feed a native deep link into the router.
///
/// Pushes the equivalent in-app route and fires `popstate`, so the shell's
/// location effect picks the callback up without a reload.
pub fn route_deep_link(link: &str) -> bool {
    let config = ActivationConfig::from_env().unwrap_or_default();
    let Some(callback) = CallbackContext::from_deep_link(link, &config) else {
        return false;
    };
    let route = callback.internal_route(&config.root_path);

    let Some(window) = web_sys::window() else {
        return false;
    };
    let pushed = window
        .history()
        .and_then(|history| history.push_state_with_url(&JsValue::NULL, "", Some(&route)));
    if let Err(e) = pushed {
        tracing::warn!(error = %js_error("pushState", &e), "Could not route deep link");
        return false;
    }

    match web_sys::PopStateEvent::new("popstate") {
        Ok(event) => {
            if let Err(e) = window.dispatch_event(&event) {
                tracing::warn!(error = %js_error("dispatchEvent", &e), "Could not notify router");
            }
        }
        Err(e) => tracing::warn!(error = %js_error("popstate", &e), "Could not notify router"),
    }
    true
}

/// Capacitor-style hosts serve the bundle from their own scheme on iOS and
/// from an Android WebView elsewhere
pub fn detect_platform() -> Platform {
    let Some(window) = web_sys::window() else {
        return Platform::Web;
    };

    let protocol = window.location().protocol().unwrap_or_default();
    if protocol == "capacitor:" || protocol == "ionic:" {
        return Platform::Ios;
    }

    let agent = window.navigator().user_agent().unwrap_or_default();
    if agent.contains("Android") && agent.contains("; wv)") {
        Platform::Android
    } else {
        Platform::Web
    }
}

// ============================================================================
// Timer
// ============================================================================

pub struct BrowserTimer;

#[async_trait(?Send)]
impl Timer for BrowserTimer {
    async fn sleep(&self, duration: Duration) {
        let ms = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window()
                .map(|window| window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms));
            if !matches!(scheduled, Some(Ok(_))) {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let _ = JsFuture::from(promise).await;
    }
}

// ============================================================================
// Query cache
// ============================================================================

/// The shell's cached tenant query
#[derive(Clone, Copy)]
pub struct TenantCache {
    pub tenant: RwSignal<Option<Tenant>>,

    /// Bumped on every clear; the shell refetches when it changes
    pub generation: RwSignal<u32>,

    /// Set once the current fetch finished, whether it found a tenant or failed
    pub settled: RwSignal<bool>,
}

impl TenantCache {
    pub fn new() -> Self {
        Self {
            tenant: RwSignal::new(None),
            generation: RwSignal::new(0),
            settled: RwSignal::new(false),
        }
    }
}

impl QueryCache for TenantCache {
    fn clear(&self) {
        self.tenant.set(None);
        self.settled.set(false);
        self.generation.update(|g| *g = g.wrapping_add(1));
    }
}
