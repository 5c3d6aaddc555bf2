//! Campus Web Shell
//!
//! Leptos-based WASM frontend. Evaluates the onboarding gate on every
//! render and runs the activation reconciler when a checkout comes back.

mod api;
mod app;
mod components;
mod logging;
mod pages;
mod platform;
mod shell;

pub use app::App;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    logging::init();
    leptos::mount::mount_to_body(App);
}

/// Entry point for the native host's URL-open listener.
///
/// Returns `true` when the link was an onboarding callback; the shell then
/// absorbs it through the router as if the page had loaded with it.
#[wasm_bindgen]
pub fn handle_deep_link(url: &str) -> bool {
    platform::route_deep_link(url)
}
