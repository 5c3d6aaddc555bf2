//! Server Configuration

use activation_core::ActivationConfig;
use activation_payments::ReturnTargets;

/// Process-level settings, read after `.env` is loaded
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Public origin the web return URLs point at
    pub frontend_url: String,

    /// Directory holding the built WASM bundle
    pub static_dir: String,

    pub deep_link_scheme: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            frontend_url: "http://localhost:3000".into(),
            static_dir: "static".into(),
            deep_link_scheme: ActivationConfig::default().deep_link_scheme,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str, fallback: String| std::env::var(key).unwrap_or(fallback);

        Self {
            bind_addr: var("BIND_ADDR", defaults.bind_addr),
            frontend_url: var("FRONTEND_URL", defaults.frontend_url),
            static_dir: var("STATIC_DIR", defaults.static_dir),
            deep_link_scheme: var("ACTIVATION_DEEP_LINK_SCHEME", defaults.deep_link_scheme),
        }
    }

    pub fn return_targets(&self) -> ReturnTargets {
        ReturnTargets {
            frontend_url: self.frontend_url.clone(),
            deep_link_scheme: self.deep_link_scheme.clone(),
        }
    }
}
