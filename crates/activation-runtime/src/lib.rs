//! # activation-runtime
//!
//! Backend accessors for the activation pipeline.
//!
//! ## Backends
//!
//! - **REST** (default): PostgREST tables plus the auth user endpoint of the
//!   managed database, over `reqwest`. Compiles for native and `wasm32`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use activation_runtime::{BackendConfig, RestBackend};
//!
//! let backend = Arc::new(RestBackend::from_config(BackendConfig::from_env()?));
//! backend.set_session(Some(access_token));
//! let reconciler = Reconciler::new(backend.clone(), backend, cache, navigator, timer, config);
//! ```

pub mod config;
pub mod error;
pub mod rest;

pub use config::BackendConfig;
pub use error::BackendError;
pub use rest::RestBackend;

// Re-export core types for convenience
pub use activation_core::{
    ActivationError, IdentityProvider, Result, Role, Tenant, TenantId, TenantStore, TenantType,
    UserIdentity,
};
