//! Activation Configuration

use std::time::Duration;

use crate::error::{ActivationError, Result};

/// How a run absorbs read-after-write lag before reloading
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettleStrategy {
    /// Blind wait before the hard reload
    FixedDelay(Duration),

    /// Re-read the tenant until the write is visible, then reload.
    /// After `max_attempts` reads the run proceeds anyway.
    PollUntilConfirmed {
        interval: Duration,
        max_attempts: u32,
    },
}

impl Default for SettleStrategy {
    fn default() -> Self {
        Self::FixedDelay(Duration::from_millis(2000))
    }
}

/// Reconciler and parser configuration
#[derive(Clone, Debug)]
pub struct ActivationConfig {
    /// Settling behaviour after a successful write
    pub settle: SettleStrategy,

    /// Upper bound for every network call inside a run
    pub network_timeout: Duration,

    /// An `external_reference` longer than this is taken as a bare tenant id
    pub reference_min_len: usize,

    /// Custom URL scheme of the native app
    pub deep_link_scheme: String,

    /// Host segment that routes a deep link to onboarding
    pub onboarding_host: String,

    /// Target of the final hard navigation
    pub root_path: String,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            settle: SettleStrategy::default(),
            network_timeout: Duration::from_secs(15),
            reference_min_len: 20,
            deep_link_scheme: "campus".into(),
            onboarding_host: "onboarding".into(),
            root_path: "/".into(),
        }
    }
}

impl ActivationConfig {
    /// Build from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        let settle_ms = env_u64("ACTIVATION_SETTLE_MS")?;
        let poll_attempts = env_u64("ACTIVATION_POLL_ATTEMPTS")?;

        config.settle = match (settle_ms, poll_attempts) {
            (ms, Some(attempts)) if attempts > 0 => SettleStrategy::PollUntilConfirmed {
                interval: Duration::from_millis(ms.unwrap_or(1000)),
                max_attempts: u32::try_from(attempts).map_err(|_| {
                    ActivationError::Config("ACTIVATION_POLL_ATTEMPTS out of range".into())
                })?,
            },
            (Some(ms), _) => SettleStrategy::FixedDelay(Duration::from_millis(ms)),
            (None, _) => SettleStrategy::default(),
        };

        if let Some(ms) = env_u64("ACTIVATION_TIMEOUT_MS")? {
            config.network_timeout = Duration::from_millis(ms);
        }

        if let Ok(scheme) = std::env::var("ACTIVATION_DEEP_LINK_SCHEME") {
            if scheme.is_empty() {
                return Err(ActivationError::Config("ACTIVATION_DEEP_LINK_SCHEME is empty".into()));
            }
            config.deep_link_scheme = scheme;
        }

        if let Ok(path) = std::env::var("ACTIVATION_ROOT_PATH") {
            if !path.starts_with('/') {
                return Err(ActivationError::Config(format!("ACTIVATION_ROOT_PATH must start with '/', got '{path}'")));
            }
            config.root_path = path;
        }

        Ok(config)
    }

    /// Builder-style override of the settle strategy
    #[must_use]
    pub fn with_settle(mut self, settle: SettleStrategy) -> Self {
        self.settle = settle;
        self
    }

    #[must_use]
    pub fn with_root_path(mut self, path: impl Into<String>) -> Self {
        self.root_path = path.into();
        self
    }

    /// Builder-style override of the network bound
    #[must_use]
    pub const fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ActivationError::Config(format!("{key} must be an integer, got '{raw}'"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ActivationConfig::default();
        assert_eq!(config.settle, SettleStrategy::FixedDelay(Duration::from_secs(2)));
        assert_eq!(config.reference_min_len, 20);
        assert_eq!(config.onboarding_host, "onboarding");
        assert_eq!(config.root_path, "/");
    }

    #[test]
    fn test_builders() {
        let config = ActivationConfig::default()
            .with_settle(SettleStrategy::FixedDelay(Duration::ZERO))
            .with_network_timeout(Duration::from_millis(50))
            .with_root_path("/app");
        assert_eq!(config.settle, SettleStrategy::FixedDelay(Duration::ZERO));
        assert_eq!(config.root_path, "/app");
        assert_eq!(config.network_timeout, Duration::from_millis(50));
    }
}
