//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for activation operations
pub type Result<T> = std::result::Result<T, ActivationError>;

/// Activation error types
#[derive(Error, Debug)]
pub enum ActivationError {
    /// No tenant could be derived from the callback, the UI or the profile
    #[error("cannot automatically identify the school account")]
    UnresolvedTenant,

    /// Authenticated identity lookup failed
    #[error("Identity error: {0}")]
    Identity(String),

    /// Writing the tenant record failed
    #[error("Tenant update failed: {0}")]
    TenantWrite(String),

    /// Reading the tenant record failed
    #[error("Tenant read failed: {0}")]
    TenantRead(String),

    /// A network call exceeded the configured bound
    #[error("{stage} timed out after {}ms", after.as_millis())]
    Timeout { stage: Stage, after: Duration },

    /// Session storage unavailable or corrupt
    #[error("Storage error: {0}")]
    Storage(String),

    /// Checkout preference could not be created
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The run stage a bounded call belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Updating,
    Settling,
    Initiating,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Resolving => "tenant resolution",
            Self::Updating => "tenant update",
            Self::Settling => "confirmation read",
            Self::Initiating => "checkout initiation",
        };
        f.write_str(name)
    }
}

impl ActivationError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Identity(_)
                | Self::TenantWrite(_)
                | Self::TenantRead(_)
                | Self::Timeout { .. }
                | Self::Gateway(_)
        )
    }

    /// Message shown in the activation overlay
    pub fn user_message(&self) -> String {
        match self {
            Self::UnresolvedTenant => self.to_string(),
            Self::Identity(_) => "We could not verify your session. Please sign in again.".into(),
            Self::TenantWrite(msg) | Self::TenantRead(msg) => msg.clone(),
            Self::Timeout { .. } => "The server took too long to respond. Please try again.".into(),
            Self::Gateway(msg) => format!("Could not start the payment process: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_message_is_user_facing() {
        let err = ActivationError::UnresolvedTenant;
        assert_eq!(err.user_message(), "cannot automatically identify the school account");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timeout_display() {
        let err = ActivationError::Timeout {
            stage: Stage::Updating,
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "tenant update timed out after 1500ms");
        assert!(err.is_retryable());
    }
}
