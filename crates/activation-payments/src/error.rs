//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Request rejected before reaching Stripe
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// External reference could not be encoded
    #[error("Reference error: {0}")]
    Reference(#[from] activation_core::ActivationError),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Stripe(_))
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            Self::Stripe(_) => "Payment processing failed. Please try again.",
            Self::InvalidRequest(msg) => msg,
            Self::Config(_) => "Payments are not configured on this server.",
            Self::Reference(_) => "An error occurred processing your request.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_message_is_surfaced() {
        let e = PaymentError::InvalidRequest("tenantId is required".into());
        assert_eq!(e.user_message(), "tenantId is required");
        assert!(!e.is_retryable());
    }
}
