//! Error Types

use thiserror::Error;

/// Transport-level backend failures
#[derive(Error, Debug)]
pub enum BackendError {
    /// Request never completed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status with the server's message
    #[error("{status}: {message}")]
    Status { status: u16, message: String },

    /// Body did not match the expected row shape
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_decode(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) => false,
        }
    }

    /// The server's own message where one exists.
    ///
    /// Surfaced verbatim in the sync error overlay.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Http(_) => "Could not reach the server. Check your connection.".into(),
            Self::Decode(_) => "The server returned an unexpected response.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_retryable() {
        let e = BackendError::Status {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(e.is_retryable());

        let e = BackendError::Status {
            status: 403,
            message: "new row violates row-level security policy".into(),
        };
        assert!(!e.is_retryable());
        assert_eq!(e.user_message(), "new row violates row-level security policy");
    }
}
