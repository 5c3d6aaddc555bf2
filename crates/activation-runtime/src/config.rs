//! Backend Configuration

use activation_core::{ActivationError, Result};

/// Managed backend connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub url: String,

    /// Public anon key, sent as `apikey` on every request
    pub anon_key: String,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    /// Read `BACKEND_URL` and `BACKEND_ANON_KEY`
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("BACKEND_URL")
            .map_err(|_| ActivationError::Config("BACKEND_URL is not set".into()))?;
        let anon_key = std::env::var("BACKEND_ANON_KEY")
            .map_err(|_| ActivationError::Config("BACKEND_ANON_KEY is not set".into()))?;
        Ok(Self::new(url, anon_key))
    }

    pub(crate) fn rest(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.url)
    }

    pub(crate) fn auth_user(&self) -> String {
        format!("{}/auth/v1/user", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_ignore_trailing_slash() {
        let config = BackendConfig::new("https://db.example.com/", "anon");
        assert_eq!(config.rest("tenants"), "https://db.example.com/rest/v1/tenants");
        assert_eq!(config.auth_user(), "https://db.example.com/auth/v1/user");
    }
}
