//! API Client

use activation_core::{ActivationError, PreferenceGateway, PreferenceRequest, PreferenceResponse, Result};
use activation_runtime::BackendConfig;
use async_trait::async_trait;

/// Backend settings baked in at build time
pub fn backend_config() -> BackendConfig {
    BackendConfig::new(
        option_env!("BACKEND_URL").unwrap_or("http://localhost:54321"),
        option_env!("BACKEND_ANON_KEY").unwrap_or_default(),
    )
}

fn origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:3000".into())
}

/// Preference endpoint on the activation server
pub struct HttpPreferenceGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPreferenceGateway {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/preference", origin()),
        }
    }
}

#[async_trait(?Send)]
impl PreferenceGateway for HttpPreferenceGateway {
    async fn create_preference(&self, request: &PreferenceRequest) -> Result<PreferenceResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ActivationError::Gateway(e.to_string()))?;

        if response.status().is_success() {
            response
                .json::<PreferenceResponse>()
                .await
                .map_err(|e| ActivationError::Gateway(e.to_string()))
        } else {
            let data: serde_json::Value = response.json().await.unwrap_or_default();
            Err(ActivationError::Gateway(
                data["error"].as_str().unwrap_or("Request failed").to_string(),
            ))
        }
    }
}
