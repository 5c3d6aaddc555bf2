//! activation-server
//!
//! Axum server behind the trial and subscription initiators. Creates
//! hosted checkout sessions and serves the WASM shell.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{routing::{get, post}, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use activation_payments::StripeClient;

use crate::config::ServerConfig;
use crate::handlers::{create_preference, health_check};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env();

    // Initialize payments
    let stripe = match StripeClient::from_env(config.return_targets()) {
        Ok(client) => {
            tracing::info!("✓ Stripe configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("⚠ {e} - payments disabled");
            None
        }
    };

    let app = router(AppState { stripe }, &config.static_dir);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("activation-server running on http://{}", config.bind_addr);
    tracing::info!("  GET  /health          - Health check");
    tracing::info!("  POST /api/preference  - Create checkout preference");
    tracing::info!("  return URLs -> {} | {}://onboarding", config.frontend_url, config.deep_link_scheme);

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState, static_dir: &str) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Client-side routes fall back to the shell so `/?status=...` and
    // deep-link routes all load the app
    let index = format!("{static_dir}/index.html");
    let assets = ServeDir::new(static_dir).fallback(ServeFile::new(index));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/preference", post(create_preference))
        .fallback_service(assets)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::default(), "static")
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_stripe() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["stripe_configured"], false);
    }

    #[tokio::test]
    async fn test_preference_without_stripe_is_unavailable() {
        let response = app()
            .oneshot(post_json(
                "/api/preference",
                r#"{"tenantId":"T1","planType":"basic","isTrial":true,"trialDays":30,"platform":"web"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(response).await["code"], "PAYMENTS_DISABLED");
    }

    #[tokio::test]
    async fn test_invalid_preference_is_rejected_first() {
        let response = app()
            .oneshot(post_json("/api/preference", r#"{"tenantId":"","planType":"pro"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"], "tenantId is required");
    }
}
