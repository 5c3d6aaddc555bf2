//! Platform Seams
//!
//! Browser-side effects the reconciler needs, abstracted so the same state
//! machine runs in the WASM shell and under `tokio` in tests.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{self, Either};

use crate::error::{ActivationError, Result, Stage};

/// Client-side query cache
pub trait QueryCache {
    /// Drop every cached entry
    fn clear(&self);
}

/// Page navigation
pub trait Navigator {
    /// Remove `status`, `payment_id` and `external_reference` from the
    /// visible URL without reloading
    fn strip_callback_params(&self);

    /// Full document navigation; all in-memory state is rebuilt
    fn hard_navigate(&self, path: &str);

    /// Hand a URL to an external surface (hosted checkout)
    fn open_external(&self, url: &str) -> Result<()> {
        self.hard_navigate(url);
        Ok(())
    }
}

/// Async sleep source
#[async_trait(?Send)]
pub trait Timer {
    async fn sleep(&self, duration: Duration);
}

/// Timer backed by the tokio runtime
#[cfg(feature = "tokio-timer")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioTimer;

#[cfg(feature = "tokio-timer")]
#[async_trait(?Send)]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Race `fut` against `limit`; expiry becomes [`ActivationError::Timeout`]
pub async fn bounded<T, F>(timer: &dyn Timer, limit: Duration, stage: Stage, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let fut = std::pin::pin!(fut);
    let expiry = timer.sleep(limit);

    match future::select(fut, expiry).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => {
            tracing::warn!(stage = %stage, limit_ms = %limit.as_millis(), "Network call timed out");
            Err(ActivationError::Timeout { stage, after: limit })
        }
    }
}
