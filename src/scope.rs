//! Lifetime guard for async work started on behalf of a view.
//!
//! A `ViewScope` is closed when its view goes away. Results that arrive
//! afterwards are dropped instead of being applied to stale state.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::ApiError;

#[derive(Debug, Clone)]
pub struct ViewScope {
    active: Arc<AtomicBool>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Close the scope. Every clone observes the change.
    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Await `future` and return its output, or `None` if the scope was
    /// closed by the time it finished.
    pub async fn run<F: Future>(&self, future: F) -> Option<F::Output> {
        let output = future.await;
        if self.is_active() {
            Some(output)
        } else {
            tracing::debug!("Dropping result for closed view");
            None
        }
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Inline state of a binary resource (attachment image, report PDF).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobState {
    Loading,
    Ready(Vec<u8>),
    /// Shown as an inline failure indicator, never as a notification.
    Failed(String),
}

impl BlobState {
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Ready(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Fetch a blob inside `scope`. Errors degrade to [`BlobState::Failed`];
/// `None` means the view closed before the fetch finished.
pub async fn fetch_blob<F>(scope: &ViewScope, fetch: F) -> Option<BlobState>
where
    F: Future<Output = Result<Vec<u8>, ApiError>>,
{
    let result = scope.run(fetch).await?;
    Some(match result {
        Ok(bytes) => BlobState::Ready(bytes),
        Err(e) => {
            tracing::debug!(error = %e, "Blob fetch failed");
            BlobState::Failed(e.to_string())
        }
    })
}
