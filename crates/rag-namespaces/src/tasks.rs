//! Detached background work (initial syncs, login syncs).

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Tracks fire-and-forget tasks so failures are logged and shutdown can
/// wait for them.
#[derive(Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
    token: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a named task. Errors are logged, never propagated.
    pub fn spawn<F, E>(&self, name: &str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let name = name.to_string();
        let token = self.token.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                result = task => match result {
                    Ok(()) => debug!(task = %name, "Background task finished"),
                    Err(e) => warn!(task = %name, error = %e, "Background task failed"),
                },
                _ = token.cancelled() => info!(task = %name, "Background task cancelled"),
            }
        });
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Wait until every task spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop accepting work, give running tasks `grace`, then cancel them.
    /// Returns true if everything finished within the grace period.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            return true;
        }
        warn!(remaining = self.tracker.len(), "Cancelling background tasks");
        self.token.cancel();
        self.tracker.wait().await;
        false
    }
}
