//! A managed group of background tasks.

use crate::auth::policy::parse_duration;
use crate::lifecycle::Managed;
use anyhow::Context;
use async_trait::async_trait;
use std::env;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Environment variable specifying how long [`TaskSetManager`] waits for its tasks on stop.
pub const SHUTDOWN_TIMEOUT: &str = "SHUTDOWN_TIMEOUT";

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs background tasks which are cancelled and awaited once the lifecycle stops.
///
/// Every task receives a [`CancellationToken`] and is expected to return promptly once it
/// is cancelled:
///
/// ```rust,ignore
/// let workers = lifecycle.manage(TaskSetManager::from_env("workers")?)?;
/// workers.spawn(|cancelled| async move {
///     while !cancelled.is_cancelled() {
///         poll_queue().await;
///     }
/// })?;
/// ```
pub struct TaskSetManager {
    name: String,
    shutdown_timeout: Duration,
    tracker: TaskTracker,
    token: CancellationToken,
}

impl TaskSetManager {
    pub fn new(name: impl Into<String>, shutdown_timeout: Duration) -> Self {
        TaskSetManager {
            name: name.into(),
            shutdown_timeout,
            tracker: TaskTracker::new(),
            token: CancellationToken::new(),
        }
    }

    /// Creates a manager whose shutdown timeout is read from `SHUTDOWN_TIMEOUT` (e.g. `45s`).
    pub fn from_env(name: impl Into<String>) -> anyhow::Result<Self> {
        let shutdown_timeout = match env::var(SHUTDOWN_TIMEOUT) {
            Ok(value) => parse_duration(value.trim())
                .with_context(|| format!("Invalid {}: '{}'", SHUTDOWN_TIMEOUT, value))?,
            Err(_) => DEFAULT_SHUTDOWN_TIMEOUT,
        };

        Ok(Self::new(name, shutdown_timeout))
    }

    /// Spawns a task which receives the cancellation token of this manager.
    ///
    /// Fails once the manager has been stopped.
    pub fn spawn<F, Fut>(&self, task: F) -> anyhow::Result<JoinHandle<Fut::Output>>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        if self.tracker.is_closed() {
            anyhow::bail!("Cannot spawn a task in '{}' as it has been stopped", self.name);
        }

        Ok(self.tracker.spawn(task(self.token.child_token())))
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

#[async_trait]
impl Managed for TaskSetManager {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::debug!(
            "Cancelling {} background task(s) of '{}'...",
            self.tracker.len(),
            self.name
        );
        self.token.cancel();
        self.tracker.close();

        if tokio::time::timeout(self.shutdown_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            anyhow::bail!(
                "{} task(s) did not terminate within {:?}",
                self.tracker.len(),
                self.shutdown_timeout
            );
        }

        Ok(())
    }
}
