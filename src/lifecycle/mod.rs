//! Managed lifecycle of application resources.
//!
//! Resources such as background task pools, connection pools or servers implement
//! [`Managed`] and are registered with the [`LifecycleRegistry`]. The registry starts them in
//! registration order and stops them in exact reverse order:
//!
//! ```rust,ignore
//! let mut lifecycle = LifecycleRegistry::new();
//! lifecycle.manage(DatabasePool::new(config))?;
//! lifecycle.manage(TaskSetManager::from_env("workers")?)?;
//!
//! lifecycle.start_all().await?;
//! // ... serve requests ...
//! lifecycle.stop_all().await?;
//! ```
//!
//! Starting is fail-fast: the first failing component aborts the start sequence. Stopping is
//! best-effort: every started component is stopped, failures are collected and reported
//! together once all components had their chance.

use async_trait::async_trait;
use std::future::Future;

pub mod registry;
pub mod tasks;

pub use registry::{LifecycleError, LifecycleRegistry, LifecycleState, StopFailure};
pub use tasks::TaskSetManager;

/// A component with an explicit start/stop lifecycle.
///
/// Both operations default to a no-op. `stop` may be invoked even if `start` failed part way,
/// so implementations must tolerate releasing resources they never fully acquired.
#[async_trait]
pub trait Managed: Send + Sync {
    /// A human readable name used in logs and error reports.
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    async fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Receives notifications about the state transitions of a [`LifecycleRegistry`].
pub trait LifecycleListener: Send + Sync {
    fn lifecycle_starting(&self) {}

    fn lifecycle_started(&self) {}

    /// Invoked once if a component fails to start.
    fn lifecycle_failure(&self, _component: &str, _error: &anyhow::Error) {}

    fn lifecycle_stopping(&self) {}

    fn lifecycle_stopped(&self) {}
}

/// Adapts a pair of async closures into a [`Managed`] component.
pub struct ManagedFn<S, T> {
    name: String,
    start: S,
    stop: T,
}

/// Creates a [`Managed`] component from a start and a stop closure.
///
/// ```rust,ignore
/// let pool = Arc::new(ConnectionPool::new());
/// lifecycle.manage(managed_fn(
///     "connection-pool",
///     { let pool = pool.clone(); move || { let pool = pool.clone(); async move { pool.connect().await } } },
///     { let pool = pool.clone(); move || { let pool = pool.clone(); async move { pool.close().await } } },
/// ))?;
/// ```
pub fn managed_fn<S, SF, T, TF>(name: impl Into<String>, start: S, stop: T) -> ManagedFn<S, T>
where
    S: Fn() -> SF + Send + Sync,
    SF: Future<Output = anyhow::Result<()>> + Send + 'static,
    T: Fn() -> TF + Send + Sync,
    TF: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    ManagedFn {
        name: name.into(),
        start,
        stop,
    }
}

#[async_trait]
impl<S, SF, T, TF> Managed for ManagedFn<S, T>
where
    S: Fn() -> SF + Send + Sync,
    SF: Future<Output = anyhow::Result<()>> + Send + 'static,
    T: Fn() -> TF + Send + Sync,
    TF: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn start(&self) -> anyhow::Result<()> {
        (self.start)().await
    }

    async fn stop(&self) -> anyhow::Result<()> {
        (self.stop)().await
    }
}
